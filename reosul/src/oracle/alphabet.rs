use std::collections::BTreeMap;
use std::iter;

use crate::symbols::Input;

/// Generates the input alphabet of a connector with the specified input
/// ports.
///
/// The alphabet holds one data input per subset of the ports, followed by
/// [`Input::Tick`], i.e. `2^n + 1` distinct symbols. The order is
/// deterministic: the first symbol activates no port, and adding the `k`-th
/// port appends a copy of the `2^k` symbols generated so far with that port
/// activated.
pub fn alphabet<I>(ports: I) -> Vec<Input>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut data: Vec<BTreeMap<String, bool>> = vec![BTreeMap::new()];

    for port in ports {
        let port = port.into();
        let activated: Vec<_> = data
            .iter()
            .map(|datum| {
                let mut datum = datum.clone();
                datum.insert(port.clone(), true);
                datum
            })
            .collect();
        for datum in &mut data {
            datum.insert(port.clone(), false);
        }
        data.extend(activated);
    }

    data.into_iter()
        .map(Input::Data)
        .chain(iter::once(Input::Tick))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn alphabet_order() {
        let rendered: Vec<String> = alphabet(["A", "B"]).iter().map(ToString::to_string).collect();

        assert_eq!(rendered, ["Ø", "A", "B", "A,B", "T"]);
    }

    #[test]
    fn alphabet_without_ports() {
        let rendered: Vec<String> = alphabet(Vec::<String>::new())
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(rendered, ["Ø", "T"]);
    }

    proptest! {
        #[test]
        fn alphabet_covers_every_subset(ports in prop::collection::btree_set("[A-Z][0-9]?", 0..7)) {
            let symbols = alphabet(ports.iter().cloned());

            prop_assert_eq!(symbols.len(), (1usize << ports.len()) + 1);
            prop_assert_eq!(symbols.iter().filter(|input| input.is_tick()).count(), 1);
            prop_assert!(symbols.last().is_some_and(Input::is_tick));

            let distinct: BTreeSet<_> = symbols.iter().collect();
            prop_assert_eq!(distinct.len(), symbols.len());

            for input in symbols.iter().filter(|input| !input.is_tick()) {
                for port in &ports {
                    prop_assert!(input.is_active(port).is_some());
                }
            }
        }
    }
}
