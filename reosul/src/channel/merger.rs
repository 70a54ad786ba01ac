use tracing::trace;

use super::Process;
use crate::ports::fabric::{ClaimOutcome, Delivery, Fabric, PortId, ReadOutcome};

/// Process of a merger.
///
/// The merger reads all of its sources at once; when several of them are
/// being written, the fabric gives priority to one picked at random, so that
/// exactly one datum goes through per firing.
pub(super) struct MergerChannel {
    sources: Vec<PortId>,
    sink: PortId,
}

impl MergerChannel {
    pub(super) fn new(sources: Vec<PortId>, sink: PortId) -> Self {
        Self { sources, sink }
    }
}

impl Process for MergerChannel {
    fn run(self, fabric: &Fabric) {
        while fabric.await_demand(&self.sources) {
            let claims = match fabric.claim(&[self.sink], fabric.deadline(), &self.sources) {
                ClaimOutcome::Claimed(claims) => claims,
                ClaimOutcome::Timeout | ClaimOutcome::Withdrawn => continue,
                ClaimOutcome::Stopped => return,
            };

            match fabric.read(&self.sources, Some(fabric.deadline())) {
                ReadOutcome::Value { port, value } => {
                    let delivery = fabric.deliver(claims, value);
                    trace!(
                        source = fabric.name(port),
                        sink = fabric.name(self.sink),
                        ?delivery,
                        "merger fired"
                    );
                    if delivery == Delivery::Stopped {
                        return;
                    }
                }
                ReadOutcome::Timeout => fabric.release(claims),
                ReadOutcome::Stopped => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crate::channel::tests::{port, Bench, DELAY};
    use crate::channel::Channel;

    #[test]
    fn merger_is_exclusive() {
        let bench = Bench::new(
            3,
            &[Channel::Merger {
                sources: vec![port(0), port(1)],
                sink: port(2),
            }],
        );

        let writers: Vec<_> = ["a", "b"]
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let input = bench.port(index);
                thread::spawn(move || input.write(value, DELAY * 2))
            })
            .collect();

        let value = bench.port(2).try_read(DELAY * 3);
        let accepted: Vec<bool> = writers.into_iter().map(|w| w.join().unwrap()).collect();

        // A single read lets exactly one datum through.
        assert_eq!(accepted.iter().filter(|&&ok| ok).count(), 1);
        let expected = if accepted[0] { "a" } else { "b" };
        assert_eq!(value.as_deref(), Some(expected));

        bench.stop();
    }
}
