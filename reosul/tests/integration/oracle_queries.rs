//! Membership queries.

use reosul::connector::Connector;
use reosul::oracle::{Equivalence, EquivalenceOracle, Hypothesis, MembershipOracle, Oracle};
use reosul::simulation::simulate;
use reosul::symbols::{Input, InputSeq, Output};

use super::{init_tracing, DELAY, TIME_UNIT};

/// `A` is forwarded to `C` synchronously and `B` is buffered towards `D`.
fn two_lines() -> Connector {
    Connector::builder("two-lines")
        .inputs(["A", "B", "E"])
        .outputs(["C", "D"])
        .internals(["M0", "M1"])
        .lossy_buffer("A", "M0")
        .sync("M0", "C")
        .lossy_buffer("B", "M1")
        .fifo1("M1", "D")
        .delay(DELAY)
        .time_unit(TIME_UNIT)
        .build()
        .unwrap()
}

fn find(oracle: &Oracle, rendering: &str) -> Input {
    oracle
        .inputs()
        .iter()
        .find(|input| input.to_string() == rendering)
        .cloned()
        .unwrap()
}

#[test]
fn oracle_alphabet() {
    let oracle = Oracle::new(two_lines());
    let inputs = MembershipOracle::inputs(&oracle);

    assert_eq!(inputs.len(), 9);
    assert_eq!(inputs.iter().filter(|input| input.is_tick()).count(), 1);
    assert_eq!(inputs[0].to_string(), "Ø");
}

#[test]
fn oracle_outputs_are_complete() {
    init_tracing();

    let connector = two_lines();
    let inputs = InputSeq::from(vec![
        Input::with_active(["A", "B", "E"], ["A"]),
        Input::Tick,
        Input::with_active(["A", "B", "E"], ["B", "E"]),
    ]);

    let outputs = simulate(&connector, &inputs).unwrap();

    assert_eq!(outputs.len(), inputs.len());
    for output in outputs.iter() {
        assert_eq!(output.len(), 2);
        assert!(output.get("C").is_some());
        assert!(output.get("D").is_some());
    }
}

#[test]
fn oracle_queries_are_stable() {
    init_tracing();

    let oracle = Oracle::builder(two_lines()).bound(2).build();
    let word = InputSeq::from(vec![find(&oracle, "A,B"), Input::Tick]);

    let first = oracle.membership_query(&word).unwrap();
    let second = oracle.membership_query(&word).unwrap();

    assert_eq!(first, second);
    assert_eq!(oracle.stats().queries, 2);
    assert!(oracle.stats().runs >= 6);
}

#[test]
fn oracle_tick_is_quiet() {
    init_tracing();

    let oracle = Oracle::builder(two_lines()).bound(1).build();
    let word = InputSeq::from(vec![Input::Tick]);

    let output = oracle.membership_query(&word).unwrap();

    assert_eq!(output, Output::empty(["C", "D"]));
    assert_eq!(output.to_string(), "ϵ");
}

#[test]
fn oracle_equivalence_not_implemented() {
    struct Echo;

    impl Hypothesis for Echo {
        fn run(&self, _word: &InputSeq) -> Output {
            Output::empty(["C", "D"])
        }
    }

    let oracle = Oracle::new(two_lines());

    assert_eq!(oracle.equivalence_query(&Echo), Equivalence::NotImplemented);
    assert_ne!(
        EquivalenceOracle::equivalence_query(&oracle, &Echo),
        Equivalence::Equivalent
    );
}
