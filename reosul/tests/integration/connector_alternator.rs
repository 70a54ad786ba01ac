//! The alternator: a datum on `A` only goes through together with a datum on
//! `B`, which is then emitted at the next step.

use reosul::connector::Connector;
use reosul::oracle::Oracle;
use reosul::simulation::simulate;
use reosul::symbols::{Input, InputSeq, SingleOutput};

use super::{init_tracing, DELAY, TIME_UNIT};

fn alternator() -> Connector {
    Connector::builder("alternator")
        .inputs(["A", "B"])
        .output("C")
        .internals(["M0", "M1", "M2", "M3", "M4", "M5", "M6", "M7"])
        .lossy_buffer("A", "M6")
        .lossy_buffer("B", "M7")
        .replicator("M6", ["M0", "M1"])
        .replicator("M7", ["M2", "M3"])
        .sync_drain("M1", "M2")
        .sync("M0", "M4")
        .fifo1("M3", "M5")
        .merger(["M4", "M5"], "C")
        .delay(DELAY)
        .time_unit(TIME_UNIT)
        .build()
        .unwrap()
}

fn offer(active: &[&str]) -> Input {
    Input::with_active(["A", "B"], active.iter().copied())
}

#[test]
fn alternator_both_inputs() {
    init_tracing();

    let inputs = InputSeq::from(vec![offer(&["A", "B"]), Input::Tick]);

    let outputs = simulate(&alternator(), &inputs).unwrap();

    assert_eq!(outputs[0].get("C"), Some(&SingleOutput::datum("A")));
    assert_eq!(outputs[1].get("C"), Some(&SingleOutput::datum("B")));
}

#[test]
fn alternator_single_input_is_lost() {
    init_tracing();

    for active in [&["A"][..], &["B"][..]] {
        let inputs = InputSeq::from(vec![offer(active), Input::Tick]);

        let outputs = simulate(&alternator(), &inputs).unwrap();

        assert!(
            outputs.iter().all(|output| output.is_quiet()),
            "{active:?} produced {outputs}"
        );
    }
}

#[test]
fn alternator_membership_query() {
    init_tracing();

    let oracle = Oracle::builder(alternator()).bound(1).max_runs(10).build();
    let both = oracle
        .inputs()
        .iter()
        .find(|input| input.to_string() == "A,B")
        .cloned()
        .unwrap();

    let word = InputSeq::from(vec![both, Input::Tick]);
    let output = oracle.membership_query(&word).unwrap();

    assert_eq!(output.to_string(), "C:B");
}
