//! A datum replicated to a synchronous line and a buffered line that merge
//! into a single output.

use reosul::connector::Connector;
use reosul::oracle::Oracle;
use reosul::simulation::simulate;
use reosul::symbols::{Input, InputSeq, Output, SingleOutput};

use super::{init_tracing, DELAY, TIME_UNIT};

fn replicate_buffer_merge() -> Connector {
    Connector::builder("replicate-buffer-merge")
        .input("A")
        .output("C")
        .internals(["M0", "M1", "M2", "M3", "M4"])
        .lossy_buffer("A", "M0")
        .replicator("M0", ["M1", "M2"])
        .sync("M1", "M3")
        .fifo1("M2", "M4")
        .merger(["M3", "M4"], "C")
        .delay(DELAY)
        .time_unit(TIME_UNIT)
        .build()
        .unwrap()
}

fn offer_a() -> Input {
    Input::with_active(["A"], ["A"])
}

#[test]
fn replicate_merge_synchronous_copy_first() {
    init_tracing();

    let connector = replicate_buffer_merge();
    let inputs = InputSeq::from(vec![offer_a(), Input::Tick]);

    let outputs = simulate(&connector, &inputs).unwrap();

    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].get("C"), Some(&SingleOutput::datum("A")));
    // Each step carries at most one datum, which is a copy of `A`.
    for output in outputs.iter() {
        assert_eq!(output.len(), 1);
        if let Some(datum) = output.get("C").and_then(SingleOutput::as_datum) {
            assert_eq!(datum, "A");
        }
    }
    assert!(!outputs.iter().all(|output| output.is_quiet()));
}

#[test]
fn replicate_merge_buffered_copy_surfaces_later() {
    init_tracing();

    let connector = replicate_buffer_merge();
    let inputs = InputSeq::from(vec![offer_a(), Input::Tick]);

    // Replication is all-or-nothing, so the buffer keeps its copy of `A`
    // whenever the synchronous copy reaches `C`, and hands it over at the
    // next read of `C`.
    for _ in 0..5 {
        let outputs = simulate(&connector, &inputs).unwrap();

        assert_eq!(outputs.to_string(), "C:A-C:A");
    }
}

#[test]
fn replicate_merge_stabilized_answer() {
    init_tracing();

    let oracle = Oracle::builder(replicate_buffer_merge()).bound(2).build();
    let offer = oracle
        .inputs()
        .iter()
        .find(|input| input.is_active("A") == Some(true))
        .cloned()
        .unwrap();
    let first = InputSeq::new().extended(offer);

    let output = oracle.membership_query(&first).unwrap();
    assert_eq!(output.to_string(), "C:A");

    let output = oracle
        .membership_query(&first.extended(Input::Tick))
        .unwrap();
    assert_eq!(output.to_string(), "C:A");

    let output = oracle
        .membership_query(&InputSeq::new().extended(Input::Tick))
        .unwrap();
    assert_eq!(output, Output::empty(["C"]));
}

#[test]
fn replicate_merge_quiet_without_data() {
    init_tracing();

    let connector = replicate_buffer_merge();
    let inputs = InputSeq::from(vec![
        Input::Tick,
        Input::with_active(["A"], Vec::<&str>::new()),
    ]);

    let outputs = simulate(&connector, &inputs).unwrap();

    assert!(outputs.iter().all(|output| output.is_quiet()));
}

#[test]
fn merger_forwards_one_of_simultaneous_data() {
    init_tracing();

    let connector = Connector::builder("merge")
        .inputs(["A", "B"])
        .output("C")
        .internals(["M0", "M1"])
        .lossy_buffer("A", "M0")
        .lossy_buffer("B", "M1")
        .merger(["M0", "M1"], "C")
        .delay(DELAY)
        .time_unit(TIME_UNIT)
        .build()
        .unwrap();
    let inputs = InputSeq::from(vec![Input::with_active(["A", "B"], ["A", "B"])]);

    let outputs = simulate(&connector, &inputs).unwrap();

    let datum = outputs[0].get("C").and_then(SingleOutput::as_datum);
    assert!(matches!(datum, Some("A") | Some("B")), "got {datum:?}");
}
