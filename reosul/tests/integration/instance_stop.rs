//! Stopping connector instances.

use std::thread;
use std::time::{Duration, Instant};

use reosul::connector::Connector;

use super::{init_tracing, DELAY, TIME_UNIT};

fn buffer_line() -> Connector {
    Connector::builder("buffer-line")
        .input("A")
        .output("C")
        .internals(["M0", "M1"])
        .lossy_buffer("A", "M0")
        .fifo1("M0", "M1")
        .sync("M1", "C")
        .delay(DELAY)
        .time_unit(TIME_UNIT)
        .build()
        .unwrap()
}

#[test]
fn instance_repeated_stop() {
    init_tracing();

    let connector = buffer_line();
    for _ in 0..20 {
        let instance = connector.instantiate().unwrap();
        let input = instance.input("A").unwrap().clone();
        let output = instance.output("C").unwrap().clone();

        assert!(input.write("A", DELAY));
        instance.stop().unwrap();

        // Ports outlive the instance but no longer rendezvous.
        assert!(!input.write("A", DELAY));
        assert_eq!(output.try_read(DELAY), None);
    }
}

#[test]
fn instance_stop_wakes_blocking_reader() {
    init_tracing();

    let instance = buffer_line().instantiate().unwrap();
    let output = instance.output("C").unwrap().clone();

    let reader = thread::spawn(move || output.blocking_read());
    thread::sleep(DELAY * 2);

    let start = Instant::now();
    instance.stop().unwrap();

    assert_eq!(reader.join().unwrap(), None);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn instance_stopped_on_drop() {
    init_tracing();

    let instance = buffer_line().instantiate().unwrap();
    let input = instance.input("A").unwrap().clone();
    drop(instance);

    assert!(!input.write("A", DELAY));
}
