use tracing::trace;

use super::Process;
use crate::ports::fabric::{ClaimOutcome, Delivery, Fabric, PortId, ReadOutcome};

/// Process of a replicator.
///
/// All sinks are claimed at once before the source is read, which makes the
/// copy all-or-nothing.
pub(super) struct ReplicatorChannel {
    source: PortId,
    sinks: Vec<PortId>,
}

impl ReplicatorChannel {
    pub(super) fn new(source: PortId, sinks: Vec<PortId>) -> Self {
        Self { source, sinks }
    }
}

impl Process for ReplicatorChannel {
    fn run(self, fabric: &Fabric) {
        while fabric.await_demand(&[self.source]) {
            let claims = match fabric.claim(&self.sinks, fabric.deadline(), &[self.source]) {
                ClaimOutcome::Claimed(claims) => claims,
                ClaimOutcome::Timeout | ClaimOutcome::Withdrawn => continue,
                ClaimOutcome::Stopped => return,
            };

            match fabric.read(&[self.source], Some(fabric.deadline())) {
                ReadOutcome::Value { value, .. } => {
                    let delivery = fabric.deliver(claims, value);
                    trace!(source = fabric.name(self.source), ?delivery, "replicator fired");
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

    fn replicator_bench() -> Bench {
        Bench::new(
            3,
            &[Channel::Replicator {
                source: port(0),
                sinks: vec![port(1), port(2)],
            }],
        )
    }

    #[test]
    fn replicator_copies_to_all_sinks() {
        let bench = replicator_bench();

        let input = bench.port(0);
        let left = bench.port(1);
        let right = bench.port(2);
        let writer = thread::spawn(move || input.write("a", DELAY * 2));
        let left = thread::spawn(move || left.try_read(DELAY * 3));

        assert_eq!(right.try_read(DELAY * 3).as_deref(), Some("a"));
        assert_eq!(left.join().unwrap().as_deref(), Some("a"));
        assert!(writer.join().unwrap());

        bench.stop();
    }

    #[test]
    fn replicator_is_atomic() {
        let bench = replicator_bench();

        // Only one sink is ready: nothing may be transferred.
        let input = bench.port(0);
        let writer = thread::spawn(move || input.write("a", DELAY));

        assert_eq!(bench.port(1).try_read(DELAY * 3), None);
        assert!(!writer.join().unwrap());

        bench.stop();
    }
}
