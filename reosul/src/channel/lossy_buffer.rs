use tracing::trace;

use super::Process;
use crate::ports::fabric::{ClaimOutcome, Delivery, Fabric, PortId, ReadOutcome};

/// Process of a lossy buffer.
///
/// The source is always being read, so a writer never waits for more than
/// the time it takes to forward the previous datum.
pub(super) struct LossyBufferChannel {
    source: PortId,
    sink: PortId,
}

impl LossyBufferChannel {
    pub(super) fn new(source: PortId, sink: PortId) -> Self {
        Self { source, sink }
    }
}

impl Process for LossyBufferChannel {
    fn run(self, fabric: &Fabric) {
        loop {
            let value = match fabric.read(&[self.source], None) {
                ReadOutcome::Value { value, .. } => value,
                ReadOutcome::Timeout => continue,
                ReadOutcome::Stopped => return,
            };

            let delivery = match fabric.claim(&[self.sink], fabric.deadline(), &[]) {
                ClaimOutcome::Claimed(claims) => fabric.deliver(claims, value),
                ClaimOutcome::Timeout | ClaimOutcome::Withdrawn => Delivery::Refused,
                ClaimOutcome::Stopped => return,
            };
            match delivery {
                Delivery::Delivered => {}
                Delivery::Refused => trace!(sink = fabric.name(self.sink), "lossy buffer lost datum"),
                Delivery::Stopped => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::channel::tests::{port, Bench, DELAY};
    use crate::channel::Channel;

    #[test]
    fn lossy_buffer_drops_untaken_datum() {
        let bench = Bench::new(
            2,
            &[Channel::LossyBuffer {
                source: port(0),
                sink: port(1),
            }],
        );

        // Accepted even though nobody reads the sink.
        assert!(bench.port(0).write("a", DELAY));
        std::thread::sleep(DELAY * 2);
        assert_eq!(bench.port(1).try_read(DELAY), None);

        bench.stop();
    }
}
