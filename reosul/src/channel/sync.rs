use tracing::trace;

use super::Process;
use crate::ports::fabric::{ClaimOutcome, Delivery, Fabric, PortId, ReadOutcome};

/// Process of a synchronous channel.
///
/// The sink is claimed first, and only while the source is being written,
/// so that a datum is never taken from the source unless the sink is ready
/// to take it in the same step.
pub(super) struct SyncChannel {
    source: PortId,
    sink: PortId,
}

impl SyncChannel {
    pub(super) fn new(source: PortId, sink: PortId) -> Self {
        Self { source, sink }
    }
}

impl Process for SyncChannel {
    fn run(self, fabric: &Fabric) {
        while fabric.await_demand(&[self.source]) {
            let claims = match fabric.claim(&[self.sink], fabric.deadline(), &[self.source]) {
                ClaimOutcome::Claimed(claims) => claims,
                ClaimOutcome::Timeout | ClaimOutcome::Withdrawn => continue,
                ClaimOutcome::Stopped => return,
            };

            match fabric.read(&[self.source], Some(fabric.deadline())) {
                ReadOutcome::Value { value, .. } => {
                    let delivery = fabric.deliver(claims, value);
                    trace!(
                        source = fabric.name(self.source),
                        sink = fabric.name(self.sink),
                        ?delivery,
                        "sync fired"
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
