use tracing::trace;

use super::Process;
use crate::ports::fabric::{Fabric, JoinOutcome, PortId};

/// Process of a synchronous drain.
pub(super) struct SyncDrainChannel {
    left: PortId,
    right: PortId,
}

impl SyncDrainChannel {
    pub(super) fn new(left: PortId, right: PortId) -> Self {
        Self { left, right }
    }
}

impl Process for SyncDrainChannel {
    fn run(self, fabric: &Fabric) {
        loop {
            match fabric.read_joint(&[self.left, self.right], fabric.delay()) {
                JoinOutcome::Values(_) => trace!(
                    left = fabric.name(self.left),
                    right = fabric.name(self.right),
                    "sync drain fired"
                ),
                JoinOutcome::Timeout => trace!(
                    left = fabric.name(self.left),
                    right = fabric.name(self.right),
                    "sync drain refused lone datum"
                ),
                JoinOutcome::Stopped => return,
            }
        }
    }
}
