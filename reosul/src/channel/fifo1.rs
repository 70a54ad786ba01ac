use tracing::trace;

use super::Process;
use crate::ports::fabric::{ClaimOutcome, Delivery, Fabric, PortId, ReadOutcome};

/// Process of a one-place buffer.
pub(super) struct Fifo1Channel {
    source: PortId,
    sink: PortId,
}

impl Fifo1Channel {
    pub(super) fn new(source: PortId, sink: PortId) -> Self {
        Self { source, sink }
    }
}

impl Process for Fifo1Channel {
    fn run(self, fabric: &Fabric) {
        let mut slot: Option<String> = None;

        loop {
            match slot.take() {
                None => match fabric.read(&[self.source], Some(fabric.deadline())) {
                    ReadOutcome::Value { value, .. } => {
                        trace!(source = fabric.name(self.source), "fifo1 filled");
                        slot = Some(value);
                    }
                    ReadOutcome::Timeout => {}
                    ReadOutcome::Stopped => return,
                },
                Some(value) => match fabric.claim(&[self.sink], fabric.deadline(), &[]) {
                    ClaimOutcome::Claimed(claims) => {
                        match fabric.deliver(claims, value.clone()) {
                            Delivery::Delivered => {
                                trace!(sink = fabric.name(self.sink), "fifo1 emptied");
                            }
                            Delivery::Refused => slot = Some(value),
                            Delivery::Stopped => return,
                        }
                    }
                    ClaimOutcome::Timeout | ClaimOutcome::Withdrawn => slot = Some(value),
                    ClaimOutcome::Stopped => return,
                },
            }
        }
    }
}
