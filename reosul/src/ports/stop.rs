//! Stop request and acknowledgement.

use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{debug, error};

use super::fabric::Fabric;

/// Acknowledgement of the stop request by one channel process.
///
/// The process acknowledges by returning from its thread.
pub(crate) struct Acknowledgement {
    channel: String,
    handle: JoinHandle<()>,
}

impl Acknowledgement {
    pub(crate) fn new(channel: String, handle: JoinHandle<()>) -> Self {
        Self { channel, handle }
    }
}

/// Handle used to stop all channel processes of a connector instance.
///
/// Stopping broadcasts the stop request to every port of the instance, which
/// wakes up all pending rendezvous, and then waits until each process has
/// acknowledged. Dropping the handle stops the instance if this was not done
/// explicitly.
pub struct StopHandle {
    fabric: Arc<Fabric>,
    acknowledgements: Vec<Acknowledgement>,
}

impl StopHandle {
    pub(crate) fn new(fabric: Arc<Fabric>) -> Self {
        Self {
            fabric,
            acknowledgements: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, acknowledgement: Acknowledgement) {
        self.acknowledgements.push(acknowledgement);
    }

    /// Checks whether the stop request was already broadcast.
    pub fn is_stop_requested(&self) -> bool {
        self.fabric.is_stopped()
    }

    /// Requests all processes to stop and waits for their acknowledgement.
    ///
    /// Stopping is idempotent: once all processes have acknowledged, further
    /// calls return immediately.
    pub fn stop(&mut self) -> Result<(), StopError> {
        self.fabric.request_stop();

        let mut panicked = Vec::new();
        for Acknowledgement { channel, handle } in self.acknowledgements.drain(..) {
            if handle.join().is_err() {
                error!(channel = %channel, "channel process panicked");
                panicked.push(channel);
            } else {
                debug!(channel = %channel, "channel process stopped");
            }
        }

        if panicked.is_empty() {
            Ok(())
        } else {
            Err(StopError::Panicked { channels: panicked })
        }
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("pending_acknowledgements", &self.acknowledgements.len())
            .finish_non_exhaustive()
    }
}

/// Error returned when an instance did not stop cleanly.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StopError {
    /// One or more channel processes panicked before acknowledging.
    #[error("channel process(es) panicked: {}", channels.join(", "))]
    Panicked {
        /// Labels of the channels whose process panicked.
        channels: Vec<String>,
    },
}

impl StopError {
    /// Returns a stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Panicked { .. } => "channel_panicked",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::ports::fabric::PortId;

    fn fabric() -> Arc<Fabric> {
        Arc::new(Fabric::new(vec!["A".into()], Duration::from_millis(10)))
    }

    #[test]
    fn stop_is_acknowledged() {
        let fabric = fabric();
        let mut stop = StopHandle::new(fabric.clone());

        let process = {
            let fabric = fabric.clone();
            thread::spawn(move || while fabric.await_demand(&[PortId(0)]) {})
        };
        stop.register(Acknowledgement::new("idle".into(), process));

        assert!(!stop.is_stop_requested());
        assert_eq!(stop.stop(), Ok(()));
        assert!(stop.is_stop_requested());
        // Repeated stops are no-ops.
        assert_eq!(stop.stop(), Ok(()));
    }

    #[test]
    fn stop_reports_panicked_process() {
        let mut stop = StopHandle::new(fabric());

        let process = thread::spawn(|| panic!("boom"));
        stop.register(Acknowledgement::new("faulty".into(), process));

        assert_eq!(
            stop.stop(),
            Err(StopError::Panicked {
                channels: vec!["faulty".into()]
            })
        );
    }
}
