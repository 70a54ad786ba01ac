//! Connector ports.
//!
//! A [`Port`] is the environment's handle to one boundary port of a running
//! connector [`Instance`](crate::connector::Instance). Writes to an input
//! port and reads from an output port are rendezvous: a write only succeeds
//! if the connector accepts the datum within the specified timeout, and a
//! read only succeeds if a datum is offered within the timeout. An abandoned
//! rendezvous has no effect on the connector.
//!
//! `Port`s are clonable. Their clones are shallow copies that refer to the
//! same port of the same instance.
//!
//! #### Example
//!
//! ```
//! use std::thread;
//! use std::time::Duration;
//!
//! use reosul::connector::Connector;
//!
//! let connector = Connector::builder("pipe")
//!     .input("A")
//!     .output("B")
//!     .sync("A", "B")
//!     .build()
//!     .unwrap();
//!
//! let instance = connector.instantiate().unwrap();
//! let input = instance.input("A").unwrap().clone();
//! let output = instance.output("B").unwrap();
//!
//! let writer = thread::spawn(move || input.write("A", Duration::from_millis(500)));
//! assert_eq!(output.try_read(Duration::from_millis(500)).as_deref(), Some("A"));
//! assert!(writer.join().unwrap());
//!
//! instance.stop().unwrap();
//! ```

pub(crate) mod fabric;
mod stop;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fabric::{ClaimOutcome, Delivery, Fabric, PortId, ReadOutcome};

pub use stop::{StopError, StopHandle};
pub(crate) use stop::Acknowledgement;

/// Environment handle to a boundary port of a connector instance.
#[derive(Clone)]
pub struct Port {
    fabric: Arc<Fabric>,
    id: PortId,
}

impl Port {
    pub(crate) fn new(fabric: Arc<Fabric>, id: PortId) -> Self {
        Self { fabric, id }
    }

    /// Returns the name of the port.
    pub fn name(&self) -> &str {
        self.fabric.name(self.id)
    }

    /// Offers a datum to the connector.
    ///
    /// Returns `true` if the connector took the datum within `timeout`, and
    /// `false` if the rendezvous was abandoned or the instance was stopped.
    pub fn write(&self, value: impl Into<String>, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        match self.fabric.claim(&[self.id], deadline, &[]) {
            ClaimOutcome::Claimed(claims) => {
                self.fabric.deliver(claims, value.into()) == Delivery::Delivered
            }
            ClaimOutcome::Timeout | ClaimOutcome::Withdrawn | ClaimOutcome::Stopped => false,
        }
    }

    /// Waits up to `timeout` for a datum offered by the connector.
    ///
    /// Returns `None` if no datum was offered in time or if the instance was
    /// stopped.
    pub fn try_read(&self, timeout: Duration) -> Option<String> {
        self.read(Some(Instant::now() + timeout))
    }

    /// Waits for a datum offered by the connector.
    ///
    /// Returns `None` only once the instance is stopped.
    pub fn blocking_read(&self) -> Option<String> {
        self.read(None)
    }

    fn read(&self, deadline: Option<Instant>) -> Option<String> {
        match self.fabric.read(&[self.id], deadline) {
            ReadOutcome::Value { value, .. } => Some(value),
            ReadOutcome::Timeout | ReadOutcome::Stopped => None,
        }
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port").field("name", &self.name()).finish()
    }
}
