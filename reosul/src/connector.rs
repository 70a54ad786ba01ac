//! Connector descriptors and running instances.
//!
//! A [`Connector`] is an immutable, validated description of a Reo circuit:
//! its boundary input ports, boundary output ports, internal ports, the
//! primitive [`Channel`]s between them and its [`Timing`]. Connectors are
//! assembled with a [`ConnectorBuilder`]:
//!
//! ```
//! use std::time::Duration;
//!
//! use reosul::connector::Connector;
//!
//! // A datum written on `A` is forwarded to `C` immediately, and a copy is
//! // forwarded through a one-place buffer.
//! let connector = Connector::builder("replicate-buffer-merge")
//!     .input("A")
//!     .output("C")
//!     .internals(["M0", "M1", "M2", "M3"])
//!     .lossy_buffer("A", "M0")
//!     .replicator("M0", ["M1", "M2"])
//!     .fifo1("M2", "M3")
//!     .merger(["M1", "M3"], "C")
//!     .delay(Duration::from_millis(25))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(connector.inputs(), ["A"]);
//! assert_eq!(connector.channels().len(), 4);
//! ```
//!
//! Each call to [`Connector::instantiate()`] creates an [`Instance`] with
//! fresh ports and one running process per channel. An instance runs until it
//! is stopped or dropped.

mod builder;

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::channel::Channel;
use crate::ports::fabric::{Fabric, PortId};
use crate::ports::{Port, StopError, StopHandle};
use crate::time::Timing;

pub use builder::ConnectorBuilder;

/// A validated Reo connector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connector {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    internals: Vec<String>,
    channels: Vec<Channel>,
    timing: Timing,
}

impl Connector {
    /// Creates a builder for a connector with the specified name.
    pub fn builder(name: impl Into<String>) -> ConnectorBuilder {
        ConnectorBuilder::new(name)
    }

    /// Returns the name of the connector.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the boundary ports written by the environment, in declaration
    /// order.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Returns the boundary ports read by the environment, in declaration
    /// order.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Returns the internal ports.
    pub fn internals(&self) -> &[String] {
        &self.internals
    }

    /// Returns the channels of the connector.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Returns the timing of the connector.
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Allocates fresh ports and starts one process per channel.
    ///
    /// If a process cannot be spawned, the processes spawned so far are
    /// stopped before the error is returned.
    pub fn instantiate(&self) -> Result<Instance, ConnectorError> {
        let names: Vec<String> = self
            .inputs
            .iter()
            .chain(&self.outputs)
            .chain(&self.internals)
            .cloned()
            .collect();
        let ids: BTreeMap<&str, PortId> = names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), PortId(index)))
            .collect();

        let fabric = Arc::new(Fabric::new(names.clone(), self.timing.delay()));
        let mut stop = StopHandle::new(fabric.clone());
        for channel in &self.channels {
            let acknowledgement = channel
                .spawn(&fabric, |name| ids[name])
                .map_err(|source| ConnectorError::Spawn {
                    channel: channel.to_string(),
                    source: Arc::new(source),
                })?;
            stop.register(acknowledgement);
        }

        let boundary = |ports: &[String]| -> BTreeMap<String, Port> {
            ports
                .iter()
                .map(|name| (name.clone(), Port::new(fabric.clone(), ids[name.as_str()])))
                .collect()
        };
        let inputs = boundary(&self.inputs);
        let outputs = boundary(&self.outputs);

        debug!(connector = %self.name, channels = self.channels.len(), "instance started");

        Ok(Instance {
            name: self.name.clone(),
            inputs,
            outputs,
            stop,
        })
    }
}

/// A running connector.
///
/// Dropping an instance stops it; use [`Instance::stop()`] to find out
/// whether all processes stopped cleanly.
pub struct Instance {
    name: String,
    inputs: BTreeMap<String, Port>,
    outputs: BTreeMap<String, Port>,
    stop: StopHandle,
}

impl Instance {
    /// Returns the input port with the specified name, if any.
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.get(name)
    }

    /// Returns the output port with the specified name, if any.
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.get(name)
    }

    /// Returns an iterator over the output ports, sorted by name.
    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.values()
    }

    /// Stops all processes and waits for their acknowledgement.
    pub fn stop(mut self) -> Result<(), StopError> {
        let result = self.stop.stop();
        debug!(connector = %self.name, "instance stopped");

        result
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Error returned when a connector is invalid or cannot be instantiated.
#[derive(Clone, Debug, Error)]
pub enum ConnectorError {
    /// A port name was declared more than once.
    #[error("port '{port}' is declared more than once")]
    DuplicatePort {
        /// Name of the port.
        port: String,
    },
    /// A channel refers to an undeclared port.
    #[error("channel {channel} refers to undeclared port '{port}'")]
    UnknownPort {
        /// Rendering of the channel.
        channel: String,
        /// Name of the port.
        port: String,
    },
    /// A port is written by more than one channel.
    #[error("port '{port}' is written by more than one channel")]
    MultipleProducers {
        /// Name of the port.
        port: String,
    },
    /// A port is read by more than one channel.
    #[error("port '{port}' is read by more than one channel")]
    MultipleConsumers {
        /// Name of the port.
        port: String,
    },
    /// An input port is written by a channel instead of the environment.
    #[error("input port '{port}' is written by a channel")]
    ProducedInput {
        /// Name of the port.
        port: String,
    },
    /// An output port is read by a channel instead of the environment.
    #[error("output port '{port}' is read by a channel")]
    ConsumedOutput {
        /// Name of the port.
        port: String,
    },
    /// A channel has an invalid shape.
    #[error("invalid channel {channel}: {reason}")]
    InvalidChannel {
        /// Rendering of the channel.
        channel: String,
        /// Why the channel is invalid.
        reason: &'static str,
    },
    /// The rendezvous delay is zero.
    #[error("the rendezvous delay must be non-zero")]
    ZeroDelay,
    /// The process of a channel could not be spawned.
    #[error("could not spawn the process of channel {channel}")]
    Spawn {
        /// Rendering of the channel.
        channel: String,
        /// Error reported by the OS.
        #[source]
        source: Arc<io::Error>,
    },
}

impl ConnectorError {
    /// Returns a stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::DuplicatePort { .. } => "duplicate_port",
            Self::UnknownPort { .. } => "unknown_port",
            Self::MultipleProducers { .. } => "multiple_producers",
            Self::MultipleConsumers { .. } => "multiple_consumers",
            Self::ProducedInput { .. } => "produced_input",
            Self::ConsumedOutput { .. } => "consumed_output",
            Self::InvalidChannel { .. } => "invalid_channel",
            Self::ZeroDelay => "zero_delay",
            Self::Spawn { .. } => "spawn",
        }
    }
}
