//! Execution of a connector over an input sequence.
//!
//! A [`Simulator`] runs a fresh instance of its connector for each input
//! sequence. Every input symbol makes one *step*:
//!
//! * a data input writes, concurrently, one datum on each active input port,
//!   the datum being the name of the port,
//! * a time-advance input ([`Input::Tick`]) blocks for one time unit,
//!
//! and in both cases one bounded read is issued on every output port,
//! concurrently with the writes. A step ends once all its writes and reads
//! have resolved, so consecutive steps never overlap. What each read observed
//! is recorded and, after the last step and once the instance has stopped,
//! turned into one [`Output`] per step.
//!
//! Runs are not deterministic: the rendezvous delay is a wall-clock bound and
//! mergers pick among ready sources at random. The
//! [`Oracle`](crate::oracle::Oracle) repeats runs until their answers agree.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use reosul::connector::Connector;
//! use reosul::simulation::Simulator;
//! use reosul::symbols::{Input, InputSeq, SingleOutput};
//!
//! let connector = Connector::builder("pipe")
//!     .input("A")
//!     .output("B")
//!     .sync("A", "B")
//!     .delay(Duration::from_millis(50))
//!     .build()
//!     .unwrap();
//!
//! let inputs = InputSeq::from(vec![Input::with_active(["A"], ["A"])]);
//! let outputs = Simulator::new(connector).run(&inputs).unwrap();
//!
//! assert_eq!(outputs.len(), 1);
//! assert_eq!(outputs[0].get("B"), Some(&SingleOutput::datum("A")));
//! ```

mod capture;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, trace};

use crate::connector::{Connector, ConnectorError};
use crate::ports::StopError;
use crate::symbols::{Input, InputSeq, Output, OutputSeq};

use capture::{CaptureBuffer, Observation};

/// Runs a connector over input sequences.
#[derive(Clone, Debug)]
pub struct Simulator {
    connector: Arc<Connector>,
}

impl Simulator {
    /// Creates a simulator for the specified connector.
    pub fn new(connector: impl Into<Arc<Connector>>) -> Self {
        Self {
            connector: connector.into(),
        }
    }

    /// Returns the simulated connector.
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Runs a fresh instance of the connector over `inputs`.
    ///
    /// The returned sequence has one output per input, and each output has
    /// one entry per output port of the connector.
    pub fn run(&self, inputs: &InputSeq) -> Result<OutputSeq, SimulationError> {
        let connector = &*self.connector;
        for (step, input) in inputs.iter().enumerate() {
            check_input(connector, step, input)?;
        }
        if inputs.is_empty() {
            return Ok(OutputSeq::default());
        }

        let instance = connector
            .instantiate()
            .map_err(SimulationError::Instantiate)?;
        let timing = connector.timing();
        let delay = timing.delay();

        let captures: Vec<(&str, CaptureBuffer)> = connector
            .outputs()
            .iter()
            .map(|port| (port.as_str(), CaptureBuffer::with_capacity(inputs.len())))
            .collect();

        for (step, input) in inputs.iter().enumerate() {
            trace!(connector = connector.name(), step, input = %input, "simulation step");

            crossbeam_utils::thread::scope(|s| {
                match input {
                    Input::Tick => timing.advance(),
                    Input::Data(_) => {
                        for name in input.active_ports() {
                            let Some(port) = instance.input(name) else {
                                continue;
                            };
                            s.spawn(move |_| {
                                let is_accepted = port.write(port.name(), delay);
                                trace!(port = port.name(), is_accepted, "input written");
                            });
                        }
                    }
                }
                for (name, capture) in &captures {
                    let Some(port) = instance.output(name) else {
                        continue;
                    };
                    let writer = capture.writer();
                    s.spawn(move |_| {
                        let observation = match port.try_read(delay) {
                            Some(value) => Observation::Datum(value),
                            None => Observation::Nothing,
                        };
                        writer.write(observation);
                    });
                }
            })
            .map_err(|_| SimulationError::StepPanicked { step })?;
        }

        instance.stop().map_err(SimulationError::Shutdown)?;

        let mut outputs: Vec<Output> = (0..inputs.len()).map(|_| Output::default()).collect();
        for (name, capture) in captures {
            let observations = capture.drain().map_err(|(step, kind)| {
                error!(port = name, step, %kind, "protocol violation");

                SimulationError::ProtocolViolation {
                    port: name.into(),
                    step,
                    kind,
                }
            })?;
            for (output, observation) in outputs.iter_mut().zip(observations) {
                output.set(name, observation);
            }
        }

        Ok(OutputSeq::from(outputs))
    }
}

/// Checks that a data input has exactly one entry per input port of the
/// connector.
fn check_input(connector: &Connector, step: usize, input: &Input) -> Result<(), SimulationError> {
    let Input::Data(datum) = input else {
        return Ok(());
    };

    if let Some(port) = datum
        .keys()
        .find(|port| !connector.inputs().contains(*port))
    {
        return Err(SimulationError::UnknownInputPort {
            step,
            port: port.clone(),
        });
    }
    if let Some(port) = connector
        .inputs()
        .iter()
        .find(|port| !datum.contains_key(port.as_str()))
    {
        return Err(SimulationError::IncompleteInput {
            step,
            port: port.clone(),
        });
    }

    Ok(())
}

/// Runs a fresh instance of `connector` over `inputs`.
///
/// This is a shorthand for [`Simulator::run()`].
pub fn simulate(connector: &Connector, inputs: &InputSeq) -> Result<OutputSeq, SimulationError> {
    Simulator::new(connector.clone()).run(inputs)
}

/// Kind of a protocol violation detected in the recorded observations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// No observation was recorded for a step.
    MissingObservation,
    /// More observations were recorded than there were steps.
    Overflow,
    /// An empty datum was read, which is indistinguishable from no datum.
    EmptyDatum,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingObservation => "missing observation",
            Self::Overflow => "capture overflow",
            Self::EmptyDatum => "empty datum",
        })
    }
}

/// Error returned when a run fails.
#[derive(Clone, Debug, Error)]
pub enum SimulationError {
    /// The connector could not be instantiated.
    #[error("the connector could not be instantiated")]
    Instantiate(#[source] ConnectorError),
    /// The instance did not stop cleanly.
    #[error("the instance did not stop cleanly")]
    Shutdown(#[source] StopError),
    /// A write or read of a step panicked.
    #[error("a port operation panicked at step {step}")]
    StepPanicked {
        /// Index of the step.
        step: usize,
    },
    /// An input has an entry for a port that is not an input port of the
    /// connector.
    #[error("step {step} refers to '{port}', which is not an input port")]
    UnknownInputPort {
        /// Index of the step.
        step: usize,
        /// Name of the port.
        port: String,
    },
    /// An input has no entry for an input port of the connector.
    #[error("step {step} has no entry for input port '{port}'")]
    IncompleteInput {
        /// Index of the step.
        step: usize,
        /// Name of the missing port.
        port: String,
    },
    /// The recorded observations are inconsistent.
    #[error("protocol violation on port '{port}' at step {step}: {kind}")]
    ProtocolViolation {
        /// Name of the output port.
        port: String,
        /// Index of the step.
        step: usize,
        /// What went wrong.
        kind: ViolationKind,
    },
}

impl SimulationError {
    /// Checks whether the failure is specific to this run, so that the run
    /// can be discarded and retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Instantiate(_) | Self::Shutdown(_) | Self::StepPanicked { .. }
        )
    }

    /// Returns a stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Instantiate(_) => "instantiate",
            Self::Shutdown(_) => "shutdown",
            Self::StepPanicked { .. } => "step_panicked",
            Self::UnknownInputPort { .. } => "unknown_input_port",
            Self::IncompleteInput { .. } => "incomplete_input",
            Self::ProtocolViolation { .. } => "protocol_violation",
        }
    }
}
