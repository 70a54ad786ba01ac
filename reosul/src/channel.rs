//! Primitive Reo channels.
//!
//! Each channel of a running connector is executed by its own process, i.e.
//! a dedicated thread that loops over rendezvous on the channel ends until
//! the instance is stopped:
//!
//! * [`Channel::Sync`] transfers a datum from its source to its sink in a
//!   single atomic step,
//! * [`Channel::SyncDrain`] takes one datum from each of its two sources
//!   simultaneously and discards both; neither side can complete alone,
//! * [`Channel::Fifo1`] is a one-place buffer: its source succeeds when the
//!   buffer is empty and its sink when it is full,
//! * [`Channel::Replicator`] copies a datum from its source to all of its
//!   sinks atomically, or does nothing,
//! * [`Channel::Merger`] forwards a datum from exactly one of its sources to
//!   its sink, choosing at random among ready sources,
//! * [`Channel::LossyBuffer`] always accepts a datum and forwards it if its
//!   sink takes it within the rendezvous delay, dropping it otherwise.
//!
//! Processes never hold a rendezvous for longer than the rendezvous delay of
//! their instance, except for reads that wait for a datum to become
//! available: these are interrupted by the stop request.

mod fifo1;
mod lossy_buffer;
mod merger;
mod replicator;
mod sync;
mod sync_drain;

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;

use crate::ports::fabric::{Fabric, PortId};
use crate::ports::Acknowledgement;

use fifo1::Fifo1Channel;
use lossy_buffer::LossyBufferChannel;
use merger::MergerChannel;
use replicator::ReplicatorChannel;
use sync::SyncChannel;
use sync_drain::SyncDrainChannel;

/// A primitive channel between named ports.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// Atomic transfer from `source` to `sink`.
    Sync {
        /// Port read by the channel.
        source: String,
        /// Port written by the channel.
        sink: String,
    },
    /// Simultaneous consumption of a datum on each source.
    SyncDrain {
        /// First port read by the channel.
        left: String,
        /// Second port read by the channel.
        right: String,
    },
    /// One-place buffer.
    Fifo1 {
        /// Port read by the channel.
        source: String,
        /// Port written by the channel.
        sink: String,
    },
    /// Atomic copy from `source` to every sink.
    Replicator {
        /// Port read by the channel.
        source: String,
        /// Ports written by the channel.
        sinks: Vec<String>,
    },
    /// Exclusive transfer from one of the sources to `sink`.
    Merger {
        /// Ports read by the channel.
        sources: Vec<String>,
        /// Port written by the channel.
        sink: String,
    },
    /// Always-accepting transfer that loses data not taken in time.
    LossyBuffer {
        /// Port read by the channel.
        source: String,
        /// Port written by the channel.
        sink: String,
    },
}

impl Channel {
    /// Returns the kind of the channel as a lowercase label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sync { .. } => "sync",
            Self::SyncDrain { .. } => "sync_drain",
            Self::Fifo1 { .. } => "fifo1",
            Self::Replicator { .. } => "replicator",
            Self::Merger { .. } => "merger",
            Self::LossyBuffer { .. } => "lossy_buffer",
        }
    }

    /// Returns the ports read by the channel.
    pub fn sources(&self) -> Vec<&str> {
        match self {
            Self::Sync { source, .. }
            | Self::Fifo1 { source, .. }
            | Self::Replicator { source, .. }
            | Self::LossyBuffer { source, .. } => vec![source.as_str()],
            Self::SyncDrain { left, right } => vec![left.as_str(), right.as_str()],
            Self::Merger { sources, .. } => sources.iter().map(String::as_str).collect(),
        }
    }

    /// Returns the ports written by the channel.
    pub fn sinks(&self) -> Vec<&str> {
        match self {
            Self::Sync { sink, .. }
            | Self::Fifo1 { sink, .. }
            | Self::Merger { sink, .. }
            | Self::LossyBuffer { sink, .. } => vec![sink.as_str()],
            Self::SyncDrain { .. } => Vec::new(),
            Self::Replicator { sinks, .. } => sinks.iter().map(String::as_str).collect(),
        }
    }

    /// Spawns the process of the channel on a dedicated thread.
    ///
    /// `resolve` maps the port names of the channel to the ports of the
    /// fabric; all names must have been validated beforehand.
    pub(crate) fn spawn(
        &self,
        fabric: &Arc<Fabric>,
        resolve: impl Fn(&str) -> PortId,
    ) -> io::Result<Acknowledgement> {
        let process: Box<dyn FnOnce(&Fabric) + Send> = match self {
            Self::Sync { source, sink } => {
                boxed(SyncChannel::new(resolve(source), resolve(sink)))
            }
            Self::SyncDrain { left, right } => {
                boxed(SyncDrainChannel::new(resolve(left), resolve(right)))
            }
            Self::Fifo1 { source, sink } => {
                boxed(Fifo1Channel::new(resolve(source), resolve(sink)))
            }
            Self::Replicator { source, sinks } => boxed(ReplicatorChannel::new(
                resolve(source),
                sinks.iter().map(|sink| resolve(sink)).collect(),
            )),
            Self::Merger { sources, sink } => boxed(MergerChannel::new(
                sources.iter().map(|source| resolve(source)).collect(),
                resolve(sink),
            )),
            Self::LossyBuffer { source, sink } => {
                boxed(LossyBufferChannel::new(resolve(source), resolve(sink)))
            }
        };

        let label = self.to_string();
        let fabric = fabric.clone();
        let handle = thread::Builder::new()
            .name(format!("reosul-{}", self.kind()))
            .spawn(move || process(&fabric))?;

        Ok(Acknowledgement::new(label, handle))
    }
}

impl fmt::Display for Channel {
    /// Renders the channel as e.g. `sync(A->B)` or `merger(A,B->C)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}->{})",
            self.kind(),
            self.sources().join(","),
            self.sinks().join(",")
        )
    }
}

/// A channel process.
trait Process: Send + 'static {
    /// Runs the process until the stop request is observed.
    fn run(self, fabric: &Fabric);
}

fn boxed<P: Process>(process: P) -> Box<dyn FnOnce(&Fabric) + Send> {
    Box::new(move |fabric: &Fabric| process.run(fabric))
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::ports::{Port, StopHandle};

    pub(super) const DELAY: Duration = Duration::from_millis(40);

    /// A running set of channels over ports `P0`, `P1`, ...
    pub(super) struct Bench {
        pub(super) fabric: Arc<Fabric>,
        stop: StopHandle,
    }

    impl Bench {
        pub(super) fn new(ports: usize, channels: &[Channel]) -> Self {
            let fabric = Arc::new(Fabric::new(
                (0..ports).map(|i| format!("P{i}")).collect(),
                DELAY,
            ));
            let mut stop = StopHandle::new(fabric.clone());
            for channel in channels {
                let ack = channel
                    .spawn(&fabric, |name| PortId(name[1..].parse().unwrap()))
                    .unwrap();
                stop.register(ack);
            }

            Self { fabric, stop }
        }

        pub(super) fn port(&self, index: usize) -> Port {
            Port::new(self.fabric.clone(), PortId(index))
        }

        pub(super) fn stop(mut self) {
            self.stop.stop().unwrap();
        }
    }

    pub(super) fn port(index: usize) -> String {
        format!("P{index}")
    }

    #[test]
    fn channel_display() {
        let merger = Channel::Merger {
            sources: vec!["A".into(), "B".into()],
            sink: "C".into(),
        };
        let drain = Channel::SyncDrain {
            left: "A".into(),
            right: "B".into(),
        };

        assert_eq!(merger.to_string(), "merger(A,B->C)");
        assert_eq!(drain.to_string(), "sync_drain(A,B->)");
    }

    #[test]
    fn channel_stop_while_busy() {
        let bench = Bench::new(
            3,
            &[
                Channel::Sync {
                    source: port(0),
                    sink: port(1),
                },
                Channel::LossyBuffer {
                    source: port(1),
                    sink: port(2),
                },
            ],
        );

        let writer = {
            let input = bench.port(0);
            thread::spawn(move || {
                while input.write("x", DELAY) {}
            })
        };
        thread::sleep(DELAY * 3);

        let start = Instant::now();
        bench.stop();
        assert!(start.elapsed() < DELAY * 10);
        writer.join().unwrap();
    }
}
