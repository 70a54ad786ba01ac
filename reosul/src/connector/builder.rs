use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use crate::channel::Channel;
use crate::time::Timing;

use super::{Connector, ConnectorError};

#[derive(Copy, Clone, PartialEq, Eq)]
enum PortKind {
    Input,
    Output,
    Internal,
}

/// Builder for a [`Connector`].
///
/// Declarations are only checked by [`ConnectorBuilder::build()`].
pub struct ConnectorBuilder {
    name: String,
    ports: Vec<(String, PortKind)>,
    channels: Vec<Channel>,
    delay: Duration,
    time_unit: Duration,
}

impl ConnectorBuilder {
    pub(super) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            channels: Vec::new(),
            delay: Timing::DEFAULT_DELAY,
            time_unit: Timing::DEFAULT_TIME_UNIT,
        }
    }

    /// Declares a boundary port written by the environment.
    pub fn input(self, name: impl Into<String>) -> Self {
        self.port(name, PortKind::Input)
    }

    /// Declares several boundary ports written by the environment.
    pub fn inputs<I: IntoIterator>(self, names: I) -> Self
    where
        I::Item: Into<String>,
    {
        names.into_iter().fold(self, Self::input)
    }

    /// Declares a boundary port read by the environment.
    pub fn output(self, name: impl Into<String>) -> Self {
        self.port(name, PortKind::Output)
    }

    /// Declares several boundary ports read by the environment.
    pub fn outputs<I: IntoIterator>(self, names: I) -> Self
    where
        I::Item: Into<String>,
    {
        names.into_iter().fold(self, Self::output)
    }

    /// Declares a port that is only visible to channels.
    pub fn internal(self, name: impl Into<String>) -> Self {
        self.port(name, PortKind::Internal)
    }

    /// Declares several ports that are only visible to channels.
    pub fn internals<I: IntoIterator>(self, names: I) -> Self
    where
        I::Item: Into<String>,
    {
        names.into_iter().fold(self, Self::internal)
    }

    /// Sets the bound of every rendezvous attempt.
    ///
    /// If not set, [`Timing::DEFAULT_DELAY`] is used.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;

        self
    }

    /// Sets the duration of a time-advance step.
    ///
    /// If not set, [`Timing::DEFAULT_TIME_UNIT`] is used.
    pub fn time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;

        self
    }

    /// Sets both the rendezvous delay and the time unit.
    pub fn timing(self, timing: Timing) -> Self {
        self.delay(timing.delay()).time_unit(timing.time_unit())
    }

    /// Adds a channel.
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);

        self
    }

    /// Adds a synchronous channel.
    pub fn sync(self, source: impl Into<String>, sink: impl Into<String>) -> Self {
        self.channel(Channel::Sync {
            source: source.into(),
            sink: sink.into(),
        })
    }

    /// Adds a synchronous drain.
    pub fn sync_drain(self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.channel(Channel::SyncDrain {
            left: left.into(),
            right: right.into(),
        })
    }

    /// Adds a one-place buffer.
    pub fn fifo1(self, source: impl Into<String>, sink: impl Into<String>) -> Self {
        self.channel(Channel::Fifo1 {
            source: source.into(),
            sink: sink.into(),
        })
    }

    /// Adds a replicator.
    pub fn replicator<I: IntoIterator>(self, source: impl Into<String>, sinks: I) -> Self
    where
        I::Item: Into<String>,
    {
        self.channel(Channel::Replicator {
            source: source.into(),
            sinks: sinks.into_iter().map(Into::into).collect(),
        })
    }

    /// Adds a merger.
    pub fn merger<I: IntoIterator>(self, sources: I, sink: impl Into<String>) -> Self
    where
        I::Item: Into<String>,
    {
        self.channel(Channel::Merger {
            sources: sources.into_iter().map(Into::into).collect(),
            sink: sink.into(),
        })
    }

    /// Adds a lossy buffer.
    pub fn lossy_buffer(self, source: impl Into<String>, sink: impl Into<String>) -> Self {
        self.channel(Channel::LossyBuffer {
            source: source.into(),
            sink: sink.into(),
        })
    }

    /// Validates the declarations and builds the connector.
    pub fn build(self) -> Result<Connector, ConnectorError> {
        if self.delay.is_zero() {
            return Err(ConnectorError::ZeroDelay);
        }

        let mut kinds = BTreeMap::new();
        for (name, kind) in &self.ports {
            if kinds.insert(name.as_str(), *kind).is_some() {
                return Err(ConnectorError::DuplicatePort { port: name.clone() });
            }
        }

        let mut produced = BTreeSet::new();
        let mut consumed = BTreeSet::new();
        for channel in &self.channels {
            check_shape(channel)?;

            for port in channel.sources().into_iter().chain(channel.sinks()) {
                if !kinds.contains_key(port) {
                    return Err(ConnectorError::UnknownPort {
                        channel: channel.to_string(),
                        port: port.into(),
                    });
                }
            }
            for port in channel.sinks() {
                if kinds[port] == PortKind::Input {
                    return Err(ConnectorError::ProducedInput { port: port.into() });
                }
                if !produced.insert(port) {
                    return Err(ConnectorError::MultipleProducers { port: port.into() });
                }
            }
            for port in channel.sources() {
                if kinds[port] == PortKind::Output {
                    return Err(ConnectorError::ConsumedOutput { port: port.into() });
                }
                if !consumed.insert(port) {
                    return Err(ConnectorError::MultipleConsumers { port: port.into() });
                }
            }
        }

        let names = |wanted: PortKind| -> Vec<String> {
            self.ports
                .iter()
                .filter(|(_, kind)| *kind == wanted)
                .map(|(name, _)| name.clone())
                .collect()
        };

        Ok(Connector {
            inputs: names(PortKind::Input),
            outputs: names(PortKind::Output),
            internals: names(PortKind::Internal),
            name: self.name,
            channels: self.channels,
            timing: Timing::new(self.delay, self.time_unit),
        })
    }

    fn port(mut self, name: impl Into<String>, kind: PortKind) -> Self {
        self.ports.push((name.into(), kind));

        self
    }
}

fn check_shape(channel: &Channel) -> Result<(), ConnectorError> {
    let invalid = |reason| {
        Err(ConnectorError::InvalidChannel {
            channel: channel.to_string(),
            reason,
        })
    };

    match channel {
        Channel::Replicator { sinks, .. } if sinks.is_empty() => {
            return invalid("a replicator needs at least one sink")
        }
        Channel::Merger { sources, .. } if sources.is_empty() => {
            return invalid("a merger needs at least one source")
        }
        _ => {}
    }

    let ends: Vec<&str> = channel
        .sources()
        .into_iter()
        .chain(channel.sinks())
        .collect();
    let distinct: BTreeSet<&str> = ends.iter().copied().collect();
    if distinct.len() != ends.len() {
        return invalid("a port is used more than once by the channel");
    }

    Ok(())
}

impl fmt::Debug for ConnectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorBuilder")
            .field("name", &self.name)
            .field("channels", &self.channels.len())
            .finish_non_exhaustive()
    }
}
