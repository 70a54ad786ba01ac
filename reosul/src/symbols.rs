//! Input and output symbols exchanged with a learning algorithm.
//!
//! An [`Input`] is one step of a test: either a set of input ports on which
//! the environment offers a datum, or a [`Tick`](Input::Tick) that lets one
//! time unit pass. An [`Output`] is what was observed on every output port
//! during one step.
//!
//! Both symbol kinds always carry an entry for every declared port of their
//! kind: a port on which nothing happened is recorded as `false` (inputs) or
//! [`SingleOutput::Empty`] (outputs), never by omission. Ports are stored in
//! sorted maps, so renderings are stable and equality does not depend on the
//! order in which ports were declared.
//!
//! # Examples
//!
//! ```
//! use reosul::symbols::{Input, InputSeq, Output, SingleOutput};
//!
//! let word: InputSeq = [
//!     Input::with_active(["A", "B"], ["A"]),
//!     Input::Tick,
//!     Input::with_active(["A", "B"], Vec::<&str>::new()),
//! ]
//! .into_iter()
//! .collect();
//! assert_eq!(word.to_string(), "A-T-Ø");
//!
//! let mut output = Output::empty(["C", "D"]);
//! output.set("C", SingleOutput::datum("A"));
//! assert_eq!(output.to_string(), "C:A");
//! ```

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::ops::Deref;

/// Rendering of a time-advance input.
const TICK_SYMBOL: &str = "T";
/// Rendering of a data input with no active port.
const NO_DATA_SYMBOL: &str = "Ø";
/// Rendering of an empty sequence or of a quiet output.
const EPSILON_SYMBOL: &str = "ϵ";

/// One atomic input of a test.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Input {
    /// For each declared input port, whether the environment offers a datum
    /// on this port during the step.
    Data(BTreeMap<String, bool>),
    /// Let one time unit pass without offering any datum.
    Tick,
}

impl Input {
    /// Creates a data input over `ports` where exactly the ports listed in
    /// `active` offer a datum.
    ///
    /// Active ports that are not listed in `ports` are added as well, so that
    /// the resulting input never silently drops a requested datum.
    pub fn with_active<P, A>(ports: P, active: A) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let mut datum: BTreeMap<String, bool> =
            ports.into_iter().map(|port| (port.into(), false)).collect();
        for port in active {
            datum.insert(port.into(), true);
        }

        Self::Data(datum)
    }

    /// Returns `true` if this is a time-advance input.
    pub fn is_tick(&self) -> bool {
        matches!(self, Self::Tick)
    }

    /// Returns whether a datum is offered on `port`.
    ///
    /// This is `None` for a tick or for a port unknown to this input.
    pub fn is_active(&self, port: &str) -> Option<bool> {
        match self {
            Self::Data(datum) => datum.get(port).copied(),
            Self::Tick => None,
        }
    }

    /// Returns an iterator over the ports on which a datum is offered, in
    /// sorted order.
    ///
    /// The iterator is empty for a tick.
    pub fn active_ports(&self) -> impl Iterator<Item = &str> {
        let datum = match self {
            Self::Data(datum) => Some(datum),
            Self::Tick => None,
        };

        datum
            .into_iter()
            .flatten()
            .filter_map(|(port, active)| active.then_some(port.as_str()))
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tick() {
            return f.write_str(TICK_SYMBOL);
        }

        let mut active = self.active_ports().peekable();
        if active.peek().is_none() {
            return f.write_str(NO_DATA_SYMBOL);
        }
        for (i, port) in active.enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            f.write_str(port)?;
        }

        Ok(())
    }
}

/// An ordered sequence of inputs forming one test case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputSeq(Vec<Input>);

impl InputSeq {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an input to the sequence.
    pub fn push(&mut self, input: Input) {
        self.0.push(input);
    }

    /// Returns a new sequence made of this sequence followed by `input`.
    pub fn extended(&self, input: Input) -> Self {
        let mut seq = self.clone();
        seq.push(input);

        seq
    }
}

impl Deref for InputSeq {
    type Target = [Input];

    fn deref(&self) -> &[Input] {
        &self.0
    }
}

impl From<Vec<Input>> for InputSeq {
    fn from(inputs: Vec<Input>) -> Self {
        Self(inputs)
    }
}

impl FromIterator<Input> for InputSeq {
    fn from_iter<I: IntoIterator<Item = Input>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for InputSeq {
    type Item = Input;
    type IntoIter = std::vec::IntoIter<Input>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a InputSeq {
    type Item = &'a Input;
    type IntoIter = std::slice::Iter<'a, Input>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for InputSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(EPSILON_SYMBOL);
        }
        for (i, input) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str("-")?;
            }
            write!(f, "{input}")?;
        }

        Ok(())
    }
}

/// What was observed on one output port during one step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SingleOutput {
    /// No datum was observed.
    #[default]
    Empty,
    /// Exactly one datum was observed.
    Datum(String),
}

impl SingleOutput {
    /// Creates an output holding the specified datum.
    pub fn datum(datum: impl Into<String>) -> Self {
        Self::Datum(datum.into())
    }

    /// Returns `true` if no datum was observed.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the observed datum, if any.
    pub fn as_datum(&self) -> Option<&str> {
        match self {
            Self::Datum(datum) => Some(datum),
            Self::Empty => None,
        }
    }
}

/// The observations made on every output port during one step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Output(BTreeMap<String, SingleOutput>);

impl Output {
    /// Creates an output where nothing was observed on any of `ports`.
    pub fn empty<P>(ports: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self(
            ports
                .into_iter()
                .map(|port| (port.into(), SingleOutput::Empty))
                .collect(),
        )
    }

    /// Records the observation made on `port`, replacing any previous one.
    pub fn set(&mut self, port: impl Into<String>, observation: SingleOutput) {
        self.0.insert(port.into(), observation);
    }

    /// Returns the observation made on `port`, or `None` if the port is not
    /// part of this output.
    pub fn get(&self, port: &str) -> Option<&SingleOutput> {
        self.0.get(port)
    }

    /// Returns `true` if nothing was observed on any port.
    pub fn is_quiet(&self) -> bool {
        self.0.values().all(SingleOutput::is_empty)
    }

    /// Returns the number of ports covered by this output.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if this output covers no port at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the ports and their observations, in sorted
    /// port order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, SingleOutput> {
        self.0.iter()
    }
}

impl FromIterator<(String, SingleOutput)> for Output {
    fn from_iter<I: IntoIterator<Item = (String, SingleOutput)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Output {
    type Item = (&'a String, &'a SingleOutput);
    type IntoIter = btree_map::Iter<'a, String, SingleOutput>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut observed = self
            .0
            .iter()
            .filter_map(|(port, observation)| Some((port, observation.as_datum()?)))
            .peekable();

        if observed.peek().is_none() {
            return f.write_str(EPSILON_SYMBOL);
        }
        for (i, (port, datum)) in observed.enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{port}:{datum}")?;
        }

        Ok(())
    }
}

/// The outputs produced by one test case, index-aligned with its inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputSeq(Vec<Output>);

impl OutputSeq {
    /// Returns the output of the last step, if any.
    pub fn last_output(&self) -> Option<&Output> {
        self.0.last()
    }

    /// Consumes the sequence and returns the output of the last step, if any.
    pub fn into_last(mut self) -> Option<Output> {
        self.0.pop()
    }
}

impl Deref for OutputSeq {
    type Target = [Output];

    fn deref(&self) -> &[Output] {
        &self.0
    }
}

impl From<Vec<Output>> for OutputSeq {
    fn from(outputs: Vec<Output>) -> Self {
        Self(outputs)
    }
}

impl FromIterator<Output> for OutputSeq {
    fn from_iter<I: IntoIterator<Item = Output>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for OutputSeq {
    type Item = Output;
    type IntoIter = std::vec::IntoIter<Output>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for OutputSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(EPSILON_SYMBOL);
        }
        for (i, output) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str("-")?;
            }
            write!(f, "{output}")?;
        }

        Ok(())
    }
}
