//! Oracles answering the queries of an active automata learner.
//!
//! The [`Oracle`] answers *membership queries*: given an input sequence, it
//! returns the output the connector produces at the last step. Because a
//! single run is subject to timing noise, the same sequence is simulated
//! repeatedly until `bound + 1` consecutive runs agree on the answer. Runs
//! that fail for a reason specific to that run (e.g. a thread that could not
//! be spawned) are discarded without breaking the current streak.
//!
//! Equivalence queries are not supported: [`Oracle`] always answers
//! [`Equivalence::NotImplemented`], which a learner can tell apart from a
//! genuine [`Equivalence::Equivalent`].
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use reosul::connector::Connector;
//! use reosul::oracle::Oracle;
//! use reosul::symbols::{InputSeq, SingleOutput};
//!
//! let connector = Connector::builder("pipe")
//!     .input("A")
//!     .output("B")
//!     .sync("A", "B")
//!     .delay(Duration::from_millis(50))
//!     .build()
//!     .unwrap();
//!
//! let oracle = Oracle::builder(connector).bound(1).build();
//! assert_eq!(oracle.inputs().len(), 3);
//!
//! // Offer a datum on `A`.
//! let word = InputSeq::from(vec![oracle.inputs()[1].clone()]);
//! let output = oracle.membership_query(&word).unwrap();
//! assert_eq!(output.get("B"), Some(&SingleOutput::datum("A")));
//! ```

mod alphabet;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::{debug, debug_span, warn};

use crate::connector::Connector;
use crate::simulation::{SimulationError, Simulator};
use crate::symbols::{Input, InputSeq, Output, OutputSeq};

pub use alphabet::alphabet;

/// Source of answers to membership queries.
pub trait MembershipOracle {
    /// Returns the input alphabet.
    fn inputs(&self) -> &[Input];

    /// Returns the output produced at the last step of `word`.
    fn membership_query(&self, word: &InputSeq) -> Result<Output, OracleError>;
}

/// A hypothesis automaton built by a learner.
pub trait Hypothesis {
    /// Returns the output the hypothesis produces at the last step of `word`.
    fn run(&self, word: &InputSeq) -> Output;
}

/// Source of answers to equivalence queries.
pub trait EquivalenceOracle {
    /// Checks whether `hypothesis` behaves like the system under learning.
    fn equivalence_query(&self, hypothesis: &dyn Hypothesis) -> Equivalence;
}

/// Answer to an equivalence query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Equivalence {
    /// The hypothesis is equivalent to the system.
    Equivalent,
    /// An input sequence on which the hypothesis and the system differ.
    Counterexample(InputSeq),
    /// The oracle cannot answer equivalence queries.
    NotImplemented,
}

impl Equivalence {
    /// Returns the counterexample, if any.
    pub fn counterexample(&self) -> Option<&InputSeq> {
        match self {
            Self::Counterexample(word) => Some(word),
            Self::Equivalent | Self::NotImplemented => None,
        }
    }
}

/// Membership oracle backed by simulations of a connector.
#[derive(Debug)]
pub struct Oracle {
    simulator: Simulator,
    bound: usize,
    max_runs: Option<usize>,
    alphabet: OnceLock<Vec<Input>>,
    counters: Counters,
}

impl Oracle {
    /// Number of agreeing runs beyond the first one required by default.
    pub const DEFAULT_BOUND: usize = 3;

    /// Creates an oracle with the default bound and no cap on the number of
    /// runs.
    pub fn new(connector: impl Into<Arc<Connector>>) -> Self {
        Self::builder(connector).build()
    }

    /// Creates a builder for an oracle.
    pub fn builder(connector: impl Into<Arc<Connector>>) -> OracleBuilder {
        OracleBuilder {
            connector: connector.into(),
            bound: Self::DEFAULT_BOUND,
            max_runs: None,
        }
    }

    /// Returns the connector under learning.
    pub fn connector(&self) -> &Connector {
        self.simulator.connector()
    }

    /// Returns the stabilization bound.
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Returns the input alphabet of the connector.
    ///
    /// The alphabet is generated on first use.
    pub fn inputs(&self) -> &[Input] {
        self.alphabet
            .get_or_init(|| alphabet(self.connector().inputs()))
    }

    /// Returns the stabilized output produced at the last step of `word`.
    ///
    /// An empty `word` is answered without simulation with an output where
    /// nothing was observed.
    pub fn membership_query(&self, word: &InputSeq) -> Result<Output, OracleError> {
        let query = self.counters.queries.fetch_add(1, Ordering::Relaxed);
        let span = debug_span!("mquery", query, word = %word);
        let _enter = span.enter();

        if word.is_empty() {
            return Ok(Output::empty(self.connector().outputs()));
        }

        let output = stabilize(self.bound, self.max_runs, &self.counters, || {
            self.simulator.run(word)
        })?;
        debug!(answer = %output, "membership query answered");

        Ok(output)
    }

    /// Answers [`Equivalence::NotImplemented`].
    pub fn equivalence_query(&self, _hypothesis: &dyn Hypothesis) -> Equivalence {
        debug!("equivalence queries are not supported");

        Equivalence::NotImplemented
    }

    /// Returns the query and run counters.
    pub fn stats(&self) -> OracleStats {
        OracleStats {
            queries: self.counters.queries.load(Ordering::Relaxed),
            runs: self.counters.runs.load(Ordering::Relaxed),
            discarded_runs: self.counters.discarded_runs.load(Ordering::Relaxed),
        }
    }

    /// Resets the query and run counters.
    pub fn reset_stats(&self) {
        self.counters.queries.store(0, Ordering::Relaxed);
        self.counters.runs.store(0, Ordering::Relaxed);
        self.counters.discarded_runs.store(0, Ordering::Relaxed);
    }
}

impl MembershipOracle for Oracle {
    fn inputs(&self) -> &[Input] {
        Oracle::inputs(self)
    }

    fn membership_query(&self, word: &InputSeq) -> Result<Output, OracleError> {
        Oracle::membership_query(self, word)
    }
}

impl EquivalenceOracle for Oracle {
    fn equivalence_query(&self, hypothesis: &dyn Hypothesis) -> Equivalence {
        Oracle::equivalence_query(self, hypothesis)
    }
}

/// Builder for an [`Oracle`].
#[derive(Debug)]
pub struct OracleBuilder {
    connector: Arc<Connector>,
    bound: usize,
    max_runs: Option<usize>,
}

impl OracleBuilder {
    /// Sets the number of agreeing runs required beyond the first one.
    ///
    /// If not set, [`Oracle::DEFAULT_BOUND`] is used.
    pub fn bound(mut self, bound: usize) -> Self {
        self.bound = bound;

        self
    }

    /// Caps the number of runs of a single membership query, discarded runs
    /// included.
    ///
    /// A query that is still not stable after `max_runs` runs fails with
    /// [`OracleError::Unstable`]. By default, the number of runs is not
    /// capped.
    pub fn max_runs(mut self, max_runs: usize) -> Self {
        self.max_runs = Some(max_runs);

        self
    }

    /// Builds the oracle.
    pub fn build(self) -> Oracle {
        Oracle {
            simulator: Simulator::new(self.connector),
            bound: self.bound,
            max_runs: self.max_runs,
            alphabet: OnceLock::new(),
            counters: Counters::default(),
        }
    }
}

/// Snapshot of the counters of an [`Oracle`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OracleStats {
    /// Number of membership queries.
    pub queries: u64,
    /// Number of simulation runs, discarded runs included.
    pub runs: u64,
    /// Number of runs discarded because of a transient failure.
    pub discarded_runs: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queries: AtomicU64,
    runs: AtomicU64,
    discarded_runs: AtomicU64,
}

/// Error returned when a membership query cannot be answered.
#[derive(Clone, Debug, Error)]
pub enum OracleError {
    /// A run failed in a way that retrying cannot fix.
    #[error("simulation failed")]
    Simulation(#[from] SimulationError),
    /// The runs did not agree within the allowed number of runs.
    #[error("no stable answer after {runs} runs")]
    Unstable {
        /// Number of runs performed.
        runs: usize,
    },
}

impl OracleError {
    /// Returns a stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Simulation(_) => "simulation",
            Self::Unstable { .. } => "unstable",
        }
    }
}

/// Repeats `run` until `bound + 1` consecutive runs agree on the last
/// output.
fn stabilize<F>(
    bound: usize,
    max_runs: Option<usize>,
    counters: &Counters,
    mut run: F,
) -> Result<Output, OracleError>
where
    F: FnMut() -> Result<OutputSeq, SimulationError>,
{
    let mut candidate = Output::default();
    let mut streak = 0;
    let mut runs = 0;

    loop {
        if max_runs.is_some_and(|max_runs| runs >= max_runs) {
            warn!(runs, streak, "giving up on unstable query");

            return Err(OracleError::Unstable { runs });
        }
        runs += 1;
        counters.runs.fetch_add(1, Ordering::Relaxed);

        let output = match run().map(OutputSeq::into_last) {
            Ok(Some(output)) => output,
            Ok(None) => {
                warn!(run = runs, "discarded run without output");
                counters.discarded_runs.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Err(err) if err.is_transient() => {
                warn!(run = runs, error = %err, label = err.as_label(), "discarded run");
                counters.discarded_runs.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        if streak > 0 && output == candidate {
            streak += 1;
        } else {
            candidate = output;
            streak = 1;
        }
        if streak > bound {
            debug!(runs, "stabilized");

            return Ok(candidate);
        }
    }
}
