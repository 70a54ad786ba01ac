//! A membership-query oracle for active learning of Reo connectors.
//!
//! Reosul executes [Reo][reo] connectors, i.e. circuits of primitive
//! channels that coordinate the exchange of data between ports, and answers
//! the queries of an active automata learner about them. The learner sees a
//! connector as a black box: at each step it either offers a datum on a set
//! of input ports or lets one unit of time pass, and it observes which datum,
//! if any, appeared on each output port.
//!
//! Connectors are executed for real, with one thread per primitive channel
//! and wall-clock timeouts bounding every rendezvous. Answers are therefore
//! subject to timing noise, which the oracle filters out by repeating runs
//! until their answers agree.
//!
//! [reo]: https://en.wikipedia.org/wiki/Reo_Coordination_Language
//!
//! # A practical overview
//!
//! Using the oracle typically involves three activities:
//!
//! 1. the description of a connector with a
//!    [`ConnectorBuilder`](connector::ConnectorBuilder), which declares its
//!    ports and channels and validates the resulting topology,
//! 2. the creation of an [`Oracle`](oracle::Oracle) for the connector, which
//!    derives the input alphabet from the input ports of the connector,
//! 3. membership queries, each of which runs fresh instances of the
//!    connector over an input sequence.
//!
//! ## Describing a connector
//!
//! A connector is made of *input* ports written by the environment, *output*
//! ports read by the environment, *internal* ports, and
//! [`Channel`](channel::Channel)s that each read from and/or write to some
//! of these ports. Every port has at most one writer and one reader.
//!
//! The following connector offers the datum written on `A` to `C`
//! immediately, and keeps a second copy in a one-place buffer that can be
//! read at a later step:
//!
//! ```text
//!                       ┌──── sync ────┐
//!     A ── lossy ── replicator        merger ── C
//!                       └─── fifo1 ────┘
//! ```
//!
//! ```
//! use std::time::Duration;
//!
//! use reosul::connector::Connector;
//!
//! let connector = Connector::builder("replicate-buffer-merge")
//!     .input("A")
//!     .output("C")
//!     .internals(["M0", "M1", "M2", "M3", "M4"])
//!     .lossy_buffer("A", "M0")
//!     .replicator("M0", ["M1", "M2"])
//!     .sync("M1", "M3")
//!     .fifo1("M2", "M4")
//!     .merger(["M3", "M4"], "C")
//!     .delay(Duration::from_millis(25))
//!     .time_unit(Duration::from_millis(40))
//!     .build()
//!     .unwrap();
//! # let _ = connector;
//! ```
//!
//! ## Querying the oracle
//!
//! Input sequences are made of the symbols of the alphabet returned by
//! [`Oracle::inputs()`](oracle::Oracle::inputs): one data input per subset
//! of input ports, plus [`Input::Tick`](symbols::Input::Tick). A membership
//! query returns the [`Output`](symbols::Output) observed at the last step.
//!
//! ```
//! use std::time::Duration;
//!
//! use reosul::connector::Connector;
//! use reosul::oracle::Oracle;
//! use reosul::symbols::{Input, InputSeq};
//!
//! let connector = Connector::builder("buffer")
//!     .input("A")
//!     .output("B")
//!     .fifo1("A", "B")
//!     .delay(Duration::from_millis(25))
//!     .time_unit(Duration::from_millis(10))
//!     .build()
//!     .unwrap();
//!
//! let oracle = Oracle::builder(connector).bound(1).build();
//!
//! // The datum written at the first step is buffered and read right away.
//! let word = InputSeq::from(vec![Input::with_active(["A"], ["A"]), Input::Tick]);
//! let output = oracle.membership_query(&word).unwrap();
//! assert_eq!(output.to_string(), "ϵ");
//! # let _ = oracle.stats();
//! ```
//!
//! # Modules documentation
//!
//! * the [`channel`] module describes the semantics of each primitive
//!   channel,
//! * the [`ports`] module discusses the rendezvous on boundary ports and how
//!   instances are stopped,
//! * the [`simulation`] module details how a single run maps inputs to
//!   outputs,
//! * the [`oracle`] module describes how answers are stabilized.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod channel;
pub mod connector;
pub mod oracle;
pub mod ports;
pub mod simulation;
pub mod symbols;
pub mod time;
pub(crate) mod util;
