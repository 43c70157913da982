//! core — HMM parameters, log-domain recursions and their scratch space.
//!
//! Purpose
//! -------
//! Hold everything a learner needs that is not itself a learning rule: the
//! model container, topology constructors, training-set validation, the
//! forward/backward and Viterbi recursions, forward sampling, convergence
//! tracking and training options.
//!
//! Key behaviors
//! -------------
//! - [`HiddenMarkovModel`] owns `log π`, `log A` and one emission per state,
//!   and validates the row-stochastic invariant.
//! - [`forward_backward`] and [`viterbi`] expose both allocating entry points
//!   and `_into` kernels that write into caller-owned tables
//!   ([`ForwardBackwardTables`]).
//! - [`ConvergenceMonitor`] decides when an outer training loop stops;
//!   [`TrainOptions`] carries its settings plus the cancellation token.
//!
//! Invariants & assumptions
//! ------------------------
//! - All probabilities are stored as natural logs; `-∞` is a structural
//!   zero and is preserved by every recursion and re-estimation.
//! - Recursions never rescale: `log α` and `log β` are exact log-domain
//!   quantities, so sequence length does not cause underflow.
//!
//! Conventions
//! -----------
//! - Time runs along rows and states along columns in every `T × N` table.
//! - State indices are 0-based; ties in any argmax resolve to the lowest
//!   index.

pub mod convergence;
pub mod data;
pub mod forward_backward;
pub mod model;
pub mod options;
pub mod sampling;
pub mod topology;
pub mod viterbi;
pub mod workspace;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::convergence::{ConvergenceCriterion, ConvergenceMonitor};
pub use self::data::TrainingSet;
pub use self::model::HiddenMarkovModel;
pub use self::options::{CancellationToken, TrainOptions};
pub use self::topology::{Topology, TopologyKind};
pub use self::workspace::ForwardBackwardTables;
