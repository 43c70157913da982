//! learning — parameter estimation for hidden Markov models.
//!
//! Purpose
//! -------
//! Fit a [`HiddenMarkovModel`](crate::markov::core::model::HiddenMarkovModel)
//! in place from observation sequences, with or without state labels.
//!
//! Key behaviors
//! -------------
//! - [`baum_welch::BaumWelchLearning`]: unsupervised EM via forward-backward.
//! - [`viterbi_learning::ViterbiLearning`]: segmental k-means; decode, then
//!   refit as if the decoded paths were labels.
//! - [`maximum_likelihood::MaximumLikelihoodLearning`]: closed-form
//!   supervised fit from labelled state paths.
//! - [`restarts::fit_with_restarts`]: independent randomized attempts in
//!   parallel, keeping the best model.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every learner validates its whole input before touching the model.
//! - After a successful call the model satisfies the row-stochastic
//!   invariant and contains no NaN.
//! - Hitting the iteration cap is a normal outcome, reported through
//!   [`LearningStatus::MaxIterationsReached`].
//! - Cancellation is checked once per outer iteration, after the objective
//!   of the current parameters is known, so the reported log-likelihood
//!   always belongs to the returned model.
//!
//! Conventions
//! -----------
//! - Iterative learners report the per-iteration objective history in
//!   [`LearningOutcome::history`]; `iterations` is its length.

pub mod baum_welch;
pub mod maximum_likelihood;
pub mod observer;
pub mod restarts;
pub mod viterbi_learning;

pub use self::baum_welch::BaumWelchLearning;
pub use self::maximum_likelihood::MaximumLikelihoodLearning;
pub use self::restarts::{RestartLearner, RestartOptions, fit_with_restarts};
pub use self::viterbi_learning::ViterbiLearning;

use crate::markov::core::convergence::ConvergenceMonitor;

/// Why an iterative learner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningStatus {
    /// Successive objectives agreed within tolerance.
    Converged,
    /// The iteration cap was reached first.
    MaxIterationsReached,
    /// The cancellation token was raised.
    Cancelled,
}

impl LearningStatus {
    pub(crate) fn from_monitor(monitor: &ConvergenceMonitor) -> Self {
        if monitor.reached_tolerance() {
            LearningStatus::Converged
        } else {
            LearningStatus::MaxIterationsReached
        }
    }
}

/// Result of an iterative training call.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningOutcome {
    /// Objective of the returned model.
    pub log_likelihood: f64,
    pub iterations: usize,
    pub status: LearningStatus,
    /// Objective after every E-step, oldest first.
    pub history: Vec<f64>,
}
