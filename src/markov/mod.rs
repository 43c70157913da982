//! markov — hidden Markov models: parameters, inference and learning.
//!
//! Purpose
//! -------
//! Provide a generic hidden Markov model over pluggable emission
//! distributions together with the three classic learners (Baum-Welch,
//! Viterbi training, supervised maximum likelihood) and the inference
//! routines they rely on (forward/backward, posterior, Viterbi decoding).
//!
//! Key behaviors
//! -------------
//! - [`core`]: model container, topologies, recursions, sampling, options
//!   and convergence tracking.
//! - [`emissions`]: the [`EmissionModel`] trait and its discrete, Normal,
//!   multivariate Normal, Weibull and mixture implementations.
//! - [`learning`]: learners that mutate a model in place, plus parallel
//!   random restarts.
//! - [`errors`]: [`HMMError`] and the [`HMMResult`] alias.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every public entry point validates its inputs before numeric work and
//!   reports problems as [`HMMError`]; panics indicate logic bugs.
//! - Learners leave the model row-stochastic and NaN-free on success. On
//!   error the model may hold the parameters of the last completed
//!   iteration.
//! - A model and its learner are single-owner; parallelism lives only in
//!   [`learning::restarts`], where every worker owns its own copy.
//!
//! Downstream usage
//! ----------------
//! 1. Build a model with [`HiddenMarkovModel::from_topology`] or
//!    [`HiddenMarkovModel::from_probabilities`].
//! 2. Configure [`TrainOptions`] (tolerance, cap, Laplace smoothing,
//!    optional [`CancellationToken`]).
//! 3. Fit with [`BaumWelchLearning`], [`ViterbiLearning`] or
//!    [`MaximumLikelihoodLearning`], or with [`fit_with_restarts`].
//! 4. Use `evaluate`, `decode`, `posterior` and `generate` on the fitted
//!    model.

pub mod core;
pub mod emissions;
pub mod errors;
pub mod learning;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    CancellationToken, ConvergenceCriterion, ConvergenceMonitor, HiddenMarkovModel, Topology,
    TopologyKind, TrainOptions,
};
pub use self::emissions::{
    DiscreteEmission, EmissionModel, FittingOptions, MixtureEmission,
    MultivariateNormalEmission, NormalEmission, WeibullEmission,
};
pub use self::errors::{HMMError, HMMResult};
pub use self::learning::{
    BaumWelchLearning, LearningOutcome, LearningStatus, MaximumLikelihoodLearning,
    RestartLearner, RestartOptions, ViterbiLearning, fit_with_restarts,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
//     use rust_hmm::markov::prelude::*;

pub mod prelude {
    pub use super::{
        BaumWelchLearning, CancellationToken, ConvergenceCriterion, DiscreteEmission,
        EmissionModel, FittingOptions, HMMError, HMMResult, HiddenMarkovModel, LearningOutcome,
        LearningStatus, MaximumLikelihoodLearning, MixtureEmission, MultivariateNormalEmission,
        NormalEmission, RestartLearner, RestartOptions, Topology, TopologyKind, TrainOptions,
        ViterbiLearning, WeibullEmission, fit_with_restarts,
    };
}
