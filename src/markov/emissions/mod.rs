//! emissions — per-state observation distributions.
//!
//! Purpose
//! -------
//! Give every hidden state a pluggable emission density behind one trait,
//! [`EmissionModel`], so the recursions and learners stay generic over the
//! observation type. Each variant knows how to score an observation, refit
//! itself from weighted samples, draw a sample, and validate input.
//!
//! Key behaviors
//! -------------
//! - [`discrete::DiscreteEmission`]: categorical over `0..n_symbols`, with
//!   optional Laplace smoothing when refitting.
//! - [`normal::NormalEmission`]: univariate Normal, closed-form weighted MLE.
//! - [`multivariate_normal::MultivariateNormalEmission`]: full-covariance
//!   Normal, Cholesky-based density.
//! - [`weibull::WeibullEmission`]: positive observations, fitted by L-BFGS
//!   over softplus-mapped parameters.
//! - [`mixture::MixtureEmission`]: finite mixture of any of the above,
//!   refitted by an inner EM loop.
//!
//! Invariants & assumptions
//! ------------------------
//! - `fit` receives one weight per sample; weights are non-negative and
//!   need not sum to one. When they sum to zero the distribution is left
//!   unchanged.
//! - `log_probability` returns `-∞` for impossible observations and never
//!   panics; observations are validated before training starts.
//! - Fitting failures that regularization could fix (singular variance,
//!   non-positive-definite covariance) are returned, not retried.
//!
//! Conventions
//! -----------
//! - Options for fitting travel unmodified in [`FittingOptions`].
//! - `sample` takes any `rand::Rng`; reproducibility is the caller's seed.

pub mod discrete;
pub mod mixture;
pub mod multivariate_normal;
pub mod normal;
pub mod weibull;

use std::fmt::Debug;

use rand::Rng;

use crate::{
    markov::errors::{HMMError, HMMResult},
    optimization::loglik_optimizer::MLEOptions,
};

pub use self::discrete::DiscreteEmission;
pub use self::mixture::MixtureEmission;
pub use self::multivariate_normal::MultivariateNormalEmission;
pub use self::normal::NormalEmission;
pub use self::weibull::WeibullEmission;

/// A state-conditional observation distribution.
pub trait EmissionModel: Clone + Debug + Send + Sync {
    type Observation: Clone + Debug + Send + Sync;

    /// `ln p(obs)`; `-∞` when `obs` has zero density.
    fn log_probability(&self, obs: &Self::Observation) -> f64;

    /// Reject observations outside the distribution's domain.
    fn validate_observation(&self, obs: &Self::Observation) -> HMMResult<()>;

    /// Refit from `samples` where sample `i` carries `weights[i]`.
    fn fit(
        &mut self, samples: &[&Self::Observation], weights: &[f64], options: &FittingOptions,
    ) -> HMMResult<()>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Observation;

    /// Perturb parameters for a random restart. No-op by default.
    fn randomize<R: Rng + ?Sized>(&mut self, _rng: &mut R) {}
}

/// Options handed unchanged to every emission `fit`.
///
/// - `laplace`: add one pseudo-count per symbol (discrete emissions only).
/// - `regularization`: added to variances / covariance diagonals.
/// - `mixture_tolerance`, `mixture_max_iterations`: inner EM stopping rule
///   for mixtures (relative change of the weighted log-likelihood).
/// - `mle_opts`: L-BFGS settings for numerically fitted densities.
#[derive(Debug, Clone, PartialEq)]
pub struct FittingOptions {
    pub laplace: bool,
    pub regularization: f64,
    pub mixture_tolerance: f64,
    pub mixture_max_iterations: usize,
    pub mle_opts: MLEOptions,
}

impl FittingOptions {
    /// # Errors
    /// - [`HMMError::InvalidRegularization`] for a negative or non-finite
    ///   regularization.
    /// - [`HMMError::InvalidTolerance`] for a bad mixture tolerance, or when
    ///   both mixture stopping rules are zero.
    pub fn new(
        laplace: bool, regularization: f64, mixture_tolerance: f64,
        mixture_max_iterations: usize, mle_opts: MLEOptions,
    ) -> HMMResult<Self> {
        if !regularization.is_finite() || regularization < 0.0 {
            return Err(HMMError::InvalidRegularization { value: regularization });
        }
        if !mixture_tolerance.is_finite() || mixture_tolerance < 0.0 {
            return Err(HMMError::InvalidTolerance {
                value: mixture_tolerance,
                reason: "mixture tolerance must be finite and non-negative",
            });
        }
        if mixture_tolerance == 0.0 && mixture_max_iterations == 0 {
            return Err(HMMError::InvalidTolerance {
                value: mixture_tolerance,
                reason: "mixture fitting needs a tolerance or an iteration cap",
            });
        }
        Ok(Self { laplace, regularization, mixture_tolerance, mixture_max_iterations, mle_opts })
    }

    pub fn with_laplace(mut self, laplace: bool) -> Self {
        self.laplace = laplace;
        self
    }
}

impl Default for FittingOptions {
    fn default() -> Self {
        Self {
            laplace: false,
            regularization: 0.0,
            mixture_tolerance: 1e-5,
            mixture_max_iterations: 100,
            mle_opts: MLEOptions::default(),
        }
    }
}

/// Check that samples and weights line up and return the total weight.
///
/// # Errors
/// [`HMMError::WeightCountMismatch`] or [`HMMError::InvalidWeight`].
pub(crate) fn total_weight<O>(samples: &[&O], weights: &[f64]) -> HMMResult<f64> {
    if samples.len() != weights.len() {
        return Err(HMMError::WeightCountMismatch {
            expected: samples.len(),
            actual: weights.len(),
        });
    }
    let mut total = 0.0;
    for (index, &w) in weights.iter().enumerate() {
        if !w.is_finite() || w < 0.0 {
            return Err(HMMError::InvalidWeight { index, value: w });
        }
        total += w;
    }
    Ok(total)
}

/// Draw strictly positive random probabilities summing to one.
pub(crate) fn random_simplex<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..len).map(|_| rng.gen_range(0.05..1.0)).collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}
