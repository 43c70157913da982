//! Errors for hidden Markov model construction, training and decoding.
//!
//! [`HMMError`] covers the whole public surface of `markov`: malformed
//! parameters, invalid training data, numeric failures that cannot be
//! repaired locally, and emission fitting failures. It converts to a Python
//! `ValueError` when the `python-bindings` feature is on.
//!
//! ## Conventions
//! - Sequence, position and state indices are 0-based.
//! - Errors that point into a training set carry `sequence` and `position`.
//! - Optimizer failures from numerically fitted emissions are normalized to
//!   [`HMMError::EmissionFitFailed`].
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};
use statrs::distribution::NormalError;

use crate::optimization::errors::OptError;

/// Result alias for HMM operations.
pub type HMMResult<T> = Result<T, HMMError>;

/// Unified error type for hidden Markov model construction, inference and
/// learning.
///
/// Covers parameter validation, observation and training-data checks,
/// label checks for supervised fitting, numeric failures of the learners and
/// emission fits, option parsing, and the parallel-restart reduction.
/// Implements `Display`/`Error` and converts to a Python `ValueError` at
/// PyO3 boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum HMMError {
    // ---- Model parameters ----
    /// A model needs at least one hidden state.
    NoStates,

    /// Parameter block has the wrong shape for the number of states.
    ShapeMismatch { what: &'static str, expected: usize, actual: usize },

    /// A probability or log-probability entry is NaN, or a probability is
    /// outside [0, 1].
    InvalidProbability { what: &'static str, index: usize, value: f64 },

    /// A probability vector does not sum to one.
    NotStochastic { what: &'static str, row: usize, sum: f64 },

    /// Re-estimated parameters contain NaN.
    NonFiniteParameter { what: &'static str, index: usize },

    // ---- Emission parameters ----
    /// An emission distribution parameter is out of its domain.
    InvalidEmissionParam { param: &'static str, value: f64, reason: &'static str },

    /// Weighted variance collapsed to zero (or below) during fitting.
    SingularVariance { variance: f64 },

    /// Weighted covariance could not be Cholesky-factorized.
    NonPositiveDefiniteCovariance { dimension: usize },

    /// A mixture needs at least one component.
    EmptyMixture,

    /// Numerical MLE of an emission distribution failed.
    EmissionFitFailed { status: String },

    // ---- Observations ----
    /// Discrete symbol is not in `0..n_symbols`.
    SymbolOutOfRange { symbol: usize, n_symbols: usize },

    /// Continuous observation is NaN or infinite.
    NonFiniteObservation { value: f64 },

    /// Observation outside the support of a positive distribution.
    NonPositiveObservation { value: f64 },

    /// Multivariate observation has the wrong dimension.
    DimensionMismatch { expected: usize, actual: usize },

    /// An observation failed validation at a known place in a training set.
    InvalidObservation { sequence: usize, position: usize, reason: String },

    // ---- Training data ----
    /// No sequences were supplied.
    EmptyTrainingSet,

    /// A sequence has no observations.
    EmptySequence { sequence: usize },

    /// Number of weights differs from the number of sequences.
    WeightCountMismatch { expected: usize, actual: usize },

    /// Sequence weight is negative or non-finite.
    InvalidWeight { index: usize, value: f64 },

    /// All sequence weights are zero.
    ZeroTotalWeight,

    /// Number of label paths differs from the number of sequences.
    LabelCountMismatch { expected: usize, actual: usize },

    /// A label path is not as long as its sequence.
    LabelLengthMismatch { sequence: usize, expected: usize, actual: usize },

    /// A label names a state the model does not have.
    StateOutOfRange { sequence: usize, position: usize, state: usize, n_states: usize },

    /// A sequence has zero probability under the current model.
    ImpossibleSequence { sequence: usize },

    // ---- Options ----
    /// Convergence tolerance is negative or non-finite.
    InvalidTolerance { value: f64, reason: &'static str },

    /// Regularization must be finite and non-negative.
    InvalidRegularization { value: f64 },

    /// Unknown topology or convergence criterion name.
    InvalidOptionName { option: &'static str, name: String },

    /// Forward topology needs a reach of at least one.
    InvalidTopology { reason: &'static str },

    // ---- Sampling / restarts ----
    /// Requested zero-length sample.
    EmptySampleRequest,

    /// Random restarts need at least one attempt.
    NoRestarts,

    /// The shared best-model slot was poisoned by a panicking worker.
    PoisonedBestModel,

    UnknownError,
}

impl std::error::Error for HMMError {}

impl std::fmt::Display for HMMError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Model parameters ----
            HMMError::NoStates => write!(f, "Model must have at least one state"),
            HMMError::ShapeMismatch { what, expected, actual } => {
                write!(f, "Shape mismatch for {what}: expected {expected}, got {actual}")
            }
            HMMError::InvalidProbability { what, index, value } => {
                write!(f, "Invalid probability in {what} at index {index}: {value}")
            }
            HMMError::NotStochastic { what, row, sum } => {
                write!(f, "{what} row {row} sums to {sum}, expected 1")
            }
            HMMError::NonFiniteParameter { what, index } => {
                write!(f, "Re-estimated {what} is NaN at index {index}")
            }

            // ---- Emission parameters ----
            HMMError::InvalidEmissionParam { param, value, reason } => {
                write!(f, "Invalid emission parameter {param} = {value}: {reason}")
            }
            HMMError::SingularVariance { variance } => {
                write!(f, "Weighted variance {variance} is not positive; add regularization")
            }
            HMMError::NonPositiveDefiniteCovariance { dimension } => {
                write!(
                    f,
                    "Weighted {dimension}x{dimension} covariance is not positive definite; \
                     add regularization"
                )
            }
            HMMError::EmptyMixture => write!(f, "Mixture must have at least one component"),
            HMMError::EmissionFitFailed { status } => {
                write!(f, "Emission fitting failed: {status}")
            }

            // ---- Observations ----
            HMMError::SymbolOutOfRange { symbol, n_symbols } => {
                write!(f, "Symbol {symbol} out of range for alphabet of size {n_symbols}")
            }
            HMMError::NonFiniteObservation { value } => {
                write!(f, "Observation {value} is not finite")
            }
            HMMError::NonPositiveObservation { value } => {
                write!(f, "Observation {value} must be strictly positive")
            }
            HMMError::DimensionMismatch { expected, actual } => {
                write!(f, "Observation dimension mismatch: expected {expected}, got {actual}")
            }
            HMMError::InvalidObservation { sequence, position, reason } => {
                write!(
                    f,
                    "Invalid observation at sequence {sequence}, position {position}: {reason}"
                )
            }

            // ---- Training data ----
            HMMError::EmptyTrainingSet => write!(f, "Training set contains no sequences"),
            HMMError::EmptySequence { sequence } => {
                write!(f, "Sequence {sequence} is empty")
            }
            HMMError::WeightCountMismatch { expected, actual } => {
                write!(f, "Expected {expected} sequence weights, got {actual}")
            }
            HMMError::InvalidWeight { index, value } => {
                write!(f, "Weight {index} = {value} must be finite and non-negative")
            }
            HMMError::ZeroTotalWeight => write!(f, "Sequence weights sum to zero"),
            HMMError::LabelCountMismatch { expected, actual } => {
                write!(f, "Expected {expected} label paths, got {actual}")
            }
            HMMError::LabelLengthMismatch { sequence, expected, actual } => {
                write!(
                    f,
                    "Label path {sequence} has length {actual}, sequence has length {expected}"
                )
            }
            HMMError::StateOutOfRange { sequence, position, state, n_states } => {
                write!(
                    f,
                    "Label {state} at sequence {sequence}, position {position} is out of range \
                     for {n_states} states"
                )
            }
            HMMError::ImpossibleSequence { sequence } => {
                write!(f, "Sequence {sequence} has zero likelihood under the current model")
            }

            // ---- Options ----
            HMMError::InvalidTolerance { value, reason } => {
                write!(f, "Invalid tolerance {value}: {reason}")
            }
            HMMError::InvalidRegularization { value } => {
                write!(f, "Regularization {value} must be finite and non-negative")
            }
            HMMError::InvalidOptionName { option, name } => {
                write!(f, "Unknown {option} '{name}'")
            }
            HMMError::InvalidTopology { reason } => write!(f, "Invalid topology: {reason}"),

            // ---- Sampling / restarts ----
            HMMError::EmptySampleRequest => write!(f, "Sample length must be at least 1"),
            HMMError::NoRestarts => write!(f, "Number of restarts must be at least 1"),
            HMMError::PoisonedBestModel => {
                write!(f, "A restart worker panicked while holding the best model")
            }

            HMMError::UnknownError => write!(f, "Unknown error"),
        }
    }
}

impl From<OptError> for HMMError {
    fn from(err: OptError) -> Self {
        HMMError::EmissionFitFailed { status: err.to_string() }
    }
}

impl From<NormalError> for HMMError {
    fn from(err: NormalError) -> Self {
        match err {
            NormalError::MeanInvalid => HMMError::InvalidEmissionParam {
                param: "mean",
                value: f64::NAN,
                reason: "mean must be finite",
            },
            NormalError::StandardDeviationInvalid => HMMError::InvalidEmissionParam {
                param: "std_dev",
                value: f64::NAN,
                reason: "standard deviation must be finite and positive",
            },
            #[allow(unreachable_patterns)]
            _ => HMMError::UnknownError,
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<HMMError> for PyErr {
    fn from(err: HMMError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
