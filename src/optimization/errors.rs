//! Error surface of the numerical optimization layer.
//!
//! Every failure the L-BFGS stack can produce (bad configuration, a
//! log-likelihood that refuses a parameter vector, or an argmin backend
//! error) is normalized into [`OptError`]. Emission models that fit their
//! parameters by numerical maximum likelihood convert these into
//! `HMMError::EmissionFitFailed` at the model boundary.
use argmin::core::{ArgminError, Error};
use statrs::distribution::WeibullError;

/// Result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Signals the adapter to fall back to finite differences.
    GradientNotImplemented,

    /// Gradient length differs from the parameter length.
    GradientDimMismatch { expected: usize, found: usize },

    /// A gradient entry is NaN or infinite.
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- MLEOptions ----
    InvalidTolGrad { tol: f64, reason: &'static str },
    InvalidTolCost { tol: f64, reason: &'static str },
    InvalidMaxIter { max_iter: usize, reason: &'static str },
    /// All of `tol_grad`, `tol_cost` and `max_iter` were `None`.
    NoTolerancesProvided,
    InvalidLineSearch { name: String, reason: &'static str },
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    // ---- Objective ----
    /// The log-likelihood evaluated to NaN or ±inf.
    NonFiniteCost { value: f64 },

    /// Parameter vector has the wrong length for the objective.
    ThetaLengthMismatch { expected: usize, actual: usize },

    /// Unconstrained parameter entry is not finite.
    InvalidThetaInput { index: usize, value: f64 },

    /// The weighted sample handed to the objective is unusable.
    InvalidSample { index: usize, value: f64, reason: &'static str },

    /// Sample and weight vectors differ in length.
    SampleWeightMismatch { samples: usize, weights: usize },

    /// Weibull shape is invalid (<= 0 or non-finite).
    ShapeInvalid,

    /// Weibull scale is invalid (<= 0 or non-finite).
    ScaleInvalid,

    // ---- Optimizer outcome ----
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },
    MissingThetaHat,

    // ---- Argmin ---
    InvalidParameter { text: String },
    NotImplemented { text: String },
    NotInitialized { text: String },
    ConditionViolated { text: String },
    CheckPointNotFound { text: String },
    PotentialBug { text: String },
    ImpossibleError { text: String },
    /// Any other argmin error, carried as text.
    BackendError { text: String },

    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientNotImplemented => {
                write!(f, "Analytic gradient not implemented")
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- MLEOptions ----
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => write!(f, "No tolerances provided"),
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }

            // ---- Objective ----
            OptError::NonFiniteCost { value } => write!(f, "Non-finite objective value: {value}"),
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }
            OptError::InvalidSample { index, value, reason } => {
                write!(f, "Invalid sample at index {index}: {value}: {reason}")
            }
            OptError::SampleWeightMismatch { samples, weights } => {
                write!(f, "Got {samples} samples but {weights} weights")
            }
            OptError::ShapeInvalid => {
                write!(f, "Shape parameter is invalid (<= 0 or non-finite)")
            }
            OptError::ScaleInvalid => {
                write!(f, "Scale parameter is invalid (<= 0 or non-finite)")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => write!(f, "Optimizer returned no parameter estimate"),

            // ---- Argmin ----
            OptError::InvalidParameter { text } => write!(f, "Invalid parameter: {text}"),
            OptError::NotImplemented { text } => write!(f, "Not implemented: {text}"),
            OptError::NotInitialized { text } => write!(f, "Not initialized: {text}"),
            OptError::ConditionViolated { text } => write!(f, "Condition violated: {text}"),
            OptError::CheckPointNotFound { text } => write!(f, "Checkpoint not found: {text}"),
            OptError::PotentialBug { text } => write!(f, "Potential bug: {text}"),
            OptError::ImpossibleError { text } => write!(f, "Impossible error: {text}"),
            OptError::BackendError { text } => write!(f, "Backend error: {text}"),

            OptError::UnknownError => write!(f, "Unknown error"),
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Errors raised inside our own cost closures travel through argmin
        // boxed; recover them before falling back to argmin's own variants.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<WeibullError> for OptError {
    fn from(err: WeibullError) -> Self {
        match err {
            WeibullError::ShapeInvalid => OptError::ShapeInvalid,
            WeibullError::ScaleInvalid => OptError::ScaleInvalid,
            #[allow(unreachable_patterns)]
            _ => OptError::UnknownError,
        }
    }
}
