//! numerical_stability — log-domain arithmetic and positivity transforms.
//!
//! Purpose
//! -------
//! Keep the numerically delicate scalar primitives in one place so the HMM
//! recursions and the emission fitters can assume well-conditioned `f64`
//! arithmetic.
//!
//! Key behaviors
//! -------------
//! - [`log_space`]: `log_sum_exp` and its slice/view/iterator forms, a
//!   log-vector normalizer, and `safe_ln`. All are total over `-∞`.
//! - [`transformations`]: softplus and its inverse, used to map
//!   unconstrained optimizer parameters onto strictly positive ones.
//!
//! Conventions
//! -----------
//! - Pure functions on `f64` and `ndarray` views; no allocation, logging, or
//!   global state.
//! - Shape and domain validation happens in the callers.

pub mod log_space;
pub mod transformations;

pub use self::log_space::{
    log_normalize, log_sum_exp, log_sum_exp_iter, log_sum_exp_slice, log_sum_exp_view, safe_ln,
};
pub use self::transformations::{safe_softplus, safe_softplus_inv};

pub mod prelude {
    pub use super::log_space::{log_sum_exp, log_sum_exp_slice, log_sum_exp_view};
    pub use super::transformations::{safe_softplus, safe_softplus_inv};
}
