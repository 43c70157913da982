//! optimization — numerical MLE and log-domain primitives.
//!
//! Purpose
//! -------
//! Supply the numeric machinery the HMM layer builds on: stable log-space
//! arithmetic for the forward/backward and Viterbi recursions, and an
//! argmin-backed L-BFGS maximizer for emission densities without a
//! closed-form weighted MLE.
//!
//! Key behaviors
//! -------------
//! - [`loglik_optimizer`]: implement `LogLikelihood`, call `maximize`, get
//!   an `OptimOutcome`.
//! - [`numerical_stability`]: `log_sum_exp` family and softplus transforms.
//! - [`errors`]: `OptError` / `OptResult`, with argmin and statrs errors
//!   folded in.
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimization happens in an unconstrained space; positivity is enforced
//!   by the caller's reparameterization.
//! - `-∞` is a legal log-probability everywhere in `numerical_stability`.
//!
//! Downstream usage
//! ----------------
//! - `markov::core` uses `numerical_stability` in every recursion.
//! - `markov::emissions::weibull` is the consumer of `loglik_optimizer`.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
