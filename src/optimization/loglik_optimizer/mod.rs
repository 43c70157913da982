//! loglik_optimizer — L-BFGS maximization of weighted log-likelihoods.
//!
//! Purpose
//! -------
//! Fit emission parameters that have no closed-form weighted MLE. A caller
//! implements [`LogLikelihood`] over an unconstrained parameter vector and
//! calls [`maximize`]; argmin's L-BFGS does the rest.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ(θ)` into the cost `-ℓ(θ)` and
//!   supplies finite-difference gradients (via `finitediff`) when the
//!   objective has no analytic one.
//! - [`builders`] construct L-BFGS with a Hager–Zhang or More–Thuente line
//!   search; [`run::run_lbfgs`] executes it and assembles an
//!   [`OptimOutcome`].
//! - [`MLEOptions`] / [`Tolerances`] are validated on construction.
//!
//! Conventions
//! -----------
//! - Positivity constraints are handled by the caller through
//!   reparameterization (softplus), never inside the solver.
//! - Everything user-facing is expressed in `ℓ`, not in the cost.
//! - Failures are [`OptError`](crate::optimization::errors::OptError)s; the
//!   module does not panic.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
