//! Objective trait and configuration types for numerical maximum likelihood.
//!
//! Emission distributions without a closed-form weighted MLE (Weibull) expose
//! their weighted log-likelihood through [`LogLikelihood`] and hand it to
//! [`maximize`](super::maximize). Internally the solver minimizes
//! `c(θ) = -ℓ(θ)`; every type in this module speaks in terms of `ℓ`.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// A log-likelihood `ℓ(θ)` over an unconstrained parameter vector.
///
/// `value` and `check` are required. `grad` returns `∇ℓ(θ)` when an analytic
/// form exists; the default signals the adapter to use finite differences.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;

    /// Called once on the starting point before the solver runs.
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search used inside L-BFGS. Parses case-insensitively from
/// `"MoreThuente"` / `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Solver configuration for one numerical MLE run.
///
/// Default: `tol_grad = 1e-6`, `max_iter = 200`, More–Thuente, quiet, default
/// L-BFGS memory. `verbose` only has an effect with the `obs_slog` feature.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// # Errors
    /// [`OptError::InvalidLBFGSMem`] when `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if lbfgs_mem == Some(0) {
            return Err(OptError::InvalidLBFGSMem {
                mem: 0,
                reason: "L-BFGS memory must be greater than zero.",
            });
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(200) },
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules for L-BFGS. At least one must be set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if every field is `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for a
    ///   non-finite or non-positive tolerance.
    /// - [`OptError::InvalidMaxIter`] for `max_iter == Some(0)`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if max_iter == Some(0) {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Result of [`maximize`](super::maximize).
///
/// `value` is the best log-likelihood (not the cost). `converged` is `true`
/// whenever argmin reports a termination reason; hitting `max_iter` counts.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Assemble an outcome from raw solver state.
    ///
    /// # Errors
    /// Missing or non-finite `theta_hat`, or a non-finite `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            other => (true, format!("{other:?}")),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| g.l2_norm()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argmin::core::TerminationReason;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Option validation, line-search parsing and outcome assembly.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `Tolerances::new` needs at least one stopping rule.
    //
    // Given
    // -----
    // - All-`None` input, and `max_iter = Some(0)`.
    //
    // Expect
    // ------
    // - `NoTolerancesProvided` and `InvalidMaxIter` respectively.
    fn tolerances_new_rejects_empty_and_zero_cap() {
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(Some(1e-6), None, Some(0)),
            Err(OptError::InvalidMaxIter { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Line searchers parse regardless of case and reject unknown names.
    //
    // Given
    // -----
    // - "HAGERZHANG", "morethuente" and "bfgs".
    //
    // Expect
    // ------
    // - Two matches and one `InvalidLineSearch`.
    fn line_searcher_parses_case_insensitively() {
        assert_eq!("HAGERZHANG".parse::<LineSearcher>(), Ok(LineSearcher::HagerZhang));
        assert_eq!("morethuente".parse::<LineSearcher>(), Ok(LineSearcher::MoreThuente));
        assert!(matches!(
            "bfgs".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `MLEOptions::new` refuses a zero L-BFGS memory.
    //
    // Given
    // -----
    // - Valid tolerances, `lbfgs_mem = Some(0)`.
    //
    // Expect
    // ------
    // - `InvalidLBFGSMem`.
    fn mle_options_rejects_zero_memory() {
        // Arrange
        let tols = Tolerances::new(Some(1e-6), None, None).expect("valid tolerances");

        // Act
        let opts = MLEOptions::new(tols, LineSearcher::MoreThuente, false, Some(0));

        // Assert
        assert!(matches!(opts, Err(OptError::InvalidLBFGSMem { mem: 0, .. })));
    }

    #[test]
    // Purpose
    // -------
    // Outcome assembly maps the termination status and the gradient norm.
    //
    // Given
    // -----
    // - A solver that stopped on the gradient tolerance with gradient (3, 4).
    //
    // Expect
    // ------
    // - `converged == true`, `grad_norm == Some(5.0)`.
    fn optim_outcome_reports_status_and_grad_norm() {
        // Act
        let out = OptimOutcome::new(
            Some(array![1.0, 2.0]),
            -3.5,
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            12,
            FnEvalMap::new(),
            Some(array![3.0, 4.0]),
        )
        .expect("valid outcome");

        // Assert
        assert!(out.converged);
        assert_eq!(out.iterations, 12);
        assert_eq!(out.grad_norm, Some(5.0));
        assert_eq!(out.value, -3.5);
    }
}
