//! Entry point for maximizing a [`LogLikelihood`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` with L-BFGS, starting from `theta0`.
///
/// `f.check(theta0, data)` runs first; the objective is then wrapped in an
/// [`ArgMinAdapter`] (cost `-ℓ`) and handed to the line search chosen in
/// `opts`.
///
/// # Errors
/// Anything raised by `check`, the solver builders, or the solver run,
/// normalized to [`OptError`](crate::optimization::errors::OptError).
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            run_lbfgs(theta0, opts, problem, build_optimizer_more_thuente(opts)?)
        }
        LineSearcher::HagerZhang => {
            run_lbfgs(theta0, opts, problem, build_optimizer_hager_zhang(opts)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        loglik_optimizer::{Cost, traits::Tolerances},
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // End-to-end runs of `maximize` on a concave quadratic, through both line
    // searches and the finite-difference gradient path.
    // -------------------------------------------------------------------------

    struct Quadratic;

    impl LogLikelihood for Quadratic {
        type Data = Theta;

        fn value(&self, theta: &Theta, center: &Theta) -> OptResult<Cost> {
            let d = theta - center;
            Ok(-d.dot(&d))
        }

        fn check(&self, theta: &Theta, center: &Theta) -> OptResult<()> {
            if theta.len() != center.len() {
                return Err(OptError::ThetaLengthMismatch {
                    expected: center.len(),
                    actual: theta.len(),
                });
            }
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // Both line searches find the maximizer of `-(θ - c)·(θ - c)` using
    // finite-difference gradients.
    //
    // Given
    // -----
    // - Center `c = (1, -2)` and start `(0, 0)`.
    //
    // Expect
    // ------
    // - `θ̂ ≈ c` within 1e-4 and `ℓ(θ̂) ≈ 0`.
    fn maximize_finds_quadratic_peak_with_both_line_searches() {
        for ls in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            // Arrange
            let tols = Tolerances::new(Some(1e-8), None, Some(100)).expect("valid tolerances");
            let opts = MLEOptions::new(tols, ls, false, None).expect("valid options");
            let center = array![1.0, -2.0];

            // Act
            let out = maximize(&Quadratic, array![0.0, 0.0], &center, &opts).expect("converges");

            // Assert
            assert!((out.theta_hat[0] - 1.0).abs() < 1e-4, "{ls:?}: {:?}", out.theta_hat);
            assert!((out.theta_hat[1] + 2.0).abs() < 1e-4, "{ls:?}: {:?}", out.theta_hat);
            assert!(out.value.abs() < 1e-6);
        }
    }

    #[test]
    // Purpose
    // -------
    // `check` failures abort before the solver starts.
    //
    // Given
    // -----
    // - A 3-dimensional start for a 2-dimensional objective.
    //
    // Expect
    // ------
    // - `ThetaLengthMismatch`.
    fn maximize_propagates_check_failure() {
        // Arrange
        let opts = MLEOptions::default();

        // Act
        let out = maximize(&Quadratic, array![0.0, 0.0, 0.0], &array![1.0, 1.0], &opts);

        // Assert
        assert_eq!(out, Err(OptError::ThetaLengthMismatch { expected: 2, actual: 3 }));
    }
}
