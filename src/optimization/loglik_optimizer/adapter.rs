//! Bridge from a [`LogLikelihood`] to argmin's `CostFunction` / `Gradient`.
//!
//! The cost is `-ℓ(θ)`. An analytic `∇ℓ` is negated; without one the cost is
//! differentiated numerically (central first, forward as a fallback), so no
//! sign flip is needed on that path.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// A borrowed objective plus its data, presented to argmin as a cost.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let value = self.f.value(theta, self.data)?;
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value }.into());
        }
        Ok(-value)
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// `-∇ℓ(θ)` if the objective provides it, otherwise a numerical gradient
    /// of the cost.
    ///
    /// The finite-difference closure must return a bare `f64`, so the first
    /// failed cost evaluation is parked in a cell and replaced by `NaN`. A
    /// parked error or a non-finite central gradient triggers one retry with
    /// forward differences.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let parked: RefCell<Option<Error>> = RefCell::new(None);
                let cost = |theta: &Theta| -> f64 {
                    self.cost(theta).unwrap_or_else(|e| {
                        let mut slot = parked.borrow_mut();
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                        f64::NAN
                    })
                };
                let central = theta.central_diff(&cost);
                if parked.borrow().is_none() && validate_grad(&central, dim).is_ok() {
                    return Ok(central);
                }
                forward_fallback(theta, &cost, &parked)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Forward-difference gradient, surfacing any error parked during the pass.
fn forward_fallback<G: Fn(&Theta) -> f64>(
    theta: &Theta, cost: &G, parked: &RefCell<Option<Error>>,
) -> Result<Grad, Error> {
    parked.replace(None);
    let grad = theta.forward_diff(cost);
    if let Some(err) = parked.take() {
        return Err(err);
    }
    validate_grad(&grad, theta.len())?;
    Ok(grad)
}
