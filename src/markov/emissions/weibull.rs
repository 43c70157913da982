//! Weibull emissions for strictly positive observations.
//!
//! There is no closed-form weighted MLE for the shape, so `fit` maximizes
//! the weighted log-likelihood numerically. The optimizer works on
//! `θ = (softplus⁻¹(k), softplus⁻¹(λ))` so every iterate maps back to a
//! valid `(shape, scale)` pair, and it starts from the current parameters.
use ndarray::{Array1, array};
use rand::{Rng, distributions::Distribution};
use statrs::distribution::{Continuous, Weibull};

use crate::{
    markov::{
        emissions::{EmissionModel, FittingOptions, total_weight},
        errors::{HMMError, HMMResult},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{Cost, Grad, LogLikelihood, Theta, maximize},
        numerical_stability::{safe_softplus, safe_softplus_inv},
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct WeibullEmission {
    shape: f64,
    scale: f64,
    dist: Weibull,
}

impl WeibullEmission {
    /// # Errors
    /// [`HMMError::InvalidEmissionParam`] unless both parameters are finite
    /// and strictly positive.
    pub fn new(shape: f64, scale: f64) -> HMMResult<Self> {
        for (param, value) in [("shape", shape), ("scale", scale)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(HMMError::InvalidEmissionParam {
                    param,
                    value,
                    reason: "Weibull parameters must be finite and strictly positive",
                });
            }
        }
        let dist = Weibull::new(shape, scale).map_err(OptError::from)?;
        Ok(Self { shape, scale, dist })
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl EmissionModel for WeibullEmission {
    type Observation = f64;

    fn log_probability(&self, obs: &f64) -> f64 {
        if *obs <= 0.0 || !obs.is_finite() {
            return f64::NEG_INFINITY;
        }
        self.dist.ln_pdf(*obs)
    }

    fn validate_observation(&self, obs: &f64) -> HMMResult<()> {
        if !obs.is_finite() {
            return Err(HMMError::NonFiniteObservation { value: *obs });
        }
        if *obs <= 0.0 {
            return Err(HMMError::NonPositiveObservation { value: *obs });
        }
        Ok(())
    }

    /// Numerical weighted MLE with `options.mle_opts`.
    ///
    /// # Errors
    /// [`HMMError::EmissionFitFailed`] when the optimizer cannot produce a
    /// finite optimum.
    fn fit(
        &mut self, samples: &[&f64], weights: &[f64], options: &FittingOptions,
    ) -> HMMResult<()> {
        let total = total_weight(samples, weights)?;
        if total <= 0.0 {
            return Ok(());
        }
        let mut values = Vec::with_capacity(samples.len());
        let mut kept = Vec::with_capacity(samples.len());
        for (&&x, &w) in samples.iter().zip(weights) {
            self.validate_observation(&x)?;
            if w > 0.0 {
                values.push(x);
                kept.push(w / total);
            }
        }
        let data = WeightedSample { values: Array1::from(values), weights: Array1::from(kept) };
        let theta0 = array![safe_softplus_inv(self.shape), safe_softplus_inv(self.scale)];
        let outcome = maximize(&WeibullLogLikelihood, theta0, &data, &options.mle_opts)?;
        let (shape, scale) = to_params(&outcome.theta_hat);
        *self = Self::new(shape, scale)?;
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        Distribution::sample(&self.dist, rng)
    }

    fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let shape = self.shape * rng.gen_range(0.5..2.0);
        let scale = self.scale * rng.gen_range(0.5..2.0);
        if let Ok(next) = Self::new(shape, scale) {
            *self = next;
        }
    }
}

/// Observations with normalized weights; zero-weight samples are dropped.
#[derive(Debug, Clone)]
pub struct WeightedSample {
    pub values: Array1<f64>,
    pub weights: Array1<f64>,
}

/// `ℓ(θ) = Σ wᵢ ln f(xᵢ; softplus(θ₀), softplus(θ₁))`.
#[derive(Debug, Clone, Copy)]
pub struct WeibullLogLikelihood;

fn to_params(theta: &Theta) -> (f64, f64) {
    (safe_softplus(theta[0]), safe_softplus(theta[1]))
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LogLikelihood for WeibullLogLikelihood {
    type Data = WeightedSample;

    fn value(&self, theta: &Theta, data: &WeightedSample) -> OptResult<Cost> {
        let (shape, scale) = to_params(theta);
        let dist = Weibull::new(shape, scale)?;
        let value = data.values.iter().zip(data.weights.iter()).map(|(&x, &w)| w * dist.ln_pdf(x));
        Ok(value.sum())
    }

    fn check(&self, theta: &Theta, data: &WeightedSample) -> OptResult<()> {
        if theta.len() != 2 {
            return Err(OptError::ThetaLengthMismatch { expected: 2, actual: theta.len() });
        }
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(OptError::InvalidThetaInput { index, value });
        }
        if data.values.len() != data.weights.len() {
            return Err(OptError::SampleWeightMismatch {
                samples: data.values.len(),
                weights: data.weights.len(),
            });
        }
        for (index, &value) in data.values.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(OptError::InvalidSample {
                    index,
                    value,
                    reason: "Weibull observations must be finite and strictly positive.",
                });
            }
        }
        Ok(())
    }

    /// Chain rule through softplus:
    /// `∂ℓ/∂k = Σ w (1/k + ln z - zᵏ ln z)` and `∂ℓ/∂λ = Σ w (k/λ)(zᵏ - 1)`
    /// with `z = x/λ`.
    fn grad(&self, theta: &Theta, data: &WeightedSample) -> OptResult<Grad> {
        let (shape, scale) = to_params(theta);
        let mut d_shape = 0.0;
        let mut d_scale = 0.0;
        for (&x, &w) in data.values.iter().zip(data.weights.iter()) {
            let ln_z = (x / scale).ln();
            let z_k = (shape * ln_z).exp();
            d_shape += w * (1.0 / shape + ln_z - z_k * ln_z);
            d_scale += w * (shape / scale) * (z_k - 1.0);
        }
        Ok(array![d_shape * sigmoid(theta[0]), d_scale * sigmoid(theta[1])])
    }
}
