//! Full-covariance multivariate Normal emissions.
//!
//! The density is evaluated through the Cholesky factor `L` of the
//! covariance: with `L y = x - μ`, `ln p(x) = -½ (k ln 2π + ln|Σ| + yᵀy)`
//! and `ln|Σ| = 2 Σ ln Lᵢᵢ`. The factor is recomputed only when the
//! parameters change.
use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::{Array1, Array2};
use rand::{Rng, distributions::Distribution};
use statrs::distribution::Normal;

use crate::markov::{
    emissions::{EmissionModel, FittingOptions, total_weight},
    errors::{HMMError, HMMResult},
};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

#[derive(Debug, Clone, PartialEq)]
pub struct MultivariateNormalEmission {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    chol_l: DMatrix<f64>,
    log_det: f64,
}

impl MultivariateNormalEmission {
    /// # Errors
    /// - [`HMMError::ShapeMismatch`] if `covariance` is not `k × k` for a
    ///   mean of length `k ≥ 1`.
    /// - [`HMMError::InvalidEmissionParam`] for non-finite entries.
    /// - [`HMMError::NonPositiveDefiniteCovariance`] if Cholesky fails.
    pub fn new(mean: &Array1<f64>, covariance: &Array2<f64>) -> HMMResult<Self> {
        let k = mean.len();
        if k == 0 {
            return Err(HMMError::ShapeMismatch { what: "mean", expected: 1, actual: 0 });
        }
        if covariance.dim() != (k, k) {
            return Err(HMMError::ShapeMismatch {
                what: "covariance rows",
                expected: k,
                actual: covariance.nrows(),
            });
        }
        if let Some(&value) = mean.iter().chain(covariance.iter()).find(|v| !v.is_finite()) {
            return Err(HMMError::InvalidEmissionParam {
                param: "mean/covariance",
                value,
                reason: "entries must be finite",
            });
        }
        let mean = DVector::from_iterator(k, mean.iter().copied());
        let covariance = DMatrix::from_fn(k, k, |i, j| covariance[[i, j]]);
        Self::from_parts(mean, covariance)
    }

    /// Standard Normal in `k` dimensions.
    pub fn standard(k: usize) -> HMMResult<Self> {
        Self::new(&Array1::zeros(k), &Array2::eye(k))
    }

    fn from_parts(mean: DVector<f64>, covariance: DMatrix<f64>) -> HMMResult<Self> {
        let k = mean.len();
        let chol = Cholesky::new(covariance.clone())
            .ok_or(HMMError::NonPositiveDefiniteCovariance { dimension: k })?;
        let chol_l = chol.l();
        let log_det = 2.0 * chol_l.diagonal().iter().map(|d| d.ln()).sum::<f64>();
        Ok(Self { mean, covariance, chol_l, log_det })
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> Array1<f64> {
        self.mean.iter().copied().collect()
    }

    pub fn covariance(&self) -> Array2<f64> {
        let k = self.dimension();
        Array2::from_shape_fn((k, k), |(i, j)| self.covariance[(i, j)])
    }
}

impl EmissionModel for MultivariateNormalEmission {
    type Observation = Vec<f64>;

    fn log_probability(&self, obs: &Vec<f64>) -> f64 {
        let k = self.dimension();
        if obs.len() != k {
            return f64::NEG_INFINITY;
        }
        let centered = DVector::from_column_slice(obs) - &self.mean;
        match self.chol_l.solve_lower_triangular(&centered) {
            Some(y) => -0.5 * (k as f64 * LN_2PI + self.log_det + y.norm_squared()),
            None => f64::NEG_INFINITY,
        }
    }

    fn validate_observation(&self, obs: &Vec<f64>) -> HMMResult<()> {
        if obs.len() != self.dimension() {
            return Err(HMMError::DimensionMismatch {
                expected: self.dimension(),
                actual: obs.len(),
            });
        }
        if let Some(&value) = obs.iter().find(|v| !v.is_finite()) {
            return Err(HMMError::NonFiniteObservation { value });
        }
        Ok(())
    }

    /// Weighted mean and weighted covariance, `regularization` added to the
    /// diagonal.
    ///
    /// # Errors
    /// [`HMMError::NonPositiveDefiniteCovariance`] when the regularized
    /// covariance cannot be factorized.
    fn fit(
        &mut self, samples: &[&Vec<f64>], weights: &[f64], options: &FittingOptions,
    ) -> HMMResult<()> {
        let total = total_weight(samples, weights)?;
        if total <= 0.0 {
            return Ok(());
        }
        let k = self.dimension();
        let mut mean = DVector::zeros(k);
        for (x, &w) in samples.iter().zip(weights) {
            self.validate_observation(x)?;
            mean += DVector::from_column_slice(x) * w;
        }
        mean /= total;

        let mut covariance = DMatrix::zeros(k, k);
        for (x, &w) in samples.iter().zip(weights) {
            if w == 0.0 {
                continue;
            }
            let d = DVector::from_column_slice(x) - &mean;
            covariance += (&d * d.transpose()) * w;
        }
        covariance /= total;
        for i in 0..k {
            covariance[(i, i)] += options.regularization;
        }
        *self = Self::from_parts(mean, covariance)?;
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let std_normal = Normal::standard();
        let z = DVector::from_fn(self.dimension(), |_, _| std_normal.sample(rng));
        (&self.mean + &self.chol_l * z).iter().copied().collect()
    }
}
