//! Univariate Normal emissions.
use rand::{Rng, distributions::Distribution};
use statrs::distribution::{Continuous, Normal};

use crate::markov::{
    emissions::{EmissionModel, FittingOptions, total_weight},
    errors::{HMMError, HMMResult},
};

/// `N(mean, std_dev²)` for one state; refits by weighted maximum likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEmission {
    mean: f64,
    std_dev: f64,
    dist: Normal,
}

impl NormalEmission {
    /// # Errors
    /// [`HMMError::InvalidEmissionParam`] unless `mean` is finite and
    /// `std_dev` is finite and positive.
    pub fn new(mean: f64, std_dev: f64) -> HMMResult<Self> {
        if !mean.is_finite() {
            return Err(HMMError::InvalidEmissionParam {
                param: "mean",
                value: mean,
                reason: "must be finite",
            });
        }
        if !std_dev.is_finite() || std_dev <= 0.0 {
            return Err(HMMError::InvalidEmissionParam {
                param: "std_dev",
                value: std_dev,
                reason: "must be finite and positive",
            });
        }
        Ok(Self { mean, std_dev, dist: Normal::new(mean, std_dev)? })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }
}

impl EmissionModel for NormalEmission {
    type Observation = f64;

    fn log_probability(&self, obs: &f64) -> f64 {
        self.dist.ln_pdf(*obs)
    }

    fn validate_observation(&self, obs: &f64) -> HMMResult<()> {
        if !obs.is_finite() {
            return Err(HMMError::NonFiniteObservation { value: *obs });
        }
        Ok(())
    }

    /// Weighted mean and (biased) weighted variance plus `regularization`.
    ///
    /// # Errors
    /// [`HMMError::SingularVariance`] when the regularized variance is not
    /// strictly positive.
    fn fit(
        &mut self, samples: &[&f64], weights: &[f64], options: &FittingOptions,
    ) -> HMMResult<()> {
        let total = total_weight(samples, weights)?;
        if total <= 0.0 {
            return Ok(());
        }
        let (mean, variance) = weighted_moments(samples, weights, total);
        let variance = variance + options.regularization;
        if variance <= 0.0 || !variance.is_finite() {
            return Err(HMMError::SingularVariance { variance });
        }
        *self = Self::new(mean, variance.sqrt())?;
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        Distribution::sample(&self.dist, rng)
    }
}

/// Weighted mean and biased weighted variance; `total` is the weight sum.
fn weighted_moments(samples: &[&f64], weights: &[f64], total: f64) -> (f64, f64) {
    let mean = samples.iter().zip(weights).map(|(&&x, &w)| w * x).sum::<f64>() / total;
    let variance = samples
        .iter()
        .zip(weights)
        .map(|(&&x, &w)| w * (x - mean) * (x - mean))
        .sum::<f64>()
        / total;
    (mean, variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Density values, weighted refitting, the singular-variance failure and
    // its regularized escape.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Log-density matches the closed form.
    //
    // Given
    // -----
    // - `N(1, 2²)` evaluated at 3.
    //
    // Expect
    // ------
    // - `-ln(2√(2π)) - 0.5`.
    fn log_probability_matches_closed_form() {
        let e = NormalEmission::new(1.0, 2.0).unwrap();
        let expected = -(2.0 * (2.0 * std::f64::consts::PI).sqrt()).ln() - 0.5;
        assert!((e.log_probability(&3.0) - expected).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Weights shift the fitted mean towards heavily weighted samples.
    //
    // Given
    // -----
    // - Samples (0, 10) with weights (3, 1).
    //
    // Expect
    // ------
    // - Mean 2.5 and variance 18.75.
    fn fit_uses_weighted_moments() {
        // Arrange
        let mut e = NormalEmission::new(0.0, 1.0).unwrap();
        let xs = [0.0, 10.0];
        let refs: Vec<&f64> = xs.iter().collect();

        // Act
        e.fit(&refs, &[3.0, 1.0], &FittingOptions::default()).unwrap();

        // Assert
        assert!((e.mean() - 2.5).abs() < 1e-12);
        assert!((e.std_dev().powi(2) - 18.75).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // All mass on one value is a singular variance unless regularized.
    //
    // Given
    // -----
    // - Samples (4, 4); regularization 0, then 0.01.
    //
    // Expect
    // ------
    // - `SingularVariance`, then std_dev = 0.1.
    fn fit_reports_singular_variance_and_regularization_fixes_it() {
        // Arrange
        let xs = [4.0, 4.0];
        let refs: Vec<&f64> = xs.iter().collect();
        let mut plain = NormalEmission::new(0.0, 1.0).unwrap();
        let mut regularized = plain.clone();
        let reg = FittingOptions { regularization: 0.01, ..FittingOptions::default() };

        // Act
        let err = plain.fit(&refs, &[1.0, 1.0], &FittingOptions::default());
        regularized.fit(&refs, &[1.0, 1.0], &reg).unwrap();

        // Assert
        assert!(matches!(err, Err(HMMError::SingularVariance { .. })));
        assert!((regularized.std_dev() - 0.1).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Samples follow the configured moments.
    //
    // Given
    // -----
    // - `N(-3, 0.5²)`, 4000 seeded draws.
    //
    // Expect
    // ------
    // - Sample mean within 0.05 of -3.
    fn sample_has_expected_mean() {
        let e = NormalEmission::new(-3.0, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mean = (0..4000).map(|_| e.sample(&mut rng)).sum::<f64>() / 4000.0;
        assert!((mean + 3.0).abs() < 0.05, "mean = {mean}");
    }
}
