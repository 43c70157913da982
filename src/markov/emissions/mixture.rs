//! Finite mixtures of emission densities.
//!
//! `p(x) = Σ_c π_c p_c(x)`, evaluated in log space. Refitting runs an inner
//! EM pass: component responsibilities are computed per sample, multiplied
//! into the outer sample weights, and each component is refitted with its
//! share. The pass stops on `FittingOptions::mixture_tolerance` or
//! `mixture_max_iterations` through a [`ConvergenceMonitor`].
use ndarray::{Array1, Array2};
use rand::Rng;

use crate::{
    markov::{
        core::{
            convergence::{ConvergenceCriterion, ConvergenceMonitor},
            sampling::sample_log_categorical,
        },
        emissions::{EmissionModel, FittingOptions, random_simplex, total_weight},
        errors::{HMMError, HMMResult},
    },
    optimization::numerical_stability::{log_sum_exp_view, safe_ln},
};

#[derive(Debug, Clone, PartialEq)]
pub struct MixtureEmission<E> {
    log_coefficients: Array1<f64>,
    components: Vec<E>,
}

impl<E: EmissionModel> MixtureEmission<E> {
    /// # Errors
    /// - [`HMMError::EmptyMixture`] with no components.
    /// - [`HMMError::ShapeMismatch`] when coefficient and component counts
    ///   differ.
    /// - [`HMMError::InvalidProbability`] / [`HMMError::NotStochastic`] for
    ///   bad coefficients.
    pub fn new(coefficients: &[f64], components: Vec<E>) -> HMMResult<Self> {
        if components.is_empty() {
            return Err(HMMError::EmptyMixture);
        }
        if coefficients.len() != components.len() {
            return Err(HMMError::ShapeMismatch {
                what: "mixture coefficients",
                expected: components.len(),
                actual: coefficients.len(),
            });
        }
        for (index, &c) in coefficients.iter().enumerate() {
            if !(0.0..=1.0).contains(&c) {
                return Err(HMMError::InvalidProbability {
                    what: "mixture coefficients",
                    index,
                    value: c,
                });
            }
        }
        let sum: f64 = coefficients.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(HMMError::NotStochastic { what: "mixture coefficients", row: 0, sum });
        }
        let log_coefficients = coefficients.iter().map(|&c| safe_ln(c)).collect();
        Ok(Self { log_coefficients, components })
    }

    /// Equal weight on every component.
    pub fn uniform(components: Vec<E>) -> HMMResult<Self> {
        let n = components.len().max(1);
        Self::new(&vec![1.0 / n as f64; components.len()], components)
    }

    pub fn components(&self) -> &[E] {
        &self.components
    }

    pub fn coefficients(&self) -> Array1<f64> {
        self.log_coefficients.mapv(f64::exp)
    }

    /// `ln π_c + ln p_c(x)` for every sample (rows) and component (columns).
    fn joint_log_densities(&self, samples: &[&E::Observation]) -> Array2<f64> {
        Array2::from_shape_fn((samples.len(), self.components.len()), |(n, c)| {
            self.log_coefficients[c] + self.components[c].log_probability(samples[n])
        })
    }
}

impl<E: EmissionModel> EmissionModel for MixtureEmission<E> {
    type Observation = E::Observation;

    fn log_probability(&self, obs: &E::Observation) -> f64 {
        let joint: Array1<f64> = self
            .log_coefficients
            .iter()
            .zip(&self.components)
            .map(|(&lc, comp)| lc + comp.log_probability(obs))
            .collect();
        log_sum_exp_view(joint.view())
    }

    fn validate_observation(&self, obs: &E::Observation) -> HMMResult<()> {
        self.components.iter().try_for_each(|comp| comp.validate_observation(obs))
    }

    /// Inner EM over the components, run on a copy that replaces `self` only
    /// when every pass succeeded.
    ///
    /// # Errors
    /// Any error raised by a component `fit`; `self` is then unchanged.
    fn fit(
        &mut self, samples: &[&E::Observation], weights: &[f64], options: &FittingOptions,
    ) -> HMMResult<()> {
        let total = total_weight(samples, weights)?;
        if total <= 0.0 {
            return Ok(());
        }
        let mut monitor = ConvergenceMonitor::new(
            options.mixture_tolerance,
            options.mixture_max_iterations,
            ConvergenceCriterion::Relative,
        )?;
        let n_comp = self.components.len();
        let mut next = self.clone();
        loop {
            let mut joint = next.joint_log_densities(samples);
            let mut objective = 0.0;
            for (mut row, &w) in joint.rows_mut().into_iter().zip(weights) {
                let ll = log_sum_exp_view(row.view());
                if ll == f64::NEG_INFINITY {
                    row.fill(f64::NEG_INFINITY);
                    continue;
                }
                objective += w * ll;
                row.mapv_inplace(|v| v - ll);
            }
            if monitor.update(objective / total) {
                break;
            }

            for c in 0..n_comp {
                let comp_weights: Vec<f64> = joint
                    .column(c)
                    .iter()
                    .zip(weights)
                    .map(|(&log_r, &w)| w * log_r.exp())
                    .collect();
                let share: f64 = comp_weights.iter().sum();
                next.log_coefficients[c] = safe_ln(share / total);
                next.components[c].fit(samples, &comp_weights, options)?;
            }
        }
        *self = next;
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> E::Observation {
        let chosen = sample_log_categorical(self.log_coefficients.view(), rng);
        self.components[chosen].sample(rng)
    }

    fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let p = random_simplex(rng, self.components.len());
        self.log_coefficients = p.into_iter().map(f64::ln).collect();
        for comp in &mut self.components {
            comp.randomize(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markov::emissions::normal::NormalEmission;
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Mixture density, inner-EM recovery of a well separated two-component
    // Normal mixture, an unchanged mixture after a failed component fit, and
    // constructor checks.
    // -------------------------------------------------------------------------

    fn two_normals(m0: f64, m1: f64) -> Vec<NormalEmission> {
        vec![NormalEmission::new(m0, 1.0).unwrap(), NormalEmission::new(m1, 1.0).unwrap()]
    }

    #[test]
    // Purpose
    // -------
    // The log-density is the log of the weighted component densities.
    //
    // Given
    // -----
    // - 0.3·N(0,1) + 0.7·N(4,1) at x = 1.
    //
    // Expect
    // ------
    // - Matches `ln(0.3 p0 + 0.7 p1)` to 1e-12.
    fn log_probability_is_weighted_sum() {
        // Arrange
        let comps = two_normals(0.0, 4.0);
        let expected = (0.3 * comps[0].log_probability(&1.0).exp()
            + 0.7 * comps[1].log_probability(&1.0).exp())
        .ln();
        let mix = MixtureEmission::new(&[0.3, 0.7], comps).unwrap();

        // Act
        let lp = mix.log_probability(&1.0);

        // Assert
        assert!((lp - expected).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Inner EM separates two well separated clusters.
    //
    // Given
    // -----
    // - 1000 draws from 0.25·N(-5,1) + 0.75·N(5,1); start from equal weights
    //   with means (-1, 1).
    //
    // Expect
    // ------
    // - Coefficients near (0.25, 0.75) and means near (-5, 5).
    fn fit_recovers_two_component_mixture() {
        // Arrange
        let truth = MixtureEmission::new(&[0.25, 0.75], two_normals(-5.0, 5.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(23);
        let xs: Vec<f64> = (0..1000).map(|_| truth.sample(&mut rng)).collect();
        let refs: Vec<&f64> = xs.iter().collect();
        let weights = vec![1.0; xs.len()];
        let mut mix = MixtureEmission::uniform(two_normals(-1.0, 1.0)).unwrap();

        // Act
        mix.fit(&refs, &weights, &FittingOptions::default()).unwrap();

        // Assert
        let pi = mix.coefficients();
        assert!((pi[0] - 0.25).abs() < 0.05, "pi = {pi}");
        assert!((mix.components()[0].mean() + 5.0).abs() < 0.2);
        assert!((mix.components()[1].mean() - 5.0).abs() < 0.2);
    }

    #[test]
    // Purpose
    // -------
    // Constructor refuses empty mixtures and mismatched coefficients.
    //
    // Given
    // -----
    // - No components; two components with three coefficients.
    //
    // Expect
    // ------
    // - `EmptyMixture`; `ShapeMismatch`.
    fn new_rejects_empty_and_mismatched() {
        let empty = MixtureEmission::<NormalEmission>::new(&[], vec![]);
        let mismatched = MixtureEmission::new(&[0.2, 0.3, 0.5], two_normals(0.0, 1.0));
        assert_eq!(empty, Err(HMMError::EmptyMixture));
        assert!(matches!(mismatched, Err(HMMError::ShapeMismatch { .. })));
    }

    #[test]
    // Purpose
    // -------
    // A component that cannot be refitted leaves the whole mixture as it was.
    //
    // Given
    // -----
    // - 0.5·N(0,1) + 0.5·N(5,1); five samples all equal to 1; no
    //   regularization.
    //
    // Expect
    // ------
    // - `SingularVariance`; coefficients and components unchanged.
    fn failed_component_fit_leaves_mixture_unchanged() {
        // Arrange
        let mut mix = MixtureEmission::uniform(two_normals(0.0, 5.0)).unwrap();
        let before = mix.clone();
        let xs = [1.0; 5];
        let refs: Vec<&f64> = xs.iter().collect();

        // Act
        let res = mix.fit(&refs, &[1.0; 5], &FittingOptions::default());

        // Assert
        assert!(matches!(res, Err(HMMError::SingularVariance { .. })));
        assert_eq!(mix, before);
    }
}
