//! Categorical emissions over a finite alphabet `0..n_symbols`.
use ndarray::Array1;
use rand::Rng;

use crate::{
    markov::{
        core::sampling::sample_log_categorical,
        emissions::{EmissionModel, FittingOptions, random_simplex, total_weight},
        errors::{HMMError, HMMResult},
    },
    optimization::numerical_stability::safe_ln,
};

/// Symbol log-probabilities for one state.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteEmission {
    log_probs: Array1<f64>,
}

impl DiscreteEmission {
    /// Build from probabilities that sum to one (within 1e-6).
    ///
    /// # Errors
    /// - [`HMMError::ShapeMismatch`] for an empty alphabet.
    /// - [`HMMError::InvalidProbability`] for entries outside [0, 1].
    /// - [`HMMError::NotStochastic`] if the entries do not sum to one.
    pub fn new(probs: &[f64]) -> HMMResult<Self> {
        if probs.is_empty() {
            return Err(HMMError::ShapeMismatch {
                what: "symbol probabilities",
                expected: 1,
                actual: 0,
            });
        }
        for (index, &p) in probs.iter().enumerate() {
            if !(0.0..=1.0).contains(&p) {
                return Err(HMMError::InvalidProbability {
                    what: "symbol probabilities",
                    index,
                    value: p,
                });
            }
        }
        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(HMMError::NotStochastic { what: "symbol probabilities", row: 0, sum });
        }
        Ok(Self { log_probs: probs.iter().map(|&p| safe_ln(p)).collect() })
    }

    /// Equal probability for every symbol.
    pub fn uniform(n_symbols: usize) -> HMMResult<Self> {
        if n_symbols == 0 {
            return Err(HMMError::ShapeMismatch {
                what: "symbol probabilities",
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self { log_probs: Array1::from_elem(n_symbols, -(n_symbols as f64).ln()) })
    }

    pub fn n_symbols(&self) -> usize {
        self.log_probs.len()
    }

    pub fn log_probabilities(&self) -> &Array1<f64> {
        &self.log_probs
    }

    pub fn probabilities(&self) -> Array1<f64> {
        self.log_probs.mapv(f64::exp)
    }
}

impl EmissionModel for DiscreteEmission {
    type Observation = usize;

    fn log_probability(&self, obs: &usize) -> f64 {
        self.log_probs.get(*obs).copied().unwrap_or(f64::NEG_INFINITY)
    }

    fn validate_observation(&self, obs: &usize) -> HMMResult<()> {
        if *obs >= self.n_symbols() {
            return Err(HMMError::SymbolOutOfRange { symbol: *obs, n_symbols: self.n_symbols() });
        }
        Ok(())
    }

    /// Weighted symbol frequencies, plus one per symbol under Laplace.
    fn fit(
        &mut self, samples: &[&usize], weights: &[f64], options: &FittingOptions,
    ) -> HMMResult<()> {
        let total = total_weight(samples, weights)?;
        let n = self.n_symbols();
        let prior = if options.laplace { 1.0 } else { 0.0 };
        if total <= 0.0 && prior == 0.0 {
            return Ok(());
        }
        let mut counts = Array1::from_elem(n, prior);
        for (&&symbol, &w) in samples.iter().zip(weights) {
            self.validate_observation(&symbol)?;
            counts[symbol] += w;
        }
        let denom = total + prior * n as f64;
        self.log_probs = counts.mapv(|c| safe_ln(c / denom));
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        sample_log_categorical(self.log_probs.view(), rng)
    }

    fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let p = random_simplex(rng, self.n_symbols());
        self.log_probs = p.into_iter().map(f64::ln).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Construction checks, weighted refitting with and without Laplace, the
    // zero-weight guard, and sampling frequencies.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Probabilities that do not sum to one are refused.
    //
    // Given
    // -----
    // - `[0.3, 0.3]`.
    //
    // Expect
    // ------
    // - `NotStochastic`.
    fn new_rejects_non_stochastic() {
        let e = DiscreteEmission::new(&[0.3, 0.3]);
        assert!(matches!(e, Err(HMMError::NotStochastic { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Weighted frequencies without smoothing.
    //
    // Given
    // -----
    // - Symbols (0, 1, 1) with weights (1, 0.5, 0.5) over a 3-symbol alphabet.
    //
    // Expect
    // ------
    // - p = (0.5, 0.5, 0), the last one exactly `-∞` in log space.
    fn fit_uses_weighted_frequencies() {
        // Arrange
        let mut e = DiscreteEmission::uniform(3).unwrap();
        let obs = [0usize, 1, 1];
        let refs: Vec<&usize> = obs.iter().collect();

        // Act
        e.fit(&refs, &[1.0, 0.5, 0.5], &FittingOptions::default()).unwrap();

        // Assert
        let p = e.probabilities();
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);
        assert_eq!(e.log_probability(&2), f64::NEG_INFINITY);
    }

    #[test]
    // Purpose
    // -------
    // Laplace smoothing adds one pseudo-count per symbol.
    //
    // Given
    // -----
    // - Two observations of symbol 0, alphabet of size 2, `laplace = true`.
    //
    // Expect
    // ------
    // - p = (3/4, 1/4).
    fn fit_with_laplace_adds_pseudocounts() {
        // Arrange
        let mut e = DiscreteEmission::uniform(2).unwrap();
        let obs = [0usize, 0];
        let refs: Vec<&usize> = obs.iter().collect();
        let opts = FittingOptions::default().with_laplace(true);

        // Act
        e.fit(&refs, &[1.0, 1.0], &opts).unwrap();

        // Assert
        let p = e.probabilities();
        assert!((p[0] - 0.75).abs() < 1e-12);
        assert!((p[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A state with no responsibility keeps its distribution.
    //
    // Given
    // -----
    // - Non-uniform emission, all weights zero, no Laplace.
    //
    // Expect
    // ------
    // - Parameters unchanged.
    fn fit_with_zero_weight_is_noop() {
        // Arrange
        let mut e = DiscreteEmission::new(&[0.9, 0.1]).unwrap();
        let before = e.clone();
        let obs = [1usize];
        let refs: Vec<&usize> = obs.iter().collect();

        // Act
        e.fit(&refs, &[0.0], &FittingOptions::default()).unwrap();

        // Assert
        assert_eq!(e, before);
    }

    #[test]
    // Purpose
    // -------
    // Sampling respects the probabilities and never yields impossible symbols.
    //
    // Given
    // -----
    // - p = (0.2, 0, 0.8), 5000 seeded draws.
    //
    // Expect
    // ------
    // - Symbol 1 never appears; symbol 2 frequency within 0.03 of 0.8.
    fn sample_matches_probabilities() {
        // Arrange
        let e = DiscreteEmission::new(&[0.2, 0.0, 0.8]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        // Act
        let draws: Vec<usize> = (0..5000).map(|_| e.sample(&mut rng)).collect();

        // Assert
        assert!(draws.iter().all(|&s| s != 1));
        let freq = draws.iter().filter(|&&s| s == 2).count() as f64 / 5000.0;
        assert!((freq - 0.8).abs() < 0.03, "freq = {freq}");
    }
}
