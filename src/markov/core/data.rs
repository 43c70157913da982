//! TrainingSet — validated, possibly ragged, weighted observation sequences.
//!
//! Purpose
//! -------
//! Check a training set once, before any numeric work, and carry the derived
//! quantities every learner needs: per-sequence weights in both raw and
//! normalized-log form, and the longest sequence length for sizing scratch
//! tables.
//!
//! Key behaviors
//! -------------
//! - Rejects an empty set, empty sequences, observations the model's
//!   emissions refuse, and malformed weights.
//! - Without explicit weights every sequence gets raw weight 1 and log weight
//!   `ln(1/N)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `logsumexp(log_weights) == 0` up to rounding.
//! - Raw weights are finite, non-negative and not all zero.
use ndarray::Array1;

use crate::markov::{
    core::model::HiddenMarkovModel,
    emissions::EmissionModel,
    errors::{HMMError, HMMResult},
};

#[derive(Debug, Clone)]
pub struct TrainingSet<'a, O> {
    sequences: &'a [Vec<O>],
    weights: Array1<f64>,
    log_weights: Array1<f64>,
    max_len: usize,
}

impl<'a, O> TrainingSet<'a, O> {
    /// # Errors
    /// - [`HMMError::EmptyTrainingSet`], [`HMMError::EmptySequence`],
    ///   [`HMMError::InvalidObservation`].
    /// - [`HMMError::WeightCountMismatch`], [`HMMError::InvalidWeight`],
    ///   [`HMMError::ZeroTotalWeight`].
    pub fn new<E>(
        model: &HiddenMarkovModel<E>, sequences: &'a [Vec<O>], weights: Option<&[f64]>,
    ) -> HMMResult<Self>
    where
        E: EmissionModel<Observation = O>,
    {
        if sequences.is_empty() {
            return Err(HMMError::EmptyTrainingSet);
        }
        for (k, seq) in sequences.iter().enumerate() {
            model.validate_sequence(k, seq)?;
        }
        let weights = match weights {
            Some(w) => validate_weights(w, sequences.len())?,
            None => Array1::ones(sequences.len()),
        };
        let total = weights.sum();
        let log_weights = weights.mapv(|w| (w / total).ln());
        let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
        Ok(Self { sequences, weights, log_weights, max_len })
    }

    pub fn sequences(&self) -> &'a [Vec<O>] {
        self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Raw weights as supplied (ones by default).
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// `ln(w_k / Σ w)`.
    pub fn log_weights(&self) -> &Array1<f64> {
        &self.log_weights
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn total_observations(&self) -> usize {
        self.sequences.iter().map(Vec::len).sum()
    }
}

fn validate_weights(weights: &[f64], expected: usize) -> HMMResult<Array1<f64>> {
    if weights.len() != expected {
        return Err(HMMError::WeightCountMismatch { expected, actual: weights.len() });
    }
    if let Some((index, &value)) =
        weights.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(HMMError::InvalidWeight { index, value });
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(HMMError::ZeroTotalWeight);
    }
    Ok(Array1::from(weights.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markov::{core::topology::Topology, emissions::DiscreteEmission};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Weight normalization and each rejection path.
    // -------------------------------------------------------------------------

    fn model() -> HiddenMarkovModel<DiscreteEmission> {
        let topo = Topology::ergodic(2).unwrap();
        HiddenMarkovModel::from_topology(&topo, vec![DiscreteEmission::uniform(3).unwrap(); 2])
            .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Default and explicit weights normalize to log weights summing to one.
    //
    // Given
    // -----
    // - Two ragged sequences; no weights, then weights (1, 3).
    //
    // Expect
    // ------
    // - ln(½) each; then ln(¼), ln(¾). `max_len` is 3.
    fn weights_are_normalized_in_log_space() {
        // Arrange
        let m = model();
        let seqs: Vec<Vec<usize>> = vec![vec![0, 1, 2], vec![1]];

        // Act
        let plain = TrainingSet::new(&m, &seqs, None).unwrap();
        let weighted = TrainingSet::new(&m, &seqs, Some(&[1.0, 3.0][..])).unwrap();

        // Assert
        assert!((plain.log_weights()[0] - 0.5f64.ln()).abs() < 1e-12);
        assert!((weighted.log_weights()[1] - 0.75f64.ln()).abs() < 1e-12);
        assert_eq!(weighted.weights()[1], 3.0);
        assert_eq!(plain.max_len(), 3);
    }

    #[test]
    // Purpose
    // -------
    // Each malformed input has its own error.
    //
    // Given
    // -----
    // - No sequences; an empty sequence; symbol 7; a weight count mismatch;
    //   a negative weight; all-zero weights.
    //
    // Expect
    // ------
    // - The matching `HMMError` for each case.
    fn malformed_sets_are_rejected() {
        let m = model();
        let none: Vec<Vec<usize>> = vec![];
        let seqs: Vec<Vec<usize>> = vec![vec![0, 1], vec![2]];
        let with_empty: Vec<Vec<usize>> = vec![vec![0], vec![]];
        let bad_symbol: Vec<Vec<usize>> = vec![vec![0, 7]];
        assert!(matches!(TrainingSet::new(&m, &none, None), Err(HMMError::EmptyTrainingSet)));
        assert!(matches!(
            TrainingSet::new(&m, &with_empty, None),
            Err(HMMError::EmptySequence { sequence: 1 })
        ));
        assert!(matches!(
            TrainingSet::new(&m, &bad_symbol, None),
            Err(HMMError::InvalidObservation { sequence: 0, position: 1, .. })
        ));
        assert!(matches!(
            TrainingSet::new(&m, &seqs, Some(&[1.0][..])),
            Err(HMMError::WeightCountMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            TrainingSet::new(&m, &seqs, Some(&[1.0, -2.0][..])),
            Err(HMMError::InvalidWeight { index: 1, .. })
        ));
        assert!(matches!(
            TrainingSet::new(&m, &seqs, Some(&[0.0, 0.0][..])),
            Err(HMMError::ZeroTotalWeight)
        ));
    }
}
