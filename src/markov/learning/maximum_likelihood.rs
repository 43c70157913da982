//! MaximumLikelihoodLearning — supervised fit from labelled state paths.
//!
//! Counts initial states and state-to-state transitions along the labelled
//! paths, each sequence contributing its weight rescaled to mean one, and
//! refits every emission on the observations labelled with its state
//! (indicator weights).
//! With `use_laplace` one pseudo-count is added to every initial and
//! transition cell and to every discrete symbol count. A state that is never
//! left gets a uniform row over its current support, so the result is always
//! a distribution.
use ndarray::{Array1, Array2, Axis};

use crate::{
    markov::{
        core::{
            data::TrainingSet, forward_backward, model::HiddenMarkovModel, options::TrainOptions,
        },
        emissions::EmissionModel,
        errors::{HMMError, HMMResult},
        learning::baum_welch::reestimate_transitions,
    },
    optimization::numerical_stability::safe_ln,
};

/// Supervised learner for sequences whose hidden states are known.
///
/// Only `use_laplace` and `fitting` of its [`TrainOptions`] are read; the
/// fit is a single closed-form pass.
#[derive(Debug, Clone)]
pub struct MaximumLikelihoodLearning {
    options: TrainOptions,
}

impl MaximumLikelihoodLearning {
    pub fn new(options: TrainOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    /// Fit `model` to `sequences` labelled by `paths`; return the total
    /// log-likelihood of the sequences under the fitted model.
    ///
    /// `weights`, when given, are rescaled to mean one (`w_k · K / Σ w`)
    /// before counting, so only their ratios matter and `None` behaves like
    /// equal weights of any size. The Laplace pseudo-count is added on that
    /// scale.
    ///
    /// The new parameters are built on a copy of `model` and committed only
    /// when every emission fit and the final validation succeed; on error
    /// `model` is left untouched.
    ///
    /// # Errors
    /// - Training-set errors (see
    ///   [`TrainingSet::new`](crate::markov::core::data::TrainingSet::new)).
    /// - [`HMMError::LabelCountMismatch`], [`HMMError::LabelLengthMismatch`],
    ///   [`HMMError::StateOutOfRange`].
    /// - Emission fitting errors and [`HMMError::NonFiniteParameter`].
    pub fn fit<E: EmissionModel>(
        &self, model: &mut HiddenMarkovModel<E>, sequences: &[Vec<E::Observation>],
        paths: &[Vec<usize>], weights: Option<&[f64]>,
    ) -> HMMResult<f64> {
        let data = TrainingSet::new(model, sequences, weights)?;
        let n = model.n_states();
        validate_paths(paths, sequences, n)?;
        let scale = data.len() as f64 / data.weights().sum();
        let weights = data.weights().mapv(|w| w * scale);

        let prior = if self.options.use_laplace { 1.0 } else { 0.0 };
        let mut initial = Array1::from_elem(n, prior);
        let mut transitions = Array2::from_elem((n, n), prior);
        for (path, &w) in paths.iter().zip(&weights) {
            initial[path[0]] += w;
            for step in path.windows(2) {
                transitions[[step[0], step[1]]] += w;
            }
        }

        let mut next = model.clone();
        let initial_total = initial.sum();
        next.log_initial.assign(&initial.mapv(|c| safe_ln(c / initial_total)));
        let log_num = transitions.mapv(safe_ln);
        let log_den = transitions.sum_axis(Axis(1)).mapv(safe_ln);
        reestimate_transitions(&mut next.log_transitions, &log_num, &log_den);

        let fitting = self.options.fitting.clone().with_laplace(self.options.use_laplace);
        let samples: Vec<&E::Observation> = sequences.iter().flatten().collect();
        let mut state_weights = vec![0.0; samples.len()];
        for (i, emission) in next.emissions.iter_mut().enumerate() {
            let labels = paths.iter().zip(&weights).flat_map(|(path, &w)| {
                path.iter().map(move |&s| if s == i { w } else { 0.0 })
            });
            for (slot, w) in state_weights.iter_mut().zip(labels) {
                *slot = w;
            }
            emission.fit(&samples, &state_weights, &fitting)?;
        }
        next.validate()?;
        *model = next;

        sequences.iter().map(|seq| forward_backward::evaluate(model, seq)).sum()
    }
}

/// Check that every sequence has a label path of the same length with
/// labels in `0..n_states`.
pub(crate) fn validate_paths<O>(
    paths: &[Vec<usize>], sequences: &[Vec<O>], n_states: usize,
) -> HMMResult<()> {
    if paths.len() != sequences.len() {
        return Err(HMMError::LabelCountMismatch {
            expected: sequences.len(),
            actual: paths.len(),
        });
    }
    for (k, (path, seq)) in paths.iter().zip(sequences).enumerate() {
        if path.len() != seq.len() {
            return Err(HMMError::LabelLengthMismatch {
                sequence: k,
                expected: seq.len(),
                actual: path.len(),
            });
        }
        if let Some((position, &state)) = path.iter().enumerate().find(|(_, s)| **s >= n_states)
        {
            return Err(HMMError::StateOutOfRange { sequence: k, position, state, n_states });
        }
    }
    Ok(())
}
