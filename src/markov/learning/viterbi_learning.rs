//! ViterbiLearning — segmental k-means training.
//!
//! Each outer iteration decodes every sequence with the current model,
//! treats the decoded paths as labels for
//! [`MaximumLikelihoodLearning`], and scores the refitted model by the total
//! log-likelihood of the training set. Cheaper than Baum-Welch per
//! iteration; the objective is not guaranteed to be monotone.
//!
//! Decoding reuses one [`ForwardBackwardTables`] arena sized to the longest
//! sequence.
use crate::markov::{
    core::{
        data::TrainingSet, forward_backward::log_emissions_into, model::HiddenMarkovModel,
        options::TrainOptions, viterbi::decode_into, workspace::ForwardBackwardTables,
    },
    emissions::EmissionModel,
    errors::{HMMError, HMMResult},
    learning::{
        LearningOutcome, LearningStatus, maximum_likelihood::MaximumLikelihoodLearning,
        observer::ProgressLog,
    },
};

/// Segmental k-means: decode every sequence with the current model, then
/// refit it by supervised maximum likelihood on the decoded paths.
#[derive(Debug, Clone)]
pub struct ViterbiLearning {
    options: TrainOptions,
    tables: ForwardBackwardTables,
}

impl ViterbiLearning {
    pub fn new(options: TrainOptions) -> Self {
        Self { options, tables: ForwardBackwardTables::with_capacity(0, 0) }
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    /// Train `model` in place on `sequences`.
    ///
    /// `weights` are passed to every refit, where they are rescaled to mean
    /// one, so only their ratios matter. A failed refit leaves `model` at the
    /// parameters of the last completed iteration.
    ///
    /// # Errors
    /// Invalid training data or options, [`HMMError::ImpossibleSequence`]
    /// when a sequence has no possible path under the current model, and any
    /// emission fitting error.
    pub fn fit<E: EmissionModel>(
        &mut self, model: &mut HiddenMarkovModel<E>, sequences: &[Vec<E::Observation>],
        weights: Option<&[f64]>,
    ) -> HMMResult<LearningOutcome> {
        let data = TrainingSet::new(model, sequences, weights)?;
        let mut monitor = self.options.monitor()?;
        let progress = ProgressLog::new("viterbi", self.options.verbose);
        if monitor.is_unbounded() {
            progress.unbounded();
        }
        self.tables.reserve(data.max_len(), model.n_states());
        let supervised = MaximumLikelihoodLearning::new(self.options.clone());
        let mut history = Vec::new();

        let status = loop {
            let paths = self.decode_all(model, &data)?;
            let objective = supervised.fit(model, sequences, &paths, weights)?;
            history.push(objective);
            let converged = monitor.update(objective);
            progress.iteration(monitor.iterations(), objective, monitor.delta());
            if converged {
                break LearningStatus::from_monitor(&monitor);
            }
            if self.options.is_cancelled() {
                break LearningStatus::Cancelled;
            }
        };

        let outcome = LearningOutcome {
            log_likelihood: history.last().copied().unwrap_or(f64::NEG_INFINITY),
            iterations: history.len(),
            status,
            history,
        };
        progress.finish(&outcome);
        Ok(outcome)
    }

    fn decode_all<E: EmissionModel>(
        &mut self, model: &HiddenMarkovModel<E>, data: &TrainingSet<'_, E::Observation>,
    ) -> HMMResult<Vec<Vec<usize>>> {
        let mut paths = Vec::with_capacity(data.len());
        for (k, seq) in data.sequences().iter().enumerate() {
            let mut views = self.tables.split(seq.len());
            log_emissions_into(model, seq, views.log_emission.view_mut());
            let (path, log_probability) = decode_into(
                model.log_initial.view(),
                model.log_transitions.view(),
                views.log_emission.view(),
                views.log_alpha.view_mut(),
                views.backpointers.view_mut(),
            );
            if log_probability == f64::NEG_INFINITY {
                return Err(HMMError::ImpossibleSequence { sequence: k });
            }
            paths.push(path);
        }
        Ok(paths)
    }
}
