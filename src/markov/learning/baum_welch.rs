//! BaumWelchLearning — EM estimation from unlabelled sequences.
//!
//! Purpose
//! -------
//! Fit initial, transition and emission parameters of a hidden Markov model
//! by alternating a forward-backward E-step and a closed-form M-step until
//! the average log-likelihood stops improving.
//!
//! Key behaviors
//! -------------
//! - E-step, per sequence `k` of length `T`:
//!   - `log γ[t][i] = log α[t][i] + log β[t][i] - logsum_i(...)`;
//!   - `log ξ[t][i][j] = log α[t][i] + log A[i][j] + log b_j(o_{t+1})
//!     + log β[t+1][j] - logsum_{i,j}(...)`;
//!   - both normalized per timestep, then shifted by the normalized log
//!     sequence weight `ln w_k`.
//! - Objective: `Σ_k w_k ln P(O_k)` with `Σ w_k = 1`, so the plain average
//!   under default weights.
//! - M-step:
//!   - `log π_i = logsum_k log γ_k[0][i]`;
//!   - `log A[i][j] = logsum_{k,t<T-1} log ξ - logsum_{k,t<T-1} log γ`, with
//!     `0` when numerator and denominator are equal and a uniform row over
//!     the current support when the state is never left;
//!   - each emission refitted from all observations weighted by
//!     `exp(log γ[..][i])`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Scratch tables are sized once per `fit` call to the longest sequence
//!   and reused by every iteration.
//! - A sequence with zero likelihood under the current model stops training
//!   with [`HMMError::ImpossibleSequence`].
//! - NaN in the re-estimated parameters is reported as
//!   [`HMMError::NonFiniteParameter`]; it is never written back silently.
//! - Transitions that are `-∞` stay `-∞`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the degenerate-state guard, monotone objectives,
//!   weighting, cancellation and the iteration cap. The worked 3-state
//!   example lives in the integration tests.
use ndarray::{Array1, Array2};

use crate::{
    markov::{
        core::{
            data::TrainingSet,
            forward_backward::{backward_into, forward_into, log_emissions_into, log_gamma_into},
            model::HiddenMarkovModel,
            options::TrainOptions,
            workspace::ForwardBackwardTables,
        },
        emissions::EmissionModel,
        errors::{HMMError, HMMResult},
        learning::{LearningOutcome, LearningStatus, observer::ProgressLog},
    },
    optimization::numerical_stability::{log_sum_exp, log_sum_exp_iter},
};

/// Running log-domain sums of the E-step, reset every iteration.
#[derive(Debug, Clone)]
struct Accumulators {
    log_initial: Array1<f64>,
    log_ksi_sum: Array2<f64>,
    log_gamma_sum: Array1<f64>,
}

impl Accumulators {
    fn new(n: usize) -> Self {
        Self {
            log_initial: Array1::from_elem(n, f64::NEG_INFINITY),
            log_ksi_sum: Array2::from_elem((n, n), f64::NEG_INFINITY),
            log_gamma_sum: Array1::from_elem(n, f64::NEG_INFINITY),
        }
    }

    fn reset(&mut self) {
        self.log_initial.fill(f64::NEG_INFINITY);
        self.log_ksi_sum.fill(f64::NEG_INFINITY);
        self.log_gamma_sum.fill(f64::NEG_INFINITY);
    }
}

/// BaumWelchLearning — expectation-maximization for an unlabelled HMM.
///
/// Purpose
/// -------
/// Re-estimate π, A and every emission from the posterior state and
/// transition occupancies until the [`ConvergenceMonitor`] stops the loop or
/// the cancellation token is raised.
///
/// Fields
/// ------
/// - `options`: tolerance, cap, criterion, emission fitting options,
///   cancellation and verbosity.
/// - `tables`, `log_gamma`, `log_ksi`: scratch sized on the first `fit` and
///   reused across iterations and calls.
///
/// Invariants
/// ----------
/// - The objective is the weight-normalized mean log-likelihood and never
///   decreases between iterations.
/// - Each M-step commits as a whole or not at all.
///
/// [`ConvergenceMonitor`]: crate::markov::core::ConvergenceMonitor
#[derive(Debug, Clone)]
pub struct BaumWelchLearning {
    options: TrainOptions,
    tables: ForwardBackwardTables,
    log_gamma: Vec<Array2<f64>>,
    log_ksi: Array2<f64>,
}

impl BaumWelchLearning {
    /// Learner with empty scratch; buffers are sized by the first `fit`.
    pub fn new(options: TrainOptions) -> Self {
        Self {
            options,
            tables: ForwardBackwardTables::with_capacity(0, 0),
            log_gamma: Vec::new(),
            log_ksi: Array2::zeros((0, 0)),
        }
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    /// Train `model` in place on `sequences`.
    ///
    /// `weights`, when given, holds one non-negative weight per sequence;
    /// they are normalized to sum to one.
    ///
    /// # Errors
    /// Invalid training data or options, [`HMMError::ImpossibleSequence`],
    /// [`HMMError::NonFiniteParameter`], and any emission fitting error.
    pub fn fit<E: EmissionModel>(
        &mut self, model: &mut HiddenMarkovModel<E>, sequences: &[Vec<E::Observation>],
        weights: Option<&[f64]>,
    ) -> HMMResult<LearningOutcome> {
        let data = TrainingSet::new(model, sequences, weights)?;
        let mut monitor = self.options.monitor()?;
        let progress = ProgressLog::new("baum-welch", self.options.verbose);
        if monitor.is_unbounded() {
            progress.unbounded();
        }
        self.prepare(&data, model.n_states());
        let samples: Vec<&E::Observation> = sequences.iter().flatten().collect();
        let mut acc = Accumulators::new(model.n_states());
        let mut history = Vec::new();

        let status = loop {
            acc.reset();
            let objective = self.expectation(model, &data, &mut acc)?;
            history.push(objective);
            let converged = monitor.update(objective);
            progress.iteration(monitor.iterations(), objective, monitor.delta());
            if converged {
                break LearningStatus::from_monitor(&monitor);
            }
            if self.options.is_cancelled() {
                break LearningStatus::Cancelled;
            }
            self.maximization(model, &acc, &samples)?;
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

    fn prepare<O>(&mut self, data: &TrainingSet<'_, O>, n: usize) {
        self.tables.reserve(data.max_len(), n);
        self.log_gamma = data.sequences().iter().map(|s| Array2::zeros((s.len(), n))).collect();
        self.log_ksi = Array2::zeros((n, n));
    }

    /// Fill `log γ` for every sequence and the ξ/γ accumulators; return the
    /// weighted mean log-likelihood.
    fn expectation<E: EmissionModel>(
        &mut self, model: &HiddenMarkovModel<E>, data: &TrainingSet<'_, E::Observation>,
        acc: &mut Accumulators,
    ) -> HMMResult<f64> {
        let n = model.n_states();
        let log_a = model.log_transitions.view();
        let mut objective = 0.0;

        for (k, seq) in data.sequences().iter().enumerate() {
            let t_len = seq.len();
            let lw = data.log_weights()[k];
            let mut views = self.tables.split(t_len);
            log_emissions_into(model, seq, views.log_emission.view_mut());
            let ll = forward_into(
                model.log_initial.view(),
                log_a,
                views.log_emission.view(),
                views.log_alpha.view_mut(),
            );
            if ll == f64::NEG_INFINITY {
                return Err(HMMError::ImpossibleSequence { sequence: k });
            }
            backward_into(log_a, views.log_emission.view(), views.log_beta.view_mut());
            let gamma = &mut self.log_gamma[k];
            log_gamma_into(views.log_alpha.view(), views.log_beta.view(), gamma.view_mut());

            for t in 0..t_len.saturating_sub(1) {
                for i in 0..n {
                    for j in 0..n {
                        self.log_ksi[[i, j]] = views.log_alpha[[t, i]]
                            + log_a[[i, j]]
                            + views.log_emission[[t + 1, j]]
                            + views.log_beta[[t + 1, j]];
                    }
                }
                let norm = log_sum_exp_iter(self.log_ksi.iter().copied());
                for ((i, j), &v) in self.log_ksi.indexed_iter() {
                    let cell = &mut acc.log_ksi_sum[[i, j]];
                    *cell = log_sum_exp(*cell, v - norm + lw);
                }
                for i in 0..n {
                    let cell = &mut acc.log_gamma_sum[i];
                    *cell = log_sum_exp(*cell, gamma[[t, i]] + lw);
                }
            }

            gamma.mapv_inplace(|g| g + lw);
            for i in 0..n {
                acc.log_initial[i] = log_sum_exp(acc.log_initial[i], gamma[[0, i]]);
            }
            objective += lw.exp() * ll;
        }
        Ok(objective)
    }

    /// Re-estimate into a copy and commit it only once every emission fit
    /// and the final validation succeeded, so an error leaves `model` at the
    /// parameters of the last completed iteration.
    fn maximization<E: EmissionModel>(
        &self, model: &mut HiddenMarkovModel<E>, acc: &Accumulators, samples: &[&E::Observation],
    ) -> HMMResult<()> {
        let n = model.n_states();
        let mut next = model.clone();
        next.log_initial.assign(&acc.log_initial);
        reestimate_transitions(&mut next.log_transitions, &acc.log_ksi_sum, &acc.log_gamma_sum);

        let mut weights = Vec::with_capacity(samples.len());
        for i in 0..n {
            weights.clear();
            let column = self.log_gamma.iter().flat_map(|g| g.column(i).into_iter().copied());
            weights.extend(column.map(f64::exp));
            next.emissions[i].fit(samples, &weights, &self.options.fitting)?;
        }
        next.validate()?;
        *model = next;
        Ok(())
    }
}

/// `log A[i][j] = num[i][j] - den[i]` with the degenerate-state guards.
pub(crate) fn reestimate_transitions(
    log_a: &mut Array2<f64>, log_num: &Array2<f64>, log_den: &Array1<f64>,
) {
    for (i, mut row) in log_a.rows_mut().into_iter().enumerate() {
        let den = log_den[i];
        if den == f64::NEG_INFINITY {
            let support = row.iter().filter(|v| v.is_finite()).count().max(1);
            let uniform = -(support as f64).ln();
            row.mapv_inplace(|v| if v.is_finite() { uniform } else { f64::NEG_INFINITY });
            continue;
        }
        for (j, cell) in row.iter_mut().enumerate() {
            let num = log_num[[i, j]];
            *cell = if num == den { 0.0 } else { num - den };
        }
    }
}
