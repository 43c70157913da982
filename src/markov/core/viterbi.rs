//! Viterbi decoding: the single most likely hidden-state path.
//!
//! `δ[0][i] = log π_i + log b_i(o_0)`,
//! `δ[t][j] = log b_j(o_t) + max_i(δ[t-1][i] + log A[i][j])`, with the
//! maximizing `i` stored as a backpointer. The path is recovered from
//! `argmax_i δ[T-1][i]`. Every comparison is a strict `>`, so ties resolve
//! to the lowest state index and repeated calls return identical paths.
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2};

use crate::markov::{
    core::{
        forward_backward::{first_argmax, log_emissions_into},
        model::HiddenMarkovModel,
    },
    emissions::EmissionModel,
    errors::HMMResult,
};

/// Max-product kernel over precomputed emission log-densities.
///
/// `log_delta` and `backpointers` must have as many rows as `log_emission`.
/// Returns the path and its joint log-probability, `-∞` if no path is
/// possible (the path is then all zeros).
pub fn decode_into(
    log_initial: ArrayView1<'_, f64>, log_transitions: ArrayView2<'_, f64>,
    log_emission: ArrayView2<'_, f64>, mut log_delta: ArrayViewMut2<'_, f64>,
    mut backpointers: ArrayViewMut2<'_, usize>,
) -> (Vec<usize>, f64) {
    let t_len = log_emission.nrows();
    let n = log_initial.len();
    for i in 0..n {
        log_delta[[0, i]] = log_initial[i] + log_emission[[0, i]];
        backpointers[[0, i]] = 0;
    }
    for t in 1..t_len {
        for j in 0..n {
            let mut best_i = 0;
            let mut best = log_delta[[t - 1, 0]] + log_transitions[[0, j]];
            for i in 1..n {
                let candidate = log_delta[[t - 1, i]] + log_transitions[[i, j]];
                if candidate > best {
                    best = candidate;
                    best_i = i;
                }
            }
            log_delta[[t, j]] = best + log_emission[[t, j]];
            backpointers[[t, j]] = best_i;
        }
    }

    let last = first_argmax(log_delta.row(t_len - 1).iter().copied());
    let log_probability = log_delta[[t_len - 1, last]];
    let mut path = vec![0; t_len];
    path[t_len - 1] = last;
    for t in (1..t_len).rev() {
        path[t - 1] = backpointers[[t, path[t]]];
    }
    (path, log_probability)
}

/// Most likely state path for `obs` and its joint log-probability.
///
/// # Errors
/// [`HMMError::EmptySequence`](crate::markov::errors::HMMError::EmptySequence)
/// or `InvalidObservation`.
pub fn decode<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, obs: &[E::Observation],
) -> HMMResult<(Vec<usize>, f64)> {
    model.validate_sequence(0, obs)?;
    let shape = (obs.len(), model.n_states());
    let mut log_emission = Array2::zeros(shape);
    log_emissions_into(model, obs, log_emission.view_mut());
    let mut log_delta = Array2::zeros(shape);
    let mut backpointers = Array2::zeros(shape);
    Ok(decode_into(
        model.log_initial.view(),
        model.log_transitions.view(),
        log_emission.view(),
        log_delta.view_mut(),
        backpointers.view_mut(),
    ))
}
