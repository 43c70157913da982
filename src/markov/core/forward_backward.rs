//! Forward and backward recursions in log space.
//!
//! Purpose
//! -------
//! Compute `log α` and `log β` for one observation sequence without any
//! per-step rescaling, and derive the sequence log-likelihood and posterior
//! state probabilities from them.
//!
//! Key behaviors
//! -------------
//! - `log α[0][i] = log π_i + log b_i(o_0)`,
//!   `log α[t][j] = log b_j(o_t) + logsum_i(log α[t-1][i] + log A[i][j])`.
//! - `log β[T-1][i] = 0`,
//!   `log β[t][i] = logsum_j(log A[i][j] + log b_j(o_{t+1}) + log β[t+1][j])`.
//! - `evaluate` returns `logsum_i log α[T-1][i]`.
//! - The `*_into` kernels work on caller-provided views and never allocate;
//!   the public wrappers allocate their own tables.
//!
//! Invariants & assumptions
//! ------------------------
//! - Each recursion is O(T·N²). `-∞` propagates as probability zero.
//! - The kernels take the emission log-densities as a precomputed `T × N`
//!   table, so each `log b_j(o_t)` is evaluated once per pass.
//! - Public wrappers validate the sequence first; the kernels assume valid,
//!   non-empty input with matching shapes.
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2, Zip};

use crate::{
    markov::{
        core::model::HiddenMarkovModel,
        emissions::EmissionModel,
        errors::{HMMError, HMMResult},
    },
    optimization::numerical_stability::{log_sum_exp_iter, log_sum_exp_view},
};

/// Fill `out[t][j] = log b_j(obs[t])`.
pub fn log_emissions_into<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, obs: &[E::Observation], mut out: ArrayViewMut2<'_, f64>,
) {
    for (mut row, o) in out.rows_mut().into_iter().zip(obs) {
        for (cell, emission) in row.iter_mut().zip(&model.emissions) {
            *cell = emission.log_probability(o);
        }
    }
}

/// Forward kernel. Returns `ln P(obs)`.
pub fn forward_into(
    log_initial: ArrayView1<'_, f64>, log_transitions: ArrayView2<'_, f64>,
    log_emission: ArrayView2<'_, f64>, mut log_alpha: ArrayViewMut2<'_, f64>,
) -> f64 {
    let t_len = log_emission.nrows();
    let n = log_initial.len();
    Zip::from(log_alpha.row_mut(0))
        .and(&log_initial)
        .and(log_emission.row(0))
        .for_each(|a, &pi, &b| *a = pi + b);
    for t in 1..t_len {
        for j in 0..n {
            let incoming = log_sum_exp_iter(
                (0..n).map(|i| log_alpha[[t - 1, i]] + log_transitions[[i, j]]),
            );
            log_alpha[[t, j]] = log_emission[[t, j]] + incoming;
        }
    }
    log_sum_exp_view(log_alpha.row(t_len - 1))
}

/// Backward kernel.
pub fn backward_into(
    log_transitions: ArrayView2<'_, f64>, log_emission: ArrayView2<'_, f64>,
    mut log_beta: ArrayViewMut2<'_, f64>,
) {
    let t_len = log_emission.nrows();
    let n = log_transitions.nrows();
    log_beta.row_mut(t_len - 1).fill(0.0);
    for t in (0..t_len - 1).rev() {
        for i in 0..n {
            log_beta[[t, i]] = log_sum_exp_iter((0..n).map(|j| {
                log_transitions[[i, j]] + log_emission[[t + 1, j]] + log_beta[[t + 1, j]]
            }));
        }
    }
}

/// Per-timestep normalized `log γ[t][k] = log α + log β - logsum_k(log α + log β)`.
///
/// Rows whose normalizer is `-∞` are left at `-∞`.
pub fn log_gamma_into(
    log_alpha: ArrayView2<'_, f64>, log_beta: ArrayView2<'_, f64>,
    mut log_gamma: ArrayViewMut2<'_, f64>,
) {
    Zip::from(&mut log_gamma)
        .and(&log_alpha)
        .and(&log_beta)
        .for_each(|g, &a, &b| *g = a + b);
    for mut row in log_gamma.rows_mut() {
        let norm = log_sum_exp_view(row.view());
        if norm.is_finite() {
            row.mapv_inplace(|v| v - norm);
        }
    }
}

fn tables_for<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, obs: &[E::Observation],
) -> HMMResult<(Array2<f64>, Array2<f64>)> {
    model.validate_sequence(0, obs)?;
    let shape = (obs.len(), model.n_states());
    let mut log_emission = Array2::zeros(shape);
    log_emissions_into(model, obs, log_emission.view_mut());
    Ok((log_emission, Array2::zeros(shape)))
}

/// `(log α, ln P(obs))` for one sequence.
///
/// # Errors
/// [`HMMError::EmptySequence`] or [`HMMError::InvalidObservation`].
pub fn forward<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, obs: &[E::Observation],
) -> HMMResult<(Array2<f64>, f64)> {
    let (log_emission, mut log_alpha) = tables_for(model, obs)?;
    let ll = forward_into(
        model.log_initial.view(),
        model.log_transitions.view(),
        log_emission.view(),
        log_alpha.view_mut(),
    );
    Ok((log_alpha, ll))
}

/// `log β` for one sequence.
///
/// # Errors
/// As [`forward`].
pub fn backward<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, obs: &[E::Observation],
) -> HMMResult<Array2<f64>> {
    let (log_emission, mut log_beta) = tables_for(model, obs)?;
    backward_into(model.log_transitions.view(), log_emission.view(), log_beta.view_mut());
    Ok(log_beta)
}

/// `ln P(obs | model)`; `-∞` when the sequence is impossible.
///
/// # Errors
/// As [`forward`].
pub fn evaluate<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, obs: &[E::Observation],
) -> HMMResult<f64> {
    forward(model, obs).map(|(_, ll)| ll)
}

/// Posterior state probabilities `P(s_t = k | obs)`, `T × N`.
///
/// # Errors
/// As [`forward`], plus [`HMMError::ImpossibleSequence`] when
/// `P(obs) = 0`.
pub fn posterior<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, obs: &[E::Observation],
) -> HMMResult<Array2<f64>> {
    let (log_emission, mut log_alpha) = tables_for(model, obs)?;
    let mut log_beta = Array2::zeros(log_alpha.raw_dim());
    let ll = forward_into(
        model.log_initial.view(),
        model.log_transitions.view(),
        log_emission.view(),
        log_alpha.view_mut(),
    );
    if ll == f64::NEG_INFINITY {
        return Err(HMMError::ImpossibleSequence { sequence: 0 });
    }
    backward_into(model.log_transitions.view(), log_emission.view(), log_beta.view_mut());
    let mut log_gamma = Array2::zeros(log_alpha.raw_dim());
    log_gamma_into(log_alpha.view(), log_beta.view(), log_gamma.view_mut());
    Ok(log_gamma.mapv(f64::exp))
}

/// State with the highest posterior probability at each step.
///
/// Ties go to the lowest state index.
///
/// # Errors
/// As [`posterior`].
pub fn posterior_decode<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, obs: &[E::Observation],
) -> HMMResult<Vec<usize>> {
    let gamma = posterior(model, obs)?;
    Ok(gamma.rows().into_iter().map(|row| first_argmax(row.iter().copied())).collect())
}

/// Index of the first maximum; strict `>` keeps the earliest on ties.
pub(crate) fn first_argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if i == 0 || v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::markov::emissions::DiscreteEmission;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Forward likelihood against brute-force enumeration, forward/backward
    // consistency, posterior normalization, and input errors.
    // -------------------------------------------------------------------------

    fn weather() -> HiddenMarkovModel<DiscreteEmission> {
        let emissions = vec![
            DiscreteEmission::new(&[0.1, 0.4, 0.5]).unwrap(),
            DiscreteEmission::new(&[0.6, 0.3, 0.1]).unwrap(),
        ];
        HiddenMarkovModel::from_probabilities(
            &array![0.6, 0.4],
            &array![[0.7, 0.3], [0.4, 0.6]],
            emissions,
        )
        .unwrap()
    }

    fn brute_force(model: &HiddenMarkovModel<DiscreteEmission>, obs: &[usize]) -> f64 {
        let n = model.n_states();
        let mut total = 0.0;
        for code in 0..n.pow(obs.len() as u32) {
            let path: Vec<usize> = (0..obs.len()).map(|t| (code / n.pow(t as u32)) % n).collect();
            let mut lp = model.log_initial()[path[0]]
                + model.emissions()[path[0]].log_probability(&obs[0]);
            for t in 1..obs.len() {
                lp += model.log_transitions()[[path[t - 1], path[t]]]
                    + model.emissions()[path[t]].log_probability(&obs[t]);
            }
            total += lp.exp();
        }
        total.ln()
    }

    #[test]
    // Purpose
    // -------
    // Forward likelihood equals the sum over all state paths.
    //
    // Given
    // -----
    // - Two-state, three-symbol model and the sequence (0, 1, 2, 2).
    //
    // Expect
    // ------
    // - `evaluate` matches brute-force enumeration to 1e-12.
    fn evaluate_matches_path_enumeration() {
        let m = weather();
        let obs = [0, 1, 2, 2];
        assert_relative_eq!(evaluate(&m, &obs).unwrap(), brute_force(&m, &obs), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Backward recursion yields the same likelihood as forward.
    //
    // Given
    // -----
    // - The same model and sequence.
    //
    // Expect
    // ------
    // - `logsum_i(log π_i + log b_i(o_0) + log β[0][i])` equals the forward
    //   likelihood.
    fn backward_agrees_with_forward() {
        // Arrange
        let m = weather();
        let obs = [0, 1, 2, 2];

        // Act
        let (_, ll) = forward(&m, &obs).unwrap();
        let beta = backward(&m, &obs).unwrap();
        let via_beta = log_sum_exp_iter((0..2).map(|i| {
            m.log_initial()[i] + m.emissions()[i].log_probability(&obs[0]) + beta[[0, i]]
        }));

        // Assert
        assert_relative_eq!(ll, via_beta, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Posterior rows are probability distributions.
    //
    // Given
    // -----
    // - The same model, sequence (2, 0, 0, 1, 2).
    //
    // Expect
    // ------
    // - Every row sums to one within 1e-12; posterior decoding has one state
    //   per step.
    fn posterior_rows_sum_to_one() {
        let m = weather();
        let obs = [2, 0, 0, 1, 2];
        let gamma = posterior(&m, &obs).unwrap();
        for row in gamma.rows() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        assert_eq!(posterior_decode(&m, &obs).unwrap().len(), obs.len());
    }

    #[test]
    // Purpose
    // -------
    // Invalid input is rejected before any numeric work.
    //
    // Given
    // -----
    // - An empty sequence; a sequence containing symbol 5 of 3.
    //
    // Expect
    // ------
    // - `EmptySequence`; `InvalidObservation` at position 1.
    fn invalid_sequences_are_rejected() {
        let m = weather();
        assert_eq!(evaluate(&m, &[]), Err(HMMError::EmptySequence { sequence: 0 }));
        assert!(matches!(
            evaluate(&m, &[0, 5]),
            Err(HMMError::InvalidObservation { sequence: 0, position: 1, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A sequence the model cannot produce has likelihood zero.
    //
    // Given
    // -----
    // - A model whose only emission never produces symbol 1.
    //
    // Expect
    // ------
    // - `evaluate` is `-∞`; `posterior` reports `ImpossibleSequence`.
    fn impossible_sequence_has_zero_likelihood() {
        let m = HiddenMarkovModel::from_probabilities(
            &array![1.0],
            &array![[1.0]],
            vec![DiscreteEmission::new(&[1.0, 0.0]).unwrap()],
        )
        .unwrap();
        assert_eq!(evaluate(&m, &[0, 1]).unwrap(), f64::NEG_INFINITY);
        assert_eq!(posterior(&m, &[0, 1]), Err(HMMError::ImpossibleSequence { sequence: 0 }));
    }
}
