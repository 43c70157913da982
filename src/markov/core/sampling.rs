//! Forward sampling of state paths and observations.
use ndarray::ArrayView1;
use rand::Rng;

use crate::markov::{
    core::model::HiddenMarkovModel,
    emissions::EmissionModel,
    errors::{HMMError, HMMResult},
};

/// Draw an index from a log-probability vector.
///
/// `-∞` entries are never drawn. Rounding that leaves `u` above the
/// cumulative sum falls back to the last possible index.
pub fn sample_log_categorical<R: Rng + ?Sized>(log_p: ArrayView1<'_, f64>, rng: &mut R) -> usize {
    let u: f64 = rng.gen();
    let mut cumulative = 0.0;
    let mut last_possible = 0;
    for (i, &lp) in log_p.iter().enumerate() {
        if lp == f64::NEG_INFINITY {
            continue;
        }
        cumulative += lp.exp();
        last_possible = i;
        if u < cumulative {
            return i;
        }
    }
    last_possible
}

/// Run the chain for `length` steps.
///
/// # Errors
/// [`HMMError::EmptySampleRequest`] for `length == 0`.
pub fn generate<E: EmissionModel, R: Rng + ?Sized>(
    model: &HiddenMarkovModel<E>, length: usize, rng: &mut R,
) -> HMMResult<(Vec<usize>, Vec<E::Observation>)> {
    if length == 0 {
        return Err(HMMError::EmptySampleRequest);
    }
    let mut states = Vec::with_capacity(length);
    let mut observations = Vec::with_capacity(length);
    let mut state = sample_log_categorical(model.log_initial.view(), rng);
    for t in 0..length {
        if t > 0 {
            state = sample_log_categorical(model.log_transitions.row(state), rng);
        }
        states.push(state);
        observations.push(model.emissions[state].sample(rng));
    }
    Ok((states, observations))
}
