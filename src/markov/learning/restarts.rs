//! restarts — independent training attempts run in parallel.
//!
//! Purpose
//! -------
//! EM and segmental k-means only find local optima. This module runs
//! `restarts` attempts on a rayon pool, each from its own copy of the
//! starting model, and keeps the attempt with the highest final
//! log-likelihood.
//!
//! Key behaviors
//! -------------
//! - Attempt 0 starts from the caller's parameters unchanged; attempt `i > 0`
//!   starts from a copy randomized with `StdRng::seed_from_u64(seed + i)`,
//!   which keeps every `-∞` transition so the topology survives.
//! - Workers share nothing but the read-only inputs, the cancellation token
//!   and one `Mutex<Option<Candidate>>` holding the best result so far. The
//!   comparison and replacement happen under the lock.
//! - Ties in log-likelihood go to the lower attempt index, and a NaN
//!   objective ranks below every number, so the winner does not depend on
//!   thread scheduling.
//! - An attempt that fails is dropped. The call fails only when every
//!   attempt failed, returning the error of the lowest-indexed attempt.
//!
//! Invariants & assumptions
//! ------------------------
//! - The caller's model is never mutated.
//! - A raised cancellation token stops every attempt at its next outer
//!   iteration; the partial results still compete.
use std::{cmp::Ordering, str::FromStr, sync::Mutex};

use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use crate::markov::{
    core::{model::HiddenMarkovModel, options::TrainOptions},
    emissions::EmissionModel,
    errors::{HMMError, HMMResult},
    learning::{BaumWelchLearning, LearningOutcome, ViterbiLearning},
};

/// Which iterative learner every attempt runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartLearner {
    #[default]
    BaumWelch,
    Viterbi,
}

impl FromStr for RestartLearner {
    type Err = HMMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baum-welch" | "baumwelch" | "em" => Ok(RestartLearner::BaumWelch),
            "viterbi" => Ok(RestartLearner::Viterbi),
            _ => Err(HMMError::InvalidOptionName { option: "learner", name: s.to_string() }),
        }
    }
}

/// Number of attempts and the base seed of their random starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartOptions {
    pub restarts: usize,
    pub seed: u64,
}

impl RestartOptions {
    /// # Errors
    /// [`HMMError::NoRestarts`] when `restarts == 0`.
    pub fn new(restarts: usize, seed: u64) -> HMMResult<Self> {
        if restarts == 0 {
            return Err(HMMError::NoRestarts);
        }
        Ok(Self { restarts, seed })
    }
}

impl Default for RestartOptions {
    fn default() -> Self {
        Self { restarts: 4, seed: 0 }
    }
}

#[derive(Debug)]
struct Candidate<E: EmissionModel> {
    attempt: usize,
    model: HiddenMarkovModel<E>,
    outcome: LearningOutcome,
}

impl<E: EmissionModel> Candidate<E> {
    fn beats(&self, other: &Self) -> bool {
        let rank = |ll: f64| if ll.is_nan() { f64::NEG_INFINITY } else { ll };
        match rank(self.outcome.log_likelihood).total_cmp(&rank(other.outcome.log_likelihood)) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.attempt < other.attempt,
        }
    }
}

/// Train `restarts.restarts` copies of `model` in parallel and return the
/// best fitted model with its outcome.
///
/// # Errors
/// - [`HMMError::NoRestarts`] when no attempt is requested.
/// - [`HMMError::PoisonedBestModel`] when a worker panicked while holding
///   the shared best-model slot.
/// - The lowest-indexed attempt's error when every attempt failed.
pub fn fit_with_restarts<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, sequences: &[Vec<E::Observation>], weights: Option<&[f64]>,
    learner: RestartLearner, options: &TrainOptions, restarts: &RestartOptions,
) -> HMMResult<(HiddenMarkovModel<E>, LearningOutcome)> {
    if restarts.restarts == 0 {
        return Err(HMMError::NoRestarts);
    }
    let best: Mutex<Option<Candidate<E>>> = Mutex::new(None);

    let failures: Vec<(usize, HMMError)> = (0..restarts.restarts)
        .into_par_iter()
        .filter_map(|attempt| {
            let result = run_attempt(model, sequences, weights, learner, options, restarts, attempt)
                .and_then(|(model, outcome)| offer(&best, Candidate { attempt, model, outcome }));
            result.err().map(|err| (attempt, err))
        })
        .collect();

    let best = best.into_inner().map_err(|_| HMMError::PoisonedBestModel)?;
    match best {
        Some(candidate) => Ok((candidate.model, candidate.outcome)),
        None => Err(failures
            .into_iter()
            .min_by_key(|(attempt, _)| *attempt)
            .map_or(HMMError::NoRestarts, |(_, err)| err)),
    }
}

fn run_attempt<E: EmissionModel>(
    model: &HiddenMarkovModel<E>, sequences: &[Vec<E::Observation>], weights: Option<&[f64]>,
    learner: RestartLearner, options: &TrainOptions, restarts: &RestartOptions, attempt: usize,
) -> HMMResult<(HiddenMarkovModel<E>, LearningOutcome)> {
    let mut candidate = model.clone();
    if attempt > 0 {
        let mut rng = StdRng::seed_from_u64(restarts.seed.wrapping_add(attempt as u64));
        candidate.randomize(&mut rng);
    }
    let outcome = match learner {
        RestartLearner::BaumWelch => {
            BaumWelchLearning::new(options.clone()).fit(&mut candidate, sequences, weights)?
        }
        RestartLearner::Viterbi => {
            ViterbiLearning::new(options.clone()).fit(&mut candidate, sequences, weights)?
        }
    };
    Ok((candidate, outcome))
}

fn offer<E: EmissionModel>(
    best: &Mutex<Option<Candidate<E>>>, candidate: Candidate<E>,
) -> HMMResult<()> {
    let mut slot = best.lock().map_err(|_| HMMError::PoisonedBestModel)?;
    let replace = match slot.as_ref() {
        Some(current) => candidate.beats(current),
        None => true,
    };
    if replace {
        *slot = Some(candidate);
    }
    Ok(())
}
