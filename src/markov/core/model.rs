//! HiddenMarkovModel — log-domain parameters of a hidden Markov model.
//!
//! Purpose
//! -------
//! Hold the initial distribution, the transition matrix and one emission
//! density per state, all in log space, and expose the inference entry
//! points (evaluate, decode, posterior, generate) on top of them.
//!
//! Key behaviors
//! -------------
//! - Constructors validate shapes and stochasticity up front, from log
//!   parameters ([`HiddenMarkovModel::new`]), from probabilities
//!   ([`HiddenMarkovModel::from_probabilities`]) or from a [`Topology`].
//! - [`HiddenMarkovModel::validate`] re-checks the invariants; learners call
//!   it after every re-estimation to catch NaN contamination.
//! - Inference methods are thin wrappers over the free functions in
//!   `forward_backward`, `viterbi` and `sampling`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `n_states ≥ 1`, `log_initial.len() == n_states`,
//!   `log_transitions` is `n_states × n_states`,
//!   `emissions.len() == n_states`.
//! - `logsumexp(log_initial) ≈ 0` and every transition row has
//!   `logsumexp ≈ 0` within [`STOCHASTIC_TOL`]. `-∞` is probability zero.
//! - No entry is NaN or `+∞`.
//!
//! Conventions
//! -----------
//! - Rows of `log_transitions` are "from" states, columns "to" states.
//! - Learners mutate the parameter blocks in place through crate-private
//!   fields; the public API only hands out shared views.
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;

use crate::{
    markov::{
        core::{forward_backward, sampling, topology::Topology, viterbi},
        emissions::{EmissionModel, random_simplex},
        errors::{HMMError, HMMResult},
    },
    optimization::numerical_stability::{log_sum_exp_view, safe_ln},
};

/// Allowed deviation of a probability vector's sum from one.
pub const STOCHASTIC_TOL: f64 = 1e-6;

/// HiddenMarkovModel — parameters of a first-order HMM stored in log space.
///
/// Purpose
/// -------
/// Hold the initial distribution, the transition matrix and one emission
/// distribution per hidden state. Learners mutate it in place; inference
/// routines borrow it.
///
/// Fields
/// ------
/// - `log_initial`: `ln π_i`, length `n_states`.
/// - `log_transitions`: `ln A[i][j]`, `n_states × n_states`. `-∞` marks a
///   structurally forbidden transition.
/// - `emissions`: one [`EmissionModel`] per state.
///
/// Invariants
/// ----------
/// - `exp(log_initial)` and every row of `exp(log_transitions)` sum to one
///   within [`STOCHASTIC_TOL`]; no entry is NaN or `+∞`.
/// - `emissions.len() == n_states`.
/// - Both hold after every constructor and after every successful learner
///   call ([`Self::validate`]).
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenMarkovModel<E> {
    pub(crate) log_initial: Array1<f64>,
    pub(crate) log_transitions: Array2<f64>,
    pub(crate) emissions: Vec<E>,
}

impl<E: EmissionModel> HiddenMarkovModel<E> {
    /// Build from log-probabilities.
    ///
    /// # Errors
    /// - [`HMMError::NoStates`] for zero states.
    /// - [`HMMError::ShapeMismatch`] when the blocks disagree on the number
    ///   of states.
    /// - [`HMMError::InvalidProbability`] / [`HMMError::NotStochastic`] /
    ///   [`HMMError::NonFiniteParameter`] from [`Self::validate`].
    pub fn new(
        log_initial: Array1<f64>, log_transitions: Array2<f64>, emissions: Vec<E>,
    ) -> HMMResult<Self> {
        let n = log_initial.len();
        if n == 0 {
            return Err(HMMError::NoStates);
        }
        if log_transitions.nrows() != n {
            return Err(HMMError::ShapeMismatch {
                what: "transition rows",
                expected: n,
                actual: log_transitions.nrows(),
            });
        }
        if log_transitions.ncols() != n {
            return Err(HMMError::ShapeMismatch {
                what: "transition columns",
                expected: n,
                actual: log_transitions.ncols(),
            });
        }
        if emissions.len() != n {
            return Err(HMMError::ShapeMismatch {
                what: "emissions",
                expected: n,
                actual: emissions.len(),
            });
        }
        let model = Self { log_initial, log_transitions, emissions };
        model.validate()?;
        Ok(model)
    }

    /// Build from probabilities; zeros become `-∞`.
    ///
    /// # Errors
    /// As [`Self::new`], plus [`HMMError::InvalidProbability`] for entries
    /// outside [0, 1].
    pub fn from_probabilities(
        initial: &Array1<f64>, transitions: &Array2<f64>, emissions: Vec<E>,
    ) -> HMMResult<Self> {
        check_unit_interval("initial", initial.iter())?;
        check_unit_interval("transitions", transitions.iter())?;
        Self::new(initial.mapv(safe_ln), transitions.mapv(safe_ln), emissions)
    }

    /// # Errors
    /// [`HMMError::ShapeMismatch`] when `emissions.len()` differs from the
    /// topology's state count.
    pub fn from_topology(topology: &Topology, emissions: Vec<E>) -> HMMResult<Self> {
        Self::new(topology.log_initial(), topology.log_transitions(), emissions)
    }

    pub fn n_states(&self) -> usize {
        self.log_initial.len()
    }

    pub fn log_initial(&self) -> &Array1<f64> {
        &self.log_initial
    }

    pub fn log_transitions(&self) -> &Array2<f64> {
        &self.log_transitions
    }

    pub fn emissions(&self) -> &[E] {
        &self.emissions
    }

    pub fn initial_probabilities(&self) -> Array1<f64> {
        self.log_initial.mapv(f64::exp)
    }

    pub fn transition_probabilities(&self) -> Array2<f64> {
        self.log_transitions.mapv(f64::exp)
    }

    /// Check the parameter invariants listed in the module docs.
    ///
    /// NaN is reported as [`HMMError::NonFiniteParameter`] with a row-major
    /// index, so a contaminated re-estimate is distinguishable from a bad
    /// user input.
    pub fn validate(&self) -> HMMResult<()> {
        check_log_block("initial", self.log_initial.iter())?;
        check_log_block("transitions", self.log_transitions.iter())?;
        check_log_row("initial", 0, self.log_initial.view())?;
        for (row, values) in self.log_transitions.rows().into_iter().enumerate() {
            check_log_row("transitions", row, values)?;
        }
        Ok(())
    }

    /// Reject empty sequences and observations the emissions cannot score.
    ///
    /// # Errors
    /// [`HMMError::EmptySequence`] or [`HMMError::InvalidObservation`], both
    /// located at `sequence`.
    pub fn validate_sequence(&self, sequence: usize, obs: &[E::Observation]) -> HMMResult<()> {
        if obs.is_empty() {
            return Err(HMMError::EmptySequence { sequence });
        }
        for (position, o) in obs.iter().enumerate() {
            self.emissions.iter().try_for_each(|e| e.validate_observation(o)).map_err(|err| {
                HMMError::InvalidObservation { sequence, position, reason: err.to_string() }
            })?;
        }
        Ok(())
    }

    /// `ln P(obs | model)`.
    ///
    /// # Errors
    /// Invalid or empty `obs`.
    pub fn evaluate(&self, obs: &[E::Observation]) -> HMMResult<f64> {
        forward_backward::evaluate(self, obs)
    }

    /// Most likely state path and its joint log-probability.
    ///
    /// # Errors
    /// Invalid or empty `obs`.
    pub fn decode(&self, obs: &[E::Observation]) -> HMMResult<(Vec<usize>, f64)> {
        viterbi::decode(self, obs)
    }

    /// Posterior state probabilities, `T × n_states`.
    ///
    /// # Errors
    /// Invalid or empty `obs`, or a sequence with zero likelihood.
    pub fn posterior(&self, obs: &[E::Observation]) -> HMMResult<Array2<f64>> {
        forward_backward::posterior(self, obs)
    }

    /// Draw `length` steps of the chain: states and their observations.
    ///
    /// # Errors
    /// [`HMMError::EmptySampleRequest`] for `length == 0`.
    pub fn generate<R: Rng + ?Sized>(
        &self, length: usize, rng: &mut R,
    ) -> HMMResult<(Vec<usize>, Vec<E::Observation>)> {
        sampling::generate(self, length, rng)
    }

    /// Redraw every stochastic row and perturb the emissions.
    ///
    /// Entries that are `-∞` stay `-∞`, so forward topologies keep their
    /// band structure.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        randomize_log_row(self.log_initial.view_mut(), rng);
        for row in self.log_transitions.rows_mut() {
            randomize_log_row(row, rng);
        }
        for emission in &mut self.emissions {
            emission.randomize(rng);
        }
    }
}

fn randomize_log_row<R: Rng + ?Sized>(mut row: ndarray::ArrayViewMut1<'_, f64>, rng: &mut R) {
    let support: Vec<usize> =
        row.iter().enumerate().filter(|(_, v)| v.is_finite()).map(|(i, _)| i).collect();
    let p = random_simplex(rng, support.len());
    for (&i, pi) in support.iter().zip(p) {
        row[i] = pi.ln();
    }
}

fn check_unit_interval<'a>(
    what: &'static str, values: impl Iterator<Item = &'a f64>,
) -> HMMResult<()> {
    for (index, &p) in values.enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(HMMError::InvalidProbability { what, index, value: p });
        }
    }
    Ok(())
}

fn check_log_block<'a>(
    what: &'static str, values: impl Iterator<Item = &'a f64>,
) -> HMMResult<()> {
    for (index, &lp) in values.enumerate() {
        if lp.is_nan() {
            return Err(HMMError::NonFiniteParameter { what, index });
        }
        if lp > STOCHASTIC_TOL {
            return Err(HMMError::InvalidProbability { what, index, value: lp.exp() });
        }
    }
    Ok(())
}

fn check_log_row(what: &'static str, row: usize, values: ArrayView1<'_, f64>) -> HMMResult<()> {
    let sum = log_sum_exp_view(values).exp();
    if (sum - 1.0).abs() > STOCHASTIC_TOL {
        return Err(HMMError::NotStochastic { what, row, sum });
    }
    Ok(())
}
