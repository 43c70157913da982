//! rust_hmm — hidden Markov model learning in log space, with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes a discrete-symbol HMM to Python through the `_rust_hmm`
//! extension module when the `python-bindings` feature is enabled.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules: [`markov`] (models, inference,
//!   learners) and [`optimization`] (L-BFGS likelihood maximization and
//!   log-space numerics used by numerically fitted emissions).
//! - Define `#[pyclass]` wrappers ([`DiscreteHMM`], [`LearningResult`]) and
//!   the `#[pymodule]` initializer with its `hidden_markov` submodule.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; this file only converts
//!   inputs, dispatches, and maps [`markov::errors::HMMError`] to `ValueError`.
//! - A `DiscreteHMM` always wraps a validated model; a failed training call
//!   may leave it at the parameters of its last completed iteration.
//!
//! Conventions
//! -----------
//! - Python-exposed classes live under `_rust_hmm.hidden_markov`.
//! - Probabilities cross the boundary as plain probabilities, not logs.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by the
//!   end-to-end pipeline test under `tests/`.

pub mod markov;
pub mod optimization;
pub mod utils;

#[cfg(feature = "obs_slog")]
pub mod logging;

#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use rand::{SeedableRng, rngs::StdRng};

#[cfg(feature = "python-bindings")]
use crate::{
    markov::{
        core::HiddenMarkovModel,
        emissions::DiscreteEmission,
        learning::{
            BaumWelchLearning, LearningOutcome, LearningStatus, MaximumLikelihoodLearning,
            RestartLearner, RestartOptions, ViterbiLearning, fit_with_restarts,
        },
    },
    utils::{
        extract_sequences, extract_symbols, extract_topology, extract_train_options,
        extract_weights, to_rows,
    },
};

/// DiscreteHMM — Python-facing hidden Markov model over integer symbols.
///
/// Purpose
/// -------
/// Expose construction, the three learners, random restarts, decoding,
/// evaluation, posteriors and sampling of a
/// `HiddenMarkovModel<DiscreteEmission>` to Python.
///
/// Parameters
/// ----------
/// Constructed from Python via `DiscreteHMM(n_states, n_symbols,
/// topology="ergodic", reach=None)` or `DiscreteHMM.from_probabilities(...)`.
///
/// Notes
/// -----
/// - Training methods accept `tolerance`, `max_iterations`, `criterion`
///   ("relative" | "absolute"), `use_laplace` and `verbose`; `None` keeps
///   the library defaults (tolerance 1e-5, no cap).
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_hmm.hidden_markov")]
pub struct DiscreteHMM {
    pub inner: HiddenMarkovModel<DiscreteEmission>,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl DiscreteHMM {
    #[new]
    #[pyo3(
        signature = (n_states, n_symbols, topology = None, reach = None),
        text_signature = "(n_states, n_symbols, /, topology='ergodic', reach=None)"
    )]
    pub fn new(
        n_states: usize, n_symbols: usize, topology: Option<&str>, reach: Option<usize>,
    ) -> PyResult<Self> {
        let topology = extract_topology(n_states, topology, reach)?;
        let emissions = vec![DiscreteEmission::uniform(n_symbols)?; n_states];
        let inner = HiddenMarkovModel::from_topology(&topology, emissions)?;
        Ok(DiscreteHMM { inner })
    }

    #[staticmethod]
    #[pyo3(text_signature = "(initial, transitions, emissions, /)")]
    pub fn from_probabilities(
        initial: Vec<f64>, transitions: Vec<Vec<f64>>, emissions: Vec<Vec<f64>>,
    ) -> PyResult<Self> {
        let n = initial.len();
        if transitions.len() != n || transitions.iter().any(|row| row.len() != n) {
            return Err(PyValueError::new_err("transitions must be an n_states x n_states matrix"));
        }
        let flat: Vec<f64> = transitions.into_iter().flatten().collect();
        let transitions = Array2::from_shape_vec((n, n), flat)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let emissions = emissions
            .iter()
            .map(|row| DiscreteEmission::new(row))
            .collect::<Result<Vec<_>, _>>()?;
        let inner =
            HiddenMarkovModel::from_probabilities(&Array1::from(initial), &transitions, emissions)?;
        Ok(DiscreteHMM { inner })
    }

    #[pyo3(
        signature = (sequences, weights = None, tolerance = None, max_iterations = None,
                     criterion = None, use_laplace = None, verbose = None),
        text_signature = "(self, sequences, /, weights=None, tolerance=1e-5, \
                          max_iterations=0, criterion='relative', use_laplace=True, \
                          verbose=False)"
    )]
    pub fn fit_baum_welch(
        &mut self, sequences: &Bound<'_, PyAny>, weights: Option<&Bound<'_, PyAny>>,
        tolerance: Option<f64>, max_iterations: Option<usize>, criterion: Option<&str>,
        use_laplace: Option<bool>, verbose: Option<bool>,
    ) -> PyResult<LearningResult> {
        let seqs = extract_sequences(sequences)?;
        let weights = extract_weights(weights)?;
        let opts =
            extract_train_options(tolerance, max_iterations, criterion, use_laplace, verbose)?;
        let outcome =
            BaumWelchLearning::new(opts).fit(&mut self.inner, &seqs, weights.as_deref())?;
        Ok(LearningResult { inner: outcome })
    }

    #[pyo3(
        signature = (sequences, weights = None, tolerance = None, max_iterations = None,
                     criterion = None, use_laplace = None, verbose = None),
        text_signature = "(self, sequences, /, weights=None, tolerance=1e-5, \
                          max_iterations=0, criterion='relative', use_laplace=True, \
                          verbose=False)"
    )]
    pub fn fit_viterbi(
        &mut self, sequences: &Bound<'_, PyAny>, weights: Option<&Bound<'_, PyAny>>,
        tolerance: Option<f64>, max_iterations: Option<usize>, criterion: Option<&str>,
        use_laplace: Option<bool>, verbose: Option<bool>,
    ) -> PyResult<LearningResult> {
        let seqs = extract_sequences(sequences)?;
        let weights = extract_weights(weights)?;
        let opts =
            extract_train_options(tolerance, max_iterations, criterion, use_laplace, verbose)?;
        let outcome = ViterbiLearning::new(opts).fit(&mut self.inner, &seqs, weights.as_deref())?;
        Ok(LearningResult { inner: outcome })
    }

    /// Supervised fit from labelled paths; returns the total log-likelihood.
    #[pyo3(
        signature = (sequences, paths, weights = None, use_laplace = None),
        text_signature = "(self, sequences, paths, /, weights=None, use_laplace=True)"
    )]
    pub fn fit_supervised(
        &mut self, sequences: &Bound<'_, PyAny>, paths: &Bound<'_, PyAny>,
        weights: Option<&Bound<'_, PyAny>>, use_laplace: Option<bool>,
    ) -> PyResult<f64> {
        let seqs = extract_sequences(sequences)?;
        let paths = extract_sequences(paths)?;
        let weights = extract_weights(weights)?;
        let opts = extract_train_options(None, None, None, use_laplace, None)?;
        let ll = MaximumLikelihoodLearning::new(opts).fit(
            &mut self.inner,
            &seqs,
            &paths,
            weights.as_deref(),
        )?;
        Ok(ll)
    }

    /// Best of `restarts` parallel attempts; replaces the model on success.
    #[pyo3(
        signature = (sequences, learner = None, restarts = None, seed = None, weights = None,
                     tolerance = None, max_iterations = None, use_laplace = None),
        text_signature = "(self, sequences, /, learner='baum-welch', restarts=4, seed=0, \
                          weights=None, tolerance=1e-5, max_iterations=0, use_laplace=True)"
    )]
    pub fn fit_restarts(
        &mut self, sequences: &Bound<'_, PyAny>, learner: Option<&str>, restarts: Option<usize>,
        seed: Option<u64>, weights: Option<&Bound<'_, PyAny>>, tolerance: Option<f64>,
        max_iterations: Option<usize>, use_laplace: Option<bool>,
    ) -> PyResult<LearningResult> {
        let seqs = extract_sequences(sequences)?;
        let weights = extract_weights(weights)?;
        let learner = match learner {
            Some(name) => name.parse::<RestartLearner>()?,
            None => RestartLearner::default(),
        };
        let defaults = RestartOptions::default();
        let restart_opts =
            RestartOptions::new(restarts.unwrap_or(defaults.restarts), seed.unwrap_or(0))?;
        let opts = extract_train_options(tolerance, max_iterations, None, use_laplace, None)?;
        let (best, outcome) = fit_with_restarts(
            &self.inner,
            &seqs,
            weights.as_deref(),
            learner,
            &opts,
            &restart_opts,
        )?;
        self.inner = best;
        Ok(LearningResult { inner: outcome })
    }

    /// Most likely state path and its log-probability.
    pub fn decode(&self, observations: &Bound<'_, PyAny>) -> PyResult<(Vec<usize>, f64)> {
        let obs = extract_symbols(observations)?;
        Ok(self.inner.decode(&obs)?)
    }

    /// Log-likelihood of one sequence.
    pub fn evaluate(&self, observations: &Bound<'_, PyAny>) -> PyResult<f64> {
        let obs = extract_symbols(observations)?;
        Ok(self.inner.evaluate(&obs)?)
    }

    /// Posterior state probabilities as a `T x n_states` nested list.
    pub fn posterior(&self, observations: &Bound<'_, PyAny>) -> PyResult<Vec<Vec<f64>>> {
        let obs = extract_symbols(observations)?;
        Ok(to_rows(&self.inner.posterior(&obs)?))
    }

    /// Sample `(states, symbols)` of the given length.
    #[pyo3(signature = (length, seed = None), text_signature = "(self, length, /, seed=None)")]
    pub fn generate(
        &self, length: usize, seed: Option<u64>,
    ) -> PyResult<(Vec<usize>, Vec<usize>)> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(self.inner.generate(length, &mut rng)?)
    }

    #[getter]
    pub fn n_states(&self) -> usize {
        self.inner.n_states()
    }

    #[getter]
    pub fn n_symbols(&self) -> usize {
        self.inner.emissions().first().map_or(0, DiscreteEmission::n_symbols)
    }

    #[getter]
    pub fn initial(&self) -> Vec<f64> {
        self.inner.initial_probabilities().to_vec()
    }

    #[getter]
    pub fn transitions(&self) -> Vec<Vec<f64>> {
        to_rows(&self.inner.transition_probabilities())
    }

    #[getter]
    pub fn emissions(&self) -> Vec<Vec<f64>> {
        self.inner.emissions().iter().map(|e| e.probabilities().to_vec()).collect()
    }
}

/// LearningResult — outcome of an iterative training call, read-only.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_hmm.hidden_markov")]
pub struct LearningResult {
    pub inner: LearningOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl LearningResult {
    #[getter]
    pub fn log_likelihood(&self) -> f64 {
        self.inner.log_likelihood
    }

    #[getter]
    pub fn iterations(&self) -> usize {
        self.inner.iterations
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.status == LearningStatus::Converged
    }

    #[getter]
    pub fn status(&self) -> String {
        match self.inner.status {
            LearningStatus::Converged => "converged",
            LearningStatus::MaxIterationsReached => "max_iterations_reached",
            LearningStatus::Cancelled => "cancelled",
        }
        .to_string()
    }

    #[getter]
    pub fn history(&self) -> Vec<f64> {
        self.inner.history.clone()
    }
}

/// _rust_hmm — PyO3 module initializer.
///
/// Creates the `hidden_markov` submodule, attaches it to `_rust_hmm` and
/// registers it in `sys.modules` so `rust_hmm.hidden_markov` imports work.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_hmm<'py>(py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let hidden_markov_mod = PyModule::new(py, "hidden_markov")?;
    hidden_markov(m, &hidden_markov_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    py.import("sys")?.getattr("modules")?.set_item("rust_hmm.hidden_markov", hidden_markov_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn hidden_markov<'py>(parent: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<DiscreteHMM>()?;
    m.add_class::<LearningResult>()?;
    parent.add_submodule(m)?;
    Ok(())
}
