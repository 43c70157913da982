//! Conversions between Python objects and the `markov` types, used by the
//! PyO3 wrappers in the crate root.
#[cfg(feature = "python-bindings")]
use std::str::FromStr;

#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use numpy::PyReadonlyArray1;

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

#[cfg(feature = "python-bindings")]
use crate::markov::core::{ConvergenceCriterion, Topology, TopologyKind, TrainOptions};

/// One symbol sequence from a 1-D integer ndarray or any sequence of ints.
#[cfg(feature = "python-bindings")]
pub fn extract_symbols(raw: &Bound<'_, PyAny>) -> PyResult<Vec<usize>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray1<i64>>() {
        return arr.as_array().iter().map(|&v| to_symbol(v)).collect();
    }
    let values: Vec<i64> = raw.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D integer numpy.ndarray or a sequence of int")
    })?;
    values.into_iter().map(to_symbol).collect()
}

/// A list of symbol sequences (ragged lengths allowed).
#[cfg(feature = "python-bindings")]
pub fn extract_sequences(raw: &Bound<'_, PyAny>) -> PyResult<Vec<Vec<usize>>> {
    let items: Vec<Bound<'_, PyAny>> = raw
        .extract()
        .map_err(|_| PyTypeError::new_err("expected a list of symbol sequences"))?;
    items.iter().map(extract_symbols).collect()
}

/// Optional per-sequence weights from an ndarray, a pandas Series or a list.
#[cfg(feature = "python-bindings")]
pub fn extract_weights(raw: Option<&Bound<'_, PyAny>>) -> PyResult<Option<Vec<f64>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if let Ok(arr) = raw.extract::<PyReadonlyArray1<f64>>() {
        return Ok(Some(arr.as_array().to_vec()));
    }
    if let Ok(obj) = raw.call_method("to_numpy", (false,), None) {
        if let Ok(arr) = obj.extract::<PyReadonlyArray1<f64>>() {
            return Ok(Some(arr.as_array().to_vec()));
        }
    }
    let values: Vec<f64> = raw.extract().map_err(|_| {
        PyTypeError::new_err("weights must be a 1-D float64 array, pandas.Series or sequence")
    })?;
    Ok(Some(values))
}

/// Training options with the library defaults for every `None`.
#[cfg(feature = "python-bindings")]
pub fn extract_train_options(
    tolerance: Option<f64>, max_iterations: Option<usize>, criterion: Option<&str>,
    use_laplace: Option<bool>, verbose: Option<bool>,
) -> PyResult<TrainOptions> {
    let criterion = match criterion {
        Some(name) => ConvergenceCriterion::from_str(name)?,
        None => ConvergenceCriterion::default(),
    };
    let opts = TrainOptions::new(tolerance.unwrap_or(1e-5), max_iterations.unwrap_or(0))?
        .with_criterion(criterion)
        .with_laplace(use_laplace.unwrap_or(true))
        .with_verbose(verbose.unwrap_or(false));
    Ok(opts)
}

#[cfg(feature = "python-bindings")]
pub fn extract_topology(
    n_states: usize, topology: Option<&str>, reach: Option<usize>,
) -> PyResult<Topology> {
    let kind = match topology {
        Some(name) => TopologyKind::from_str(name)?,
        None => TopologyKind::Ergodic,
    };
    Ok(Topology::new(kind, n_states, reach)?)
}

/// Row-major nested lists for Python.
#[cfg(feature = "python-bindings")]
pub fn to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

#[cfg(feature = "python-bindings")]
fn to_symbol(value: i64) -> PyResult<usize> {
    usize::try_from(value)
        .map_err(|_| PyValueError::new_err(format!("symbols must be non-negative, got {value}")))
}
