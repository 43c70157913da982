//! ForwardBackwardTables — reusable scratch for the recursions.
//!
//! Purpose
//! -------
//! Own the `T × N` tables the forward, backward and Viterbi recursions write
//! into, so a learner can run thousands of sequence passes without
//! reallocating.
//!
//! Key behaviors
//! -------------
//! - [`ForwardBackwardTables::with_capacity`] sizes every table once, to the
//!   longest sequence of the training set.
//! - [`ForwardBackwardTables::split`] hands out disjoint mutable views of the
//!   first `T` rows of each table.
//!
//! Invariants & assumptions
//! ------------------------
//! - Tables only grow. [`ForwardBackwardTables::reserve`] reallocates when
//!   asked for more rows or a different state count, and is called outside
//!   the iteration loop.
//! - Contents are scratch: every pass overwrites the rows it reads.
use ndarray::{Array2, ArrayViewMut2, s};

/// Borrowed views of the first `T` rows of every table.
pub struct TableViews<'a> {
    pub log_alpha: ArrayViewMut2<'a, f64>,
    pub log_beta: ArrayViewMut2<'a, f64>,
    pub log_emission: ArrayViewMut2<'a, f64>,
    pub backpointers: ArrayViewMut2<'a, usize>,
}

/// Reusable `T × N` buffers for the emission, forward, backward and
/// backpointer tables of one learner.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardBackwardTables {
    log_alpha: Array2<f64>,
    log_beta: Array2<f64>,
    log_emission: Array2<f64>,
    backpointers: Array2<usize>,
}

impl ForwardBackwardTables {
    /// Tables for sequences up to `max_len` steps over `n_states` states.
    pub fn with_capacity(max_len: usize, n_states: usize) -> Self {
        Self {
            log_alpha: Array2::from_elem((max_len, n_states), f64::NEG_INFINITY),
            log_beta: Array2::zeros((max_len, n_states)),
            log_emission: Array2::from_elem((max_len, n_states), f64::NEG_INFINITY),
            backpointers: Array2::zeros((max_len, n_states)),
        }
    }

    /// Grow to at least `max_len` rows for `n_states` columns.
    pub fn reserve(&mut self, max_len: usize, n_states: usize) {
        if self.capacity() < max_len || self.n_states() != n_states {
            *self = Self::with_capacity(max_len.max(self.capacity()), n_states);
        }
    }

    pub fn capacity(&self) -> usize {
        self.log_alpha.nrows()
    }

    pub fn n_states(&self) -> usize {
        self.log_alpha.ncols()
    }

    /// Views over rows `0..len`. `len` must not exceed [`Self::capacity`].
    pub fn split(&mut self, len: usize) -> TableViews<'_> {
        TableViews {
            log_alpha: self.log_alpha.slice_mut(s![..len, ..]),
            log_beta: self.log_beta.slice_mut(s![..len, ..]),
            log_emission: self.log_emission.slice_mut(s![..len, ..]),
            backpointers: self.backpointers.slice_mut(s![..len, ..]),
        }
    }
}
