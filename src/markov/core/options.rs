//! Training options — configuration shared by every learner.
//!
//! Purpose
//! -------
//! Collect the knobs of a training call in one validated value, so learners
//! take `&TrainOptions` instead of loose flags.
//!
//! Key behaviors
//! -------------
//! - [`TrainOptions`] bundles the stopping rule (`tolerance`,
//!   `max_iterations`, `criterion`), Laplace smoothing for supervised
//!   fitting, the emission [`FittingOptions`], an optional
//!   [`CancellationToken`] and the `verbose` switch for progress logs.
//! - [`CancellationToken`] is a cloneable flag another thread can raise to
//!   stop training cooperatively; learners check it once per outer
//!   iteration.
//!
//! Invariants & assumptions
//! ------------------------
//! - `tolerance` is finite and non-negative; `TrainOptions::new` enforces it.
//! - Defaults are `tolerance = 0` and `max_iterations = 0`, which never
//!   converge on their own. Set at least one of them, or attach a
//!   cancellation token, before training.
//! - `use_laplace` defaults to `true` and only affects supervised fitting
//!   (and Viterbi learning, which calls it).
//!
//! Conventions
//! -----------
//! - `with_*` builders consume and return `Self`.
//! - `verbose` only emits records with the `obs_slog` feature enabled.
//!
//! Testing notes
//! -------------
//! - Validation and builder behavior are unit tested here; the effect of
//!   each option on training is tested with the learners.
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::markov::{
    core::convergence::{ConvergenceCriterion, ConvergenceMonitor},
    emissions::FittingOptions,
    errors::{HMMError, HMMResult},
};

/// Cooperative stop flag shared between a trainer and its controller.
///
/// Clones share the same flag. Raising it is sticky; build a new token for
/// the next run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl PartialEq for CancellationToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}

/// Options for Baum-Welch, Viterbi learning and supervised fitting.
///
/// Fields
/// ------
/// - `tolerance`: stop once successive objectives are this close (see
///   `criterion`). `0` disables the test.
/// - `max_iterations`: objective evaluations allowed. `0` means no cap.
/// - `criterion`: relative (default) or absolute tolerance test.
/// - `use_laplace`: add-one smoothing of counts in supervised fitting.
/// - `fitting`: passed unchanged to every emission `fit`.
/// - `cancel`: optional cooperative stop flag.
/// - `verbose`: per-iteration progress records (with `obs_slog`).
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub criterion: ConvergenceCriterion,
    pub use_laplace: bool,
    pub fitting: FittingOptions,
    pub cancel: Option<CancellationToken>,
    pub verbose: bool,
}

impl TrainOptions {
    /// # Errors
    /// [`HMMError::InvalidTolerance`] when `tolerance` is negative or not
    /// finite.
    pub fn new(tolerance: f64, max_iterations: usize) -> HMMResult<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(HMMError::InvalidTolerance {
                value: tolerance,
                reason: "tolerance must be finite and non-negative",
            });
        }
        Ok(Self { tolerance, max_iterations, ..Self::default() })
    }

    pub fn with_criterion(mut self, criterion: ConvergenceCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_laplace(mut self, use_laplace: bool) -> Self {
        self.use_laplace = use_laplace;
        self
    }

    pub fn with_fitting(mut self, fitting: FittingOptions) -> Self {
        self.fitting = fitting;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Fresh monitor for one training run.
    ///
    /// # Errors
    /// [`HMMError::InvalidTolerance`] if the public `tolerance` field was set
    /// to an invalid value after construction.
    pub fn monitor(&self) -> HMMResult<ConvergenceMonitor> {
        ConvergenceMonitor::new(self.tolerance, self.max_iterations, self.criterion)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            max_iterations: 0,
            criterion: ConvergenceCriterion::Relative,
            use_laplace: true,
            fitting: FittingOptions::default(),
            cancel: None,
            verbose: false,
        }
    }
}
