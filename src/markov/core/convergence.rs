//! Convergence tracking for iterative learners.
//!
//! Purpose
//! -------
//! Decide when an EM-style loop should stop, from the stream of objective
//! values it produces. Baum-Welch, Viterbi learning and the inner mixture EM
//! all share this one rule.
//!
//! Key behaviors
//! -------------
//! - [`ConvergenceMonitor::update`] records a new objective and reports
//!   whether the loop is done.
//! - Stops when the iteration cap is reached (`max_iterations > 0`), or when
//!   `tolerance > 0` and the change between the last two objectives is within
//!   tolerance under the chosen [`ConvergenceCriterion`].
//! - [`ConvergenceMonitor::has_diverged`] flags a NaN objective.
//!
//! Invariants & assumptions
//! ------------------------
//! - The tolerance test needs two values; a single objective never converges
//!   on tolerance alone.
//! - With `tolerance == 0` and `max_iterations == 0` the monitor never
//!   reports convergence. Callers that allow this must stop the loop some
//!   other way (a cancellation token). [`ConvergenceMonitor::is_unbounded`]
//!   exposes the condition so it can be logged.
//! - `iterations` counts objective evaluations. A cap of `k` therefore allows
//!   `k` evaluations and `k - 1` parameter updates.
use std::str::FromStr;

use crate::markov::errors::{HMMError, HMMResult};

/// How the change between successive objectives is compared to `tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvergenceCriterion {
    /// `|current - previous| <= tolerance · |current|`.
    #[default]
    Relative,
    /// `|current - previous| <= tolerance`.
    Absolute,
}

impl FromStr for ConvergenceCriterion {
    type Err = HMMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relative" => Ok(ConvergenceCriterion::Relative),
            "absolute" => Ok(ConvergenceCriterion::Absolute),
            _ => Err(HMMError::InvalidOptionName {
                option: "convergence criterion",
                name: s.to_string(),
            }),
        }
    }
}

/// Tracks successive objective values of an iterative learner and decides
/// when to stop.
///
/// Invariants
/// ----------
/// - The tolerance test needs two values and a positive tolerance.
/// - `max_iterations == 0` means no cap; with `tolerance == 0` as well the
///   monitor never reports convergence.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceMonitor {
    tolerance: f64,
    max_iterations: usize,
    criterion: ConvergenceCriterion,
    previous: Option<f64>,
    current: Option<f64>,
    iterations: usize,
}

impl ConvergenceMonitor {
    /// Fresh monitor with no recorded values.
    ///
    /// # Errors
    /// [`HMMError::InvalidTolerance`] when `tolerance` is negative or not
    /// finite.
    pub fn new(
        tolerance: f64, max_iterations: usize, criterion: ConvergenceCriterion,
    ) -> HMMResult<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(HMMError::InvalidTolerance {
                value: tolerance,
                reason: "tolerance must be finite and non-negative",
            });
        }
        Ok(Self {
            tolerance,
            max_iterations,
            criterion,
            previous: None,
            current: None,
            iterations: 0,
        })
    }

    /// Record `value` and return whether the loop should stop.
    pub fn update(&mut self, value: f64) -> bool {
        self.previous = self.current;
        self.current = Some(value);
        self.iterations += 1;
        self.has_converged()
    }

    pub fn has_converged(&self) -> bool {
        self.reached_cap() || self.reached_tolerance()
    }

    /// True when the last recorded objective is NaN.
    pub fn has_diverged(&self) -> bool {
        self.current.is_some_and(f64::is_nan)
    }

    pub fn reached_cap(&self) -> bool {
        self.max_iterations > 0 && self.iterations >= self.max_iterations
    }

    /// The tolerance test alone, ignoring the cap.
    pub fn reached_tolerance(&self) -> bool {
        if self.tolerance <= 0.0 {
            return false;
        }
        let (Some(prev), Some(cur)) = (self.previous, self.current) else {
            return false;
        };
        if prev == cur {
            return true;
        }
        let delta = (cur - prev).abs();
        match self.criterion {
            ConvergenceCriterion::Relative => delta <= self.tolerance * cur.abs(),
            ConvergenceCriterion::Absolute => delta <= self.tolerance,
        }
    }

    /// Neither a tolerance nor a cap is set.
    pub fn is_unbounded(&self) -> bool {
        self.tolerance == 0.0 && self.max_iterations == 0
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    /// Change between the last two objectives, if there are two.
    pub fn delta(&self) -> Option<f64> {
        Some(self.current? - self.previous?)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Forget recorded objectives; tolerance and cap are kept.
    pub fn clear(&mut self) {
        self.previous = None;
        self.current = None;
        self.iterations = 0;
    }
}
