//! Per-iteration progress records for the learners.
//!
//! With the `obs_slog` feature and `verbose = true`, every outer iteration
//! emits one `slog` record (learner, iteration, objective, delta) on the
//! terminal logger. Otherwise every call is a no-op.
use crate::markov::learning::LearningOutcome;

#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    #[cfg(feature = "obs_slog")]
    logger: Option<slog::Logger>,
    learner: &'static str,
}

impl ProgressLog {
    pub fn new(learner: &'static str, verbose: bool) -> Self {
        #[cfg(feature = "obs_slog")]
        {
            let logger = verbose.then(crate::logging::terminal_logger);
            Self { logger, learner }
        }
        #[cfg(not(feature = "obs_slog"))]
        {
            let _ = verbose;
            Self { learner }
        }
    }

    pub fn learner(&self) -> &'static str {
        self.learner
    }

    /// Warn that neither a tolerance nor a cap will stop the loop.
    pub fn unbounded(&self) {
        #[cfg(feature = "obs_slog")]
        if let Some(log) = &self.logger {
            slog::warn!(log, "unbounded training: tolerance and iteration cap are both zero";
                "learner" => self.learner);
        }
    }

    pub fn iteration(&self, iteration: usize, objective: f64, delta: Option<f64>) {
        #[cfg(feature = "obs_slog")]
        if let Some(log) = &self.logger {
            slog::info!(log, "iteration";
                "learner" => self.learner,
                "iter" => iteration,
                "loglik" => objective,
                "delta" => delta);
        }
        #[cfg(not(feature = "obs_slog"))]
        let _ = (iteration, objective, delta);
    }

    pub fn finish(&self, outcome: &LearningOutcome) {
        #[cfg(feature = "obs_slog")]
        if let Some(log) = &self.logger {
            slog::info!(log, "finished";
                "learner" => self.learner,
                "status" => format!("{:?}", outcome.status),
                "iterations" => outcome.iterations,
                "loglik" => outcome.log_likelihood);
        }
        #[cfg(not(feature = "obs_slog"))]
        let _ = outcome;
    }
}
