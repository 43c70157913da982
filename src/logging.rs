//! Terminal progress logging behind the `obs_slog` feature.
//!
//! Learners and the L-BFGS runner only log when their options carry
//! `verbose = true`. Records go through an async drain so the numeric loops
//! never block on the terminal.
use slog::{Drain, Logger, o};

/// A fresh root logger writing compact records to stderr.
pub fn terminal_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("crate" => "rust_hmm"))
}
