//! Training progress logging.
//!
//! [`TrainingLogger`] filters messages by [`Verbosity`] and forwards them to
//! the `log` facade. The library never installs a logger; binaries and tests
//! choose their own backend.

use serde::{Deserialize, Serialize};

/// Verbosity level of training output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Warnings only.
    #[default]
    Warning,
    /// Progress: one line per boosting round plus start/finish summaries.
    Info,
    /// Everything, including per-output selection details.
    Debug,
}

/// Verbosity-filtered logger for the boosting loop.
#[derive(Debug, Clone, Copy)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::Silent && self.verbosity >= level
    }

    pub fn warn(&self, msg: &str) {
        if self.enabled(Verbosity::Warning) {
            log::warn!("{msg}");
        }
    }

    pub fn info(&self, msg: &str) {
        if self.enabled(Verbosity::Info) {
            log::info!("{msg}");
        }
    }

    pub fn debug(&self, msg: &str) {
        if self.enabled(Verbosity::Debug) {
            log::debug!("{msg}");
        }
    }

    /// Announce a training pass.
    pub fn start_training(&self, n_rounds: usize, n_samples: usize, n_features: usize) {
        self.info(&format!(
            "Starting training: {n_rounds} rounds, {n_samples} samples, {n_features} features"
        ));
    }

    /// Log the metrics of one boosting round on a single line.
    pub fn log_round(&self, round: usize, metrics: &[(String, f64)]) {
        if !self.enabled(Verbosity::Info) {
            return;
        }
        let parts: Vec<String> = metrics
            .iter()
            .map(|(name, value)| format!("{name}={value:.6}"))
            .collect();
        log::info!("[{round}] {}", parts.join(" "));
    }

    /// Summarize a finished training pass.
    pub fn finish_training(&self, rounds: usize) {
        self.info(&format!("Training complete: {rounds} rounds"));
    }
}
