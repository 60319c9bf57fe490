use serde::{Deserialize, Serialize};

/// Lifecycle of one preload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreloadPhase {
    Idle,
    Loading,
    Complete,
}

/// Observable progress of one preload run.
///
/// `loaded <= total` always holds. `is_complete` flips to true once and
/// stays there for the lifetime of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreloadState {
    pub loaded: usize,
    pub total: usize,
    pub is_complete: bool,
}

impl PreloadState {
    /// Nothing to do: reported immediately for an empty set or when disabled.
    pub fn finished_empty() -> Self {
        Self {
            loaded: 0,
            total: 0,
            is_complete: true,
        }
    }

    pub(crate) fn loading(total: usize) -> Self {
        Self {
            loaded: 0,
            total,
            is_complete: false,
        }
    }

    pub fn phase(&self) -> PreloadPhase {
        if self.is_complete {
            PreloadPhase::Complete
        } else if self.total == 0 {
            PreloadPhase::Idle
        } else {
            PreloadPhase::Loading
        }
    }

    /// Fraction settled, 0.0..=1.0. An empty finished run counts as 1.0.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return if self.is_complete { 1.0 } else { 0.0 };
        }
        self.loaded as f64 / self.total as f64
    }

    /// Count one settled load. Saturates at `total`.
    pub(crate) fn record_settled(&mut self) {
        if self.loaded < self.total {
            self.loaded += 1;
        }
    }

    /// Mark the run complete. Returns `false` if it already was.
    pub(crate) fn mark_complete(&mut self) -> bool {
        if self.is_complete {
            return false;
        }
        self.is_complete = true;
        true
    }
}

/// Summary of a finished preload run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadOutcome {
    pub success: bool,
    /// Paths that failed, in input order.
    pub failed_images: Vec<String>,
    pub total_images: usize,
}
