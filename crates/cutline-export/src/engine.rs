//! Collaborators an export is delegated to.

use cutline_core::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::request::{CutJob, TransformRequest};

/// Terminal result of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Success { output: PathBuf },
    Failure { message: String },
}

impl ExportOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Progress as reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Unavailable,
    /// Completed fraction in `0.0..=1.0`.
    Fraction(f32),
}

impl Progress {
    /// `-1.0` when unavailable, else the fraction.
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Unavailable => -1.0,
            Self::Fraction(f) => f.clamp(0.0, 1.0),
        }
    }
}

/// Receives the terminal outcome of an export, exactly once.
pub trait ExportListener: Send + Sync {
    fn on_finished(&self, outcome: ExportOutcome);
}

impl ExportListener for crossbeam_channel::Sender<ExportOutcome> {
    fn on_finished(&self, outcome: ExportOutcome) {
        let _ = self.send(outcome);
    }
}

/// Transcoding engine that applies filters and re-encodes.
///
/// Runs asynchronously: `start` returns once the job is launched and the
/// outcome arrives through the listener.
pub trait TransformEngine: Send + Sync {
    fn start(&self, request: TransformRequest, listener: Arc<dyn ExportListener>) -> Result<()>;

    fn progress(&self) -> Progress;

    /// Request the running job to stop. A no-op when idle.
    fn cancel(&self);
}

/// Stream-copy cutter. Runs to completion on the calling thread.
pub trait RemuxEngine: Send + Sync {
    /// Cut `job.trim` out of `job.source` into `job.output`.
    fn cut(&self, job: &CutJob, cancel: &CancelToken) -> Result<()>;
}

/// Handle for cancelling an in-progress export.
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
