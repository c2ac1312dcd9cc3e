//! Export orchestration.
//!
//! An export runs in the background. The caller polls [`Exporter::progress`]
//! at a fixed cadence and receives the terminal outcome once through its
//! [`ExportListener`].

use cutline_core::{CutlineError, Result, Trim};
use cutline_session::EditSession;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

use crate::engine::{
    CancelToken, ExportListener, ExportOutcome, RemuxEngine, TransformEngine,
};
use crate::request::{CutJob, TransformRequest};
use crate::settings::ExportSettings;

/// Lifecycle of a lossless cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemuxState {
    Created,
    Running,
    Completed,
    Failed,
}

impl RemuxState {
    fn progress(self) -> f32 {
        match self {
            Self::Created => 0.0,
            Self::Running => 0.5,
            Self::Completed => 1.0,
            Self::Failed => -1.0,
        }
    }
}

enum ActiveExport {
    Transform,
    Remux(Arc<Mutex<RemuxState>>),
}

/// Forwards the first outcome to the caller and records it.
struct OnceListener {
    inner: Box<dyn ExportListener>,
    slot: Arc<Mutex<Option<ExportOutcome>>>,
}

impl ExportListener for OnceListener {
    fn on_finished(&self, outcome: ExportOutcome) {
        {
            let mut slot = self.slot.lock();
            if slot.is_some() {
                return;
            }
            *slot = Some(outcome.clone());
        }
        match &outcome {
            ExportOutcome::Success { output } => {
                info!(output = %output.display(), "Export finished")
            }
            ExportOutcome::Failure { message } => warn!(%message, "Export failed"),
        }
        self.inner.on_finished(outcome);
    }
}

/// Drives one export at a time through a transform or remux engine.
pub struct Exporter {
    transform: Arc<dyn TransformEngine>,
    remux: Arc<dyn RemuxEngine>,
    active: Option<ActiveExport>,
    cancel: CancelToken,
    outcome: Arc<Mutex<Option<ExportOutcome>>>,
    worker: Option<JoinHandle<()>>,
}

impl Exporter {
    pub fn new(transform: Arc<dyn TransformEngine>, remux: Arc<dyn RemuxEngine>) -> Self {
        Self {
            transform,
            remux,
            active: None,
            cancel: CancelToken::new(),
            outcome: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    /// Start exporting `session` with `settings`.
    ///
    /// Errors returned here mean nothing was started and the exporter is left
    /// idle. Once started, failures arrive through `listener`.
    pub fn export(
        &mut self,
        session: &EditSession,
        settings: ExportSettings,
        listener: impl ExportListener + 'static,
    ) -> Result<()> {
        if self.is_running() {
            return Err(CutlineError::Busy);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.active = None;
        self.cancel = CancelToken::new();
        *self.outcome.lock() = None;

        settings.validate()?;
        let cut_job = if settings.lossless_cut {
            Some(lossless_job(session, &settings)?)
        } else {
            None
        };
        prepare_output(&settings.output_path)?;

        let listener: Arc<dyn ExportListener> = Arc::new(OnceListener {
            inner: Box::new(listener),
            slot: self.outcome.clone(),
        });

        info!(
            source = %session.source(),
            output = %settings.output_path.display(),
            lossless = settings.lossless_cut,
            "Starting export"
        );

        match cut_job {
            Some(job) => self.start_lossless(job, listener),
            None => {
                self.start_transform(session, &settings, listener);
                Ok(())
            }
        }
    }

    fn start_lossless(&mut self, job: CutJob, listener: Arc<dyn ExportListener>) -> Result<()> {
        let state = Arc::new(Mutex::new(RemuxState::Created));
        let engine = self.remux.clone();
        let cancel = self.cancel.clone();
        let worker_state = state.clone();

        let handle = std::thread::Builder::new()
            .name("cutline-remux".into())
            .spawn(move || {
                let outcome = run_lossless_cut(engine.as_ref(), job, &cancel, &worker_state);
                listener.on_finished(outcome);
            })?;

        self.worker = Some(handle);
        self.active = Some(ActiveExport::Remux(state));
        Ok(())
    }

    fn start_transform(
        &mut self,
        session: &EditSession,
        settings: &ExportSettings,
        listener: Arc<dyn ExportListener>,
    ) {
        let request = TransformRequest::from_session(session, settings);
        self.active = Some(ActiveExport::Transform);
        if let Err(e) = self.transform.start(request, listener.clone()) {
            listener.on_finished(ExportOutcome::failure(e.to_string()));
        }
    }

    /// Stop whatever is running. Safe to call at any time.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.transform.cancel();
    }

    /// `-1.0` when nothing is exporting or progress is unknown, else `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        match self.outcome.lock().as_ref() {
            Some(ExportOutcome::Success { .. }) => return 1.0,
            Some(ExportOutcome::Failure { .. }) => return -1.0,
            None => {}
        }
        match &self.active {
            None => -1.0,
            Some(ActiveExport::Remux(state)) => state.lock().progress(),
            Some(ActiveExport::Transform) => self.transform.progress().as_f32(),
        }
    }

    /// The terminal outcome of the last export, once known.
    pub fn outcome(&self) -> Option<ExportOutcome> {
        self.outcome.lock().clone()
    }

    /// Whether an export was started and has not finished yet.
    pub fn is_running(&self) -> bool {
        self.active.is_some() && self.outcome.lock().is_none()
    }
}

impl Drop for Exporter {
    fn drop(&mut self) {
        if self.is_running() {
            self.cancel();
        }
    }
}

/// The cut covers the merged trim, else the whole source when its duration
/// is known.
fn lossless_job(session: &EditSession, settings: &ExportSettings) -> Result<CutJob> {
    let trim = match session.merged_trim() {
        Some(trim) => trim,
        None => match session.source_duration_ms() {
            Some(duration) => Trim::new(0, duration)?,
            None => {
                return Err(CutlineError::InvalidParameter(
                    "Lossless cut needs a trim range or a known source duration".into(),
                ))
            }
        },
    };

    Ok(CutJob {
        source: session.source().to_string(),
        trim,
        output: settings.output_path.clone(),
        reencode_audio: false,
    })
}

fn prepare_output(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn output_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Run a lossless cut with a single audio re-encode fallback.
///
/// An attempt counts as failed when the engine errors or the output is
/// missing or empty. The first failure retries once with
/// `reencode_audio = true`; a second failure is terminal.
pub(crate) fn run_lossless_cut(
    engine: &dyn RemuxEngine,
    mut job: CutJob,
    cancel: &CancelToken,
    state: &Mutex<RemuxState>,
) -> ExportOutcome {
    *state.lock() = RemuxState::Running;

    loop {
        let attempt = engine.cut(&job, cancel);

        if cancel.is_cancelled() {
            *state.lock() = RemuxState::Failed;
            return ExportOutcome::failure(CutlineError::Cancelled.to_string());
        }

        let reason = match attempt {
            Ok(()) if output_len(&job.output) > 0 => {
                *state.lock() = RemuxState::Completed;
                return ExportOutcome::Success { output: job.output };
            }
            Ok(()) => "output is empty".to_string(),
            Err(e) => e.to_string(),
        };

        if job.reencode_audio {
            *state.lock() = RemuxState::Failed;
            return ExportOutcome::failure(format!("Lossless cut failed: {}", reason));
        }

        warn!(%reason, trim = %job.trim, "Lossless cut failed, retrying with audio re-encode");
        job.reencode_audio = true;
    }
}
