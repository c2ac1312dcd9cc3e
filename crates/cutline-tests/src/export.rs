//! Integration tests for export orchestration.
//!
//! Drives cutline-export's `Exporter` with scripted engines standing in for
//! FFmpeg.

use crossbeam_channel::{bounded, Receiver, Sender};
use cutline_core::{CutlineError, Result, Trim, VideoEffect};
use cutline_export::{
    CancelToken, CutJob, ExportListener, ExportOutcome, ExportSettings, Exporter, Progress,
    RemuxEngine, TrackSelection, TransformEngine, TransformRequest,
};
use cutline_session::EditSession;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

// ── Scripted engines ───────────────────────────────────────────

/// Writes `sizes[n]` bytes on attempt `n` and records each job.
struct ScriptedRemuxer {
    sizes: Vec<usize>,
    jobs: Mutex<Vec<CutJob>>,
}

impl ScriptedRemuxer {
    fn new(sizes: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            sizes: sizes.to_vec(),
            jobs: Mutex::new(Vec::new()),
        })
    }
}

impl RemuxEngine for ScriptedRemuxer {
    fn cut(&self, job: &CutJob, _cancel: &CancelToken) -> Result<()> {
        let mut jobs = self.jobs.lock();
        let size = self.sizes.get(jobs.len()).copied().unwrap_or(0);
        jobs.push(job.clone());
        std::fs::write(&job.output, vec![0u8; size])?;
        Ok(())
    }
}

/// Blocks until released through `gate`, then writes a non-empty output.
struct GatedRemuxer {
    gate: Receiver<()>,
}

impl RemuxEngine for GatedRemuxer {
    fn cut(&self, job: &CutJob, cancel: &CancelToken) -> Result<()> {
        while !cancel.is_cancelled() {
            if self.gate.recv_timeout(Duration::from_millis(5)).is_ok() {
                std::fs::write(&job.output, b"cut")?;
                return Ok(());
            }
        }
        Err(CutlineError::Cancelled)
    }
}

/// Transform engine whose progress and completion are driven by the test.
#[derive(Default)]
struct ManualTransformer {
    request: Mutex<Option<TransformRequest>>,
    listener: Mutex<Option<Arc<dyn ExportListener>>>,
    progress: Mutex<Option<f32>>,
    cancels: Mutex<usize>,
}

impl ManualTransformer {
    fn set_progress(&self, fraction: f32) {
        *self.progress.lock() = Some(fraction);
    }

    fn finish(&self, outcome: ExportOutcome) {
        if let Some(listener) = self.listener.lock().take() {
            listener.on_finished(outcome);
        }
    }
}

impl TransformEngine for ManualTransformer {
    fn start(&self, request: TransformRequest, listener: Arc<dyn ExportListener>) -> Result<()> {
        *self.request.lock() = Some(request);
        *self.listener.lock() = Some(listener);
        Ok(())
    }

    fn progress(&self) -> Progress {
        match *self.progress.lock() {
            Some(f) => Progress::Fraction(f),
            None => Progress::Unavailable,
        }
    }

    fn cancel(&self) {
        *self.cancels.lock() += 1;
        self.finish(ExportOutcome::failure(CutlineError::Cancelled.to_string()));
    }
}

fn channel() -> (Sender<ExportOutcome>, Receiver<ExportOutcome>) {
    bounded(1)
}

fn trimmed_session() -> EditSession {
    let mut session = EditSession::new("clips/match.mp4");
    session.add_effect(VideoEffect::Grayscale);
    session.add_trim(Trim::new(2000, 7000).unwrap()).unwrap();
    session
}

// ── Lossless cut ───────────────────────────────────────────────

#[test]
fn lossless_cut_succeeds_first_time() {
    let dir = tempfile::tempdir().unwrap();
    let remux = ScriptedRemuxer::new(&[64]);
    let mut exporter = Exporter::new(Arc::new(ManualTransformer::default()), remux.clone());

    let mut settings = ExportSettings::new(dir.path().join("nested/out.mp4"));
    settings.lossless_cut = true;
    let (tx, rx) = channel();
    exporter.export(&trimmed_session(), settings, tx).unwrap();

    let outcome = rx.recv_timeout(WAIT).unwrap();
    assert!(outcome.is_success());
    assert_eq!(exporter.progress(), 1.0);

    let jobs = remux.jobs.lock();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].trim, Trim::new(2000, 7000).unwrap());
    assert!(!jobs[0].reencode_audio);
}

#[test]
fn empty_output_retries_with_audio_reencode() {
    let dir = tempfile::tempdir().unwrap();
    let remux = ScriptedRemuxer::new(&[0, 64]);
    let mut exporter = Exporter::new(Arc::new(ManualTransformer::default()), remux.clone());

    let mut settings = ExportSettings::new(dir.path().join("out.mp4"));
    settings.lossless_cut = true;
    let (tx, rx) = channel();
    exporter.export(&trimmed_session(), settings, tx).unwrap();

    assert!(rx.recv_timeout(WAIT).unwrap().is_success());
    let flags: Vec<_> = remux.jobs.lock().iter().map(|j| j.reencode_audio).collect();
    assert_eq!(flags, [false, true]);
}

#[test]
fn second_empty_output_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let remux = ScriptedRemuxer::new(&[0, 0, 64]);
    let mut exporter = Exporter::new(Arc::new(ManualTransformer::default()), remux.clone());

    let mut settings = ExportSettings::new(dir.path().join("out.mp4"));
    settings.lossless_cut = true;
    let (tx, rx) = channel();
    exporter.export(&trimmed_session(), settings, tx).unwrap();

    match rx.recv_timeout(WAIT).unwrap() {
        ExportOutcome::Failure { message } => assert!(message.starts_with("Lossless cut failed")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(remux.jobs.lock().len(), 2);
    assert_eq!(exporter.progress(), -1.0);
}

#[test]
fn lossless_cut_without_range_uses_source_duration() {
    let dir = tempfile::tempdir().unwrap();
    let remux = ScriptedRemuxer::new(&[64]);
    let mut exporter = Exporter::new(Arc::new(ManualTransformer::default()), remux.clone());

    let mut settings = ExportSettings::new(dir.path().join("out.mp4"));
    settings.lossless_cut = true;

    let session = EditSession::new("clips/match.mp4");
    let (tx, _rx) = channel();
    assert!(matches!(
        exporter.export(&session, settings.clone(), tx),
        Err(CutlineError::InvalidParameter(_))
    ));

    let mut session = EditSession::new("clips/match.mp4");
    session.set_source_duration_ms(9000);
    let (tx, rx) = channel();
    exporter.export(&session, settings, tx).unwrap();
    assert!(rx.recv_timeout(WAIT).unwrap().is_success());
    assert_eq!(remux.jobs.lock()[0].trim, Trim::new(0, 9000).unwrap());
}

#[test]
fn rejected_export_leaves_exporter_idle() {
    let dir = tempfile::tempdir().unwrap();
    let remux = ScriptedRemuxer::new(&[64, 64]);
    let mut exporter = Exporter::new(Arc::new(ManualTransformer::default()), remux.clone());

    let mut settings = ExportSettings::new(dir.path().join("out.mp4"));
    settings.lossless_cut = true;

    let (tx, rx) = channel();
    exporter.export(&trimmed_session(), settings.clone(), tx).unwrap();
    assert!(rx.recv_timeout(WAIT).unwrap().is_success());
    assert_eq!(exporter.progress(), 1.0);

    let (tx, _rx) = channel();
    assert!(matches!(
        exporter.export(&EditSession::new("clips/match.mp4"), settings.clone(), tx),
        Err(CutlineError::InvalidParameter(_))
    ));
    assert!(!exporter.is_running());
    assert_eq!(exporter.progress(), -1.0);

    let (tx, rx) = channel();
    exporter.export(&trimmed_session(), settings, tx).unwrap();
    assert!(rx.recv_timeout(WAIT).unwrap().is_success());
    assert_eq!(remux.jobs.lock().len(), 2);
}

#[test]
fn lossless_cut_reports_midway_progress_and_rejects_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let (release, gate) = bounded(1);
    let mut exporter = Exporter::new(
        Arc::new(ManualTransformer::default()),
        Arc::new(GatedRemuxer { gate }),
    );

    let mut settings = ExportSettings::new(dir.path().join("out.mp4"));
    settings.lossless_cut = true;
    let (tx, rx) = channel();
    exporter.export(&trimmed_session(), settings.clone(), tx).unwrap();

    assert!(exporter.is_running());
    let progress = exporter.progress();
    assert!(progress == 0.0 || progress == 0.5);

    let (tx2, _rx2) = channel();
    assert!(matches!(
        exporter.export(&trimmed_session(), settings, tx2),
        Err(CutlineError::Busy)
    ));

    release.send(()).unwrap();
    assert!(rx.recv_timeout(WAIT).unwrap().is_success());
    assert!(!exporter.is_running());
}

#[test]
fn cancelling_lossless_cut_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (_release, gate) = bounded(1);
    let mut exporter = Exporter::new(
        Arc::new(ManualTransformer::default()),
        Arc::new(GatedRemuxer { gate }),
    );

    let mut settings = ExportSettings::new(dir.path().join("out.mp4"));
    settings.lossless_cut = true;
    let (tx, rx) = channel();
    exporter.export(&trimmed_session(), settings, tx).unwrap();
    exporter.cancel();

    match rx.recv_timeout(WAIT).unwrap() {
        ExportOutcome::Failure { message } => assert_eq!(message, "Export cancelled"),
        other => panic!("expected failure, got {:?}", other),
    }
}

// ── Transform ──────────────────────────────────────────────────

#[test]
fn transform_progress_and_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let transform = Arc::new(ManualTransformer::default());
    let mut exporter = Exporter::new(transform.clone(), ScriptedRemuxer::new(&[]));

    let output = dir.path().join("out.mp4");
    let mut settings = ExportSettings::new(&output);
    settings.speed = 2.0;
    settings.framerate = 24.0;
    settings.tracks = TrackSelection::VideoOnly;
    let (tx, rx) = channel();
    exporter.export(&trimmed_session(), settings, tx).unwrap();

    {
        let request = transform.request.lock();
        let request = request.as_ref().unwrap();
        let names: Vec<_> = request.video_filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["hue", "setpts", "fps"]);
        assert!(request.remove_audio);
        assert_eq!(request.clip, Some(Trim::new(2000, 7000).unwrap()));
        assert_eq!(request.expected_duration_ms, Some(2500));
    }

    assert_eq!(exporter.progress(), -1.0);
    transform.set_progress(0.4);
    assert_eq!(exporter.progress(), 0.4);

    transform.finish(ExportOutcome::Success {
        output: output.clone(),
    });
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), ExportOutcome::Success { output });
    assert_eq!(exporter.progress(), 1.0);
    assert!(!exporter.is_running());
}

#[test]
fn transform_start_error_reaches_listener() {
    struct Unavailable;

    impl TransformEngine for Unavailable {
        fn start(&self, _: TransformRequest, _: Arc<dyn ExportListener>) -> Result<()> {
            Err(CutlineError::Encoder("no hevc encoder".into()))
        }

        fn progress(&self) -> Progress {
            Progress::Unavailable
        }

        fn cancel(&self) {}
    }

    let dir = tempfile::tempdir().unwrap();
    let mut exporter = Exporter::new(Arc::new(Unavailable), ScriptedRemuxer::new(&[]));
    let (tx, rx) = channel();
    exporter
        .export(&trimmed_session(), ExportSettings::new(dir.path().join("o.mp4")), tx)
        .unwrap();

    match rx.recv_timeout(WAIT).unwrap() {
        ExportOutcome::Failure { message } => assert!(message.contains("no hevc encoder")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn cancel_transform_notifies_once() {
    let dir = tempfile::tempdir().unwrap();
    let transform = Arc::new(ManualTransformer::default());
    let mut exporter = Exporter::new(transform.clone(), ScriptedRemuxer::new(&[]));

    let (tx, rx) = crossbeam_channel::unbounded();
    exporter
        .export(&trimmed_session(), ExportSettings::new(dir.path().join("o.mp4")), tx)
        .unwrap();
    exporter.cancel();
    exporter.cancel();

    assert!(!rx.recv_timeout(WAIT).unwrap().is_success());
    assert!(rx.try_recv().is_err());
    assert_eq!(*transform.cancels.lock(), 2);
}

#[test]
fn cancel_and_progress_when_idle() {
    let exporter = Exporter::new(
        Arc::new(ManualTransformer::default()),
        ScriptedRemuxer::new(&[]),
    );
    exporter.cancel();
    assert_eq!(exporter.progress(), -1.0);
    assert!(exporter.outcome().is_none());
    assert!(!exporter.is_running());
}
