//! FFmpeg-backed engines.
//!
//! Both engines run the `ffmpeg` binary through ffmpeg-sidecar and watch its
//! event stream for progress, errors, and cancellation.

use cutline_core::{filter_chain, local_path, CutlineError, FilterSpec, Result};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::{
    CancelToken, ExportListener, ExportOutcome, Progress, RemuxEngine, TransformEngine,
};
use crate::request::{CutJob, TransformRequest};
use crate::settings::HdrMode;

// ── Argument builders ───────────────────────────────────────────

/// Input argument for a source reference.
fn ffmpeg_input(source: &str) -> String {
    local_path(source)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

/// Filters that implement an HDR mode ahead of the user filters.
pub fn hdr_filters(mode: HdrMode) -> Vec<FilterSpec> {
    match mode {
        HdrMode::KeepHdr | HdrMode::HdrAsSdr => Vec::new(),
        HdrMode::ToneMapSoftware => vec![
            FilterSpec::new("zscale").arg("t=linear").arg("npl=100"),
            FilterSpec::new("format").arg("gbrpf32le"),
            FilterSpec::new("zscale").arg("p=bt709"),
            FilterSpec::new("tonemap").arg("tonemap=hable").arg("desat=0"),
            FilterSpec::new("zscale").arg("t=bt709").arg("m=bt709").arg("r=tv"),
            FilterSpec::new("format").arg("yuv420p"),
        ],
        HdrMode::ToneMapShader => vec![FilterSpec::new("libplacebo")
            .arg("tonemapping=auto")
            .arg("colorspace=bt709")
            .arg("color_primaries=bt709")
            .arg("color_trc=bt709")
            .arg("format=yuv420p")],
    }
}

/// Arguments for a stream-copy cut.
pub fn cut_args(job: &CutJob) -> Vec<String> {
    let audio_codec = if job.reencode_audio { "aac" } else { "copy" };
    vec![
        "-i".into(),
        ffmpeg_input(&job.source),
        "-ss".into(),
        format!("{}ms", job.trim.start_ms),
        "-to".into(),
        format!("{}ms", job.trim.end_ms),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        audio_codec.into(),
        job.output.to_string_lossy().into_owned(),
    ]
}

/// Arguments for a filtered transcode.
pub fn transform_args(request: &TransformRequest) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    if let Some(clip) = request.clip {
        args.extend([
            "-ss".into(),
            format!("{}ms", clip.start_ms),
            "-to".into(),
            format!("{}ms", clip.end_ms),
        ]);
    }
    args.extend(["-i".into(), ffmpeg_input(&request.source)]);

    if request.remove_video {
        args.push("-vn".into());
    } else {
        let mut filters = hdr_filters(request.hdr_mode);
        filters.extend(request.video_filters.iter().cloned());
        if let Some(chain) = filter_chain(&filters) {
            args.extend(["-vf".into(), chain]);
        }
        match request.video_codec {
            Some(codec) => args.extend(["-c:v".into(), codec.ffmpeg_encoder().into()]),
            None if filters.is_empty() => args.extend(["-c:v".into(), "copy".into()]),
            None => {}
        }
        if request.hdr_mode == HdrMode::HdrAsSdr {
            for flag in ["-color_primaries", "-color_trc", "-colorspace"] {
                args.extend([flag.into(), "bt709".into()]);
            }
        }
    }

    if request.remove_audio {
        args.push("-an".into());
    } else {
        if let Some(chain) = filter_chain(&request.audio_filters) {
            args.extend(["-af".into(), chain]);
        }
        match request.audio_codec {
            Some(codec) => args.extend(["-c:a".into(), codec.ffmpeg_encoder().into()]),
            None if request.audio_filters.is_empty() => {
                args.extend(["-c:a".into(), "copy".into()])
            }
            None => {}
        }
    }

    args.push(request.output.to_string_lossy().into_owned());
    args
}

/// Parse an ffmpeg `HH:MM:SS.xx` timestamp into milliseconds.
pub(crate) fn parse_timestamp_ms(time: &str) -> Option<i64> {
    let mut parts = time.trim().split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(((hours * 3600.0 + minutes * 60.0 + seconds) * 1000.0).round() as i64)
}

// ── Process plumbing ────────────────────────────────────────────

fn ensure_binary(binary: &Path) -> Result<()> {
    which::which(binary).map(|_| ()).map_err(|e| {
        CutlineError::Encoder(format!("ffmpeg not found ({}): {}", binary.display(), e))
    })
}

fn ensure_source(source: &str) -> Result<()> {
    match local_path(source) {
        Some(path) if !path.exists() => Err(CutlineError::SourceUnavailable(format!(
            "Cannot read {}",
            path.display()
        ))),
        _ => Ok(()),
    }
}

/// Run ffmpeg to completion, forwarding every event to `on_event`.
fn run_ffmpeg(
    binary: &Path,
    args: &[String],
    cancel: &CancelToken,
    mut on_event: impl FnMut(&FfmpegEvent),
) -> Result<()> {
    debug!(binary = %binary.display(), args = ?args, "Spawning ffmpeg");

    let mut child = FfmpegCommand::new_with_path(binary)
        .hide_banner()
        .overwrite()
        .args(args)
        .spawn()
        .map_err(|e| CutlineError::Encoder(format!("Failed to spawn ffmpeg: {}", e)))?;

    let events = child
        .iter()
        .map_err(|e| CutlineError::Encoder(format!("Failed to read ffmpeg output: {}", e)))?;

    let mut last_error: Option<String> = None;
    for event in events {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CutlineError::Cancelled);
        }
        match &event {
            FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message)
            | FfmpegEvent::Error(message) => last_error = Some(message.clone()),
            _ => {}
        }
        on_event(&event);
    }

    let status = child
        .wait()
        .map_err(|e| CutlineError::Encoder(format!("Failed to wait for ffmpeg: {}", e)))?;

    if cancel.is_cancelled() {
        return Err(CutlineError::Cancelled);
    }
    if !status.success() {
        return Err(CutlineError::Encoder(last_error.unwrap_or_else(|| {
            format!("ffmpeg exited with status: {}", status)
        })));
    }
    Ok(())
}

fn default_binary() -> PathBuf {
    ffmpeg_sidecar::paths::ffmpeg_path()
}

// ── Remuxer ─────────────────────────────────────────────────────

/// Lossless cutter using `-c:v copy`.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    binary: PathBuf,
}

impl FfmpegRemuxer {
    pub fn new() -> Self {
        Self::with_binary(default_binary())
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegRemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl RemuxEngine for FfmpegRemuxer {
    fn cut(&self, job: &CutJob, cancel: &CancelToken) -> Result<()> {
        ensure_binary(&self.binary)?;
        ensure_source(&job.source)?;
        info!(
            trim = %job.trim,
            reencode_audio = job.reencode_audio,
            output = %job.output.display(),
            "Running lossless cut"
        );
        run_ffmpeg(&self.binary, &cut_args(job), cancel, |_| {})
    }
}

// ── Transformer ─────────────────────────────────────────────────

#[derive(Debug)]
struct TransformState {
    running: bool,
    progress: Progress,
    cancel: CancelToken,
}

/// Filtering transcoder running on a background thread.
#[derive(Debug, Clone)]
pub struct FfmpegTransformer {
    binary: PathBuf,
    state: Arc<Mutex<TransformState>>,
}

impl FfmpegTransformer {
    pub fn new() -> Self {
        Self::with_binary(default_binary())
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            state: Arc::new(Mutex::new(TransformState {
                running: false,
                progress: Progress::Unavailable,
                cancel: CancelToken::new(),
            })),
        }
    }
}

impl Default for FfmpegTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformEngine for FfmpegTransformer {
    fn start(&self, request: TransformRequest, listener: Arc<dyn ExportListener>) -> Result<()> {
        let mut state = self.state.lock();
        if state.running {
            return Err(CutlineError::Busy);
        }
        ensure_binary(&self.binary)?;
        ensure_source(&request.source)?;

        let args = transform_args(&request);
        let cancel = CancelToken::new();
        state.running = true;
        state.cancel = cancel.clone();
        state.progress = if request.expected_duration_ms.is_some() {
            Progress::Fraction(0.0)
        } else {
            Progress::Unavailable
        };
        drop(state);

        let binary = self.binary.clone();
        let shared = self.state.clone();
        let output = request.output.clone();
        let mut total_ms = request.expected_duration_ms;

        let spawned = std::thread::Builder::new()
            .name("cutline-transform".into())
            .spawn(move || {
                let result = run_ffmpeg(&binary, &args, &cancel, |event| match event {
                    FfmpegEvent::ParsedDuration(d) if total_ms.is_none() => {
                        total_ms = Some((d.duration * 1000.0).round() as i64);
                    }
                    FfmpegEvent::Progress(p) => {
                        if let (Some(total), Some(done)) = (total_ms, parse_timestamp_ms(&p.time)) {
                            if total > 0 {
                                let fraction = (done as f64 / total as f64).clamp(0.0, 1.0);
                                shared.lock().progress = Progress::Fraction(fraction as f32);
                            }
                        }
                    }
                    _ => {}
                });

                let outcome = {
                    let mut state = shared.lock();
                    state.running = false;
                    match result {
                        Ok(()) => {
                            state.progress = Progress::Fraction(1.0);
                            ExportOutcome::Success { output }
                        }
                        Err(e) => {
                            state.progress = Progress::Unavailable;
                            ExportOutcome::failure(e.to_string())
                        }
                    }
                };
                listener.on_finished(outcome);
            });

        if let Err(e) = spawned {
            self.state.lock().running = false;
            return Err(e.into());
        }
        Ok(())
    }

    fn progress(&self) -> Progress {
        self.state.lock().progress
    }

    fn cancel(&self) {
        let state = self.state.lock();
        if state.running {
            state.cancel.cancel();
        }
    }
}
