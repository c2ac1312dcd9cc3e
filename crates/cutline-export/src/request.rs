//! Translating a session plus export settings into engine jobs.

use cutline_core::{FilterSpec, Trim, VideoEffect};
use cutline_session::EditSession;
use std::path::PathBuf;

use crate::settings::{AudioCodec, ExportSettings, HdrMode, VideoCodec};

/// Video filters for an export: the session effects, then the speed change,
/// then the frame drop.
pub fn export_filters(session: &EditSession, settings: &ExportSettings) -> Vec<FilterSpec> {
    let mut filters = session.effect_filters().to_vec();
    if settings.speed > 0.0 {
        filters.push(VideoEffect::SpeedChange { speed: settings.speed }.build());
    }
    if settings.framerate > 0.0 {
        filters.push(
            VideoEffect::FrameDrop {
                target_fps: settings.framerate,
            }
            .build(),
        );
    }
    filters
}

/// `atempo` chain matching a playback speed change.
///
/// A single `atempo` stage accepts 0.5..=2.0, so larger factors are split.
pub fn tempo_filters(speed: f32) -> Vec<FilterSpec> {
    let mut filters = Vec::new();
    if speed <= 0.0 || speed == 1.0 {
        return filters;
    }
    let mut remaining = speed;
    while remaining > 2.0 {
        filters.push(FilterSpec::new("atempo").arg("2"));
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        filters.push(FilterSpec::new("atempo").arg("0.5"));
        remaining /= 0.5;
    }
    filters.push(FilterSpec::new("atempo").arg(remaining.to_string()));
    filters
}

/// Everything the transform engine needs. Built once per export; holds no
/// reference to the live session.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub source: String,
    pub clip: Option<Trim>,
    pub video_filters: Vec<FilterSpec>,
    pub audio_filters: Vec<FilterSpec>,
    pub remove_audio: bool,
    pub remove_video: bool,
    pub hdr_mode: HdrMode,
    pub audio_codec: Option<AudioCodec>,
    pub video_codec: Option<VideoCodec>,
    pub output: PathBuf,
    /// Expected output duration, used to turn timestamps into progress.
    pub expected_duration_ms: Option<i64>,
}

impl TransformRequest {
    pub fn from_session(session: &EditSession, settings: &ExportSettings) -> Self {
        let clip = session.merged_trim();
        let mut audio_filters = session.audio_filters();
        audio_filters.extend(tempo_filters(settings.speed));

        let input_duration = clip
            .map(Trim::duration_ms)
            .or_else(|| session.source_duration_ms());
        let expected_duration_ms = input_duration.map(|ms| {
            if settings.speed > 0.0 {
                (ms as f64 / f64::from(settings.speed)).round() as i64
            } else {
                ms
            }
        });

        Self {
            source: session.source().to_string(),
            clip,
            video_filters: export_filters(session, settings),
            audio_filters,
            remove_audio: !settings.tracks.exports_audio(),
            remove_video: !settings.tracks.exports_video(),
            hdr_mode: settings.hdr_mode,
            audio_codec: settings.audio_codec,
            video_codec: settings.video_codec,
            output: settings.output_path.clone(),
            expected_duration_ms,
        }
    }
}

/// One lossless cut attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutJob {
    pub source: String,
    pub trim: Trim,
    pub output: PathBuf,
    /// Re-encode audio to AAC instead of copying the stream.
    pub reencode_audio: bool,
}
