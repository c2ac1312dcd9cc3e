//! Cutline Export - turning an edit session into an output file
//!
//! This crate handles:
//! - Export settings (tracks, HDR handling, codecs, speed, frame rate)
//! - Building transform requests and lossless cut jobs from a session
//! - Orchestrating the export with progress polling and cancellation
//! - FFmpeg-backed transform and remux engines

pub mod engine;
pub mod exporter;
pub mod ffmpeg;
pub mod request;
pub mod settings;

pub use engine::{
    CancelToken, ExportListener, ExportOutcome, Progress, RemuxEngine, TransformEngine,
};
pub use exporter::{Exporter, RemuxState};
pub use ffmpeg::{FfmpegRemuxer, FfmpegTransformer};
pub use request::{export_filters, CutJob, TransformRequest};
pub use settings::{
    parse_codec_choice, AudioCodec, ExportSettings, HdrMode, TrackSelection, VideoCodec,
};

use std::sync::Arc;

/// Exporter wired to the FFmpeg engines.
pub fn ffmpeg_exporter() -> Exporter {
    Exporter::new(
        Arc::new(FfmpegTransformer::new()),
        Arc::new(FfmpegRemuxer::new()),
    )
}

/// Exporter wired to the FFmpeg engines using a specific binary.
pub fn ffmpeg_exporter_with_binary(binary: impl Into<std::path::PathBuf>) -> Exporter {
    let binary = binary.into();
    Exporter::new(
        Arc::new(FfmpegTransformer::with_binary(binary.clone())),
        Arc::new(FfmpegRemuxer::with_binary(binary)),
    )
}
