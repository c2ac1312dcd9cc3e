//! Export settings chosen in the export dialog.
//!
//! Every choice has a display label; `FromStr` parses those labels back so a
//! front end can round-trip the strings it shows.

use cutline_core::{CutlineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

// ── Tracks ──────────────────────────────────────────────────────

/// Which tracks end up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackSelection {
    #[default]
    VideoAndAudio,
    VideoOnly,
    AudioOnly,
}

impl TrackSelection {
    pub const ALL: [Self; 3] = [Self::VideoAndAudio, Self::VideoOnly, Self::AudioOnly];

    pub fn label(self) -> &'static str {
        match self {
            Self::VideoAndAudio => "Video and Audio",
            Self::VideoOnly => "Video only",
            Self::AudioOnly => "Audio only",
        }
    }

    pub fn exports_video(self) -> bool {
        !matches!(self, Self::AudioOnly)
    }

    pub fn exports_audio(self) -> bool {
        !matches!(self, Self::VideoOnly)
    }
}

// ── HDR ─────────────────────────────────────────────────────────

/// How HDR input is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HdrMode {
    #[default]
    KeepHdr,
    /// Tag the output as SDR without converting pixels.
    HdrAsSdr,
    /// Tone-map in the software filter pipeline.
    ToneMapSoftware,
    /// Tone-map with a GPU shader.
    ToneMapShader,
}

impl HdrMode {
    pub const ALL: [Self; 4] = [
        Self::KeepHdr,
        Self::HdrAsSdr,
        Self::ToneMapSoftware,
        Self::ToneMapShader,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::KeepHdr => "Keep HDR",
            Self::HdrAsSdr => "HDR as SDR",
            Self::ToneMapSoftware => "HDR to SDR (software)",
            Self::ToneMapShader => "HDR to SDR (shader)",
        }
    }
}

// ── Codecs ──────────────────────────────────────────────────────

/// Target video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    H265,
    Vp9,
    Av1,
}

impl VideoCodec {
    pub const ALL: [Self; 4] = [Self::H264, Self::H265, Self::Vp9, Self::Av1];

    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
            Self::Vp9 => "libvpx-vp9",
            Self::Av1 => "libaom-av1",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::H264 => "video/avc",
            Self::H265 => "video/hevc",
            Self::Vp9 => "video/x-vnd.on2.vp9",
            Self::Av1 => "video/av01",
        }
    }
}

/// Target audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodec {
    Aac,
    AmrNb,
    AmrWb,
    Opus,
}

impl AudioCodec {
    pub const ALL: [Self; 4] = [Self::Aac, Self::AmrNb, Self::AmrWb, Self::Opus];

    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::AmrNb => "libopencore_amrnb",
            Self::AmrWb => "libvo_amrwbenc",
            Self::Opus => "libopus",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Aac => "audio/mp4a-latm",
            Self::AmrNb => "audio/3gpp",
            Self::AmrWb => "audio/amr-wb",
            Self::Opus => "audio/opus",
        }
    }
}

/// Label shown for "keep the source codec".
pub const ORIGINAL_CODEC: &str = "Original";

fn parse_label<T: Copy>(s: &str, all: &[T], label: impl Fn(T) -> &'static str, what: &str) -> Result<T> {
    all.iter()
        .copied()
        .find(|v| label(*v).eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| CutlineError::InvalidParameter(format!("Unknown {} '{}'", what, s)))
}

impl FromStr for TrackSelection {
    type Err = CutlineError;
    fn from_str(s: &str) -> Result<Self> {
        parse_label(s, &Self::ALL, Self::label, "track selection")
    }
}

impl FromStr for HdrMode {
    type Err = CutlineError;
    fn from_str(s: &str) -> Result<Self> {
        parse_label(s, &Self::ALL, Self::label, "HDR mode")
    }
}

impl FromStr for VideoCodec {
    type Err = CutlineError;
    fn from_str(s: &str) -> Result<Self> {
        parse_label(s, &Self::ALL, Self::mime_type, "video codec")
    }
}

impl FromStr for AudioCodec {
    type Err = CutlineError;
    fn from_str(s: &str) -> Result<Self> {
        parse_label(s, &Self::ALL, Self::mime_type, "audio codec")
    }
}

/// Parse a codec dropdown value, mapping [`ORIGINAL_CODEC`] to `None`.
pub fn parse_codec_choice<T: FromStr<Err = CutlineError>>(s: &str) -> Result<Option<T>> {
    if s.trim().eq_ignore_ascii_case(ORIGINAL_CODEC) {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}

// ── Settings ────────────────────────────────────────────────────

/// Options for one export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub tracks: TrackSelection,
    pub hdr_mode: HdrMode,
    /// `None` keeps the source audio codec.
    pub audio_codec: Option<AudioCodec>,
    /// `None` keeps the source video codec.
    pub video_codec: Option<VideoCodec>,
    /// Target frame rate, 0 = unchanged.
    pub framerate: f32,
    /// Playback speed multiplier, 0 = unchanged.
    pub speed: f32,
    pub output_path: PathBuf,
    /// Cut by stream copy instead of transcoding.
    pub lossless_cut: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            tracks: TrackSelection::default(),
            hdr_mode: HdrMode::default(),
            audio_codec: None,
            video_codec: None,
            framerate: 0.0,
            speed: 0.0,
            output_path: PathBuf::new(),
            lossless_cut: false,
        }
    }
}

impl ExportSettings {
    /// Settings writing to `output_path` with every other option at its default.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Reject negative or non-finite speed/framerate.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("speed", self.speed), ("framerate", self.framerate)] {
            if !value.is_finite() || value < 0.0 {
                return Err(CutlineError::InvalidParameter(format!(
                    "Export {} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(CutlineError::InvalidParameter(
                "Export output path is empty".into(),
            ));
        }
        Ok(())
    }
}
