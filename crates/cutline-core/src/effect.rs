//! Video effects and audio processors.
//!
//! Effects are stored as plain tagged values so a session can be written to
//! disk and read back deterministically. The renderer never sees these types
//! directly: [`VideoEffect::build`] produces a fresh [`FilterSpec`] each time
//! it is called.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CutlineError, Result};

/// A single filter instance consumable by the render engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Filter name (ffmpeg filter graph syntax).
    pub name: String,
    /// Positional or `key=value` arguments, joined with `:`.
    pub args: Vec<String>,
}

impl FilterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}={}", self.name, self.args.join(":"))
        }
    }
}

/// Join filters into a linear filter chain (`a,b,c`).
pub fn filter_chain(filters: &[FilterSpec]) -> Option<String> {
    if filters.is_empty() {
        return None;
    }
    Some(
        filters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// A user-visible video effect.
///
/// Order matters: effects compose in the order they appear in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VideoEffect {
    Grayscale,
    InvertColors,
    /// Counter-clockwise rotation; the output frame grows to fit.
    Rotate { degrees: f32 },
    /// Crop window in normalized device coordinates (-1..1, y up).
    Crop {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
    },
    /// Playback speed multiplier, applied at export time.
    SpeedChange { speed: f32 },
    /// Drop frames down to a target rate, applied at export time.
    FrameDrop { target_fps: f32 },
}

impl VideoEffect {
    /// Validated crop constructor.
    pub fn crop(left: f32, right: f32, bottom: f32, top: f32) -> Result<Self> {
        let in_range = |v: f32| (-1.0..=1.0).contains(&v);
        if ![left, right, bottom, top].into_iter().all(in_range) {
            return Err(CutlineError::InvalidParameter(
                "Crop bounds must lie within -1..1".into(),
            ));
        }
        if left >= right || bottom >= top {
            return Err(CutlineError::InvalidParameter(format!(
                "Empty crop window: x {}..{}, y {}..{}",
                left, right, bottom, top
            )));
        }
        Ok(Self::Crop {
            left,
            right,
            bottom,
            top,
        })
    }

    /// Display name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Grayscale => "Grayscale",
            Self::InvertColors => "Invert colors",
            Self::Rotate { .. } => "Rotate",
            Self::Crop { .. } => "Crop",
            Self::SpeedChange { .. } => "Speed",
            Self::FrameDrop { .. } => "Frame rate",
        }
    }

    /// Icon reference understood by the front end.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Grayscale => "filter",
            Self::InvertColors => "invert_colors",
            Self::Rotate { .. } => "rotate_right",
            Self::Crop { .. } => "crop",
            Self::SpeedChange { .. } => "speed",
            Self::FrameDrop { .. } => "slow_motion_video",
        }
    }

    /// Produce a fresh render instance for this effect.
    pub fn build(&self) -> FilterSpec {
        match *self {
            Self::Grayscale => FilterSpec::new("hue").arg("s=0"),
            Self::InvertColors => FilterSpec::new("negate"),
            Self::Rotate { degrees } => {
                // ffmpeg rotates clockwise for positive angles
                let rad = format!("{:.6}", -f64::from(degrees).to_radians());
                FilterSpec::new("rotate")
                    .arg(format!("a={}", rad))
                    .arg(format!("ow=rotw({})", rad))
                    .arg(format!("oh=roth({})", rad))
            }
            Self::Crop {
                left,
                right,
                bottom,
                top,
            } => {
                let w = (right - left) / 2.0;
                let h = (top - bottom) / 2.0;
                let x = (left + 1.0) / 2.0;
                let y = (1.0 - top) / 2.0;
                FilterSpec::new("crop")
                    .arg(format!("w=iw*{}", w))
                    .arg(format!("h=ih*{}", h))
                    .arg(format!("x=iw*{}", x))
                    .arg(format!("y=ih*{}", y))
            }
            Self::SpeedChange { speed } => FilterSpec::new("setpts").arg(format!("PTS/{}", speed)),
            Self::FrameDrop { target_fps } => FilterSpec::new("fps").arg(target_fps.to_string()),
        }
    }
}

impl fmt::Display for VideoEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rotate { degrees } => write!(f, "{} {}°", self.label(), degrees),
            Self::SpeedChange { speed } => write!(f, "{} {}x", self.label(), speed),
            Self::FrameDrop { target_fps } => write!(f, "{} {} fps", self.label(), target_fps),
            _ => f.write_str(self.label()),
        }
    }
}

/// An audio processor carried through to export untouched by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioProcessor {
    Volume { gain_db: f32 },
    /// Mix all channels down to mono.
    Downmix,
}

impl AudioProcessor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Volume { .. } => "Volume",
            Self::Downmix => "Mono",
        }
    }

    pub fn build(&self) -> FilterSpec {
        match *self {
            Self::Volume { gain_db } => FilterSpec::new("volume").arg(format!("{}dB", gain_db)),
            Self::Downmix => FilterSpec::new("pan").arg("mono|c0=0.5*c0+0.5*c1"),
        }
    }
}
