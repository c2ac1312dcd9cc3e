//! Built-in effect palette.
//!
//! One-tap effects carry no parameters. Dialog effects describe the text
//! fields the front end must collect before the effect can be instantiated.

use std::collections::HashMap;

use crate::effect::VideoEffect;
use crate::error::{CutlineError, Result};

/// Kind of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
}

/// Parameter descriptor for a dialog effect.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub key: &'static str,
    pub display_name: &'static str,
    pub kind: ParamKind,
    /// Suggested values offered in a dropdown.
    pub options: &'static [&'static str],
}

/// A palette entry the user can pick.
#[derive(Debug, Clone)]
pub struct EffectTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub params: Vec<ParamDescriptor>,
}

impl EffectTemplate {
    /// Whether the effect needs arguments before it can be applied.
    pub fn needs_dialog(&self) -> bool {
        !self.params.is_empty()
    }

    /// Build the effect from user-supplied arguments keyed by `ParamDescriptor::key`.
    pub fn instantiate(&self, args: &HashMap<String, String>) -> Result<VideoEffect> {
        let float = |key: &str| -> Result<f32> {
            let raw = args.get(key).ok_or_else(|| {
                CutlineError::InvalidParameter(format!("Missing argument '{}' for {}", key, self.id))
            })?;
            if let Some(message) = validate_float(raw) {
                return Err(CutlineError::InvalidParameter(format!("{}: {}", key, message)));
            }
            raw.trim()
                .parse::<f32>()
                .map_err(|e| CutlineError::InvalidParameter(format!("{}: {}", key, e)))
        };

        match self.id {
            "grayscale" => Ok(VideoEffect::Grayscale),
            "invert_colors" => Ok(VideoEffect::InvertColors),
            "rotate" => Ok(VideoEffect::Rotate {
                degrees: float("Degrees")?,
            }),
            "crop" => VideoEffect::crop(
                float("Left")?,
                float("Right")?,
                float("Bottom")?,
                float("Top")?,
            ),
            other => Err(CutlineError::NotFound(format!("Unknown effect '{}'", other))),
        }
    }
}

const ROTATION_OPTIONS: &[&str] = &["0", "90", "180", "270"];

fn float_param(key: &'static str, display_name: &'static str) -> ParamDescriptor {
    ParamDescriptor {
        key,
        display_name,
        kind: ParamKind::Float,
        options: &[],
    }
}

/// All built-in effects, in palette order.
pub fn catalog() -> Vec<EffectTemplate> {
    vec![
        EffectTemplate {
            id: "grayscale",
            label: "Grayscale",
            icon: "filter",
            params: Vec::new(),
        },
        EffectTemplate {
            id: "invert_colors",
            label: "Invert colors",
            icon: "invert_colors",
            params: Vec::new(),
        },
        EffectTemplate {
            id: "rotate",
            label: "Rotate",
            icon: "rotate_right",
            params: vec![ParamDescriptor {
                options: ROTATION_OPTIONS,
                ..float_param("Degrees", "Degrees")
            }],
        },
        EffectTemplate {
            id: "crop",
            label: "Crop",
            icon: "crop",
            params: vec![
                float_param("Left", "Left"),
                float_param("Right", "Right"),
                float_param("Bottom", "Bottom"),
                float_param("Top", "Top"),
            ],
        },
    ]
}

/// Look up a template by id.
pub fn find_template(id: &str) -> Option<EffectTemplate> {
    catalog().into_iter().find(|t| t.id == id)
}

/// Text-field validation: `None` if `input` is a finite float, else a message.
pub fn validate_float(input: &str) -> Option<String> {
    match input.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => None,
        Ok(_) => Some("Value must be finite".to_string()),
        Err(_) => Some(format!("'{}' is not a number", input)),
    }
}
