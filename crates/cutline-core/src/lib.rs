//! Cutline Core - Foundation types for the edit session
//!
//! This crate provides the types shared by every Cutline crate:
//! - Trim ops and the trim-history merge
//! - Video effects and audio processors as serializable tagged values
//! - The built-in effect palette
//! - The common error type

pub mod catalog;
pub mod effect;
pub mod error;
pub mod trim;

pub use catalog::{catalog, find_template, validate_float, EffectTemplate, ParamDescriptor, ParamKind};
pub use effect::{filter_chain, AudioProcessor, FilterSpec, VideoEffect};
pub use error::{CutlineError, Result};
pub use trim::{merge_trims, Trim};

/// File extension of saved session files.
pub const PROJECT_FILE_EXT: &str = "cutline";

/// Resolve a source reference to a local filesystem path.
///
/// Accepts bare paths and `file://` URIs. Other schemes are opaque to Cutline
/// and yield `None`.
pub fn local_path(source: &str) -> Option<&std::path::Path> {
    if let Some(stripped) = source.strip_prefix("file://") {
        return Some(std::path::Path::new(stripped));
    }
    if source.contains("://") {
        return None;
    }
    Some(std::path::Path::new(source))
}
