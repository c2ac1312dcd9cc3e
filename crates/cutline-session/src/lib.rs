//! Cutline Session - Edit session state
//!
//! Holds the pending edits for one source media item:
//! - Ordered video effects and audio processors
//! - Append-only trim history and the merged clip range
//! - Preview notification after every mutation
//! - Binary persistence of the whole session

pub mod serialization;
pub mod session;

pub use serialization::{is_project_file, ProjectData};
pub use session::{EditSession, PreviewRequest, PreviewSink};
