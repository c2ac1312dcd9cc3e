//! Session persistence.
//!
//! Sessions are written as a single CBOR document. The format carries no
//! version field: a blob that fails to decode is treated as absent and the
//! caller starts over with an empty session.

use cutline_core::{AudioProcessor, CutlineError, Result, Trim, VideoEffect, PROJECT_FILE_EXT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Everything a session persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    /// Source media reference. Never reassigned after construction.
    source: String,
    pub video_effects: Vec<VideoEffect>,
    pub audio_processors: Vec<AudioProcessor>,
    pub trims: Vec<Trim>,
}

impl ProjectData {
    /// Create empty project data bound to a source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            video_effects: Vec::new(),
            audio_processors: Vec::new(),
            trims: Vec::new(),
        }
    }

    /// The source media reference.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Encode to a writer.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        ciborium::into_writer(self, writer)
            .map_err(|e| CutlineError::Serialization(format!("Failed to encode session: {}", e)))
    }

    /// Decode from a reader.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        ciborium::from_reader(reader)
            .map_err(|e| CutlineError::Serialization(format!("Failed to decode session: {}", e)))
    }

    /// Encode to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Decode from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from(data)
    }

    /// Save to a file path, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load from a file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}

/// Whether a path names a saved session rather than a media file.
pub fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PROJECT_FILE_EXT))
}

/// Encode a session document with unchecked trim bounds.
#[cfg(test)]
pub(crate) fn encode_raw_trims(source: &str, trims: &[(i64, i64)]) -> Vec<u8> {
    #[derive(Serialize)]
    struct RawTrim {
        start_ms: i64,
        end_ms: i64,
    }

    #[derive(Serialize)]
    struct RawProject<'a> {
        source: &'a str,
        video_effects: Vec<VideoEffect>,
        audio_processors: Vec<AudioProcessor>,
        trims: Vec<RawTrim>,
    }

    let project = RawProject {
        source,
        video_effects: Vec::new(),
        audio_processors: Vec::new(),
        trims: trims
            .iter()
            .map(|&(start_ms, end_ms)| RawTrim { start_ms, end_ms })
            .collect(),
    };
    let mut bytes = Vec::new();
    ciborium::into_writer(&project, &mut bytes).unwrap();
    bytes
}
