//! The edit session: pending edits for one source media item.
//!
//! A session is owned by whoever opened it and mutated from a single thread.
//! Consumers that need derived values (the merged trim, the filter list)
//! receive copies; nothing outside the session holds a reference into it.

use cutline_core::{
    local_path, merge_trims, AudioProcessor, CutlineError, FilterSpec, Result, Trim, VideoEffect,
};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::serialization::{is_project_file, ProjectData};

/// What the preview needs to (re)prepare playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRequest {
    pub source: String,
    /// Clip bounds, `None` for the full source.
    pub clip: Option<Trim>,
    pub video_filters: Vec<FilterSpec>,
}

/// Playback collaborator notified after every session mutation.
pub trait PreviewSink: Send {
    /// Stop, apply the request, and prepare playback again.
    fn prepare(&mut self, request: &PreviewRequest);
}

impl PreviewSink for crossbeam_channel::Sender<PreviewRequest> {
    fn prepare(&mut self, request: &PreviewRequest) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.send(request.clone());
    }
}

/// Mutable edit state bound to one source.
pub struct EditSession {
    data: ProjectData,
    merged_trim: Option<Trim>,
    effect_filters: Vec<FilterSpec>,
    source_duration_ms: Option<i64>,
    preview: Option<Box<dyn PreviewSink>>,
}

impl EditSession {
    /// Create an empty session for a source.
    pub fn new(source: impl Into<String>) -> Self {
        Self::from_data(ProjectData::new(source))
    }

    /// Wrap previously loaded project data.
    pub fn from_data(data: ProjectData) -> Self {
        let mut session = Self {
            data,
            merged_trim: None,
            effect_filters: Vec::new(),
            source_duration_ms: None,
            preview: None,
        };
        session.rebuild_effects();
        session.rebuild_trims();
        session
    }

    /// Open a source for editing.
    ///
    /// A reference to a saved session file restores that session. Any failure
    /// to read or decode it falls back to an empty session bound to the
    /// reference itself.
    pub fn open(source: impl Into<String>) -> Self {
        let source = source.into();
        let Some(path) = local_path(&source).filter(|p| is_project_file(p)) else {
            debug!(source = %source, "Opening media source");
            return Self::new(source);
        };

        match ProjectData::load_from_file(path) {
            Ok(data) => {
                info!(
                    project = %path.display(),
                    source = %data.source(),
                    effects = data.video_effects.len(),
                    trims = data.trims.len(),
                    "Restored saved session"
                );
                Self::from_data(data)
            }
            Err(e) => {
                warn!(project = %path.display(), error = %e, "Could not restore session, starting fresh");
                Self::new(source)
            }
        }
    }

    /// Read a session written by [`EditSession::serialize`].
    pub fn deserialize(path: &Path) -> Result<Self> {
        ProjectData::load_from_file(path).map(Self::from_data)
    }

    /// Write the whole session to `destination`.
    pub fn serialize(&self, destination: &Path) -> Result<()> {
        self.data.save_to_file(destination)?;
        info!(destination = %destination.display(), "Session saved");
        Ok(())
    }

    /// Encode to an in-memory blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.data.to_bytes()
    }

    /// Decode from an in-memory blob.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        ProjectData::from_bytes(data).map(Self::from_data)
    }

    /// Install the playback collaborator and prepare it with the current state.
    pub fn attach_preview(&mut self, preview: Box<dyn PreviewSink>) {
        self.preview = Some(preview);
        self.notify_preview();
    }

    /// Remove the playback collaborator.
    pub fn detach_preview(&mut self) -> Option<Box<dyn PreviewSink>> {
        self.preview.take()
    }

    /// Declare the source duration so trims can be bounds-checked.
    pub fn set_source_duration_ms(&mut self, duration_ms: i64) {
        self.source_duration_ms = Some(duration_ms);
    }

    pub fn source_duration_ms(&self) -> Option<i64> {
        self.source_duration_ms
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn source(&self) -> &str {
        self.data.source()
    }

    pub fn data(&self) -> &ProjectData {
        &self.data
    }

    pub fn video_effects(&self) -> &[VideoEffect] {
        &self.data.video_effects
    }

    pub fn audio_processors(&self) -> &[AudioProcessor] {
        &self.data.audio_processors
    }

    pub fn trims(&self) -> &[Trim] {
        &self.data.trims
    }

    /// The effective clip range, `None` when no trims are recorded.
    pub fn merged_trim(&self) -> Option<Trim> {
        self.merged_trim
    }

    /// Render instances of the session effects, in order.
    pub fn effect_filters(&self) -> &[FilterSpec] {
        &self.effect_filters
    }

    /// Audio filter instances, in order.
    pub fn audio_filters(&self) -> Vec<FilterSpec> {
        self.data
            .audio_processors
            .iter()
            .map(AudioProcessor::build)
            .collect()
    }

    pub fn preview_request(&self) -> PreviewRequest {
        PreviewRequest {
            source: self.data.source().to_string(),
            clip: self.merged_trim,
            video_filters: self.effect_filters.clone(),
        }
    }

    // ── Mutations ──────────────────────────────────────────────

    pub fn add_effect(&mut self, effect: VideoEffect) {
        debug!(effect = %effect, "Adding effect");
        self.data.video_effects.push(effect);
        self.effects_changed();
    }

    /// Remove the first occurrence of `effect`. Absent effects are ignored.
    pub fn remove_effect(&mut self, effect: &VideoEffect) {
        if let Some(index) = self.data.video_effects.iter().position(|e| e == effect) {
            self.data.video_effects.remove(index);
        }
        self.effects_changed();
    }

    pub fn add_audio_processor(&mut self, processor: AudioProcessor) {
        self.data.audio_processors.push(processor);
    }

    /// Remove the first occurrence of `processor`. Absent processors are ignored.
    pub fn remove_audio_processor(&mut self, processor: &AudioProcessor) {
        if let Some(index) = self
            .data
            .audio_processors
            .iter()
            .position(|p| p == processor)
        {
            self.data.audio_processors.remove(index);
        }
    }

    /// Append a trim op.
    ///
    /// Returns `Ok(false)` without touching anything when `trim` repeats the
    /// last recorded op.
    pub fn add_trim(&mut self, trim: Trim) -> Result<bool> {
        if let Some(duration) = self.source_duration_ms {
            if !trim.within(duration) {
                return Err(CutlineError::InvalidParameter(format!(
                    "Trim {} exceeds source duration {}ms",
                    trim, duration
                )));
            }
        }
        if self.data.trims.last() == Some(&trim) {
            return Ok(false);
        }
        debug!(trim = %trim, "Adding trim");
        self.data.trims.push(trim);
        self.trims_changed();
        Ok(true)
    }

    /// Remove the first occurrence of `trim`.
    pub fn remove_trim(&mut self, trim: Trim) {
        if let Some(index) = self.data.trims.iter().position(|t| *t == trim) {
            self.data.trims.remove(index);
        }
        self.trims_changed();
    }

    pub fn clear_trims(&mut self) {
        self.data.trims.clear();
        self.trims_changed();
    }

    // ── Derived state ──────────────────────────────────────────

    fn rebuild_effects(&mut self) {
        self.effect_filters = self
            .data
            .video_effects
            .iter()
            .map(VideoEffect::build)
            .collect();
    }

    fn rebuild_trims(&mut self) {
        self.merged_trim = merge_trims(&self.data.trims);
    }

    fn effects_changed(&mut self) {
        self.rebuild_effects();
        self.notify_preview();
    }

    fn trims_changed(&mut self) {
        self.rebuild_trims();
        self.notify_preview();
    }

    fn notify_preview(&mut self) {
        let request = self.preview_request();
        if let Some(preview) = self.preview.as_mut() {
            preview.prepare(&request);
        }
    }
}

impl fmt::Debug for EditSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("data", &self.data)
            .field("merged_trim", &self.merged_trim)
            .field("source_duration_ms", &self.source_duration_ms)
            .field("has_preview", &self.preview.is_some())
            .finish()
    }
}
