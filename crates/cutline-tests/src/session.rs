//! Integration tests for edit sessions.
//!
//! Exercises cutline-core values flowing through cutline-session state,
//! preview notification and persistence.

use crossbeam_channel::unbounded;
use cutline_core::{AudioProcessor, CutlineError, Trim, VideoEffect};
use cutline_session::{EditSession, PreviewRequest};

// ── Helpers ────────────────────────────────────────────────────

fn trim(start: i64, end: i64) -> Trim {
    Trim::new(start, end).unwrap()
}

fn populated(effects: usize, trims: usize) -> EditSession {
    let mut session = EditSession::new("file:///media/holiday.mp4");
    let palette = [
        VideoEffect::Grayscale,
        VideoEffect::InvertColors,
        VideoEffect::Rotate { degrees: 90.0 },
        VideoEffect::crop(0.1, 0.9, 0.0, 1.0).unwrap(),
    ];
    for effect in palette.iter().cycle().take(effects) {
        session.add_effect(effect.clone());
    }
    for i in 0..trims as i64 {
        session.add_trim(trim(i * 100, 10_000 - i * 100)).unwrap();
    }
    session.add_audio_processor(AudioProcessor::Volume { gain_db: -3.0 });
    session
}

// ── Persistence ────────────────────────────────────────────────

#[test]
fn saved_session_restores_everything() {
    let dir = tempfile::tempdir().unwrap();
    for (effects, trims) in [(0, 0), (1, 0), (0, 1), (3, 4), (6, 2)] {
        let session = populated(effects, trims);
        let path = dir.path().join(format!("s{}_{}.cutline", effects, trims));
        session.serialize(&path).unwrap();

        let restored = EditSession::deserialize(&path).unwrap();
        assert_eq!(restored.data(), session.data());
        assert_eq!(restored.merged_trim(), session.merged_trim());
        assert_eq!(restored.effect_filters(), session.effect_filters());
    }
}

#[test]
fn opening_a_session_file_restores_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("holiday.cutline");
    populated(2, 2).serialize(&path).unwrap();

    let reopened = EditSession::open(path.to_string_lossy().into_owned());
    assert_eq!(reopened.source(), "file:///media/holiday.mp4");
    assert_eq!(reopened.video_effects().len(), 2);
    assert_eq!(reopened.trims().len(), 2);
}

#[test]
fn corrupt_session_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.cutline");
    std::fs::write(&path, b"\xff\x00not cbor").unwrap();

    let reference = path.to_string_lossy().into_owned();
    let session = EditSession::open(reference.clone());
    assert_eq!(session.source(), reference);
    assert!(session.video_effects().is_empty());
    assert!(session.trims().is_empty());

    assert!(matches!(
        EditSession::deserialize(&path),
        Err(CutlineError::Serialization(_))
    ));
}

// ── Trim history ───────────────────────────────────────────────

#[test]
fn merged_trim_tracks_history() {
    let mut session = EditSession::new("a.mp4");
    assert_eq!(session.merged_trim(), None);

    session.add_trim(trim(0, 8000)).unwrap();
    session.add_trim(trim(1000, 6000)).unwrap();
    session.add_trim(trim(2000, 5000)).unwrap();
    assert_eq!(session.merged_trim(), Some(trim(2000, 5000)));

    session.remove_trim(trim(2000, 5000));
    assert_eq!(session.merged_trim(), Some(trim(1000, 6000)));

    session.clear_trims();
    assert_eq!(session.merged_trim(), None);
}

#[test]
fn repeated_trim_is_not_recorded() {
    let mut session = EditSession::new("a.mp4");
    assert!(session.add_trim(trim(0, 500)).unwrap());
    assert!(!session.add_trim(trim(0, 500)).unwrap());
    assert_eq!(session.trims().len(), 1);
}

#[test]
fn trim_beyond_source_is_rejected() {
    let mut session = EditSession::new("a.mp4");
    session.set_source_duration_ms(3000);
    assert!(session.add_trim(trim(0, 3001)).is_err());
    assert!(session.trims().is_empty());
}

// ── Preview ────────────────────────────────────────────────────

#[test]
fn preview_follows_video_mutations() {
    let (tx, rx) = unbounded::<PreviewRequest>();
    let mut session = EditSession::new("a.mp4");
    session.attach_preview(Box::new(tx));
    assert_eq!(rx.try_recv().unwrap().video_filters.len(), 0);

    session.add_effect(VideoEffect::Grayscale);
    session.add_trim(trim(100, 900)).unwrap();

    let after_effect = rx.try_recv().unwrap();
    assert_eq!(after_effect.video_filters.len(), 1);
    assert_eq!(after_effect.clip, None);

    let after_trim = rx.try_recv().unwrap();
    assert_eq!(after_trim.clip, Some(trim(100, 900)));

    session.add_audio_processor(AudioProcessor::Downmix);
    assert!(rx.try_recv().is_err());
}

#[test]
fn removing_effect_drops_first_occurrence_only() {
    let mut session = EditSession::new("a.mp4");
    session.add_effect(VideoEffect::Grayscale);
    session.add_effect(VideoEffect::InvertColors);
    session.add_effect(VideoEffect::Grayscale);

    session.remove_effect(&VideoEffect::Grayscale);
    assert_eq!(
        session.video_effects(),
        [VideoEffect::InvertColors, VideoEffect::Grayscale]
    );
}
