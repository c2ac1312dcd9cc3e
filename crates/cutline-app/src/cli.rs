//! Command implementations.

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::RecvTimeoutError;
use cutline_core::{
    catalog, find_template, local_path, AudioProcessor, Trim, VideoEffect, PROJECT_FILE_EXT,
};
use cutline_export::{
    ffmpeg_exporter, ffmpeg_exporter_with_binary, parse_codec_choice, ExportOutcome,
    ExportSettings,
};
use cutline_session::{is_project_file, EditSession};
use pico_args::Arguments;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::AppConfig;

pub const USAGE: &str = "\
Usage: cutline <command> [args]

Commands:
  effects                           List built-in effects
  info <session> [--json]           Show a saved session
  edit <source> [options]           Apply edits and save the session
      --effect <id[:Key=value,...]>   Append an effect (repeatable)
      --remove-effect <id[:...]>      Remove the first matching effect
      --audio <volume:dB|mono>        Append an audio processor
      --trim <start:end>              Append a trim in ms (repeatable)
      --clear-trims                   Drop the trim history first
      --duration <ms>                 Source duration for bounds checks
      --save <path>                   Destination (default: the opened
                                      session, else next to the source)
  export <source> --output <path> [options]
      --lossless                      Stream-copy cut
      --speed <x> --framerate <fps>
      --tracks <label> --hdr <label> --vcodec <mime> --acodec <mime>
      --duration <ms>
";

/// Parse `id` or `id:Key=value,Key=value` into a catalog effect.
pub fn parse_effect_spec(arg: &str) -> Result<VideoEffect> {
    let (id, raw_args) = arg.split_once(':').unwrap_or((arg, ""));
    let template = find_template(id).ok_or_else(|| anyhow!("Unknown effect '{}'", id))?;

    let mut args = HashMap::new();
    for pair in raw_args.split(',').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected Key=value, got '{}'", pair))?;
        args.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(template.instantiate(&args)?)
}

/// Parse `volume:<dB>` or `mono`.
pub fn parse_audio_spec(arg: &str) -> Result<AudioProcessor> {
    match arg.split_once(':') {
        Some(("volume", gain)) => Ok(AudioProcessor::Volume {
            gain_db: gain.parse().with_context(|| format!("Invalid gain '{}'", gain))?,
        }),
        None if arg == "mono" => Ok(AudioProcessor::Downmix),
        _ => bail!("Unknown audio processor '{}'", arg),
    }
}

/// Where a session for `source` is saved when no destination is given.
pub fn default_session_path(source: &str, project_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(source);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string());
    let file_name = format!("{}.{}", stem, PROJECT_FILE_EXT);
    match project_dir {
        Some(dir) => dir.join(file_name),
        None => path.with_file_name(file_name),
    }
}

/// Where `edit` saves when no destination is given: the project file that
/// was opened, else a new one derived from the media source.
pub fn edit_destination(
    reference: &str,
    session: &EditSession,
    project_dir: Option<&Path>,
) -> PathBuf {
    match local_path(reference).filter(|p| is_project_file(p)) {
        Some(project) => project.to_path_buf(),
        None => default_session_path(session.source(), project_dir),
    }
}

pub fn run(mut args: Arguments, config: &AppConfig) -> Result<()> {
    match args.subcommand()?.as_deref() {
        Some("effects") => cmd_effects(),
        Some("info") => cmd_info(args),
        Some("edit") => cmd_edit(args, config),
        Some("export") => cmd_export(args, config),
        Some(other) => bail!("Unknown command: {}\n\n{}", other, USAGE),
        None => {
            print!("{}", USAGE);
            Ok(())
        }
    }
}

fn cmd_effects() -> Result<()> {
    for template in catalog() {
        let params: Vec<_> = template.params.iter().map(|p| p.key).collect();
        if params.is_empty() {
            println!("{:<14} {}", template.id, template.label);
        } else {
            println!("{:<14} {} ({})", template.id, template.label, params.join(", "));
        }
    }
    Ok(())
}

fn cmd_info(mut args: Arguments) -> Result<()> {
    let json = args.contains("--json");
    let path: PathBuf = args.free_from_str()?;
    reject_leftovers(args)?;

    let session = EditSession::deserialize(&path)
        .with_context(|| format!("Failed to read session {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(session.data())?);
        return Ok(());
    }

    println!("Source: {}", session.source());
    println!("Effects:");
    for effect in session.video_effects() {
        println!("  [{}] {}", effect.icon(), effect);
    }
    println!("Audio:");
    for processor in session.audio_processors() {
        println!("  {}", processor.label());
    }
    println!("Trims:");
    for trim in session.trims() {
        println!("  {}", trim);
    }
    match session.merged_trim() {
        Some(trim) => println!("Active range: {}", trim),
        None => println!("Active range: full source"),
    }
    Ok(())
}

fn cmd_edit(mut args: Arguments, config: &AppConfig) -> Result<()> {
    let clear = args.contains("--clear-trims");
    let effects = args.values_from_fn("--effect", parse_effect_spec)?;
    let removals = args.values_from_fn("--remove-effect", parse_effect_spec)?;
    let audio = args.values_from_fn("--audio", parse_audio_spec)?;
    let trims: Vec<Trim> = args.values_from_str("--trim")?;
    let duration: Option<i64> = args.opt_value_from_str("--duration")?;
    let save: Option<PathBuf> = args.opt_value_from_str("--save")?;
    let source: String = args.free_from_str()?;
    reject_leftovers(args)?;

    let mut session = EditSession::open(source.clone());
    if let Some(duration) = duration {
        session.set_source_duration_ms(duration);
    }
    if clear {
        session.clear_trims();
    }
    for effect in effects {
        session.add_effect(effect);
    }
    for effect in &removals {
        session.remove_effect(effect);
    }
    for processor in audio {
        session.add_audio_processor(processor);
    }
    for trim in trims {
        if !session.add_trim(trim)? {
            info!(%trim, "Ignoring repeated trim");
        }
    }

    let destination = save.unwrap_or_else(|| {
        edit_destination(&source, &session, config.project_dir.as_deref())
    });
    session.serialize(&destination)?;
    println!("Saved {}", destination.display());
    Ok(())
}

fn cmd_export(mut args: Arguments, config: &AppConfig) -> Result<()> {
    let mut settings = ExportSettings::new(args.value_from_str::<_, PathBuf>("--output")?);
    settings.hdr_mode = config.default_hdr_mode;
    settings.lossless_cut = args.contains("--lossless");
    if let Some(speed) = args.opt_value_from_str("--speed")? {
        settings.speed = speed;
    }
    if let Some(framerate) = args.opt_value_from_str("--framerate")? {
        settings.framerate = framerate;
    }
    if let Some(tracks) = args.opt_value_from_str("--tracks")? {
        settings.tracks = tracks;
    }
    if let Some(hdr) = args.opt_value_from_str("--hdr")? {
        settings.hdr_mode = hdr;
    }
    if let Some(codec) = args.opt_value_from_str::<_, String>("--vcodec")? {
        settings.video_codec = parse_codec_choice(&codec)?;
    }
    if let Some(codec) = args.opt_value_from_str::<_, String>("--acodec")? {
        settings.audio_codec = parse_codec_choice(&codec)?;
    }
    let duration: Option<i64> = args.opt_value_from_str("--duration")?;
    let source: String = args.free_from_str()?;
    reject_leftovers(args)?;

    let mut session = EditSession::open(source);
    if let Some(duration) = duration {
        session.set_source_duration_ms(duration);
    }

    let mut exporter = match &config.ffmpeg_path {
        Some(binary) => ffmpeg_exporter_with_binary(binary.clone()),
        None => ffmpeg_exporter(),
    };

    let (tx, rx) = crossbeam_channel::bounded(1);
    exporter.export(&session, settings, tx)?;

    let interval = config.poll_interval();
    let outcome = loop {
        match rx.recv_timeout(interval) {
            Ok(outcome) => break outcome,
            Err(RecvTimeoutError::Timeout) => {
                let progress = exporter.progress();
                if progress >= 0.0 {
                    info!(percent = (progress * 100.0).round(), "Exporting");
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                bail!("Export engine stopped without reporting a result")
            }
        }
    };

    match outcome {
        ExportOutcome::Success { output } => {
            println!("Exported {}", output.display());
            Ok(())
        }
        ExportOutcome::Failure { message } => bail!("Export failed: {}", message),
    }
}

fn reject_leftovers(args: Arguments) -> Result<()> {
    let rest = args.finish();
    if !rest.is_empty() {
        bail!("Unexpected arguments: {:?}", rest);
    }
    Ok(())
}
