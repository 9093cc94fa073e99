//! Light show command-line front end.
//!
//! Runs the show controller from a configuration file:
//! - play songs with synchronized relays and remote LEDs
//! - probe the remote LED device
//! - inspect sequence files and generate remote show files
//! - run the relay remap workflow from the terminal

mod args;

use anyhow::{bail, Context, Result};
use args::{Cli, Command};
use clap::Parser;
use lightshow_core::audio::{AudioOutput, SilentAudio};
use lightshow_core::{ShowConfig, ShowController, StagerConfig};
use lightshow_fseq::SequenceDecoder;
use std::io::{self, BufRead, Write};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { file, frame, ms } => inspect(&file, frame, ms),
        command => {
            let mut config = load_config(&cli.config)?;
            if let Command::GenerateShows { out_dir, upload } = &command {
                if let Some(dir) = out_dir {
                    config.show_dir = dir.clone();
                }
                if !upload {
                    config.stager = StagerConfig::default();
                }
            }
            let show = ShowController::from_config(&config, audio_output(cli.no_audio)?)
                .context("failed to start show controller")?;
            let result = run(&show, command);
            show.shutdown().context("shutdown failed")?;
            result
        }
    }
}

fn load_config(path: &Path) -> Result<ShowConfig> {
    let config = ShowConfig::load_or_default(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolve_paths(base))
}

#[cfg(feature = "streaming")]
fn audio_output(no_audio: bool) -> Result<Box<dyn AudioOutput>> {
    if no_audio {
        Ok(Box::new(SilentAudio::new()))
    } else {
        Ok(Box::new(lightshow_core::audio::RodioOutput::new()))
    }
}

#[cfg(not(feature = "streaming"))]
fn audio_output(no_audio: bool) -> Result<Box<dyn AudioOutput>> {
    if !no_audio {
        log::warn!("built without audio output, keeping time silently");
    }
    Ok(Box::new(SilentAudio::new()))
}

fn run(show: &ShowController, command: Command) -> Result<()> {
    match command {
        Command::Play { title, volume } => {
            if let Some(volume) = volume {
                show.songs.set_volume(volume);
            }
            let status = show.songs.play(&title)?;
            if !status.remote.is_healthy() {
                log::warn!(
                    "remote LED device not reachable at {}, playing relays only",
                    status.remote.address
                );
            }
            println!("Playing {title:?} ({} ms)", status.playing.map(|s| s.length_ms).unwrap_or(0));
            show.songs.wait_until_idle(None);
            if let Some(fault) = show.songs.fault() {
                bail!("playback stopped: {fault}");
            }
            Ok(())
        }
        Command::Songs => {
            for song in show.catalog().songs() {
                println!(
                    "{:<40} {:<24} {:>6.1}s",
                    song.title,
                    song.artist,
                    song.length_ms as f64 / 1000.0
                );
            }
            Ok(())
        }
        Command::Probe => {
            let address = show.info().remote.address;
            if show.probe_remote() {
                println!("remote LED device reachable at {address}");
                Ok(())
            } else {
                bail!("remote LED device not reachable at {address}")
            }
        }
        Command::GenerateShows { .. } => {
            let report = show.recompile_shows()?;
            for path in &report.generated {
                println!("generated {}", path.display());
            }
            for (title, reason) in &report.failed {
                eprintln!("skipped {title:?}: {reason}");
            }
            if report.uploaded > 0 {
                println!("uploaded {} shows", report.uploaded);
            }
            Ok(())
        }
        Command::Remap => remap(show),
        Command::Status => {
            show.probe_remote();
            println!("{}", serde_json::to_string_pretty(&show.info())?);
            Ok(())
        }
        Command::Inspect { file, frame, ms } => inspect(&file, frame, ms),
    }
}

/// Read one light name per line; an empty line or EOF ends the session.
fn remap(show: &ShowController) -> Result<()> {
    let mut status = show.begin_remap()?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(channel) = status.current_channel {
        let remaining = status.remaining.clone().unwrap_or_default();
        print!("channel {channel} is lit; which light? {remaining:?} > ");
        io::stdout().flush()?;

        let name = match lines.next() {
            Some(line) => line?.trim().to_string(),
            None => String::new(),
        };
        if name.is_empty() {
            status = show.remap.cancel()?;
            println!("remap cancelled");
            break;
        }
        match show.remap.next(&name) {
            Ok(next) => status = next,
            Err(lightshow_core::ShowError::UnknownLightName(name)) => {
                eprintln!("no light named {name:?}");
            }
            Err(e) => return Err(e.into()),
        }
    }
    if !status.in_progress() {
        println!("mapping: {:?}", show.relays().mapping().names().collect::<Vec<_>>());
    }
    Ok(())
}

fn inspect(path: &Path, frame: Option<u64>, ms: Option<u64>) -> Result<()> {
    let mut decoder =
        SequenceDecoder::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let header = decoder.header().clone();

    println!("file:        {}", path.display());
    println!("version:     {}.{}", header.major_version, header.minor_version);
    println!("channels:    {}", header.channel_count_per_frame);
    println!("frames:      {}", header.frame_count);
    println!("step:        {} ms", header.step_time_ms);
    println!("duration:    {} ms", header.duration_ms());
    println!("compression: {}", header.compression.name());
    println!("blocks:      {}", header.data_blocks().len());
    for range in &header.sparse_ranges {
        println!("sparse:      {} +{}", range.start_channel, range.channel_count);
    }
    for var in &header.variable_headers {
        println!(
            "meta {}:     {}",
            var.code_str(),
            String::from_utf8_lossy(&var.data).trim_end_matches('\0')
        );
    }

    let frame = match (frame, ms) {
        (Some(index), _) => decoder.frame_at_index(index)?,
        (None, Some(ms)) => decoder.frame_at_time_ms(ms)?,
        (None, None) => return Ok(()),
    };
    let relays: String = frame
        .relay_states()
        .map(|on| if on { '#' } else { '.' })
        .collect();
    println!("relays:      {relays}");
    println!("left:        {}", hex_preview(frame.left_bytes()));
    println!("right:       {}", hex_preview(frame.right_bytes()));
    Ok(())
}

fn hex_preview(bytes: &[u8]) -> String {
    let shown: Vec<String> = bytes.iter().take(24).map(|b| format!("{b:02x}")).collect();
    if bytes.len() > 24 {
        format!("{} ... ({} bytes)", shown.join(" "), bytes.len())
    } else {
        shown.join(" ")
    }
}
