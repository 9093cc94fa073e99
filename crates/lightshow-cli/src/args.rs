//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Audio-synchronized relay and LED light show.
#[derive(Debug, Parser)]
#[command(name = "lightshow", version)]
#[command(about = "Play light shows synchronized to music")]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "lightshow.json", global = true)]
    pub config: PathBuf,

    /// Keep time with a silent clock instead of the audio device
    #[arg(long, global = true)]
    pub no_audio: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a song from the catalog until it ends
    Play {
        /// Song title
        title: String,
        /// Volume override (0-100)
        #[arg(long)]
        volume: Option<i64>,
    },
    /// List catalog songs
    Songs,
    /// Check whether the remote LED device answers on its control port
    Probe,
    /// Print a sequence file's header, or one frame
    Inspect {
        /// Sequence (.fseq) file
        file: PathBuf,
        /// Dump the frame at this index
        #[arg(long, conflicts_with = "ms")]
        frame: Option<u64>,
        /// Dump the frame active at this time in milliseconds
        #[arg(long)]
        ms: Option<u64>,
    },
    /// Generate show files for every catalog song
    GenerateShows {
        /// Output directory (default: the configured show directory)
        out_dir: Option<PathBuf>,
        /// Also copy them to the remote device
        #[arg(long)]
        upload: bool,
    },
    /// Assign relay channels to light names interactively
    Remap,
    /// Print the status of every controller as JSON
    Status,
}
