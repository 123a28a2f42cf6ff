use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mode argument that also listens to the gesture controller.
pub const GESTURE_MODE: &str = "leap";

#[derive(Parser)]
#[command(
    name = "boplicity",
    about = "Play chords and melodies on a MIDI instrument from the computer keyboard",
    after_help = "Logs, including the name of every melody note played, go to stderr and are \
                  hidden while the status screen is shown on a terminal. Redirect stderr to \
                  keep them: boplicity 2> perf.log"
)]
pub struct Cli {
    /// Input mode: `leap` adds the gesture controller to the keyboard
    pub mode: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (default: ./boplicity.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// MIDI output device name filter (default: first available)
    #[arg(long)]
    pub midi_output: Option<String>,

    /// Gesture controller input name filter (default: open all)
    #[arg(long)]
    pub gesture_device: Option<String>,

    /// MIDI channel (1-16)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub channel: Option<u8>,
}

impl Cli {
    pub fn gesture_enabled(&self) -> bool {
        self.mode.as_deref() == Some(GESTURE_MODE)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// List available MIDI outputs and gesture inputs
    Ports,
}
