use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::instrument::MidiSettings;
use crate::theory::Tonality;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_PATH: &str = "boplicity.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Starting key, e.g. `"Eb"`.
    pub key: Option<String>,
    pub midi: MidiConfig,
    pub gesture: GestureConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Substring of the output port name.
    pub output: Option<String>,
    /// 1-16
    pub channel: u8,
    pub velocity: u8,
    pub volume: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        MidiConfig {
            output: None,
            channel: 1,
            velocity: 90,
            volume: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Substring of the controller's input port name.
    pub device: Option<String>,
    /// Controller whose value 0 asks for a mute.
    pub mute_controller: Option<u8>,
    /// Controller note number -> key name.
    pub notes: HashMap<String, String>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        // White keys from middle C play the seven diatonic chords.
        let notes = [60, 62, 64, 65, 67, 69, 71]
            .iter()
            .zip('1'..='7')
            .map(|(note, key)| (note.to_string(), key.to_string()))
            .collect();
        GestureConfig {
            device: None,
            mute_controller: None,
            notes,
        }
    }
}

impl Config {
    pub fn tonality(&self) -> anyhow::Result<Tonality> {
        match &self.key {
            Some(key) => key.parse::<Tonality>().context("invalid `key` setting"),
            None => Ok(Tonality::default()),
        }
    }

    pub fn midi_settings(&self) -> anyhow::Result<MidiSettings> {
        let midi = &self.midi;
        anyhow::ensure!(
            (1..=16).contains(&midi.channel),
            "MIDI channel must be 1-16, got {}",
            midi.channel
        );
        anyhow::ensure!(midi.velocity <= 127, "velocity must be 0-127");
        anyhow::ensure!(midi.volume <= 127, "volume must be 0-127");
        Ok(MidiSettings {
            channel: midi.channel - 1,
            velocity: midi.velocity,
            volume: midi.volume,
        })
    }
}

/// Load `path`, or the default file if it exists, or built-in defaults.
pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => read(path),
        None if Path::new(DEFAULT_PATH).exists() => read(Path::new(DEFAULT_PATH)),
        None => Ok(Config::default()),
    }
}

fn read(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    log::info!("Loaded config {}", path.display());
    Ok(config)
}
