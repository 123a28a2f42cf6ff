use std::collections::HashMap;

use crossbeam_channel::Sender;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use midir::{MidiInput, MidiInputConnection};

use crate::config::GestureConfig;
use crate::keymap::MUTE_KEY;

/// Translates controller messages into the key events the keyboard would send.
#[derive(Debug, Clone)]
pub struct GestureBindings {
    notes: HashMap<u8, KeyCode>,
    mute_controller: Option<u8>,
}

impl GestureBindings {
    pub fn from_config(config: &GestureConfig) -> anyhow::Result<Self> {
        let mut notes = HashMap::new();
        for (note, key) in &config.notes {
            let note: u8 = note
                .trim()
                .parse()
                .ok()
                .filter(|n| *n <= 127)
                .ok_or_else(|| anyhow::anyhow!("invalid gesture note number '{note}'"))?;
            notes.insert(note, parse_key(key)?);
        }
        Ok(GestureBindings {
            notes,
            mute_controller: config.mute_controller,
        })
    }

    pub fn translate(&self, bytes: &[u8]) -> Option<KeyEvent> {
        let &[status, data1, data2] = bytes else {
            return None;
        };
        let code = match status & 0xF0 {
            0x90 if data2 > 0 => *self.notes.get(&data1)?,
            0xB0 if Some(data1) == self.mute_controller && data2 == 0 => KeyCode::Char(MUTE_KEY),
            _ => return None,
        };
        Some(KeyEvent::new(code, KeyModifiers::NONE))
    }
}

/// Key names accepted in `[gesture.notes]`: a single character or one of
/// `space`, `tab`, `left`, `right`, `up`, `down`.
fn parse_key(name: &str) -> anyhow::Result<KeyCode> {
    let code = match name.to_ascii_lowercase().as_str() {
        "space" => KeyCode::Char(' '),
        "tab" => KeyCode::Tab,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => anyhow::bail!("invalid gesture key '{name}'"),
            }
        }
    };
    Ok(code)
}

/// Whether the input port `name` may be opened as a gesture controller.
///
/// The port that carries our own output and loopback ports ("Midi Through")
/// would feed played notes back in as gestures. The output port is always
/// refused; loopback ports only when the device filter does not name them.
pub fn accepts_port(name: &str, device: Option<&str>, output: &str) -> bool {
    if !output.is_empty() && (name == output || name.contains(output)) {
        return false;
    }
    match device {
        Some(filter) => name.contains(filter),
        None => !name.to_ascii_lowercase().contains("through"),
    }
}

/// MIDI controller input feeding the performance queue.
///
/// Opens every input port accepted by [`accepts_port`]. Connections stay open
/// until this value is dropped.
pub struct GestureSource {
    connections: Vec<MidiInputConnection<()>>,
}

impl GestureSource {
    pub fn open(
        config: &GestureConfig,
        output: &str,
        sender: Sender<KeyEvent>,
    ) -> anyhow::Result<Self> {
        let bindings = GestureBindings::from_config(config)?;
        let midi_in = MidiInput::new("boplicity-gesture")?;
        let ports = midi_in.ports();
        let mut connections = Vec::new();

        for port in &ports {
            let name = match midi_in.port_name(port) {
                Ok(n) => n,
                Err(_) => continue,
            };
            if !accepts_port(&name, config.device.as_deref(), output) {
                log::debug!("Skipping gesture input candidate: {name}");
                continue;
            }

            let sender = sender.clone();
            let bindings = bindings.clone();
            let log_name = name.clone();

            // Need a fresh MidiInput for each connection
            let midi_in_for_port = MidiInput::new("boplicity-gesture")?;
            match midi_in_for_port.connect(
                port,
                "boplicity-gesture-in",
                move |_timestamp_us, bytes, _| {
                    if let Some(key) = bindings.translate(bytes) {
                        log::debug!("Gesture [{log_name}] {bytes:02x?} -> {:?}", key.code);
                        if sender.send(key).is_err() {
                            log::warn!("Input queue closed, dropping gesture from {log_name}");
                        }
                    }
                },
                (),
            ) {
                Ok(conn) => {
                    log::info!("Opened gesture input: {name}");
                    connections.push(conn);
                }
                Err(e) => log::warn!("Failed to open gesture input {name}: {e}"),
            }
        }

        if connections.is_empty() {
            log::warn!(
                "No gesture input matching {:?}, only the keyboard is active",
                config.device.as_deref().unwrap_or("*")
            );
        }
        Ok(GestureSource { connections })
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
