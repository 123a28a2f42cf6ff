use std::collections::BTreeSet;

use midir::{MidiOutput, MidiOutputConnection};

use crate::theory::{self, Tonality};

/// MIDI channel volume controller.
pub const VOLUME_CONTROL: u8 = 7;
const SUSTAIN_CONTROL: u8 = 64;
const RESET_ALL_CONTROLLERS: u8 = 121;
const ALL_NOTES_OFF: u8 = 123;

/// Root of chord voicings in C (C3). The bass doubles the root an octave lower.
const CHORD_BASE_NOTE: u8 = 48;
/// Tonic of melody notes in C (C4).
pub const MELODY_BASE_NOTE: u8 = 60;

/// Display metadata for a chord that was sounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordPlayed {
    pub label: String,
    pub grade: String,
}

/// The instrument the performance drives.
///
/// Every call is synchronous: when it returns, the instrument state (and the
/// answer of `current_tonality`) reflects it.
pub trait Instrument {
    fn start(&mut self) -> anyhow::Result<()>;
    /// Silence everything and release the output. Calling it again is a no-op.
    fn close(&mut self) -> anyhow::Result<()>;
    fn current_tonality(&self) -> Tonality;
    /// Sound a chord on `degree` of the current key. Returns `None` when the
    /// degree is unknown, in which case nothing is sent.
    fn play_chord(
        &mut self,
        degree: u8,
        secondary_dominant: bool,
        subordinate_minor: bool,
    ) -> anyhow::Result<Option<ChordPlayed>>;
    fn play_single_note(&mut self, offset: i32) -> anyhow::Result<()>;
    fn release_pedal(&mut self) -> anyhow::Result<()>;
    fn move_tonality(&mut self, semitones: i32) -> anyhow::Result<()>;
    fn send_control_change(&mut self, value: u8, control: u8) -> anyhow::Result<()>;
}

/// Destination for raw MIDI messages.
pub trait MidiSink {
    fn send(&mut self, message: &[u8]) -> anyhow::Result<()>;
}

impl MidiSink for MidiOutputConnection {
    fn send(&mut self, message: &[u8]) -> anyhow::Result<()> {
        MidiOutputConnection::send(self, message)
            .map_err(|e| anyhow::anyhow!("MIDI send failed: {e}"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MidiSettings {
    pub channel: u8,
    pub velocity: u8,
    pub volume: u8,
}

/// An [`Instrument`] that plays through a MIDI output on a single channel.
pub struct MidiInstrument<S: MidiSink> {
    sink: S,
    settings: MidiSettings,
    tonality: Tonality,
    chord_notes: Vec<u8>,
    melody_notes: BTreeSet<u8>,
    closed: bool,
}

impl<S: MidiSink> MidiInstrument<S> {
    pub fn new(sink: S, settings: MidiSettings, tonality: Tonality) -> Self {
        MidiInstrument {
            sink,
            settings: MidiSettings {
                channel: settings.channel.min(15),
                velocity: settings.velocity & 0x7F,
                volume: settings.volume & 0x7F,
            },
            tonality,
            chord_notes: Vec::new(),
            melody_notes: BTreeSet::new(),
            closed: false,
        }
    }

    fn note_on(&mut self, note: u8) -> anyhow::Result<()> {
        let status = 0x90 | self.settings.channel;
        self.sink.send(&[status, note & 0x7F, self.settings.velocity])
    }

    fn note_off(&mut self, note: u8) -> anyhow::Result<()> {
        let status = 0x80 | self.settings.channel;
        self.sink.send(&[status, note & 0x7F, 0])
    }

    fn control_change(&mut self, control: u8, value: u8) -> anyhow::Result<()> {
        let status = 0xB0 | self.settings.channel;
        self.sink.send(&[status, control & 0x7F, value & 0x7F])
    }

    fn silence_chord(&mut self) -> anyhow::Result<()> {
        for note in std::mem::take(&mut self.chord_notes) {
            self.note_off(note)?;
        }
        Ok(())
    }

    /// Send NoteOff for every sounding chord and melody note.
    fn all_notes_off(&mut self) -> anyhow::Result<()> {
        self.silence_chord()?;
        for note in std::mem::take(&mut self.melody_notes) {
            self.note_off(note)?;
        }
        Ok(())
    }
}

impl<S: MidiSink> Instrument for MidiInstrument<S> {
    fn start(&mut self) -> anyhow::Result<()> {
        self.control_change(RESET_ALL_CONTROLLERS, 0)?;
        self.control_change(VOLUME_CONTROL, self.settings.volume)?;
        self.control_change(SUSTAIN_CONTROL, 127)?;
        log::info!(
            "Instrument started on channel {} in {}",
            self.settings.channel + 1,
            self.tonality
        );
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.all_notes_off()?;
        self.control_change(ALL_NOTES_OFF, 0)?;
        self.control_change(SUSTAIN_CONTROL, 0)?;
        log::info!("Instrument closed");
        Ok(())
    }

    fn current_tonality(&self) -> Tonality {
        self.tonality
    }

    fn play_chord(
        &mut self,
        degree: u8,
        secondary_dominant: bool,
        subordinate_minor: bool,
    ) -> anyhow::Result<Option<ChordPlayed>> {
        let Some(chord) = theory::resolve_chord(degree, secondary_dominant, subordinate_minor)
        else {
            log::warn!("Unknown chord degree {degree}");
            return Ok(None);
        };

        self.silence_chord()?;

        let root = CHORD_BASE_NOTE + self.tonality.pitch_class() + chord.root;
        let mut notes = vec![root - 12];
        notes.extend(chord.intervals.iter().map(|i| root + i));
        for &note in &notes {
            self.note_on(note)?;
        }
        log::debug!(
            "Chord {} in {}: {}",
            chord.label,
            self.tonality,
            notes
                .iter()
                .map(|&n| theory::note_name(n))
                .collect::<Vec<_>>()
                .join(" ")
        );
        self.chord_notes = notes;

        Ok(Some(ChordPlayed {
            label: chord.label,
            grade: chord.grade.to_string(),
        }))
    }

    fn play_single_note(&mut self, offset: i32) -> anyhow::Result<()> {
        let Some(note) = theory::melody_note(MELODY_BASE_NOTE, self.tonality, offset) else {
            log::warn!("Note offset {offset} is out of MIDI range in {}", self.tonality);
            return Ok(());
        };
        // Retrigger a note that is still ringing.
        if !self.melody_notes.insert(note) {
            self.note_off(note)?;
        }
        self.note_on(note)
    }

    fn release_pedal(&mut self) -> anyhow::Result<()> {
        self.all_notes_off()?;
        self.control_change(SUSTAIN_CONTROL, 0)?;
        self.control_change(SUSTAIN_CONTROL, 127)
    }

    fn move_tonality(&mut self, semitones: i32) -> anyhow::Result<()> {
        self.tonality = self.tonality.transpose(semitones);
        log::info!("Key moved by {semitones:+} to {}", self.tonality);
        Ok(())
    }

    fn send_control_change(&mut self, value: u8, control: u8) -> anyhow::Result<()> {
        self.control_change(control, value)
    }
}

impl<S: MidiSink> Drop for MidiInstrument<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close instrument: {e}");
        }
    }
}

#[cfg(unix)]
const VIRTUAL_PORT_NAME: &str = "boplicity-out";

/// Connect to the first MIDI output whose name contains `filter` (any port if
/// `None`). Falls back to a virtual port on Unix. Returns the connection and
/// the port name.
pub fn open_output(filter: Option<&str>) -> anyhow::Result<(MidiOutputConnection, String)> {
    let midi_out = MidiOutput::new("boplicity")?;
    let ports = midi_out.ports();
    let port = ports.iter().find(|port| {
        midi_out
            .port_name(port)
            .map(|name| filter.is_none_or(|f| name.contains(f)))
            .unwrap_or(false)
    });

    match port {
        Some(port) => {
            let name = midi_out.port_name(port)?;
            let conn = midi_out
                .connect(port, "boplicity-out")
                .map_err(|e| anyhow::anyhow!("Failed to open MIDI output {name}: {e}"))?;
            log::info!("Opened MIDI output: {name}");
            Ok((conn, name))
        }
        None => fallback_output(midi_out, filter),
    }
}

#[cfg(unix)]
fn fallback_output(
    midi_out: MidiOutput,
    filter: Option<&str>,
) -> anyhow::Result<(MidiOutputConnection, String)> {
    use midir::os::unix::VirtualOutput;

    log::warn!(
        "No MIDI output matching {:?}, creating virtual port '{VIRTUAL_PORT_NAME}'",
        filter.unwrap_or("*")
    );
    let conn = midi_out
        .create_virtual(VIRTUAL_PORT_NAME)
        .map_err(|e| anyhow::anyhow!("Failed to create virtual MIDI output: {e}"))?;
    Ok((conn, VIRTUAL_PORT_NAME.to_string()))
}

#[cfg(not(unix))]
fn fallback_output(
    _midi_out: MidiOutput,
    filter: Option<&str>,
) -> anyhow::Result<(MidiOutputConnection, String)> {
    anyhow::bail!("No MIDI output matching {:?}", filter.unwrap_or("*"))
}
