use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::intent::{Classifier, MusicalIntent};

/// Key that asks for a mute. Gesture controllers emit it too.
pub const MUTE_KEY: char = 'm';

/// Computer-keyboard layout for chords, melody notes and performance controls.
///
/// - Number row `1`..`7`: diatonic chords on degrees I..VII; shifted
///   (`!@#$%^&`) plays the secondary dominant of that degree.
/// - `q`..`u`: the same degrees borrowed from the parallel minor; uppercase
///   plays their secondary dominants.
/// - Home row `a`..`'`: melody notes, `f` being the tonic.
/// - Arrows and `[` `]`: transpose. Space releases the pedal, Tab toggles it.
#[derive(Default)]
pub struct KeyMap;

impl KeyMap {
    pub fn new() -> Self {
        KeyMap
    }
}

impl Classifier for KeyMap {
    fn classify(&self, event: &KeyEvent) -> MusicalIntent {
        if event.kind == KeyEventKind::Release {
            return MusicalIntent::None;
        }
        if event
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return MusicalIntent::None;
        }

        match event.code {
            KeyCode::Char(c) => classify_char(c),
            KeyCode::Left => MusicalIntent::Transpose { semitones: -1 },
            KeyCode::Right => MusicalIntent::Transpose { semitones: 1 },
            KeyCode::Down => MusicalIntent::Transpose { semitones: -7 },
            KeyCode::Up => MusicalIntent::Transpose { semitones: 7 },
            KeyCode::Tab => MusicalIntent::PedalToggle,
            _ => MusicalIntent::None,
        }
    }
}

fn classify_char(c: char) -> MusicalIntent {
    if let Some(degree) = position(c, "1234567") {
        return chord(degree, false, false);
    }
    if let Some(degree) = position(c, "!@#$%^&") {
        return chord(degree, true, false);
    }
    if let Some(degree) = position(c, "qwertyu") {
        return chord(degree, false, true);
    }
    if let Some(degree) = position(c, "QWERTYU") {
        return chord(degree, true, true);
    }
    if let Some(index) = position(c, "asdfghjkl;'") {
        return MusicalIntent::Note {
            index: index as i32,
        };
    }

    match c {
        '[' => MusicalIntent::Transpose { semitones: -1 },
        ']' => MusicalIntent::Transpose { semitones: 1 },
        ' ' => MusicalIntent::PedalRelease,
        MUTE_KEY => MusicalIntent::Mute,
        _ => MusicalIntent::None,
    }
}

/// 1-based position of `c` in `row`.
fn position(c: char, row: &str) -> Option<u8> {
    row.chars().position(|k| k == c).map(|i| i as u8 + 1)
}

fn chord(degree: u8, secondary_dominant: bool, subordinate_minor: bool) -> MusicalIntent {
    MusicalIntent::Chord {
        degree,
        secondary_dominant,
        subordinate_minor,
    }
}
