use crossterm::event::KeyEvent;

/// What a single input event asks the performance to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicalIntent {
    Chord {
        degree: u8,
        secondary_dominant: bool,
        subordinate_minor: bool,
    },
    Note {
        index: i32,
    },
    Transpose {
        semitones: i32,
    },
    PedalRelease,
    PedalToggle,
    Mute,
    None,
}

/// Maps a raw key event to an intent. Must be pure and never block.
pub trait Classifier {
    fn classify(&self, event: &KeyEvent) -> MusicalIntent;
}
