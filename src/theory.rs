use std::fmt;
use std::str::FromStr;

const NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_SCALE: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

const MAJOR_LABELS: [&str; 7] = ["I", "ii", "iii", "IV", "V", "vi", "vii°"];
const MINOR_LABELS: [&str; 7] = ["i", "ii°", "bIII", "iv", "v", "bVI", "bVII"];

const MAJOR_GRADES: [&str; 7] = [
    "Tonic",
    "Supertonic",
    "Mediant",
    "Subdominant",
    "Dominant",
    "Submediant",
    "Leading tone",
];
const MINOR_GRADES: [&str; 7] = [
    "Tonic",
    "Supertonic",
    "Mediant",
    "Subdominant",
    "Dominant",
    "Submediant",
    "Subtonic",
];

/// Dominant seventh, stacked above the root.
const DOMINANT_SEVENTH: [u8; 4] = [0, 4, 7, 10];

/// The key the instrument is centred on, as a pitch class (0 = C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tonality(u8);

impl Tonality {
    pub fn new(pitch_class: u8) -> Self {
        Tonality(pitch_class % 12)
    }

    pub fn pitch_class(self) -> u8 {
        self.0
    }

    /// Move by `semitones`, wrapping around the octave.
    pub fn transpose(self, semitones: i32) -> Self {
        Tonality((self.0 as i32 + semitones).rem_euclid(12) as u8)
    }
}

impl fmt::Display for Tonality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NAMES[self.0 as usize])
    }
}

impl FromStr for Tonality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut chars = s.trim().chars();
        let letter = chars
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty key name"))?;
        let natural: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => anyhow::bail!("invalid key name '{s}'"),
        };
        let accidental = match chars.as_str() {
            "" => 0,
            "#" | "♯" => 1,
            "b" | "♭" => -1,
            _ => anyhow::bail!("invalid key name '{s}'"),
        };
        Ok(Tonality::new(0).transpose(natural + accidental))
    }
}

/// A chord resolved against a tonality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    /// Roman-numeral label, e.g. `IV`, `bVI`, `V7/ii`.
    pub label: String,
    /// Name of the scale degree the chord belongs to.
    pub grade: &'static str,
    /// Root as semitones above the tonic (0..12).
    pub root: u8,
    /// Chord tones as semitones above the root.
    pub intervals: Vec<u8>,
}

/// Resolve a scale degree (1..=7) to a chord.
///
/// `subordinate_minor` borrows the degree from the parallel minor scale.
/// `secondary_dominant` replaces the chord with the dominant seventh that
/// resolves onto it. Both may apply at once. Returns `None` for degrees
/// outside 1..=7.
pub fn resolve_chord(
    degree: u8,
    secondary_dominant: bool,
    subordinate_minor: bool,
) -> Option<Chord> {
    if !(1..=7).contains(&degree) {
        return None;
    }
    let step = (degree - 1) as usize;
    let (scale, labels, grades) = if subordinate_minor {
        (&MINOR_SCALE, &MINOR_LABELS, &MINOR_GRADES)
    } else {
        (&MAJOR_SCALE, &MAJOR_LABELS, &MAJOR_GRADES)
    };

    let target_root = scale[step];
    let target_label = labels[step];

    if secondary_dominant {
        let label = if step == 0 && !subordinate_minor {
            "V7".to_string()
        } else {
            format!("V7/{target_label}")
        };
        return Some(Chord {
            label,
            grade: grades[step],
            root: (target_root + 7) % 12,
            intervals: DOMINANT_SEVENTH.to_vec(),
        });
    }

    // Stack diatonic thirds: scale steps 0, 2, 4 above the degree.
    let intervals = [0, 2, 4]
        .iter()
        .map(|&third| {
            let idx = step + third;
            let semis = scale[idx % 7] + 12 * (idx / 7) as u8;
            semis - target_root
        })
        .collect();

    Some(Chord {
        label: target_label.to_string(),
        grade: grades[step],
        root: target_root,
        intervals,
    })
}

/// Semitone distance from the tonic to the diatonic step `offset` of the major
/// scale. Negative offsets walk downwards.
pub fn scale_offset(offset: i32) -> i32 {
    let octave = offset.div_euclid(7);
    let step = offset.rem_euclid(7) as usize;
    octave * 12 + MAJOR_SCALE[step] as i32
}

/// MIDI note for diatonic step `offset` above `base + tonality`, or `None`
/// when it falls outside 0..=127.
pub fn melody_note(base: u8, tonality: Tonality, offset: i32) -> Option<u8> {
    let note = base as i32 + tonality.pitch_class() as i32 + scale_offset(offset);
    u8::try_from(note).ok().filter(|n| *n <= 127)
}

/// Human-readable name of a MIDI note, e.g. `C4` for 60.
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    let name = NAMES[(note % 12) as usize];
    format!("{name}{octave}")
}
