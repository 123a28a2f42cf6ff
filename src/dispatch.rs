use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::instrument::{Instrument, MELODY_BASE_NOTE, VOLUME_CONTROL};
use crate::intent::{Classifier, MusicalIntent};
use crate::theory::{self, Tonality};

/// Aligns the classifier's note indices with the instrument's scale steps.
pub const NOTE_OFFSET: i32 = 4;

const SPLASH_LABEL: &str = "Boplicity";

/// Visual style bucket for a status screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Plain,
    SubordinateMinor,
    SecondaryDominant,
    Notice,
}

impl Variant {
    /// Subordinate minor wins over secondary dominant, which wins over plain.
    pub fn for_chord(secondary_dominant: bool, subordinate_minor: bool) -> Self {
        if subordinate_minor {
            Variant::SubordinateMinor
        } else if secondary_dominant {
            Variant::SecondaryDominant
        } else {
            Variant::Plain
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Variant::Plain => 0,
            Variant::SubordinateMinor => 1,
            Variant::SecondaryDominant => 2,
            Variant::Notice => 3,
        }
    }
}

/// Draws the status screen. Each call redraws everything.
pub trait StatusRenderer {
    fn render(
        &mut self,
        state: &PerformanceState,
        label: &str,
        variant: Variant,
    ) -> anyhow::Result<()>;
}

/// Musical state of the session. Only the dispatcher writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceState {
    pub tonality: Tonality,
    pub grade: String,
    pub secondary_dominant: bool,
    pub subordinate_minor: bool,
    pub pedal_engaged: bool,
    pub gesture_enabled: bool,
}

/// Whether the input loop should keep going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub fn is_termination(event: &KeyEvent) -> bool {
    event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c')
}

/// Name of the pitch the instrument sounds for melody step `offset`.
fn melody_note_name(tonality: Tonality, offset: i32) -> String {
    theory::melody_note(MELODY_BASE_NOTE, tonality, offset)
        .map(theory::note_name)
        .unwrap_or_else(|| "-".to_string())
}

/// Turns input events into instrument actions and status screens, one event at a time.
pub struct Dispatcher<I, C, R> {
    instrument: I,
    classifier: C,
    renderer: R,
    state: PerformanceState,
}

impl<I: Instrument, C: Classifier, R: StatusRenderer> Dispatcher<I, C, R> {
    pub fn new(instrument: I, classifier: C, renderer: R, gesture_enabled: bool) -> Self {
        let state = PerformanceState {
            tonality: instrument.current_tonality(),
            grade: "?".to_string(),
            secondary_dominant: false,
            subordinate_minor: false,
            pedal_engaged: false,
            gesture_enabled,
        };
        Dispatcher {
            instrument,
            classifier,
            renderer,
            state,
        }
    }

    pub fn state(&self) -> &PerformanceState {
        &self.state
    }

    /// Draw the start screen.
    pub fn splash(&mut self) -> anyhow::Result<()> {
        self.renderer.render(&self.state, SPLASH_LABEL, Variant::Notice)
    }

    /// Handle one input event. Ctrl+C closes the instrument and returns
    /// [`Flow::Exit`]; nothing else is dispatched afterwards.
    pub fn handle(&mut self, event: &KeyEvent) -> anyhow::Result<Flow> {
        if is_termination(event) {
            log::info!("Interrupt received, closing instrument");
            self.instrument.close()?;
            return Ok(Flow::Exit);
        }

        let intent = self.classifier.classify(event);
        log::debug!("{:?} -> {intent:?}", event.code);

        match intent {
            MusicalIntent::Chord {
                degree,
                secondary_dominant,
                subordinate_minor,
            } => {
                let Some(played) =
                    self.instrument
                        .play_chord(degree, secondary_dominant, subordinate_minor)?
                else {
                    return Ok(Flow::Continue);
                };
                self.state.grade = played.grade;
                self.state.secondary_dominant = secondary_dominant;
                self.state.subordinate_minor = subordinate_minor;
                self.state.tonality = self.instrument.current_tonality();
                let variant = Variant::for_chord(secondary_dominant, subordinate_minor);
                self.renderer.render(&self.state, &played.label, variant)?;
            }
            MusicalIntent::Note { index } => {
                let offset = index - NOTE_OFFSET;
                let name = melody_note_name(self.state.tonality, offset);
                log::info!("Note {name} (offset {offset})");
                self.instrument.play_single_note(offset)?;
            }
            MusicalIntent::Transpose { semitones } => {
                self.instrument.move_tonality(semitones)?;
                self.state.tonality = self.instrument.current_tonality();
                let label = self.state.tonality.to_string();
                self.renderer.render(&self.state, &label, Variant::Notice)?;
            }
            MusicalIntent::PedalRelease => {
                self.instrument.release_pedal()?;
                self.renderer.render(&self.state, "release", Variant::Notice)?;
            }
            MusicalIntent::PedalToggle => {
                self.state.pedal_engaged = !self.state.pedal_engaged;
                let label = if self.state.pedal_engaged {
                    "Pedal ON"
                } else {
                    "Pedal OFF"
                };
                self.renderer.render(&self.state, label, Variant::Notice)?;
            }
            MusicalIntent::Mute => {
                if self.state.gesture_enabled {
                    self.instrument.send_control_change(0, VOLUME_CONTROL)?;
                    self.renderer.render(&self.state, "mute", Variant::Notice)?;
                }
            }
            MusicalIntent::None => {}
        }

        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::instrument::{ChordPlayed, MidiInstrument, MidiSettings, MidiSink};
    use crate::keymap::{KeyMap, MUTE_KEY};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Close,
        Chord(u8, bool, bool),
        Note(i32),
        Release,
        Move(i32),
        ControlChange(u8, u8),
    }

    #[derive(Default)]
    struct Log {
        calls: Vec<Call>,
        renders: Vec<(PerformanceState, String, Variant)>,
    }

    /// Records calls and answers chords with a fixed label.
    struct MockInstrument {
        log: Rc<RefCell<Log>>,
        tonality: Tonality,
        /// Key the instrument moves to while sounding a chord, if any.
        chord_moves_to: Option<Tonality>,
    }

    impl Instrument for MockInstrument {
        fn start(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn close(&mut self) -> anyhow::Result<()> {
            self.log.borrow_mut().calls.push(Call::Close);
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
            self.log
                .borrow_mut()
                .calls
                .push(Call::Chord(degree, secondary_dominant, subordinate_minor));
            if degree > 7 {
                return Ok(None);
            }
            if let Some(tonality) = self.chord_moves_to {
                self.tonality = tonality;
            }
            let (label, grade) = match degree {
                5 if secondary_dominant => ("V7", "Dominant"),
                5 => ("V", "Dominant"),
                _ => ("X", "Other"),
            };
            Ok(Some(ChordPlayed {
                label: label.to_string(),
                grade: grade.to_string(),
            }))
        }
        fn play_single_note(&mut self, offset: i32) -> anyhow::Result<()> {
            self.log.borrow_mut().calls.push(Call::Note(offset));
            Ok(())
        }
        fn release_pedal(&mut self) -> anyhow::Result<()> {
            self.log.borrow_mut().calls.push(Call::Release);
            Ok(())
        }
        fn move_tonality(&mut self, semitones: i32) -> anyhow::Result<()> {
            self.tonality = self.tonality.transpose(semitones);
            self.log.borrow_mut().calls.push(Call::Move(semitones));
            Ok(())
        }
        fn send_control_change(&mut self, value: u8, control: u8) -> anyhow::Result<()> {
            self.log
                .borrow_mut()
                .calls
                .push(Call::ControlChange(value, control));
            Ok(())
        }
    }

    struct MockRenderer {
        log: Rc<RefCell<Log>>,
    }

    impl StatusRenderer for MockRenderer {
        fn render(
            &mut self,
            state: &PerformanceState,
            label: &str,
            variant: Variant,
        ) -> anyhow::Result<()> {
            self.log
                .borrow_mut()
                .renders
                .push((state.clone(), label.to_string(), variant));
            Ok(())
        }
    }

    /// Classifier that replays a fixed intent regardless of the key.
    struct Fixed(MusicalIntent);

    impl Classifier for Fixed {
        fn classify(&self, _event: &KeyEvent) -> MusicalIntent {
            self.0
        }
    }

    fn dispatcher<C: Classifier>(
        classifier: C,
        gesture_enabled: bool,
    ) -> (
        Dispatcher<MockInstrument, C, MockRenderer>,
        Rc<RefCell<Log>>,
    ) {
        let log = Rc::new(RefCell::new(Log::default()));
        let instrument = MockInstrument {
            log: log.clone(),
            tonality: Tonality::new(0),
            chord_moves_to: None,
        };
        let renderer = MockRenderer { log: log.clone() };
        (
            Dispatcher::new(instrument, classifier, renderer, gesture_enabled),
            log,
        )
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn ctrl_c() -> KeyEvent {
        KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
    }

    fn chord(degree: u8, secondary_dominant: bool, subordinate_minor: bool) -> MusicalIntent {
        MusicalIntent::Chord {
            degree,
            secondary_dominant,
            subordinate_minor,
        }
    }

    #[test]
    fn initial_state() {
        let (d, log) = dispatcher(KeyMap::new(), false);
        assert_eq!(d.state().grade, "?");
        assert_eq!(d.state().tonality, Tonality::new(0));
        assert!(!d.state().pedal_engaged);
        assert!(!d.state().gesture_enabled);
        assert!(log.borrow().renders.is_empty());
    }

    #[test]
    fn splash_screen() {
        let (mut d, log) = dispatcher(KeyMap::new(), false);
        d.splash().unwrap();
        let renders = &log.borrow().renders;
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].1, "Boplicity");
        assert_eq!(renders[0].2.index(), 3);
    }

    #[test]
    fn secondary_dominant_chord_renders_variant_two() {
        let (mut d, log) = dispatcher(Fixed(chord(5, true, false)), false);
        assert_eq!(d.handle(&key('x')).unwrap(), Flow::Continue);

        let log = log.borrow();
        assert_eq!(log.calls, vec![Call::Chord(5, true, false)]);
        assert_eq!(log.renders.len(), 1);
        let (state, label, variant) = &log.renders[0];
        assert_eq!(label, "V7");
        assert_eq!(variant.index(), 2);
        assert_eq!(state.grade, "Dominant");
        assert!(state.secondary_dominant);
        assert!(!state.subordinate_minor);
    }

    #[test]
    fn variant_precedence() {
        for (sd, sm, expected) in [
            (false, false, 0),
            (true, false, 2),
            (false, true, 1),
            (true, true, 1),
        ] {
            let (mut d, log) = dispatcher(Fixed(chord(2, sd, sm)), false);
            d.handle(&key('x')).unwrap();
            assert_eq!(log.borrow().renders[0].2.index(), expected, "sd={sd} sm={sm}");
            assert_eq!(Variant::for_chord(sd, sm).index(), expected);
        }
    }

    #[test]
    fn unknown_degree_is_a_no_op() {
        let (mut d, log) = dispatcher(Fixed(chord(9, false, false)), false);
        let before = d.state().clone();
        assert_eq!(d.handle(&key('x')).unwrap(), Flow::Continue);
        assert_eq!(d.state(), &before);
        assert!(log.borrow().renders.is_empty());
    }

    #[test]
    fn note_is_offset_and_not_rendered() {
        let (mut d, log) = dispatcher(Fixed(MusicalIntent::Note { index: 10 }), false);
        let before = d.state().clone();
        d.handle(&key('x')).unwrap();
        assert_eq!(log.borrow().calls, vec![Call::Note(6)]);
        assert!(log.borrow().renders.is_empty());
        assert_eq!(d.state(), &before);
    }

    #[test]
    fn home_row_tonic_reaches_instrument_as_zero() {
        let (mut d, log) = dispatcher(KeyMap::new(), false);
        d.handle(&key('f')).unwrap();
        d.handle(&key('a')).unwrap();
        assert_eq!(log.borrow().calls, vec![Call::Note(0), Call::Note(-3)]);
    }

    #[test]
    fn transpose_reads_back_tonality() {
        let (mut d, log) = dispatcher(KeyMap::new(), false);
        d.handle(&KeyEvent::new(KeyCode::Up, KeyModifiers::NONE)).unwrap();
        d.handle(&KeyEvent::new(KeyCode::Left, KeyModifiers::NONE)).unwrap();

        let log = log.borrow();
        assert_eq!(log.calls, vec![Call::Move(7), Call::Move(-1)]);
        assert_eq!(log.renders[0].1, "G");
        assert_eq!(log.renders[1].1, "F#");
        assert_eq!(log.renders[1].0.tonality, Tonality::new(6));
        assert!(log.renders.iter().all(|r| r.2 == Variant::Notice));
        assert_eq!(d.state().tonality, Tonality::new(6));
    }

    #[test]
    fn chord_after_transpose_shows_fresh_tonality() {
        let (mut d, log) = dispatcher(KeyMap::new(), false);
        d.handle(&key(']')).unwrap();
        d.handle(&key('5')).unwrap();
        let log = log.borrow();
        let (state, label, variant) = &log.renders[1];
        assert_eq!(state.tonality, Tonality::new(1));
        assert_eq!(label, "V");
        assert_eq!(*variant, Variant::Plain);
    }

    #[test]
    fn chord_reads_tonality_back_from_instrument() {
        let (mut d, log) = dispatcher(Fixed(chord(1, false, false)), false);
        d.instrument.chord_moves_to = Some(Tonality::new(5));
        d.handle(&key('x')).unwrap();

        assert_eq!(log.borrow().renders[0].0.tonality, Tonality::new(5));
        assert_eq!(d.state().tonality, Tonality::new(5));
    }

    /// Output that keeps every message for inspection after the instrument moves.
    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<Vec<Vec<u8>>>>);

    impl MidiSink for SharedSink {
        fn send(&mut self, message: &[u8]) -> anyhow::Result<()> {
            self.0.borrow_mut().push(message.to_vec());
            Ok(())
        }
    }

    #[test]
    fn logged_note_name_matches_sounded_pitch() {
        let settings = MidiSettings {
            channel: 0,
            velocity: 90,
            volume: 100,
        };
        for (key, offset) in [(0, 0), (3, 2), (11, -3), (7, 9)] {
            let sink = SharedSink::default();
            let tonality = Tonality::new(key);
            let mut inst = MidiInstrument::new(sink.clone(), settings, tonality);
            inst.play_single_note(offset).unwrap();
            let sounded = sink.0.borrow()[0][1];
            assert_eq!(
                melody_note_name(tonality, offset),
                theory::note_name(sounded),
                "key={key} offset={offset}"
            );
        }
        assert_eq!(melody_note_name(Tonality::new(0), 0), "C4");
        assert_eq!(melody_note_name(Tonality::new(0), 100), "-");
    }

    #[test]
    fn pedal_toggle_alternates() {
        let (mut d, log) = dispatcher(Fixed(MusicalIntent::PedalToggle), false);
        d.handle(&key('x')).unwrap();
        assert!(d.state().pedal_engaged);
        d.handle(&key('x')).unwrap();
        assert!(!d.state().pedal_engaged);

        let log = log.borrow();
        assert!(log.calls.is_empty());
        let labels: Vec<_> = log.renders.iter().map(|r| r.1.as_str()).collect();
        assert_eq!(labels, vec!["Pedal ON", "Pedal OFF"]);
        assert!(log.renders.iter().all(|r| r.2.index() == 3));
    }

    #[test]
    fn pedal_release() {
        let (mut d, log) = dispatcher(KeyMap::new(), false);
        d.handle(&key(' ')).unwrap();
        let log = log.borrow();
        assert_eq!(log.calls, vec![Call::Release]);
        assert_eq!(log.renders[0].1, "release");
        assert_eq!(log.renders[0].2, Variant::Notice);
    }

    #[test]
    fn mute_is_inert_without_gesture_input() {
        let (mut d, log) = dispatcher(KeyMap::new(), false);
        for c in ['1', 'T', 'f', ']', ' ', '\t'] {
            d.handle(&key(c)).unwrap();
        }
        let calls_before = log.borrow().calls.len();
        let renders_before = log.borrow().renders.len();

        d.handle(&key(MUTE_KEY)).unwrap();

        assert_eq!(log.borrow().calls.len(), calls_before);
        assert_eq!(log.borrow().renders.len(), renders_before);
    }

    #[test]
    fn mute_with_gesture_input() {
        let (mut d, log) = dispatcher(KeyMap::new(), true);
        d.handle(&key(MUTE_KEY)).unwrap();
        let log = log.borrow();
        assert_eq!(log.calls, vec![Call::ControlChange(0, VOLUME_CONTROL)]);
        assert_eq!(log.renders[0].1, "mute");
        assert_eq!(log.renders[0].2, Variant::Notice);
    }

    #[test]
    fn unmapped_key_does_nothing() {
        let (mut d, log) = dispatcher(KeyMap::new(), true);
        assert_eq!(d.handle(&key('z')).unwrap(), Flow::Continue);
        assert!(log.borrow().calls.is_empty());
        assert!(log.borrow().renders.is_empty());
    }

    #[test]
    fn interrupt_closes_once_and_exits() {
        let (mut d, log) = dispatcher(Fixed(chord(1, false, false)), true);
        d.handle(&key('x')).unwrap();
        let renders_before = log.borrow().renders.len();

        assert_eq!(d.handle(&ctrl_c()).unwrap(), Flow::Exit);

        let log = log.borrow();
        assert_eq!(log.calls.iter().filter(|c| **c == Call::Close).count(), 1);
        assert_eq!(log.calls.last(), Some(&Call::Close));
        assert_eq!(log.renders.len(), renders_before);
    }

    #[test]
    fn interrupt_bypasses_classification() {
        // The classifier would ask for a chord; termination must win.
        let (mut d, log) = dispatcher(Fixed(chord(5, true, false)), false);
        assert_eq!(d.handle(&ctrl_c()).unwrap(), Flow::Exit);
        assert_eq!(log.borrow().calls, vec![Call::Close]);
    }
}
