#![allow(clippy::collapsible_if)]

mod cli;
mod config;
mod dispatch;
mod enumerate;
mod gesture;
mod input;
mod instrument;
mod intent;
mod keymap;
mod screen;
mod theory;

use std::io::Write;
use std::time::SystemTime;

use clap::Parser;
use cli::{Cli, Command};
use crossterm::event::KeyEvent;
use dispatch::{Dispatcher, Flow};
use instrument::{Instrument, MidiInstrument};
use keymap::KeyMap;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Ports) => {
            env_logger::init();
            enumerate::midi()
        }
        None => perform(cli),
    }
}

/// Custom logger that writes to stderr with \r\n line endings for raw mode.
struct RawModeLogger;

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            let secs = now.as_secs() % 86400; // time of day
            let h = secs / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            let ms = now.subsec_millis();
            let _ = write!(
                std::io::stderr(),
                "[{h:02}:{m:02}:{s:02}.{ms:03} {}] {}\r\n",
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static RAW_MODE_LOGGER: RawModeLogger = RawModeLogger;

fn perform(cli: Cli) -> anyhow::Result<()> {
    log::set_logger(&RAW_MODE_LOGGER).ok();
    log::set_max_level(
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
    );

    let gesture_enabled = cli.gesture_enabled();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(output) = cli.midi_output {
        config.midi.output = Some(output);
    }
    if let Some(device) = cli.gesture_device {
        config.gesture.device = Some(device);
    }
    if let Some(channel) = cli.channel {
        config.midi.channel = channel;
    }

    let settings = config.midi_settings()?;
    let tonality = config.tonality()?;

    // Closes itself on drop, so every exit path below silences the instrument.
    let (output, output_name) = instrument::open_output(config.midi.output.as_deref())?;
    let mut instrument = MidiInstrument::new(output, settings, tonality);
    instrument.start()?;

    // Keyboard and gesture controller feed one queue; only this thread dispatches.
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<KeyEvent>();

    let gesture = if gesture_enabled {
        log::info!("Gesture input enabled");
        let source =
            gesture::GestureSource::open(&config.gesture, &output_name, event_tx.clone())?;
        log::info!("Gesture inputs connected: {}", source.connection_count());
        Some(source)
    } else {
        None
    };

    log::info!("Playing in {tonality}. Ctrl+C to quit.");

    let screen = screen::TerminalScreen::enter()?;
    input::spawn_keyboard(event_tx)?;

    let mut dispatcher = Dispatcher::new(instrument, KeyMap::new(), screen, gesture_enabled);
    dispatcher.splash()?;

    for event in event_rx.iter() {
        if dispatcher.handle(&event)? == Flow::Exit {
            break;
        }
    }

    let final_key = dispatcher.state().tonality;

    // Restore the terminal before the gesture connections go away.
    drop(dispatcher);
    drop(gesture);
    log::info!("Stopped in {final_key}");

    Ok(())
}
