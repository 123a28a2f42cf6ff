use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyEvent};

/// Read terminal key events on a background thread and push them into the
/// performance queue. The thread ends when the queue is closed or the
/// terminal stops delivering events.
pub fn spawn_keyboard(sender: Sender<KeyEvent>) -> anyhow::Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("keyboard".into())
        .spawn(move || {
            loop {
                match event::read() {
                    Ok(Event::Key(key)) => {
                        if sender.send(key).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log::error!("Keyboard read failed: {e}");
                        break;
                    }
                }
            }
        })?;
    Ok(handle)
}
