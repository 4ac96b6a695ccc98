//! Terminal event pump.
//!
//! A background task polls crossterm and forwards the events the explorer
//! cares about over a channel, so the main loop can `select!` on them while
//! a workspace operation is in flight.

use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseEvent};
use tokio::sync::mpsc;

/// Events consumed by the main loop.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Bracketed paste, only delivered to text prompts.
    Paste(String),
    Resize(u16, u16),
    /// The terminal lost focus; a good moment to flush state to disk.
    FocusLost,
    Tick,
}

impl AppEvent {
    fn from_crossterm(ev: CtEvent) -> Option<Self> {
        Some(match ev {
            CtEvent::Key(k) => AppEvent::Key(k),
            CtEvent::Mouse(m) => AppEvent::Mouse(m),
            CtEvent::Paste(text) => AppEvent::Paste(text),
            CtEvent::Resize(w, h) => AppEvent::Resize(w, h),
            CtEvent::FocusLost => AppEvent::FocusLost,
            _ => return None,
        })
    }
}

/// Spawn the reader.  It stops once the receiver is dropped.
pub fn spawn_event_reader(tick_rate: Duration) -> mpsc::UnboundedReceiver<AppEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || loop {
        let next = match event::poll(tick_rate) {
            Ok(true) => match event::read() {
                Ok(ev) => AppEvent::from_crossterm(ev),
                Err(err) => {
                    tracing::warn!(%err, "terminal read failed");
                    None
                }
            },
            Ok(false) => Some(AppEvent::Tick),
            Err(err) => {
                tracing::warn!(%err, "terminal poll failed");
                return;
            }
        };
        if let Some(ev) = next {
            if tx.send(ev).is_err() {
                return;
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn focus_gained_is_dropped() {
        assert!(AppEvent::from_crossterm(CtEvent::FocusGained).is_none());
        assert!(matches!(
            AppEvent::from_crossterm(CtEvent::FocusLost),
            Some(AppEvent::FocusLost)
        ));
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(matches!(
            AppEvent::from_crossterm(CtEvent::Key(key)),
            Some(AppEvent::Key(k)) if k == key
        ));
    }
}
