use std::collections::VecDeque;
use std::time::Duration;

use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent,
};
use tokio::sync::mpsc;

/// Chooser events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// A periodic tick for rendering.
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
}

/// Anything the modal loop can pull events from.
///
/// `None` means the stream is closed; the dialog treats that like closing its
/// window.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    async fn next_event(&mut self) -> Option<Event>;
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    let forwarded = match event::read() {
                        // Windows reports releases too
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            tx.send(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Mouse(mouse)) => tx.send(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Resize(w, h)) => tx.send(Event::Resize(w, h)),
                        _ => Ok(()),
                    };
                    if forwarded.is_err() {
                        break;
                    }
                } else if tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl EventSource for EventHandler {
    async fn next_event(&mut self) -> Option<Event> {
        self.next().await
    }
}

/// A fixed sequence of events, closed once exhausted.
#[derive(Debug, Default, Clone)]
pub struct ScriptedEvents {
    queue: VecDeque<Event>,
}

impl ScriptedEvents {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }

    /// Plain key presses without modifiers.
    pub fn keys(codes: impl IntoIterator<Item = KeyCode>) -> Self {
        Self::new(
            codes
                .into_iter()
                .map(|code| Event::Key(KeyEvent::new(code, KeyModifiers::NONE))),
        )
    }

    /// Each character typed as a key press.
    pub fn typed(text: &str) -> Self {
        Self::keys(text.chars().map(KeyCode::Char))
    }

    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn push_key(&mut self, code: KeyCode) {
        self.push(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    pub fn extend(&mut self, other: ScriptedEvents) {
        self.queue.extend(other.queue);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl EventSource for ScriptedEvents {
    async fn next_event(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }
}
