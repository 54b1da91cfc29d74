use crate::error::RadioError;
use crate::station::Status;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tokio::sync::oneshot;

/// Abstract control signal. Buttons, the IR remote and the web page all map
/// onto this set; the controller never learns where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Left,
    Right,
    Up,
    Down,
    /// Center button / remote Play.
    Power,
    Menu,
}

impl Event {
    pub const ALL: [Event; 6] = [
        Event::Left,
        Event::Right,
        Event::Up,
        Event::Down,
        Event::Power,
        Event::Menu,
    ];

    /// Canonical lowercase name, accepted back by `FromStr`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Event::Left => "left",
            Event::Right => "right",
            Event::Up => "up",
            Event::Down => "down",
            Event::Power => "power",
            Event::Menu => "menu",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Event {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "prev" => Ok(Event::Left),
            "right" | "next" => Ok(Event::Right),
            "up" | "vol_up" => Ok(Event::Up),
            "down" | "vol_down" => Ok(Event::Down),
            "power" | "center" | "play" => Ok(Event::Power),
            "menu" => Ok(Event::Menu),
            _ => Err(RadioError::UnknownEvent(s.to_string())),
        }
    }
}

/// Snapshot sent back to web callers after their event has been handled,
/// and published for passive page views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RadioStatus {
    pub power: bool,
    pub station: String,
    pub status: Status,
}

impl RadioStatus {
    #[must_use]
    pub fn off() -> Self {
        Self::default()
    }
}

/// One item on the controller's mailbox.
#[derive(Debug)]
pub struct Input {
    pub event: Event,
    /// Present for web-originated events; the controller sends exactly one
    /// `RadioStatus` on it.
    pub reply: Option<oneshot::Sender<RadioStatus>>,
}

impl Input {
    /// Fire-and-forget input from a button or the remote.
    #[must_use]
    pub const fn fire(event: Event) -> Self {
        Self { event, reply: None }
    }

    /// Rendezvous input: the returned receiver resolves once the controller
    /// has handled the event.
    #[must_use]
    pub fn request(event: Event) -> (Self, oneshot::Receiver<RadioStatus>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                event,
                reply: Some(tx),
            },
            rx,
        )
    }
}
