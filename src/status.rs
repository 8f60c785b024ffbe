use colored::Colorize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    /// Joining the network.
    Connecting,
    Online,
    Offline,
    /// Short flash on every detected peak.
    Beat,
    /// Last transmission failed.
    Error,
}

pub trait StatusIndicator {
    fn set(&mut self, state: LedState);
}

impl<I: StatusIndicator + ?Sized> StatusIndicator for Box<I> {
    fn set(&mut self, state: LedState) {
        (**self).set(state)
    }
}

/// Status LED for runs without one.
#[derive(Debug, Default)]
pub struct NullIndicator;

impl StatusIndicator for NullIndicator {
    fn set(&mut self, _state: LedState) {}
}

/// Renders the status LED on the terminal. Steady states print on change only.
pub struct ConsoleLed<W: Write> {
    pin: u8,
    show_beats: bool,
    last: Option<LedState>,
    out: W,
}

impl ConsoleLed<std::io::Stdout> {
    pub fn stdout(pin: u8, show_beats: bool) -> Self {
        Self::new(pin, show_beats, std::io::stdout())
    }
}

impl<W: Write> ConsoleLed<W> {
    pub fn new(pin: u8, show_beats: bool, out: W) -> Self {
        Self {
            pin,
            show_beats,
            last: None,
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatusIndicator for ConsoleLed<W> {
    fn set(&mut self, state: LedState) {
        let pin = format!("[GPIO{}]", self.pin);
        let label = match state {
            LedState::Beat => {
                if self.show_beats {
                    let _ = writeln!(self.out, "{} {}", pin.as_str().dimmed(), "♥".red());
                }
                return;
            }
            LedState::Connecting => "connecting".yellow(),
            LedState::Online => "online".green(),
            LedState::Offline => "offline".red(),
            LedState::Error => "transmission error".red().bold(),
        };

        if self.last == Some(state) {
            return;
        }
        self.last = Some(state);
        let _ = writeln!(self.out, "{} {}", pin.as_str().dimmed(), label);
    }
}
