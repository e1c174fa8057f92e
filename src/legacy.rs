//! Backward-compatible text commands.
//!
//! Older nodes exchange bare strings (`readtds`, `pm1`, `flow`, ...). Only
//! `powled0` and `powled1` change local state; everything else is ignored.

use std::fmt;

use tracing::{debug, info};

/// A text command that affects this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCommand {
    /// Switch the power LED (`powled1` on, `powled0` off)
    PowerLed(bool),
}

impl LegacyCommand {
    /// Recognise an exact command string.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "powled0" => Some(Self::PowerLed(false)),
            "powled1" => Some(Self::PowerLed(true)),
            _ => None,
        }
    }
}

impl fmt::Display for LegacyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerLed(on) => write!(f, "powled{}", u8::from(*on)),
        }
    }
}

/// Output line driving the LED.
pub trait LedOutput: Send {
    /// Drive the output high (`true`) or low.
    fn set_level(&mut self, high: bool);
}

/// Power LED state; starts off.
#[derive(Debug)]
pub struct PowerLed<O: LedOutput> {
    output: O,
    on: bool,
}

impl<O: LedOutput> PowerLed<O> {
    /// Take ownership of `output` and drive it low.
    pub fn new(output: O) -> Self {
        let mut led = Self { output, on: false };
        led.apply();
        led
    }

    /// Apply `text` if it is a recognised command.
    ///
    /// Returns `true` when the text was a command.
    pub fn handle_text(&mut self, text: &str) -> bool {
        debug!(text, "legacy rx");
        match LegacyCommand::parse(text) {
            Some(LegacyCommand::PowerLed(on)) => {
                self.on = on;
                self.apply();
                true
            }
            None => false,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.on
    }

    /// The driven output.
    pub const fn output(&self) -> &O {
        &self.output
    }

    fn apply(&mut self) {
        self.output.set_level(self.on);
        info!(state = u8::from(self.on), "power led applied");
    }
}
