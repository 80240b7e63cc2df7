use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::Display;

/// Lower bound for any inter-character delay, after jitter.
pub const MIN_DELAY_MS: f64 = 10.0;

pub const DEFAULT_BASE_DELAY_MS: u64 = 30;
pub const DEFAULT_JITTER_RATIO: f64 = 0.2;

/// Pause category of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DelayClass {
    Normal,
    Space,
    Punctuation,
    Newline,
}

impl DelayClass {
    pub fn of(ch: char) -> Self {
        match ch {
            ' ' => DelayClass::Space,
            '.' | '!' | '?' | ',' | ';' | ':' => DelayClass::Punctuation,
            '\n' => DelayClass::Newline,
            _ => DelayClass::Normal,
        }
    }

    /// Factor applied to the base delay.
    pub fn multiplier(self) -> f64 {
        match self {
            DelayClass::Normal => 1.0,
            DelayClass::Space => 0.5,
            DelayClass::Punctuation => 2.0,
            DelayClass::Newline => 3.0,
        }
    }
}

/// A queued character with its pause category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingUnit {
    pub ch: char,
    pub class: DelayClass,
}

impl TypingUnit {
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            class: DelayClass::of(ch),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingConfig {
    /// Delay for an ordinary character, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Symmetric jitter as a fraction of the class-adjusted delay.
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_jitter_ratio() -> f64 {
    DEFAULT_JITTER_RATIO
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

impl TypingConfig {
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Class-adjusted delay in milliseconds, before jitter and flooring.
    pub fn adjusted_delay_ms(&self, class: DelayClass) -> f64 {
        self.base_delay_ms as f64 * class.multiplier()
    }

    /// Delay to wait after emitting a character of `class`.
    pub fn delay_for<R: Rng + ?Sized>(&self, class: DelayClass, rng: &mut R) -> Duration {
        let adjusted = self.adjusted_delay_ms(class);
        let ratio = self.jitter_ratio.clamp(0.0, 1.0);
        let jitter = if ratio > 0.0 && adjusted > 0.0 {
            rng.gen_range(-ratio..=ratio) * adjusted
        } else {
            0.0
        };
        let millis = (adjusted + jitter).max(MIN_DELAY_MS);
        Duration::from_micros((millis * 1000.0).round() as u64)
    }
}
