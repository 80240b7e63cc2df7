//! Character-by-character replay of streamed text.

pub mod delay;
pub mod scheduler;

pub use delay::{DelayClass, MIN_DELAY_MS, TypingConfig, TypingUnit};
pub use scheduler::{DrainPhase, TypingScheduler};
