// Simulated assistant: scripted replies and delivery acknowledgements.
// Both engines are plain timers with no transport behind them.

pub mod progression;
pub mod responder;

pub use progression::StatusProgression;
pub use responder::{ResponseGenerator, Topic};
