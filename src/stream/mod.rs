//! Stream utilities

mod clock;

pub use clock::{ClockReading, RunningClock};
