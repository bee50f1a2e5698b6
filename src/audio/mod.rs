// Audio module - Output device driving the transport clock

pub mod engine;

pub use engine::{AudioEngine, AudioError, PeriodClock};
