// Loop Controller - Loop points and stop behaviour of one timeline

use serde::{Deserialize, Serialize};

/// What happens to the play position when playback stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopBehavior {
    /// Rewind to tick 0
    ReturnToZero,
    /// Rewind to the tick playback was started from
    #[default]
    ReturnToSavedStart,
    /// Leave the position where it stopped
    KeepPosition,
}

/// Loop region and stop policy attached to a play position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopController {
    loop_begin: i64,
    loop_end: i64,
    loop_enabled: bool,
    stop_behavior: StopBehavior,
    saved_position: Option<i64>,
}

impl LoopController {
    /// Loop over the first two tacts by default, with looping off
    pub fn new(ticks_per_tact: i64) -> Self {
        Self {
            loop_begin: 0,
            loop_end: ticks_per_tact * 2,
            loop_enabled: false,
            stop_behavior: StopBehavior::default(),
            saved_position: None,
        }
    }

    pub fn loop_begin(&self) -> i64 {
        self.loop_begin
    }

    pub fn loop_end(&self) -> i64 {
        self.loop_end
    }

    /// Set loop region. Bounds are reordered so that begin <= end.
    pub fn set_loop_points(&mut self, begin: i64, end: i64) {
        let begin = begin.max(0);
        let end = end.max(0);
        self.loop_begin = begin.min(end);
        self.loop_end = begin.max(end);
    }

    pub fn loop_points_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop_points_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    pub fn toggle_loop_points(&mut self) {
        self.loop_enabled = !self.loop_enabled;
    }

    /// True if `ticks` lies in [loop_begin, loop_end)
    pub fn contains(&self, ticks: i64) -> bool {
        ticks >= self.loop_begin && ticks < self.loop_end
    }

    pub fn stop_behavior(&self) -> StopBehavior {
        self.stop_behavior
    }

    pub fn set_stop_behavior(&mut self, behavior: StopBehavior) {
        self.stop_behavior = behavior;
    }

    pub fn saved_position(&self) -> Option<i64> {
        self.saved_position
    }

    pub fn save_position(&mut self, ticks: i64) {
        self.saved_position = Some(ticks);
    }

    /// Take the saved position, leaving "none" behind
    pub fn take_saved_position(&mut self) -> Option<i64> {
        self.saved_position.take()
    }
}
