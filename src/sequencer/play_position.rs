// Play Position - Cursor into one timeline (song, track, BB or pattern)

use super::loop_controller::LoopController;
use super::timeline::MidiTime;
use std::fmt;

/// Which timeline drives playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayMode {
    #[default]
    None,
    PlaySong,
    PlayTrack,
    PlayBB,
    PlayPattern,
}

impl PlayMode {
    pub const COUNT: usize = 5;

    pub const ALL: [PlayMode; Self::COUNT] = [
        PlayMode::None,
        PlayMode::PlaySong,
        PlayMode::PlayTrack,
        PlayMode::PlayBB,
        PlayMode::PlayPattern,
    ];

    /// Slot of this mode in per-mode arrays
    pub fn index(self) -> usize {
        match self {
            PlayMode::None => 0,
            PlayMode::PlaySong => 1,
            PlayMode::PlayTrack => 2,
            PlayMode::PlayBB => 3,
            PlayMode::PlayPattern => 4,
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayMode::None => write!(f, "None"),
            PlayMode::PlaySong => write!(f, "Song"),
            PlayMode::PlayTrack => write!(f, "Track"),
            PlayMode::PlayBB => write!(f, "Beat/Bassline"),
            PlayMode::PlayPattern => write!(f, "Pattern"),
        }
    }
}

/// Tick cursor plus the fractional frame count accumulated inside the current tick
#[derive(Debug, Clone, Default)]
pub struct PlayPosition {
    ticks: i64,
    current_frame: f64,
    timeline: Option<LoopController>,
}

impl PlayPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn set_ticks(&mut self, ticks: i64) {
        self.ticks = ticks;
    }

    pub fn time(&self) -> MidiTime {
        MidiTime(self.ticks)
    }

    pub fn tact(&self, ticks_per_tact: i64) -> i64 {
        self.time().tact(ticks_per_tact)
    }

    pub fn current_frame(&self) -> f64 {
        self.current_frame
    }

    pub fn set_current_frame(&mut self, frame: f64) {
        self.current_frame = frame;
    }

    /// Zero both the tick and the frame-within-tick
    pub fn reset(&mut self) {
        self.ticks = 0;
        self.current_frame = 0.0;
    }

    pub fn timeline(&self) -> Option<&LoopController> {
        self.timeline.as_ref()
    }

    pub fn timeline_mut(&mut self) -> Option<&mut LoopController> {
        self.timeline.as_mut()
    }

    pub fn attach_timeline(&mut self, timeline: LoopController) {
        self.timeline = Some(timeline);
    }

    pub fn detach_timeline(&mut self) -> Option<LoopController> {
        self.timeline.take()
    }
}
