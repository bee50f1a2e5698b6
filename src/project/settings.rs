// Song settings - Tempo, signature, master controls and loop region of a song

use serde::{Deserialize, Serialize};

use super::ProjectError;
use crate::sequencer::loop_controller::{LoopController, StopBehavior};
use crate::sequencer::timeline::{MAX_TEMPO, MIN_TEMPO, TimeSignature};
use crate::sequencer::transport::{MAX_MASTER_PITCH, MAX_MASTER_VOLUME, MIN_MASTER_PITCH};

/// Loop region of the song timeline as stored in a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSettings {
    pub begin: i64,
    pub end: i64,
    pub enabled: bool,
    #[serde(default)]
    pub stop_behavior: StopBehavior,
}

impl LoopSettings {
    pub fn apply_to(&self, timeline: &mut LoopController) {
        timeline.set_loop_points(self.begin, self.end);
        timeline.set_loop_points_enabled(self.enabled);
        timeline.set_stop_behavior(self.stop_behavior);
    }
}

impl From<&LoopController> for LoopSettings {
    fn from(timeline: &LoopController) -> Self {
        Self {
            begin: timeline.loop_begin(),
            end: timeline.loop_end(),
            enabled: timeline.loop_points_enabled(),
            stop_behavior: timeline.stop_behavior(),
        }
    }
}

/// Transport-level state persisted with a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SongSettings {
    pub bpm: u16,
    pub time_signature: TimeSignature,
    pub master_volume: u16,
    pub master_pitch: i8,
    pub loop_points: Option<LoopSettings>,
}

impl Default for SongSettings {
    fn default() -> Self {
        Self {
            bpm: 140,
            time_signature: TimeSignature::four_four(),
            master_volume: 100,
            master_pitch: 0,
            loop_points: None,
        }
    }
}

impl SongSettings {
    /// Reject values a saved song can never legitimately contain
    pub fn validate(&self) -> Result<(), ProjectError> {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&self.bpm) {
            return Err(ProjectError::InvalidStructure(format!(
                "Tempo must be between {} and {} BPM",
                MIN_TEMPO, MAX_TEMPO
            )));
        }

        let ts = self.time_signature;
        if !(1..=32).contains(&ts.numerator) || !(1..=32).contains(&ts.denominator) {
            return Err(ProjectError::InvalidStructure(
                "Time signature parts must be between 1 and 32".to_string(),
            ));
        }

        if self.master_volume > MAX_MASTER_VOLUME {
            return Err(ProjectError::InvalidStructure(format!(
                "Master volume cannot exceed {}%",
                MAX_MASTER_VOLUME
            )));
        }

        if !(MIN_MASTER_PITCH..=MAX_MASTER_PITCH).contains(&self.master_pitch) {
            return Err(ProjectError::InvalidStructure(
                "Master pitch must be within one octave".to_string(),
            ));
        }

        if let Some(loop_points) = &self.loop_points
            && (loop_points.begin < 0 || loop_points.end < loop_points.begin)
        {
            return Err(ProjectError::InvalidStructure(format!(
                "Invalid loop region {}..{}",
                loop_points.begin, loop_points.end
            )));
        }

        Ok(())
    }
}
