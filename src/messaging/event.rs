// Transport events - Audio/control thread → UI and persistence

use crate::sequencer::PlayMode;

/// Notification emitted when observable transport state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    TempoChanged(u16),
    TimeSignatureChanged {
        old_ticks_per_tact: i64,
        new_ticks_per_tact: i64,
    },
    /// Song length in tacts
    LengthChanged(i64),
    /// Master volume in percent
    MasterVolumeChanged(u16),
    PlaybackStarted(PlayMode),
    PlaybackStopped(PlayMode),
    Paused,
    Resumed,
}
