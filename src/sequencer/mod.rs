// Sequencer module
// Musical time, play positions, loop points and the song transport scheduler

pub mod action;
pub mod content;
pub mod loop_controller;
pub mod play_position;
pub mod timeline;
pub mod transport;

pub use action::{Action, ActionQueue};
pub use content::{
    Arrangement, BeatBassline, BeatBasslines, ContentList, NoteRegistry, NullNoteRegistry,
    PatternRef, Track, TrackId,
};
pub use loop_controller::{LoopController, StopBehavior};
pub use play_position::{PlayMode, PlayPosition};
pub use timeline::{
    DEFAULT_TEMPO, DEFAULT_TICKS_PER_TACT, MAX_TEMPO, MIN_TEMPO, MidiTime, TICKS_PER_QUARTER,
    Tempo, TimeSignature,
};
pub use transport::{SongTransport, TransportHandle};
