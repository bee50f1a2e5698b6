// Song Transport - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod error;
pub mod messaging;
pub mod project;
pub mod sequencer;
pub mod sync;

// Re-export commonly used types for convenience
pub use config::{HostSyncConfig, TransportConfig};
pub use error::{Result, TransportError};
pub use messaging::channels::create_event_channel;
pub use messaging::event::TransportEvent;
pub use project::{LoopSettings, ProjectError, SongSettings};
pub use sequencer::{
    Action, Arrangement, LoopController, MidiTime, PlayMode, PlayPosition, SongTransport,
    StopBehavior, TICKS_PER_QUARTER, Tempo, TimeSignature, Track, TrackId, TransportHandle,
};
pub use sync::{HostSync, HostSyncBlock};
