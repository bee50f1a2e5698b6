// Project persistence - Song-level transport settings saved with a project

pub mod serialization;
pub mod settings;

pub use serialization::{SettingsFormat, load_settings, save_settings};
pub use settings::{LoopSettings, SongSettings};

/// Project error types
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid project structure: {0}")]
    InvalidStructure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),
}
