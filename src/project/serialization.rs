// Serialization utilities for song settings (RON or JSON)

use std::fs;
use std::path::Path;

use super::ProjectError;
use super::settings::SongSettings;

/// On-disk format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Ron,
    Json,
}

impl SettingsFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SettingsFormat::Json,
            _ => SettingsFormat::Ron,
        }
    }
}

pub fn serialize_to_ron(settings: &SongSettings) -> Result<String, ProjectError> {
    Ok(ron::ser::to_string_pretty(
        settings,
        ron::ser::PrettyConfig::default(),
    )?)
}

pub fn deserialize_from_ron(data: &str) -> Result<SongSettings, ProjectError> {
    ron::from_str(data).map_err(|e| ProjectError::Ron(e.code))
}

pub fn serialize_to_json(settings: &SongSettings) -> Result<String, ProjectError> {
    Ok(serde_json::to_string_pretty(settings)?)
}

pub fn deserialize_from_json(data: &str) -> Result<SongSettings, ProjectError> {
    Ok(serde_json::from_str(data)?)
}

/// Write settings to `path`, format chosen by extension
pub fn save_settings(path: &Path, settings: &SongSettings) -> Result<(), ProjectError> {
    settings.validate()?;
    let text = match SettingsFormat::from_path(path) {
        SettingsFormat::Ron => serialize_to_ron(settings)?,
        SettingsFormat::Json => serialize_to_json(settings)?,
    };
    fs::write(path, text)?;
    log::info!("Song settings saved to {}", path.display());
    Ok(())
}

/// Read and validate settings from `path`
pub fn load_settings(path: &Path) -> Result<SongSettings, ProjectError> {
    let text = fs::read_to_string(path)?;
    let settings = match SettingsFormat::from_path(path) {
        SettingsFormat::Ron => deserialize_from_ron(&text)?,
        SettingsFormat::Json => deserialize_from_json(&text)?,
    };
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SettingsFormat::from_path(&PathBuf::from("song.JSON")),
            SettingsFormat::Json
        );
        assert_eq!(
            SettingsFormat::from_path(&PathBuf::from("song.ron")),
            SettingsFormat::Ron
        );
        assert_eq!(
            SettingsFormat::from_path(&PathBuf::from("song")),
            SettingsFormat::Ron
        );
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let settings = deserialize_from_ron("(bpm: 96)").unwrap();
        assert_eq!(settings.bpm, 96);
        assert_eq!(settings.master_volume, 100);
        assert!(settings.loop_points.is_none());
    }

    #[test]
    fn test_malformed_json_is_reported() {
        assert!(matches!(
            deserialize_from_json("{ \"bpm\": \"fast\" }"),
            Err(ProjectError::Json(_))
        ));
    }
}
