/// Persistent application settings
///
/// Stored as JSON in the user's config directory:
/// - Linux: ~/.config/lazy-gallery/settings.json
/// - macOS: ~/Library/Application Support/lazy-gallery/settings.json
/// - Windows: %APPDATA%\lazy-gallery\settings.json
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors while reading or writing the settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine the user config directory")]
    NoConfigDir,
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// All user-tunable values
///
/// Missing fields in the JSON file fall back to their defaults, so
/// older settings files keep working when new fields are added.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    // ========== Source ==========
    /// Directory scanned (recursively) for images
    pub images_dir: PathBuf,

    // ========== List layout ==========
    /// Height of one row in logical pixels
    pub row_height: f32,

    /// Gap between two rows in logical pixels
    pub row_spacing: f32,

    /// Extra rows kept in the pool beyond the ones that fit on screen.
    /// Their images are decoded ahead of time for smooth scrolling.
    pub preload_rows: usize,

    /// Longest side (in pixels) decoded images are reduced to
    pub max_decode_size: u32,

    // ========== Window ==========
    pub window_width: f32,
    pub window_height: f32,

    // ========== Packaging ==========
    /// Whether `bundle` copies the images folder next to the build output
    pub copy_images_on_bundle: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("Images"),
            row_height: 120.0,
            row_spacing: 10.0,
            preload_rows: 6,
            max_decode_size: 512,
            window_width: 720.0,
            window_height: 900.0,
            copy_images_on_bundle: false,
        }
    }
}

impl Settings {
    /// Convert to JSON string for storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Default location of the settings file
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or(SettingsError::NoConfigDir)?;

        path.push("lazy-gallery");
        path.push("settings.json");
        Ok(path)
    }

    /// Read settings from `path`.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(json) => Ok(Self::from_json(&json)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load settings, logging and falling back to defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Ok(path) => path,
                Err(e) => {
                    warn!("⚠️  {}; using default settings", e);
                    return Self::default();
                }
            },
        };

        match Self::load_from(&path) {
            Ok(settings) => {
                info!(path = %path.display(), "settings loaded");
                settings
            }
            Err(e) => {
                warn!("⚠️  {}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Write settings to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_json()?).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization() {
        let mut settings = Settings::default();
        settings.row_height = 200.0;
        settings.copy_images_on_bundle = true;

        let json = settings.to_json().unwrap();
        let restored = Settings::from_json(&json).unwrap();

        assert_eq!(settings, restored);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let restored = Settings::from_json(r#"{ "preload_rows": 2 }"#).unwrap();

        assert_eq!(restored.preload_rows, 2);
        assert_eq!(restored.row_height, Settings::default().row_height);
        assert_eq!(restored.images_dir, PathBuf::from("Images"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.images_dir = PathBuf::from("/srv/photos");
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Json(_))));
        assert_eq!(Settings::load_or_default(Some(&path)), Settings::default());
    }
}
