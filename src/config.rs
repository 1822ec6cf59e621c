//! Game Configuration
//!
//! Window, physics and pacing settings read from a RON file at startup:
//!
//! ```ron
//! (
//!     title: "Pyramid",
//!     gravity: (0.0, -9.81, 0.0),
//!     fps_limit: Fps60,
//!     show_debug: true,
//! )
//! ```
//!
//! Every field has a default, so a partial file (or no file) is fine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::game::FpsLimit;
use crate::render::DEFAULT_BACKGROUND;

/// Error type for config loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::SerializeError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub title: String,
    pub window_width: i32,
    pub window_height: i32,
    pub gravity: [f32; 3],
    /// Physics step length in seconds
    pub timestep: f32,
    pub fps_limit: FpsLimit,
    /// Show debug wireframes on every entity
    pub show_debug: bool,
    /// Clear color, 0xRRGGBB
    pub background: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: "Pyramid".to_string(),
            window_width: 1280,
            window_height: 720,
            gravity: [0.0, -9.81, 0.0],
            timestep: 1.0 / 60.0,
            fps_limit: FpsLimit::default(),
            show_debug: false,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl GameConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_ron_str(&contents).map_err(|e| {
                log::error!("Failed to parse config {}: {}", path.display(), e);
                e
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = GameConfig::from_ron_str("(title: \"Test\", fps_limit: Fps30)").unwrap();
        assert_eq!(config.title, "Test");
        assert_eq!(config.fps_limit, FpsLimit::Fps30);
        assert_eq!(config.gravity, [0.0, -9.81, 0.0]);
        assert_eq!(config.background, DEFAULT_BACKGROUND);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = GameConfig::load(dir.path().join("missing.ron")).unwrap();
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.ron");
        let config = GameConfig {
            show_debug: true,
            timestep: 1.0 / 30.0,
            ..GameConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(GameConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_bad_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.ron");
        std::fs::write(&path, "(gravity: \"down\")").unwrap();
        assert!(matches!(GameConfig::load(&path), Err(ConfigError::ParseError(_))));
    }
}
