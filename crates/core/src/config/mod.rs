use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{error::positive_rate, FrameSize, PlayMode, Result, SyncMode};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

impl AppConfig {
    /// Reads and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        positive_rate("scheduler target rate", self.scheduler.target_rate)?;
        for track in &self.tracks {
            positive_rate("track fps", track.fps)?;
        }
        Ok(())
    }
}

/// Configuration of the scheduler loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub target_rate: f64,
    pub diagnostics: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_rate: 35.0,
            diagnostics: false,
        }
    }
}

/// Where a track's frames come from and how it plays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub sync: SyncMode,
    #[serde(default)]
    pub playback: PlayMode,
    #[serde(default)]
    pub size: FrameSize,
    /// Terminal cell (column, row) of the frame's top-left corner, 1-based.
    #[serde(default = "default_origin")]
    pub origin: (u16, u16),
}

fn default_fps() -> f64 {
    24.0
}

fn default_origin() -> (u16, u16) {
    (1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_in_defaults() {
        let config = AppConfig::from_json(
            r#"{ "tracks": [ { "name": "fire", "path": "frames/fire" } ] }"#,
        )
        .unwrap();

        assert_eq!(config.scheduler.target_rate, 35.0);
        assert!(!config.scheduler.diagnostics);
        let track = &config.tracks[0];
        assert_eq!(track.fps, 24.0);
        assert_eq!(track.sync, SyncMode::Synced);
        assert_eq!(track.playback, PlayMode::Loop);
        assert_eq!(track.size, FrameSize::new(32, 32));
        assert_eq!(track.origin, (1, 1));
    }

    #[test]
    fn parses_explicit_modes() {
        let config = AppConfig::from_json(
            r#"{
                "scheduler": { "target_rate": 60, "diagnostics": true },
                "tracks": [ {
                    "name": "hud", "path": "hud", "fps": 12,
                    "sync": "unsynced", "playback": "once",
                    "size": { "width": 8, "height": 4 }, "origin": [10, 3]
                } ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.scheduler.target_rate, 60.0);
        let track = &config.tracks[0];
        assert_eq!(track.sync, SyncMode::Unsynced);
        assert_eq!(track.playback, PlayMode::Once);
        assert_eq!(track.origin, (10, 3));
    }

    #[test]
    fn rejects_zero_rates() {
        let err = AppConfig::from_json(r#"{ "scheduler": { "target_rate": 0 } }"#).unwrap_err();
        assert!(format!("{err}").contains("scheduler target rate"));

        let err = AppConfig::from_json(
            r#"{ "tracks": [ { "name": "a", "path": "a", "fps": -2 } ] }"#,
        )
        .unwrap_err();
        assert!(format!("{err}").contains("track fps"));
    }

    #[test]
    fn reports_malformed_json() {
        assert!(matches!(
            AppConfig::from_json("{ not json"),
            Err(crate::FlipbookError::Json(_))
        ));
    }
}
