//! Session configuration
//!
//! All options have defaults; JSON input uses camelCase keys and may omit any
//! field. Environment overrides use the `SHAKTRIS_` prefix.

use serde::{Deserialize, Serialize};

use crate::types::{
    BASE_FALL_INTERVAL_MS, DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH, DEFAULT_HOME_ZONE_HEIGHT,
    DEFAULT_HOME_ZONE_WIDTH, DEFAULT_ROW_CLEAR_THRESHOLD, DEFAULT_SPAWN_HEIGHT,
    TETROMINO_SPAWN_INTERVAL_MS,
};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board must be at least 4x4, got {width}x{height}")]
    BoardTooSmall { width: u16, height: u16 },

    #[error("home zone {width}x{height} does not fit a {board_width}x{board_height} board")]
    HomeZoneTooLarge {
        width: u16,
        height: u16,
        board_width: u16,
        board_height: u16,
    },

    #[error("row clear threshold must be in 1..={max}, got {value}")]
    InvalidThreshold { value: u16, max: u16 },

    #[error("base fall interval must be positive")]
    ZeroFallInterval,

    #[error("spawn height must be positive")]
    ZeroSpawnHeight,

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error(transparent)]
    Json(#[from] JsonError),
}

/// Wrapper so `ConfigError` stays `PartialEq`
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid config json: {0}")]
pub struct JsonError(pub String);

/// Game session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub board_width: u16,
    pub board_height: u16,
    pub row_clear_threshold: u16,
    pub home_zone_width: u16,
    pub home_zone_height: u16,
    /// Delay (ms) between entering the tetromino phase and the automatic spawn
    #[serde(alias = "tetrominoSpawnInterval")]
    pub tetromino_spawn_interval_ms: u32,
    #[serde(alias = "baseFallInterval")]
    pub base_fall_interval_ms: u32,
    /// Fall interval per level (index 0 = level 1). Empty means `base / level`.
    pub fall_speed_table: Vec<u32>,
    pub spawn_height: u8,
    /// Phase length after which a stalled phase is forced forward
    #[serde(alias = "turnTimeLimit")]
    pub turn_time_limit_ms: Option<u32>,
    pub seed: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: DEFAULT_BOARD_WIDTH,
            board_height: DEFAULT_BOARD_HEIGHT,
            row_clear_threshold: DEFAULT_ROW_CLEAR_THRESHOLD,
            home_zone_width: DEFAULT_HOME_ZONE_WIDTH,
            home_zone_height: DEFAULT_HOME_ZONE_HEIGHT,
            tetromino_spawn_interval_ms: TETROMINO_SPAWN_INTERVAL_MS,
            base_fall_interval_ms: BASE_FALL_INTERVAL_MS,
            fall_speed_table: Vec::new(),
            spawn_height: DEFAULT_SPAWN_HEIGHT,
            turn_time_limit_ms: None,
            seed: 1,
        }
    }
}

impl GameConfig {
    /// Convenience constructor for a board of the given size with default rules
    pub fn with_board(width: u16, height: u16) -> Self {
        Self {
            board_width: width,
            board_height: height,
            home_zone_width: DEFAULT_HOME_ZONE_WIDTH.min(width),
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| JsonError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        use std::env;

        fn parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
            match env::var(key) {
                Ok(raw) => {
                    let trimmed = raw.trim();
                    if trimmed.is_empty() {
                        return Ok(None);
                    }
                    trimmed
                        .parse()
                        .map(Some)
                        .map_err(|_| ConfigError::InvalidEnv { key, value: raw })
                }
                Err(_) => Ok(None),
            }
        }

        let mut config = Self::default();
        if let Some(v) = parse("SHAKTRIS_BOARD_WIDTH")? {
            config.board_width = v;
        }
        if let Some(v) = parse("SHAKTRIS_BOARD_HEIGHT")? {
            config.board_height = v;
        }
        if let Some(v) = parse("SHAKTRIS_ROW_CLEAR_THRESHOLD")? {
            config.row_clear_threshold = v;
        }
        if let Some(v) = parse("SHAKTRIS_HOME_ZONE_WIDTH")? {
            config.home_zone_width = v;
        }
        if let Some(v) = parse("SHAKTRIS_HOME_ZONE_HEIGHT")? {
            config.home_zone_height = v;
        }
        if let Some(v) = parse("SHAKTRIS_SPAWN_INTERVAL_MS")? {
            config.tetromino_spawn_interval_ms = v;
        }
        if let Some(v) = parse("SHAKTRIS_BASE_FALL_INTERVAL_MS")? {
            config.base_fall_interval_ms = v;
        }
        if let Some(v) = parse("SHAKTRIS_SPAWN_HEIGHT")? {
            config.spawn_height = v;
        }
        if let Some(v) = parse("SHAKTRIS_TURN_TIME_LIMIT_MS")? {
            config.turn_time_limit_ms = Some(v);
        }
        if let Some(v) = parse("SHAKTRIS_SEED")? {
            config.seed = v;
        }
        if let Ok(raw) = env::var("SHAKTRIS_FALL_SPEED_TABLE") {
            config.fall_speed_table = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<u32>())
                .collect::<Result<_, _>>()
                .map_err(|_| ConfigError::InvalidEnv {
                    key: "SHAKTRIS_FALL_SPEED_TABLE",
                    value: raw.clone(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_width < 4 || self.board_height < 4 {
            return Err(ConfigError::BoardTooSmall {
                width: self.board_width,
                height: self.board_height,
            });
        }
        if self.home_zone_width == 0
            || self.home_zone_height == 0
            || self.home_zone_width > self.board_width
            || u32::from(self.home_zone_height) * 2 > u32::from(self.board_height)
        {
            return Err(ConfigError::HomeZoneTooLarge {
                width: self.home_zone_width,
                height: self.home_zone_height,
                board_width: self.board_width,
                board_height: self.board_height,
            });
        }
        if self.row_clear_threshold == 0 || self.row_clear_threshold > self.board_width {
            return Err(ConfigError::InvalidThreshold {
                value: self.row_clear_threshold,
                max: self.board_width,
            });
        }
        if self.base_fall_interval_ms == 0 {
            return Err(ConfigError::ZeroFallInterval);
        }
        if self.spawn_height == 0 {
            return Err(ConfigError::ZeroSpawnHeight);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert_eq!(config.board_width, 30);
        assert_eq!(config.board_height, 30);
        assert_eq!(config.row_clear_threshold, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config =
            GameConfig::from_json_str(r#"{"boardWidth":10,"boardHeight":20,"turnTimeLimit":5000}"#)
                .unwrap();
        assert_eq!(config.board_width, 10);
        assert_eq!(config.board_height, 20);
        assert_eq!(config.row_clear_threshold, 8);
        assert_eq!(config.turn_time_limit_ms, Some(5000));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = GameConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_threshold_wider_than_board_rejected() {
        let config = GameConfig {
            row_clear_threshold: 40,
            ..GameConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidThreshold { value: 40, max: 30 })
        );
    }

    #[test]
    fn test_home_zone_must_fit_twice() {
        let config = GameConfig {
            home_zone_height: 16,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::HomeZoneTooLarge { .. })
        ));
    }

    #[test]
    fn test_huge_home_zone_is_an_error() {
        let err = GameConfig::from_json_str(r#"{"homeZoneHeight":40000}"#).unwrap_err();
        assert!(matches!(err, ConfigError::HomeZoneTooLarge { height: 40000, .. }));
    }

    #[test]
    fn test_config_error_converts_into_session_error() {
        let err = ConfigError::ZeroFallInterval;
        let session_err: crate::error::SessionError = err.clone().into();
        assert_eq!(session_err, crate::error::SessionError::Config(err));
    }
}
