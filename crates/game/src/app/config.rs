use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use engine::{LoopConfig, Vec2};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::gameplay::Tuning;

pub(crate) const CONFIG_ENV_VAR: &str = "ARCADE_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Point {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl From<Point> for Vec2 {
    fn from(point: Point) -> Self {
        Vec2::new(point.x, point.y)
    }
}

/// Axis-aligned wall given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WallRect {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ArenaConfig {
    pub(crate) window_title: String,
    pub(crate) canvas_width: u32,
    pub(crate) canvas_height: u32,
    pub(crate) target_tps: u32,
    pub(crate) seed: Option<u64>,
    pub(crate) enemy_count: u32,
    pub(crate) player_spawn: Point,
    pub(crate) player_move_speed: f32,
    pub(crate) enemy_speed: f32,
    pub(crate) bullet_speed: f32,
    pub(crate) blood_particles: u32,
    pub(crate) walls: Vec<WallRect>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            window_title: "Arcade".to_string(),
            canvas_width: 800,
            canvas_height: 600,
            target_tps: 60,
            seed: None,
            enemy_count: 10,
            player_spawn: Point { x: 200.0, y: 200.0 },
            player_move_speed: 3.0,
            enemy_speed: 3.0,
            bullet_speed: 20.0,
            blood_particles: 10,
            walls: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {field}: {source}")]
    Parse {
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: &'static str,
    },
}

impl ArenaConfig {
    /// Reads the file named by `ARCADE_CONFIG`, or returns defaults when the
    /// variable is not set.
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load(Path::new(&path)),
            Err(env::VarError::NotPresent) => {
                info!(env_var = CONFIG_ENV_VAR, "config_defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::EnvVar {
                var: CONFIG_ENV_VAR,
                source,
            }),
        }
    }

    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw)?;
        info!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    pub(crate) fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: Self = serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            let field = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            ConfigError::Parse {
                field,
                source: error.into_inner(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ConfigError::Invalid {
                field: "canvas",
                message: "width and height must be non-zero",
            });
        }
        if self.target_tps == 0 {
            return Err(ConfigError::Invalid {
                field: "target_tps",
                message: "must be at least 1",
            });
        }
        for (field, value) in [
            ("player_move_speed", self.player_move_speed),
            ("enemy_speed", self.enemy_speed),
            ("bullet_speed", self.bullet_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be a finite, non-negative number",
                });
            }
        }
        if self
            .walls
            .iter()
            .any(|wall| !(wall.width > 0.0 && wall.height > 0.0))
        {
            return Err(ConfigError::Invalid {
                field: "walls",
                message: "wall width and height must be positive",
            });
        }
        Ok(())
    }

    pub(crate) fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            window_title: self.window_title.clone(),
            window_width: self.canvas_width,
            window_height: self.canvas_height,
            target_tps: self.target_tps,
            seed: self.seed,
            ..LoopConfig::default()
        }
    }

    pub(crate) fn tuning(&self) -> Tuning {
        Tuning {
            player_move_speed: self.player_move_speed,
            enemy_speed: self.enemy_speed,
            bullet_speed: self.bullet_speed,
            blood_particles: self.blood_particles,
        }
    }
}
