use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chaos::ChaosConfig;
use crate::combo::ComboTables;
use crate::economy::EconomyConfig;
use crate::error::ConfigError;
use crate::gimmick::GimmickConfig;
use crate::kicks::WallKickTable;
use crate::piece_engine::{LOCK_DELAY_MAX_MS_DEFAULT, LOCK_DELAY_MS_DEFAULT};
use crate::tempo::TempoConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomConfig {
    pub min_players: usize,
    pub max_players: usize,
    pub tick_ms: u64,
    pub relay_every_ticks: u64,
    pub waiting_timeout_ticks: u64,
    /// Zero means no limit.
    pub max_duration_ticks: u64,
    pub command_timeout_ms: u64,
    pub relay_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 8,
            tick_ms: 50,
            relay_every_ticks: 4,
            waiting_timeout_ticks: 1_200,
            max_duration_ticks: 12_000,
            command_timeout_ms: 2_000,
            relay_capacity: 64,
        }
    }
}

impl RoomConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players == 0 || self.min_players > self.max_players {
            return Err(ConfigError::InvalidRoster {
                min: self.min_players,
                max: self.max_players,
            });
        }
        if self.tick_ms == 0 || self.relay_every_ticks == 0 || self.relay_capacity == 0 {
            return Err(ConfigError::Invalid(
                "tickMs, relayEveryTicks and relayCapacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub lock_delay_ms: u32,
    pub lock_delay_max_ms: u32,
    /// JSON kick table; the SRS table is used when unset.
    pub kick_table_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_delay_ms: LOCK_DELAY_MS_DEFAULT,
            lock_delay_max_ms: LOCK_DELAY_MAX_MS_DEFAULT,
            kick_table_path: None,
        }
    }
}

impl EngineConfig {
    pub fn kick_table(&self) -> Result<Arc<WallKickTable>, ConfigError> {
        match &self.kick_table_path {
            Some(path) => WallKickTable::load(path).map(Arc::new),
            None => Ok(Arc::new(WallKickTable::srs())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaConfig {
    #[serde(default)]
    pub room: RoomConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub scoring: ComboTables,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub chaos: ChaosConfig,
    #[serde(default)]
    pub gimmicks: GimmickConfig,
    #[serde(default)]
    pub tempo: TempoConfig,
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.room.validate()?;
        self.scoring.validate()?;
        self.economy.validate()?;
        self.chaos.validate()?;
        self.gimmicks.validate()?;
        self.tempo.validate()?;
        Ok(())
    }

    pub fn from_json(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: ArenaConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}

/// Resolves where the arena config lives.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(explicit) = lookup("ARENA_CONFIG_PATH") {
            return Self::new(explicit);
        }

        let base = lookup("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                lookup("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("block-arena");
        path.push("arena.json");
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// A missing file yields defaults. A file that exists but cannot be read
    /// or fails validation is an error.
    pub fn load(&self) -> Result<ArenaConfig, ConfigError> {
        let origin = self.path.display().to_string();
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %origin, "arena config not found, using defaults");
                return Ok(ArenaConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: origin,
                    source,
                });
            }
        };
        let config = ArenaConfig::from_json(&text, &origin)?;
        info!(path = %origin, "arena config loaded");
        Ok(config)
    }
}
