use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TempoConfig {
    pub base_bpm: u32,
    pub min_bpm: u32,
    pub max_bpm: u32,
    pub frenzy_bonus_bpm: u32,
    /// Gravity interval at the base tempo.
    pub base_gravity_ms: u32,
    pub min_gravity_ms: u32,
    /// Hard drops this close to a beat count as beat hits.
    pub beat_window_ticks: u64,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            base_bpm: 120,
            min_bpm: 60,
            max_bpm: 240,
            frenzy_bonus_bpm: 30,
            base_gravity_ms: 800,
            min_gravity_ms: 50,
            beat_window_ticks: 1,
        }
    }
}

impl TempoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_bpm == 0 || self.min_bpm > self.base_bpm || self.base_bpm > self.max_bpm {
            return Err(ConfigError::InvalidTempo(format!(
                "need 0 < min {} <= base {} <= max {}",
                self.min_bpm, self.base_bpm, self.max_bpm
            )));
        }
        if self.base_gravity_ms == 0 || self.min_gravity_ms == 0 {
            return Err(ConfigError::InvalidTempo(
                "gravity intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Room pacing. Drives gravity and the beat grid.
#[derive(Debug, Clone)]
pub struct Tempo {
    config: TempoConfig,
    bpm: u32,
}

impl Tempo {
    pub fn new(config: TempoConfig) -> Self {
        let bpm = config.base_bpm;
        Self { config, bpm }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    /// Recomputes bpm from the base value, gimmick deltas and the frenzy bonus.
    pub fn update(&mut self, gimmick_delta_bpm: i32, frenzy: bool) -> u32 {
        let mut bpm = self.config.base_bpm as i64 + gimmick_delta_bpm as i64;
        if frenzy {
            bpm += self.config.frenzy_bonus_bpm as i64;
        }
        self.bpm = bpm.clamp(self.config.min_bpm as i64, self.config.max_bpm as i64) as u32;
        self.bpm
    }

    /// Gravity interval, scaled inversely with tempo.
    pub fn gravity_interval_ms(&self) -> u32 {
        let base = self.config.base_gravity_ms as u64 * self.config.base_bpm as u64;
        let scaled = base / self.bpm.max(1) as u64;
        (scaled as u32).max(self.config.min_gravity_ms)
    }

    /// Ticks between beats at the current tempo, never below one.
    pub fn beat_period_ticks(&self, tick_ms: u64) -> u64 {
        let beat_ms = 60_000 / self.bpm.max(1) as u64;
        (beat_ms / tick_ms.max(1)).max(1)
    }

    pub fn is_on_beat(&self, tick: u64, tick_ms: u64) -> bool {
        let period = self.beat_period_ticks(tick_ms);
        let phase = tick % period;
        phase.min(period - phase) <= self.config.beat_window_ticks
    }
}
