//! Arena-wide volatility meter.
//!
//! Chaos is kept in milli-points internally so that small per-tick decay
//! works at high tick rates; thresholds and gains are whole points.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const MILLI: u64 = 1_000;

/// Gains per notable event, in whole chaos points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChaosTriggers {
    /// Gain for a 1..=4 line clear.
    pub lines_cleared: [u32; 4],
    pub all_clear: u32,
    /// A single hit at or above this much damage counts as a spike.
    pub damage_spike_threshold: u64,
    pub damage_spike: u32,
    pub mob_defeated: u32,
    pub top_out: u32,
}

impl Default for ChaosTriggers {
    fn default() -> Self {
        Self {
            lines_cleared: [0, 2, 5, 12],
            all_clear: 20,
            damage_spike_threshold: 300,
            damage_spike: 8,
            mob_defeated: 25,
            top_out: 15,
        }
    }
}

/// Stabilizing action taken when chaos reaches the collapse threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CollapsePolicy {
    #[default]
    ResetChaos,
    ResetChaosAndClearGimmicks,
    SetChaos {
        value: u32,
    },
}

impl CollapsePolicy {
    pub fn clears_gimmicks(self) -> bool {
        matches!(self, CollapsePolicy::ResetChaosAndClearGimmicks)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChaosConfig {
    pub max: u32,
    pub decay_milli_per_tick: u32,
    pub gimmick_threshold: u32,
    pub frenzy_threshold: u32,
    pub collapse_threshold: u32,
    pub triggers: ChaosTriggers,
    pub collapse_policy: CollapsePolicy,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            max: 100,
            decay_milli_per_tick: 50,
            gimmick_threshold: 30,
            frenzy_threshold: 70,
            collapse_threshold: 100,
            triggers: ChaosTriggers::default(),
            collapse_policy: CollapsePolicy::ResetChaos,
        }
    }
}

impl ChaosConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.gimmick_threshold < self.frenzy_threshold
            && self.frenzy_threshold < self.collapse_threshold
            && self.collapse_threshold <= self.max;
        if !ordered {
            return Err(ConfigError::InvalidThresholds(format!(
                "gimmick {}, frenzy {}, collapse {}, max {}",
                self.gimmick_threshold, self.frenzy_threshold, self.collapse_threshold, self.max
            )));
        }
        if let CollapsePolicy::SetChaos { value } = self.collapse_policy {
            if value >= self.collapse_threshold {
                return Err(ConfigError::InvalidThresholds(format!(
                    "collapse policy sets chaos to {value}, at or above collapse {}",
                    self.collapse_threshold
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChaosTier {
    #[default]
    Calm,
    /// Gimmick draws are allowed.
    Gimmick,
    /// Draws are limited to high-tier gimmicks and tempo is raised.
    Frenzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaosEvent {
    LinesCleared(u8),
    AllClear,
    Damage(u64),
    MobDefeated,
    TopOut,
}

#[derive(Debug, Clone)]
pub struct ChaosMeter {
    config: ChaosConfig,
    milli: u64,
    collapses: u32,
}

impl ChaosMeter {
    pub fn new(config: ChaosConfig) -> Self {
        Self {
            config,
            milli: 0,
            collapses: 0,
        }
    }

    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Current value in whole points.
    pub fn value(&self) -> u32 {
        (self.milli / MILLI) as u32
    }

    pub fn collapses(&self) -> u32 {
        self.collapses
    }

    pub fn tier(&self) -> ChaosTier {
        let value = self.value();
        if value >= self.config.frenzy_threshold {
            ChaosTier::Frenzy
        } else if value >= self.config.gimmick_threshold {
            ChaosTier::Gimmick
        } else {
            ChaosTier::Calm
        }
    }

    /// Adds the configured gain for `event`; returns the points gained.
    pub fn record(&mut self, event: ChaosEvent) -> u32 {
        let triggers = &self.config.triggers;
        let gain = match event {
            ChaosEvent::LinesCleared(0) => 0,
            ChaosEvent::LinesCleared(count) => triggers.lines_cleared[(count.min(4) - 1) as usize],
            ChaosEvent::AllClear => triggers.all_clear,
            ChaosEvent::Damage(amount) if amount >= triggers.damage_spike_threshold => {
                triggers.damage_spike
            }
            ChaosEvent::Damage(_) => 0,
            ChaosEvent::MobDefeated => triggers.mob_defeated,
            ChaosEvent::TopOut => triggers.top_out,
        };
        self.add(gain);
        gain
    }

    pub fn add(&mut self, points: u32) {
        let max = self.config.max as u64 * MILLI;
        self.milli = (self.milli + points as u64 * MILLI).min(max);
    }

    pub fn decay(&mut self) {
        self.milli = self
            .milli
            .saturating_sub(self.config.decay_milli_per_tick as u64);
    }

    /// Applies the collapse policy when chaos sits at or above the collapse
    /// threshold. Returns the policy that fired.
    pub fn check_collapse(&mut self) -> Option<CollapsePolicy> {
        if self.value() < self.config.collapse_threshold {
            return None;
        }
        let policy = self.config.collapse_policy;
        self.milli = match policy {
            CollapsePolicy::ResetChaos | CollapsePolicy::ResetChaosAndClearGimmicks => 0,
            CollapsePolicy::SetChaos { value } => value.min(self.config.max) as u64 * MILLI,
        };
        self.collapses = self.collapses.saturating_add(1);
        Some(policy)
    }
}
