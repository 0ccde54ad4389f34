//! Clear streaks and the damage/score multiplier.
//!
//! Multipliers are integer percentages (100 = x1.0) so the economy stays
//! deterministic across peers.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Multiplier(pub u32);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(100);

    pub fn percent(self) -> u32 {
        self.0
    }

    pub fn apply(self, base: u64) -> u64 {
        base.saturating_mul(self.0 as u64) / 100
    }

    /// Chains another percentage on top of this one.
    pub fn scaled(self, percent: u32) -> Multiplier {
        Multiplier(((self.0 as u64 * percent as u64) / 100).min(u32::MAX as u64) as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComboTables {
    /// Factor for 1..=4 cleared lines.
    pub line_factor_percent: [u32; 4],
    /// Bonus added per combo step; index 0 is the first clear of a streak.
    /// Streaks longer than the table reuse the last entry.
    pub combo_bonus_percent: Vec<u32>,
    /// Extra factor applied to a back-to-back qualifying clear.
    pub back_to_back_bonus_percent: u32,
    pub back_to_back_min_lines: u8,
    pub all_clear_bonus_percent: u32,
    /// Score points for 1..=4 lines before the multiplier.
    pub line_points: [u32; 4],
}

impl Default for ComboTables {
    fn default() -> Self {
        Self {
            line_factor_percent: [100, 110, 125, 150],
            combo_bonus_percent: vec![0, 10, 20, 35, 50, 70, 100],
            back_to_back_bonus_percent: 50,
            back_to_back_min_lines: 4,
            all_clear_bonus_percent: 100,
            line_points: [100, 300, 500, 800],
        }
    }
}

impl ComboTables {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.combo_bonus_percent.is_empty() {
            return Err(ConfigError::Invalid(
                "comboBonusPercent needs at least one entry".to_string(),
            ));
        }
        if self.combo_bonus_percent.windows(2).any(|w| w[1] < w[0]) {
            return Err(ConfigError::Invalid(
                "comboBonusPercent must be non-decreasing".to_string(),
            ));
        }
        if self.line_factor_percent.contains(&0) {
            return Err(ConfigError::Invalid(
                "lineFactorPercent entries must be positive".to_string(),
            ));
        }
        if !(1..=4).contains(&self.back_to_back_min_lines) {
            return Err(ConfigError::Invalid(
                "backToBackMinLines must be within 1..=4".to_string(),
            ));
        }
        Ok(())
    }

    fn line_factor(&self, lines: u8) -> u32 {
        let idx = (lines.clamp(1, 4) - 1) as usize;
        self.line_factor_percent[idx]
    }

    fn combo_bonus(&self, combo: u32) -> u32 {
        let step = combo.saturating_sub(1) as usize;
        let last = self.combo_bonus_percent.len().saturating_sub(1);
        self.combo_bonus_percent
            .get(step.min(last))
            .copied()
            .unwrap_or(0)
    }

    fn points(&self, lines: u8) -> u32 {
        let idx = (lines.clamp(1, 4) - 1) as usize;
        self.line_points[idx]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub lines: u8,
    pub combo: u32,
    pub back_to_back: bool,
    pub all_clear: bool,
    pub multiplier: Multiplier,
    pub points: u32,
}

/// Per-player streak tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboScorer {
    tables: ComboTables,
    combo: u32,
    back_to_back_ready: bool,
    /// Extra combo bonus from active modifiers, in percent points.
    #[serde(default)]
    combo_bonus_extra: u32,
}

impl ComboScorer {
    pub fn new(tables: ComboTables) -> Self {
        Self {
            tables,
            combo: 0,
            back_to_back_ready: false,
            combo_bonus_extra: 0,
        }
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn tables(&self) -> &ComboTables {
        &self.tables
    }

    /// True when the next qualifying clear would be back-to-back.
    pub fn back_to_back_ready(&self) -> bool {
        self.back_to_back_ready
    }

    pub fn set_combo_bonus_extra(&mut self, percent: u32) {
        self.combo_bonus_extra = percent;
    }

    /// Applies a lock that cleared `count` lines with the back-to-back status
    /// decided by the caller. A zero-line lock resets the streak.
    pub fn on_lines_cleared(&mut self, count: u8, is_back_to_back: bool) -> ScoreResult {
        self.score(count, is_back_to_back, false)
    }

    /// Applies a lock and derives back-to-back from the scorer's own chain.
    pub fn on_lock(&mut self, count: u8, all_clear: bool) -> ScoreResult {
        let qualifies = count >= self.tables.back_to_back_min_lines;
        let is_back_to_back = qualifies && self.back_to_back_ready;
        self.back_to_back_ready = qualifies;
        self.score(count, is_back_to_back, all_clear)
    }

    fn score(&mut self, count: u8, is_back_to_back: bool, all_clear: bool) -> ScoreResult {
        if count == 0 {
            self.combo = 0;
            return ScoreResult {
                multiplier: Multiplier::ONE,
                ..ScoreResult::default()
            };
        }

        self.combo = self.combo.saturating_add(1);

        let combo_bonus = self.tables.combo_bonus(self.combo) + self.combo_bonus_extra;
        let mut multiplier = Multiplier(self.tables.line_factor(count)).scaled(100 + combo_bonus);
        if is_back_to_back {
            multiplier = multiplier.scaled(100 + self.tables.back_to_back_bonus_percent);
        }
        if all_clear {
            multiplier = multiplier.scaled(100 + self.tables.all_clear_bonus_percent);
        }

        let points = multiplier.apply(self.tables.points(count) as u64);
        ScoreResult {
            lines: count,
            combo: self.combo,
            back_to_back: is_back_to_back,
            all_clear,
            multiplier,
            points: points.min(u32::MAX as u64) as u32,
        }
    }
}
