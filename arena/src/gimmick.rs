//! Temporary rule modifiers drawn while chaos is high.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chaos::ChaosTier;
use crate::economy::EconomyModifiers;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GimmickKind {
    GoldRush,
    Overclock,
    Slowdown,
    ComboFever,
    DoubleDamage,
    GarbageSurge,
    MirrorControls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GimmickTier {
    Standard,
    High,
}

impl GimmickKind {
    pub const ALL: [GimmickKind; 7] = [
        GimmickKind::GoldRush,
        GimmickKind::Overclock,
        GimmickKind::Slowdown,
        GimmickKind::ComboFever,
        GimmickKind::DoubleDamage,
        GimmickKind::GarbageSurge,
        GimmickKind::MirrorControls,
    ];

    pub const fn tier(self) -> GimmickTier {
        match self {
            GimmickKind::DoubleDamage | GimmickKind::GarbageSurge | GimmickKind::MirrorControls => {
                GimmickTier::High
            }
            _ => GimmickTier::Standard,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GimmickKind::GoldRush => "gold rush",
            GimmickKind::Overclock => "overclock",
            GimmickKind::Slowdown => "slowdown",
            GimmickKind::ComboFever => "combo fever",
            GimmickKind::DoubleDamage => "double damage",
            GimmickKind::GarbageSurge => "garbage surge",
            GimmickKind::MirrorControls => "mirror controls",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GimmickSpec {
    pub kind: GimmickKind,
    pub weight: u32,
    pub duration_ticks: u64,
}

/// Strength of each gimmick's effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GimmickEffects {
    pub gold_rush_percent: u32,
    pub double_damage_percent: u32,
    pub combo_fever_bonus_percent: u32,
    pub overclock_bpm: i32,
    pub slowdown_bpm: i32,
    pub garbage_surge_rows: usize,
}

impl Default for GimmickEffects {
    fn default() -> Self {
        Self {
            gold_rush_percent: 200,
            double_damage_percent: 200,
            combo_fever_bonus_percent: 50,
            overclock_bpm: 30,
            slowdown_bpm: -30,
            garbage_surge_rows: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GimmickConfig {
    pub table: Vec<GimmickSpec>,
    pub draw_interval_ticks: u64,
    /// A kind stays out of the pool for this long after it expires.
    pub cooldown_ticks: u64,
    pub max_active: usize,
    pub effects: GimmickEffects,
}

impl Default for GimmickConfig {
    fn default() -> Self {
        let spec = |kind, weight, duration_ticks| GimmickSpec {
            kind,
            weight,
            duration_ticks,
        };
        Self {
            table: vec![
                spec(GimmickKind::GoldRush, 30, 200),
                spec(GimmickKind::Overclock, 20, 160),
                spec(GimmickKind::Slowdown, 15, 160),
                spec(GimmickKind::ComboFever, 25, 200),
                spec(GimmickKind::DoubleDamage, 12, 120),
                spec(GimmickKind::GarbageSurge, 8, 1),
                spec(GimmickKind::MirrorControls, 6, 100),
            ],
            draw_interval_ticks: 40,
            cooldown_ticks: 200,
            max_active: 2,
            effects: GimmickEffects::default(),
        }
    }
}

impl GimmickConfig {
    /// Every kind must appear exactly once with a positive weight and
    /// duration, and the weights must sum within `u32`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (idx, spec) in self.table.iter().enumerate() {
            if self.table[..idx].iter().any(|s| s.kind == spec.kind) {
                return Err(ConfigError::DuplicateGimmickSpec(spec.kind));
            }
        }
        self.table
            .iter()
            .try_fold(0u32, |total, spec| total.checked_add(spec.weight))
            .ok_or(ConfigError::GimmickWeightOverflow)?;
        for kind in GimmickKind::ALL {
            let Some(spec) = self.spec(kind) else {
                return Err(ConfigError::MissingGimmickSpec(kind));
            };
            if spec.weight == 0 {
                return Err(ConfigError::ZeroGimmickWeight(kind));
            }
            if spec.duration_ticks == 0 {
                return Err(ConfigError::ZeroGimmickDuration(kind));
            }
        }
        if self.draw_interval_ticks == 0 {
            return Err(ConfigError::Invalid(
                "drawIntervalTicks must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn spec(&self, kind: GimmickKind) -> Option<&GimmickSpec> {
        self.table.iter().find(|spec| spec.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGimmick {
    pub kind: GimmickKind,
    pub activated_tick: u64,
    pub expires_tick: u64,
}

/// Combined effect of the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GimmickModifiers {
    pub economy: EconomyModifiers,
    pub combo_bonus_extra: u32,
    pub tempo_delta_bpm: i32,
    pub mirror_controls: bool,
}

impl Default for GimmickModifiers {
    fn default() -> Self {
        Self {
            economy: EconomyModifiers::default(),
            combo_bonus_extra: 0,
            tempo_delta_bpm: 0,
            mirror_controls: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GimmickDirector {
    config: GimmickConfig,
    rng: StdRng,
    active: Vec<ActiveGimmick>,
    /// Kind and expiry tick of everything that ended recently.
    recently_expired: Vec<(GimmickKind, u64)>,
    last_draw_boundary: u64,
}

impl GimmickDirector {
    pub fn new(config: GimmickConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            active: Vec::new(),
            recently_expired: Vec::new(),
            last_draw_boundary: 0,
        }
    }

    pub fn config(&self) -> &GimmickConfig {
        &self.config
    }

    pub fn active(&self) -> &[ActiveGimmick] {
        &self.active
    }

    pub fn is_active(&self, kind: GimmickKind) -> bool {
        self.active.iter().any(|g| g.kind == kind)
    }

    pub fn active_kinds(&self) -> Vec<GimmickKind> {
        self.active.iter().map(|g| g.kind).collect()
    }

    /// Kinds a draw at `tick` could pick under `tier`.
    pub fn eligible(&self, tier: ChaosTier, tick: u64) -> Vec<GimmickKind> {
        if tier == ChaosTier::Calm {
            return Vec::new();
        }
        let cooldown = self.config.cooldown_ticks;
        GimmickKind::ALL
            .into_iter()
            .filter(|&kind| tier != ChaosTier::Frenzy || kind.tier() == GimmickTier::High)
            .filter(|&kind| !self.is_active(kind))
            .filter(|&kind| {
                !self
                    .recently_expired
                    .iter()
                    .any(|&(k, at)| k == kind && tick < at.saturating_add(cooldown))
            })
            .collect()
    }

    /// Removes every gimmick whose expiry tick has been reached.
    pub fn expire(&mut self, tick: u64) -> Vec<ActiveGimmick> {
        let (ended, kept): (Vec<_>, Vec<_>) =
            self.active.drain(..).partition(|g| g.expires_tick <= tick);
        self.active = kept;
        for gimmick in &ended {
            self.recently_expired.push((gimmick.kind, gimmick.expires_tick));
        }
        let cooldown = self.config.cooldown_ticks;
        self.recently_expired
            .retain(|&(_, at)| tick < at.saturating_add(cooldown));
        ended
    }

    /// Ends everything immediately, e.g. on a collapse.
    pub fn clear_all(&mut self, tick: u64) -> Vec<ActiveGimmick> {
        let ended: Vec<ActiveGimmick> = self.active.drain(..).collect();
        for gimmick in &ended {
            self.recently_expired.push((gimmick.kind, tick));
        }
        ended
    }

    /// Attempts one draw when a draw boundary has been crossed since the last
    /// attempt and the tier allows it.
    pub fn try_draw(&mut self, tier: ChaosTier, tick: u64) -> Option<ActiveGimmick> {
        let boundary = tick / self.config.draw_interval_ticks.max(1);
        if boundary <= self.last_draw_boundary {
            return None;
        }
        self.last_draw_boundary = boundary;

        if self.active.len() >= self.config.max_active {
            return None;
        }
        let pool = self.eligible(tier, tick);
        let kind = self.pick_weighted(&pool)?;
        let duration = self.config.spec(kind).map_or(1, |s| s.duration_ticks.max(1));
        let gimmick = ActiveGimmick {
            kind,
            activated_tick: tick,
            expires_tick: tick.saturating_add(duration),
        };
        self.active.push(gimmick);
        debug!(?kind, tick, expires = gimmick.expires_tick, "gimmick drawn");
        Some(gimmick)
    }

    pub fn modifiers(&self) -> GimmickModifiers {
        let effects = &self.config.effects;
        let mut mods = GimmickModifiers::default();
        for gimmick in &self.active {
            match gimmick.kind {
                GimmickKind::GoldRush => {
                    mods.economy.gold_percent = effects.gold_rush_percent;
                }
                GimmickKind::DoubleDamage => {
                    mods.economy.damage_percent = effects.double_damage_percent;
                }
                GimmickKind::ComboFever => {
                    mods.combo_bonus_extra = effects.combo_fever_bonus_percent;
                }
                GimmickKind::Overclock => mods.tempo_delta_bpm += effects.overclock_bpm,
                GimmickKind::Slowdown => mods.tempo_delta_bpm += effects.slowdown_bpm,
                GimmickKind::MirrorControls => mods.mirror_controls = true,
                GimmickKind::GarbageSurge => {}
            }
        }
        mods
    }

    fn pick_weighted(&mut self, pool: &[GimmickKind]) -> Option<GimmickKind> {
        let weighted: Vec<(GimmickKind, u64)> = pool
            .iter()
            .filter_map(|&kind| self.config.spec(kind).map(|s| (kind, u64::from(s.weight))))
            .filter(|&(_, weight)| weight > 0)
            .collect();
        let total: u64 = weighted.iter().map(|(_, w)| w).sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.rng.gen_range(0..total);
        for (kind, weight) in weighted {
            if roll < weight {
                return Some(kind);
            }
            roll -= weight;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn director() -> GimmickDirector {
        GimmickDirector::new(
            GimmickConfig {
                draw_interval_ticks: 10,
                cooldown_ticks: 50,
                max_active: 2,
                ..GimmickConfig::default()
            },
            42,
        )
    }

    #[test]
    fn calm_never_draws() {
        let mut d = director();
        for tick in 0..200 {
            assert!(d.try_draw(ChaosTier::Calm, tick).is_none());
        }
    }

    #[test]
    fn frenzy_pool_is_high_tier_only() {
        let d = director();
        let pool = d.eligible(ChaosTier::Frenzy, 0);
        assert_eq!(
            pool,
            vec![
                GimmickKind::DoubleDamage,
                GimmickKind::GarbageSurge,
                GimmickKind::MirrorControls
            ]
        );
        assert_eq!(d.eligible(ChaosTier::Gimmick, 0).len(), 7);
    }

    #[test]
    fn draws_once_per_boundary_and_respects_max_active() {
        let mut d = director();
        assert!(d.try_draw(ChaosTier::Gimmick, 5).is_none());
        assert!(d.try_draw(ChaosTier::Gimmick, 10).is_some());
        assert!(d.try_draw(ChaosTier::Gimmick, 11).is_none());
        assert!(d.try_draw(ChaosTier::Gimmick, 20).is_some());
        assert!(d.try_draw(ChaosTier::Gimmick, 30).is_none());
        assert_eq!(d.active().len(), 2);
        let kinds = d.active_kinds();
        assert_ne!(kinds[0], kinds[1]);
    }

    #[test]
    fn expired_kind_sits_out_the_cooldown() {
        let mut d = director();
        let drawn = d.try_draw(ChaosTier::Gimmick, 10).unwrap();
        let ended = d.expire(drawn.expires_tick);
        assert_eq!(ended, vec![drawn]);
        assert!(!d.eligible(ChaosTier::Gimmick, drawn.expires_tick).contains(&drawn.kind));
        assert!(d.eligible(ChaosTier::Gimmick, drawn.expires_tick + 50).contains(&drawn.kind));
    }

    #[test]
    fn modifiers_revert_on_expiry() {
        let mut d = GimmickDirector::new(
            GimmickConfig {
                table: GimmickKind::ALL
                    .into_iter()
                    .map(|kind| GimmickSpec {
                        kind,
                        weight: u32::from(kind == GimmickKind::DoubleDamage),
                        duration_ticks: 5,
                    })
                    .collect(),
                draw_interval_ticks: 1,
                max_active: 1,
                ..GimmickConfig::default()
            },
            1,
        );
        let drawn = d.try_draw(ChaosTier::Frenzy, 1).unwrap();
        assert_eq!(drawn.kind, GimmickKind::DoubleDamage);
        assert_eq!(d.modifiers().economy.damage_percent, 200);
        d.expire(6);
        assert_eq!(d.modifiers(), GimmickModifiers::default());
    }

    #[test]
    fn zero_weight_fails_validation() {
        let mut config = GimmickConfig::default();
        config.table[2].weight = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroGimmickWeight(GimmickKind::Slowdown))
        ));
        config.table.remove(2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingGimmickSpec(GimmickKind::Slowdown))
        ));
    }

    #[test]
    fn duplicate_kind_fails_validation() {
        let mut config = GimmickConfig::default();
        let extra = config.table[0];
        config.table.push(extra);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateGimmickSpec(GimmickKind::GoldRush))
        ));
    }

    #[test]
    fn weight_sum_past_u32_fails_validation() {
        let mut config = GimmickConfig::default();
        for spec in &mut config.table {
            spec.weight = u32::MAX / 2;
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GimmickWeightOverflow)
        ));
    }

    #[test]
    fn heavy_weights_still_draw() {
        let mut config = GimmickConfig::default();
        for spec in &mut config.table {
            spec.weight = u32::MAX / 2;
        }
        let mut d = GimmickDirector::new(config, 3);
        let drawn = d.try_draw(ChaosTier::Gimmick, 40);
        assert!(drawn.is_some());
    }
}
