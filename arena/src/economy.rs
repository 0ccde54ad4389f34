use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::combo::Multiplier;
use crate::error::{ActionError, ConfigError};
use crate::protocol::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobDef {
    pub id: String,
    pub max_hp: u64,
}

impl Default for MobDef {
    fn default() -> Self {
        Self {
            id: "stone_golem".to_string(),
            max_hp: 6_000,
        }
    }
}

/// What happens once the shared mob reaches zero hp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DefeatPolicy {
    /// A tougher mob of the same kind appears.
    #[serde(rename_all = "camelCase")]
    Respawn { hp_growth_percent: u32 },
    EndRound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EconomyConfig {
    /// Gold for 1..=4 cleared lines.
    pub gold_per_lines: [u64; 4],
    /// Base mob damage for 1..=4 cleared lines, before the multiplier.
    pub damage_per_lines: [u64; 4],
    pub beat_damage: u64,
    pub beat_multiplier_percent: u32,
    pub income_interval_ticks: u64,
    pub income_amount: u64,
    /// Gold to every active player when the mob falls.
    pub defeat_bounty: u64,
    pub mob: MobDef,
    pub defeat_policy: DefeatPolicy,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            gold_per_lines: [10, 25, 45, 80],
            damage_per_lines: [40, 100, 180, 320],
            beat_damage: 12,
            beat_multiplier_percent: 150,
            income_interval_ticks: 100,
            income_amount: 5,
            defeat_bounty: 50,
            mob: MobDef::default(),
            defeat_policy: DefeatPolicy::Respawn {
                hp_growth_percent: 125,
            },
        }
    }
}

impl EconomyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.income_interval_ticks == 0 {
            return Err(ConfigError::Invalid(
                "incomeIntervalTicks must be positive".to_string(),
            ));
        }
        if self.mob.max_hp == 0 {
            return Err(ConfigError::Invalid("mob maxHp must be positive".to_string()));
        }
        if let DefeatPolicy::Respawn { hp_growth_percent } = self.defeat_policy {
            if hp_growth_percent == 0 {
                return Err(ConfigError::Invalid(
                    "respawn hpGrowthPercent must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mob {
    pub def_id: String,
    pub hp: u64,
    pub max_hp: u64,
    pub generation: u32,
    defeated: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hit {
    pub dealt: u64,
    /// Set only on the hit that brought hp to zero.
    pub defeated_now: bool,
}

impl Mob {
    pub fn new(def: &MobDef) -> Self {
        Self {
            def_id: def.id.clone(),
            hp: def.max_hp,
            max_hp: def.max_hp,
            generation: 1,
            defeated: false,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Clamps at zero. A defeated mob absorbs further hits.
    pub fn apply_damage(&mut self, amount: u64) -> Hit {
        if self.defeated || amount == 0 {
            return Hit::default();
        }
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        let defeated_now = self.hp == 0;
        self.defeated = defeated_now;
        Hit {
            dealt,
            defeated_now,
        }
    }

    fn respawned(&self, hp_growth_percent: u32) -> Mob {
        let max_hp = (self.max_hp.saturating_mul(hp_growth_percent as u64) / 100).max(1);
        Mob {
            def_id: self.def_id.clone(),
            hp: max_hp,
            max_hp,
            generation: self.generation.saturating_add(1),
            defeated: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLedger {
    pub gold: u64,
    pub damage_dealt: u64,
    pub beat_hits: u32,
    pub last_clear_tick: Option<u64>,
    pub last_beat_tick: Option<u64>,
    beat_damage_at_last_beat: u64,
    pub active: bool,
}

/// Gimmick-driven scaling applied on top of the base tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyModifiers {
    pub gold_percent: u32,
    pub damage_percent: u32,
}

impl Default for EconomyModifiers {
    fn default() -> Self {
        Self {
            gold_percent: 100,
            damage_percent: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearReward {
    pub gold: u64,
    pub damage: u64,
    pub defeated_mob: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobDefeat {
    pub mob_id: String,
    pub generation: u32,
    pub tick: u64,
    pub finishing_player: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefeatResolution {
    Respawned { defeat: MobDefeat, next: Mob },
    RoundOver { defeat: MobDefeat },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEconomyView {
    pub gold: u64,
    pub damage_dealt: u64,
    pub mob_hp: u64,
    pub mob_max_hp: u64,
}

/// Shared mob and per-player gold ledger of one room.
#[derive(Debug, Clone)]
pub struct BattleEconomy {
    config: EconomyConfig,
    mob: Mob,
    ledgers: BTreeMap<PlayerId, PlayerLedger>,
    last_income_boundary: u64,
    modifiers: EconomyModifiers,
    pending_defeat: Option<MobDefeat>,
    defeats: u32,
}

impl BattleEconomy {
    pub fn new(config: EconomyConfig) -> Self {
        let mob = Mob::new(&config.mob);
        Self {
            config,
            mob,
            ledgers: BTreeMap::new(),
            last_income_boundary: 0,
            modifiers: EconomyModifiers::default(),
            pending_defeat: None,
            defeats: 0,
        }
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn mob(&self) -> &Mob {
        &self.mob
    }

    pub fn defeats(&self) -> u32 {
        self.defeats
    }

    pub fn ledger(&self, player: &str) -> Option<&PlayerLedger> {
        self.ledgers.get(player)
    }

    pub fn ledgers(&self) -> &BTreeMap<PlayerId, PlayerLedger> {
        &self.ledgers
    }

    pub fn add_player(&mut self, player: &str) {
        self.ledgers
            .entry(player.to_string())
            .or_insert_with(|| PlayerLedger {
                active: true,
                ..PlayerLedger::default()
            });
    }

    pub fn remove_player(&mut self, player: &str) -> Option<PlayerLedger> {
        self.ledgers.remove(player)
    }

    /// Inactive players (topped out) stop receiving passive income.
    pub fn set_player_active(&mut self, player: &str, active: bool) {
        if let Some(ledger) = self.ledgers.get_mut(player) {
            ledger.active = active;
        }
    }

    pub fn set_modifiers(&mut self, modifiers: EconomyModifiers) {
        self.modifiers = modifiers;
    }

    pub fn modifiers(&self) -> EconomyModifiers {
        self.modifiers
    }

    /// Restarts the income schedule, e.g. when the room goes active.
    pub fn reset_income_schedule(&mut self, tick: u64) {
        self.last_income_boundary = tick / self.config.income_interval_ticks.max(1);
    }

    pub fn on_lines_cleared(
        &mut self,
        player: &str,
        count: u8,
        multiplier: Multiplier,
        tick: u64,
    ) -> Result<ClearReward, ActionError> {
        let modifiers = self.modifiers;
        let Some(ledger) = self.ledgers.get_mut(player) else {
            return Err(ActionError::UnknownPlayer(player.to_string()));
        };
        if count == 0 {
            return Ok(ClearReward::default());
        }
        let idx = (count.min(4) - 1) as usize;

        let gold =
            self.config.gold_per_lines[idx].saturating_mul(modifiers.gold_percent as u64) / 100;
        let base = multiplier.apply(self.config.damage_per_lines[idx]);
        let mut damage = Multiplier(modifiers.damage_percent).apply(base);

        // A beat hit from the same tick already landed part of this damage.
        // Only the first clear after it is reduced.
        if ledger.last_beat_tick == Some(tick) {
            damage = damage.saturating_sub(ledger.beat_damage_at_last_beat);
            ledger.beat_damage_at_last_beat = 0;
        }

        ledger.gold = ledger.gold.saturating_add(gold);
        ledger.last_clear_tick = Some(tick);

        let hit = self.mob.apply_damage(damage);
        ledger.damage_dealt = ledger.damage_dealt.saturating_add(hit.dealt);
        if hit.defeated_now {
            self.record_defeat(player, tick);
        }

        debug!(
            player,
            count,
            gold,
            damage = hit.dealt,
            mob_hp = self.mob.hp,
            "line clear reward"
        );
        Ok(ClearReward {
            gold,
            damage: hit.dealt,
            defeated_mob: hit.defeated_now,
        })
    }

    /// Rhythm hit. Returns `Ok(None)` when the hit is absorbed because the
    /// player already scored this tick.
    pub fn on_beat_hit(&mut self, player: &str, tick: u64) -> Result<Option<u64>, ActionError> {
        let modifiers = self.modifiers;
        let Some(ledger) = self.ledgers.get_mut(player) else {
            return Err(ActionError::UnknownPlayer(player.to_string()));
        };
        if ledger.last_clear_tick == Some(tick) || ledger.last_beat_tick == Some(tick) {
            return Ok(None);
        }

        let base = Multiplier(self.config.beat_multiplier_percent).apply(self.config.beat_damage);
        let damage = Multiplier(modifiers.damage_percent).apply(base);
        let hit = self.mob.apply_damage(damage);

        ledger.last_beat_tick = Some(tick);
        ledger.beat_damage_at_last_beat = hit.dealt;
        ledger.beat_hits = ledger.beat_hits.saturating_add(1);
        ledger.damage_dealt = ledger.damage_dealt.saturating_add(hit.dealt);
        if hit.defeated_now {
            self.record_defeat(player, tick);
        }
        Ok(Some(hit.dealt))
    }

    /// Credits every active player once per income boundary crossed since the
    /// last call. Skipped ticks are caught up; repeated ticks credit nothing.
    /// Returns the number of boundaries credited.
    pub fn passive_income_tick(&mut self, tick: u64) -> u64 {
        let boundary = tick / self.config.income_interval_ticks.max(1);
        if boundary <= self.last_income_boundary {
            return 0;
        }
        let periods = boundary - self.last_income_boundary;
        self.last_income_boundary = boundary;

        let amount = self.config.income_amount.saturating_mul(periods);
        for ledger in self.ledgers.values_mut().filter(|l| l.active) {
            ledger.gold = ledger.gold.saturating_add(amount);
        }
        periods
    }

    /// Applies the defeat policy for a defeat recorded during this tick.
    pub fn settle_defeat(&mut self) -> Option<DefeatResolution> {
        let defeat = self.pending_defeat.take()?;
        self.defeats = self.defeats.saturating_add(1);

        let bounty = self.config.defeat_bounty;
        for ledger in self.ledgers.values_mut().filter(|l| l.active) {
            ledger.gold = ledger.gold.saturating_add(bounty);
        }

        match self.config.defeat_policy {
            DefeatPolicy::Respawn { hp_growth_percent } => {
                let next = self.mob.respawned(hp_growth_percent);
                info!(
                    mob = %next.def_id,
                    generation = next.generation,
                    max_hp = next.max_hp,
                    "mob respawned"
                );
                self.mob = next.clone();
                Some(DefeatResolution::Respawned { defeat, next })
            }
            DefeatPolicy::EndRound => Some(DefeatResolution::RoundOver { defeat }),
        }
    }

    pub fn player_view(&self, player: &str) -> Option<PlayerEconomyView> {
        let ledger = self.ledgers.get(player)?;
        Some(PlayerEconomyView {
            gold: ledger.gold,
            damage_dealt: ledger.damage_dealt,
            mob_hp: self.mob.hp,
            mob_max_hp: self.mob.max_hp,
        })
    }

    fn record_defeat(&mut self, player: &str, tick: u64) {
        info!(
            player,
            mob = %self.mob.def_id,
            generation = self.mob.generation,
            tick,
            "mob defeated"
        );
        self.pending_defeat = Some(MobDefeat {
            mob_id: self.mob.def_id.clone(),
            generation: self.mob.generation,
            tick,
            finishing_player: player.to_string(),
        });
    }
}
