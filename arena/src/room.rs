//! Single-room state machine.
//!
//! `ArenaRoom` is synchronous and owns every piece of room state. The room
//! actor is its only writer; tests drive it directly. Time advances only
//! through [`ArenaRoom::advance_to`], which takes the logical tick the caller
//! derived from wall-clock time. Every time-driven effect compares against a
//! boundary it last applied, so a jump of several ticks catches up once.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, warn};

use crate::board::BOARD_WIDTH;
use crate::chaos::{ChaosEvent, ChaosMeter, ChaosTier};
use crate::combo::{ComboScorer, Multiplier};
use crate::config::ArenaConfig;
use crate::economy::{BattleEconomy, DefeatResolution};
use crate::error::{ActionError, ConfigError, JoinError, StartError};
use crate::gimmick::{GimmickDirector, GimmickKind, GimmickModifiers};
use crate::kicks::WallKickTable;
use crate::piece_engine::{GravityStep, LockOutcome, PieceEngine};
use crate::protocol::{
    ActionResult, EndReason, LockReport, PlayerAction, PlayerId, PlayerStatDelta, RelayPayload,
    RoomEvent, RoomId, RoomPhase, RoomRecord, RoomSummary,
};
use crate::ranking::{RankingEntry, compute_rankings};
use crate::tempo::Tempo;

const PLAYER_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
pub struct PlayerSlot {
    id: PlayerId,
    engine: Option<PieceEngine>,
    scorer: ComboScorer,
    score: u64,
    alive: bool,
    survival_ticks: u64,
    gravity_ms: u64,
}

impl PlayerSlot {
    fn new(id: PlayerId, scorer: ComboScorer) -> Self {
        Self {
            id,
            engine: None,
            scorer,
            score: 0,
            alive: false,
            survival_ticks: 0,
            gravity_ms: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn engine(&self) -> Option<&PieceEngine> {
        self.engine.as_ref()
    }

    pub fn scorer(&self) -> &ComboScorer {
        &self.scorer
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Has a live board.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn survival_ticks(&self) -> u64 {
        self.survival_ticks
    }
}

pub struct ArenaRoom {
    id: RoomId,
    config: ArenaConfig,
    kicks: Arc<WallKickTable>,
    seed: u64,
    phase: RoomPhase,
    tick: u64,
    waiting_ticks: u64,
    players: BTreeMap<PlayerId, PlayerSlot>,
    economy: BattleEconomy,
    chaos: ChaosMeter,
    gimmicks: GimmickDirector,
    tempo: Tempo,
    modifiers: GimmickModifiers,
    hole_rng: StdRng,
    events: Vec<RoomEvent>,
    rankings: Option<Vec<RankingEntry>>,
    end_reason: Option<EndReason>,
}

impl ArenaRoom {
    pub fn new(id: impl Into<RoomId>, config: ArenaConfig, seed: u64) -> Result<Self, ConfigError> {
        let kicks = config.engine.kick_table()?;
        Self::with_kicks(id, config, kicks, seed)
    }

    pub fn with_kicks(
        id: impl Into<RoomId>,
        config: ArenaConfig,
        kicks: Arc<WallKickTable>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let id = id.into();
        let room = Self {
            economy: BattleEconomy::new(config.economy.clone()),
            chaos: ChaosMeter::new(config.chaos.clone()),
            gimmicks: GimmickDirector::new(config.gimmicks.clone(), seed ^ 0x6A09_E667),
            tempo: Tempo::new(config.tempo.clone()),
            modifiers: GimmickModifiers::default(),
            hole_rng: StdRng::seed_from_u64(seed ^ 0xBB67_AE85),
            events: vec![RoomEvent::RoomCreated { room_id: id.clone() }],
            id,
            config,
            kicks,
            seed,
            phase: RoomPhase::Waiting,
            tick: 0,
            waiting_ticks: 0,
            players: BTreeMap::new(),
            rankings: None,
            end_reason: None,
        };
        info!(room = %room.id, "room created");
        Ok(room)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Logical tick since activation.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn waiting_ticks(&self) -> u64 {
        self.waiting_ticks
    }

    pub fn economy(&self) -> &BattleEconomy {
        &self.economy
    }

    pub fn chaos(&self) -> &ChaosMeter {
        &self.chaos
    }

    pub fn gimmicks(&self) -> &GimmickDirector {
        &self.gimmicks
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub fn modifiers(&self) -> GimmickModifiers {
        self.modifiers
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().cloned().collect()
    }

    pub fn player(&self, id: &str) -> Option<&PlayerSlot> {
        self.players.get(id)
    }

    pub fn rankings(&self) -> Option<&[RankingEntry]> {
        self.rankings.as_deref()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Direct access to a player's engine for scenario setup.
    pub fn engine_mut(&mut self, player: &str) -> Option<&mut PieceEngine> {
        self.players.get_mut(player)?.engine.as_mut()
    }

    pub fn drain_events(&mut self) -> Vec<RoomEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn join(&mut self, player: &str) -> Result<(), JoinError> {
        if self.phase != RoomPhase::Waiting {
            return Err(JoinError::NotJoinable);
        }
        if self.players.contains_key(player) {
            return Err(JoinError::AlreadyJoined(player.to_string()));
        }
        let capacity = self.config.room.max_players;
        if self.players.len() >= capacity {
            return Err(JoinError::RoomFull { capacity });
        }

        let scorer = ComboScorer::new(self.config.scoring.clone());
        self.players
            .insert(player.to_string(), PlayerSlot::new(player.to_string(), scorer));
        self.economy.add_player(player);
        self.events.push(RoomEvent::PlayerJoined {
            player_id: player.to_string(),
        });
        info!(room = %self.id, player, roster = self.players.len(), "player joined");
        Ok(())
    }

    /// Removes a player. An active room that drops below the minimum roster
    /// ends early; the others keep playing otherwise.
    pub fn leave(&mut self, player: &str) -> Result<(), ActionError> {
        if self.phase == RoomPhase::Ended {
            return Err(ActionError::RoomNotActive);
        }
        if self.players.remove(player).is_none() {
            return Err(ActionError::UnknownPlayer(player.to_string()));
        }
        self.economy.remove_player(player);
        self.events.push(RoomEvent::PlayerLeft {
            player_id: player.to_string(),
        });
        info!(room = %self.id, player, roster = self.players.len(), "player left");

        if self.phase == RoomPhase::Active && self.players.len() < self.config.room.min_players {
            self.end(EndReason::RosterBelowMinimum);
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), StartError> {
        if self.phase != RoomPhase::Waiting {
            return Err(StartError::NotWaiting);
        }
        let (min, max) = (self.config.room.min_players, self.config.room.max_players);
        let have = self.players.len();
        if have < min || have > max {
            return Err(StartError::RosterSize { have, min, max });
        }

        let engine_cfg = &self.config.engine;
        for (idx, slot) in self.players.values_mut().enumerate() {
            let seed = self
                .seed
                .wrapping_add((idx as u64 + 1).wrapping_mul(PLAYER_SEED_STRIDE));
            let mut engine = PieceEngine::new(seed, Arc::clone(&self.kicks))
                .with_lock_delay(engine_cfg.lock_delay_ms, engine_cfg.lock_delay_max_ms);
            slot.alive = engine.start().is_ok();
            slot.engine = Some(engine);
        }

        self.tick = 0;
        self.economy.reset_income_schedule(0);
        self.set_phase(RoomPhase::Active);
        info!(room = %self.id, players = have, "room started");
        Ok(())
    }

    /// Applies one player input. Rejected inputs change nothing.
    pub fn apply_action(
        &mut self,
        player: &str,
        action: PlayerAction,
    ) -> Result<ActionResult, ActionError> {
        if self.phase != RoomPhase::Active {
            return Err(ActionError::RoomNotActive);
        }
        let mirror = self.modifiers.mirror_controls;
        let Some(slot) = self.players.get_mut(player) else {
            return Err(ActionError::UnknownPlayer(player.to_string()));
        };
        let engine = match slot.engine.as_mut() {
            Some(engine) if slot.alive => engine,
            _ => return Err(ActionError::BoardGameOver(player.to_string())),
        };

        let mut result = ActionResult::default();
        match action {
            PlayerAction::Move { direction } => {
                let direction = if mirror { direction.mirrored() } else { direction };
                let (dx, dy) = direction.delta();
                if !engine.try_move(dx, dy) {
                    return Err(ActionError::Blocked);
                }
                result.rows = u32::from(dy != 0);
            }
            PlayerAction::Rotate { direction } => {
                if !engine.try_rotate(direction) {
                    return Err(ActionError::Blocked);
                }
            }
            PlayerAction::SoftDrop => {
                result.rows = engine.soft_drop();
            }
            PlayerAction::Hold => {
                if !engine.hold() {
                    return Err(ActionError::Blocked);
                }
            }
            PlayerAction::HardDrop => {
                let Some(outcome) = engine.hard_drop() else {
                    return Err(ActionError::Blocked);
                };
                result.rows = outcome.drop_distance;
                let report = self.resolve_lock(player, outcome, true);
                result.lock = Some(report);
            }
        }
        debug!(room = %self.id, player, ?action, tick = self.tick, "action applied");
        Ok(result)
    }

    /// Advances to `target` (a logical tick). Ticks at or behind the current
    /// one are ignored. In Waiting the target counts waiting time.
    pub fn advance_to(&mut self, target: u64) {
        match self.phase {
            RoomPhase::Waiting => {
                self.waiting_ticks = self.waiting_ticks.max(target);
                let timeout = self.config.room.waiting_timeout_ticks;
                if timeout > 0 && self.waiting_ticks >= timeout {
                    info!(room = %self.id, waited = self.waiting_ticks, "waiting timed out");
                    self.end(EndReason::Cancelled);
                }
            }
            RoomPhase::Active => {
                if target <= self.tick {
                    return;
                }
                let elapsed = target - self.tick;
                self.tick = target;
                self.step(elapsed);
            }
            RoomPhase::Ended => {}
        }
    }

    /// Ends the room now, e.g. on teardown.
    pub fn shutdown(&mut self) {
        if self.phase != RoomPhase::Ended {
            self.end(EndReason::Shutdown);
        }
    }

    /// One relay payload per player with a board.
    pub fn relay_payloads(&self) -> Vec<RelayPayload> {
        let active_gimmicks = self.gimmicks.active_kinds();
        self.players
            .values()
            .filter_map(|slot| {
                let engine = slot.engine.as_ref()?;
                let gold = self.economy.ledger(&slot.id).map_or(0, |l| l.gold);
                Some(RelayPayload {
                    player_id: slot.id.clone(),
                    board_snapshot: engine.snapshot(),
                    gold,
                    mob_hp: self.economy.mob().hp,
                    combo_count: slot.scorer.combo(),
                    chaos: self.chaos.value(),
                    tempo: self.tempo.bpm(),
                    active_gimmicks: active_gimmicks.clone(),
                    tick: self.tick,
                })
            })
            .collect()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            phase: self.phase,
            tick: self.tick,
            players: self.player_ids(),
            chaos: self.chaos.value(),
            tempo: self.tempo.bpm(),
            mob: self.economy.mob().clone(),
            active_gimmicks: self.gimmicks.active().to_vec(),
            rankings: self.rankings.clone(),
        }
    }

    /// Persistence record; available once the room has ended.
    pub fn record(&self) -> Option<RoomRecord> {
        let reason = self.end_reason?;
        let rankings = self.rankings.clone().unwrap_or_default();
        let stats = self
            .players
            .values()
            .map(|slot| {
                let ledger = self.economy.ledger(&slot.id);
                PlayerStatDelta {
                    player_id: slot.id.clone(),
                    gold: ledger.map_or(0, |l| l.gold),
                    damage_dealt: ledger.map_or(0, |l| l.damage_dealt),
                    lines_cleared: slot.engine.as_ref().map_or(0, |e| e.lines_cleared()),
                    pieces_locked: slot.engine.as_ref().map_or(0, |e| e.pieces_locked()),
                    score: slot.score,
                    survival_ticks: slot.survival_ticks,
                }
            })
            .collect();
        Some(RoomRecord {
            room_id: self.id.clone(),
            reason,
            final_tick: self.tick,
            rankings,
            stats,
        })
    }

    fn step(&mut self, elapsed: u64) {
        let tick = self.tick;

        for _ in 0..elapsed {
            self.chaos.decay();
        }

        for ended in self.gimmicks.expire(tick) {
            debug!(room = %self.id, kind = ?ended.kind, tick, "gimmick expired");
            self.events.push(RoomEvent::GimmickDeactivated {
                kind: ended.kind,
                tick,
            });
        }
        self.refresh_modifiers();

        self.run_gravity(elapsed);

        let credited = self.economy.passive_income_tick(tick);
        if credited > 0 {
            debug!(room = %self.id, tick, periods = credited, "passive income");
        }

        if self.settle_defeat() {
            self.end(EndReason::MobRoundOver);
            return;
        }

        if let Some(policy) = self.chaos.check_collapse() {
            info!(room = %self.id, ?policy, tick, "chaos collapse");
            if policy.clears_gimmicks() {
                for ended in self.gimmicks.clear_all(tick) {
                    self.events.push(RoomEvent::GimmickDeactivated {
                        kind: ended.kind,
                        tick,
                    });
                }
            }
            self.events.push(RoomEvent::ChaosCollapse { policy, tick });
        }

        let tier = self.chaos.tier();
        if let Some(gimmick) = self.gimmicks.try_draw(tier, tick) {
            info!(room = %self.id, kind = ?gimmick.kind, ?tier, tick, "gimmick activated");
            self.events.push(RoomEvent::GimmickActivated { gimmick });
            if gimmick.kind == GimmickKind::GarbageSurge {
                self.garbage_surge();
            }
        }
        self.refresh_modifiers();

        for slot in self.players.values_mut().filter(|s| s.alive) {
            slot.survival_ticks = tick;
        }

        if !self.players.values().any(|s| s.alive) {
            self.end(EndReason::AllToppedOut);
            return;
        }
        let limit = self.config.room.max_duration_ticks;
        if limit > 0 && tick >= limit {
            self.end(EndReason::TimeLimit);
        }
    }

    /// Gravity moves pieces at the tempo's interval; lock delay runs on the
    /// tick clock so it lasts its configured time at any tempo.
    fn run_gravity(&mut self, elapsed: u64) {
        let tick_ms = self.config.room.tick_ms;
        let lock_dt = u32::try_from(tick_ms).unwrap_or(u32::MAX);
        let interval = self.tempo.gravity_interval_ms().max(1) as u64;
        let ids: Vec<PlayerId> = self.players.keys().cloned().collect();

        for id in ids {
            let mut locks = Vec::new();
            if let Some(slot) = self.players.get_mut(&id) {
                if !slot.alive {
                    continue;
                }
                let Some(engine) = slot.engine.as_mut() else {
                    continue;
                };
                for _ in 0..elapsed {
                    slot.gravity_ms = slot.gravity_ms.saturating_add(tick_ms);
                    while slot.gravity_ms >= interval {
                        slot.gravity_ms -= interval;
                        if !engine.try_move(0, -1) {
                            slot.gravity_ms = 0;
                            break;
                        }
                    }
                    if let GravityStep::Locked(outcome) = engine.advance_lock_delay(lock_dt) {
                        let over = outcome.game_over;
                        locks.push(outcome);
                        if over {
                            break;
                        }
                    }
                }
            }
            for outcome in locks {
                self.resolve_lock(&id, outcome, false);
            }
        }
    }

    /// Runs a lock through scoring, the economy and chaos.
    fn resolve_lock(&mut self, player: &str, outcome: LockOutcome, hard_drop: bool) -> LockReport {
        let tick = self.tick;
        let count = outcome.lines_cleared();
        let all_clear = outcome.lines.all_clear;

        let Some(slot) = self.players.get_mut(player) else {
            warn!(room = %self.id, player, "lock for a player no longer in the roster");
            return LockReport {
                lines: count,
                all_clear,
                combo: 0,
                back_to_back: false,
                multiplier: Multiplier::ONE,
                points: 0,
                gold: 0,
                damage: 0,
                beat_damage: None,
                game_over: outcome.game_over,
            };
        };
        slot.scorer
            .set_combo_bonus_extra(self.modifiers.combo_bonus_extra);
        let score = slot.scorer.on_lock(count, all_clear);
        slot.score = slot.score.saturating_add(score.points as u64);

        let mut report = LockReport {
            lines: count,
            all_clear,
            combo: score.combo,
            back_to_back: score.back_to_back,
            multiplier: score.multiplier,
            points: score.points,
            gold: 0,
            damage: 0,
            beat_damage: None,
            game_over: outcome.game_over,
        };

        if count > 0 {
            match self
                .economy
                .on_lines_cleared(player, count, score.multiplier, tick)
            {
                Ok(reward) => {
                    report.gold = reward.gold;
                    report.damage = reward.damage;
                }
                Err(err) => warn!(room = %self.id, player, %err, "clear reward skipped"),
            }
            self.chaos.record(ChaosEvent::LinesCleared(count));
            self.chaos.record(ChaosEvent::Damage(report.damage));
            if all_clear {
                self.chaos.record(ChaosEvent::AllClear);
            }
        }

        if hard_drop && self.tempo.is_on_beat(tick, self.config.room.tick_ms) {
            match self.economy.on_beat_hit(player, tick) {
                Ok(beat) => report.beat_damage = beat,
                Err(err) => warn!(room = %self.id, player, %err, "beat hit skipped"),
            }
        }

        if outcome.game_over {
            self.top_out(player);
        }

        debug!(
            room = %self.id,
            player,
            lines = count,
            combo = report.combo,
            multiplier = report.multiplier.percent(),
            damage = report.damage,
            "lock resolved"
        );
        report
    }

    fn top_out(&mut self, player: &str) {
        let tick = self.tick;
        if let Some(slot) = self.players.get_mut(player) {
            if !slot.alive {
                return;
            }
            slot.alive = false;
            slot.survival_ticks = tick;
        }
        self.economy.set_player_active(player, false);
        self.chaos.record(ChaosEvent::TopOut);
        self.events.push(RoomEvent::PlayerToppedOut {
            player_id: player.to_string(),
            tick,
        });
        info!(room = %self.id, player, tick, "player topped out");
    }

    /// Resolves a defeat recorded since the last settle. Returns true when the
    /// defeat policy ends the round.
    fn settle_defeat(&mut self) -> bool {
        let Some(resolution) = self.economy.settle_defeat() else {
            return false;
        };
        self.chaos.record(ChaosEvent::MobDefeated);
        match resolution {
            DefeatResolution::Respawned { defeat, next } => {
                self.events.push(RoomEvent::MobDefeated { defeat });
                self.events.push(RoomEvent::MobRespawned { mob: next });
                false
            }
            DefeatResolution::RoundOver { defeat } => {
                self.events.push(RoomEvent::MobDefeated { defeat });
                true
            }
        }
    }

    fn garbage_surge(&mut self) {
        let rows = self.config.gimmicks.effects.garbage_surge_rows;
        let hole = self.hole_rng.gen_range(0..BOARD_WIDTH);
        let mut toppled = Vec::new();
        for slot in self.players.values_mut().filter(|s| s.alive) {
            if let Some(engine) = slot.engine.as_mut() {
                if engine.inject_garbage(rows, hole) {
                    toppled.push(slot.id.clone());
                }
            }
        }
        for id in toppled {
            self.top_out(&id);
        }
    }

    fn refresh_modifiers(&mut self) {
        self.modifiers = self.gimmicks.modifiers();
        self.economy.set_modifiers(self.modifiers.economy);
        let frenzy = self.chaos.tier() == ChaosTier::Frenzy;
        self.tempo.update(self.modifiers.tempo_delta_bpm, frenzy);
    }

    fn set_phase(&mut self, to: RoomPhase) {
        let from = self.phase;
        self.phase = to;
        self.events.push(RoomEvent::PhaseChanged {
            from,
            to,
            tick: self.tick,
        });
    }

    fn end(&mut self, reason: EndReason) {
        if self.phase == RoomPhase::Ended {
            return;
        }
        // A kill landed by an action this tick still pays out before the
        // room closes. The caller's reason stands.
        self.settle_defeat();
        let rankings = compute_rankings(self.players.values().map(|slot| {
            let damage = self.economy.ledger(&slot.id).map_or(0, |l| l.damage_dealt);
            (slot.id.clone(), damage, slot.survival_ticks)
        }));
        self.rankings = Some(rankings.clone());
        self.end_reason = Some(reason);
        self.set_phase(RoomPhase::Ended);
        self.events.push(RoomEvent::RoomEnded { reason, rankings });
        info!(room = %self.id, ?reason, tick = self.tick, "room ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> ArenaRoom {
        ArenaRoom::new("r1", ArenaConfig::default(), 11).unwrap()
    }

    #[test]
    fn join_is_rejected_once_full() {
        let mut config = ArenaConfig::default();
        config.room.max_players = 2;
        let mut room = ArenaRoom::new("full", config, 1).unwrap();
        room.join("a").unwrap();
        room.join("b").unwrap();
        assert_eq!(room.join("c"), Err(JoinError::RoomFull { capacity: 2 }));
        assert_eq!(
            room.join("a"),
            Err(JoinError::AlreadyJoined("a".to_string()))
        );
    }

    #[test]
    fn start_requires_minimum_roster() {
        let mut room = room();
        room.join("solo").unwrap();
        assert_eq!(
            room.start(),
            Err(StartError::RosterSize {
                have: 1,
                min: 2,
                max: 8
            })
        );
        room.join("duo").unwrap();
        room.start().unwrap();
        assert_eq!(room.phase(), RoomPhase::Active);
        assert_eq!(room.start(), Err(StartError::NotWaiting));
    }

    #[test]
    fn actions_outside_active_are_rejected() {
        let mut room = room();
        room.join("a").unwrap();
        assert_eq!(
            room.apply_action("a", PlayerAction::HardDrop),
            Err(ActionError::RoomNotActive)
        );
    }

    #[test]
    fn waiting_room_cancels_after_timeout() {
        let mut room = room();
        room.join("a").unwrap();
        room.advance_to(1_199);
        assert_eq!(room.phase(), RoomPhase::Waiting);
        room.advance_to(1_200);
        assert_eq!(room.phase(), RoomPhase::Ended);
        assert_eq!(room.end_reason(), Some(EndReason::Cancelled));
        assert_eq!(room.join("b"), Err(JoinError::NotJoinable));
    }

    #[test]
    fn leaving_below_minimum_ends_active_room() {
        let mut room = room();
        room.join("a").unwrap();
        room.join("b").unwrap();
        room.start().unwrap();
        room.leave("b").unwrap();
        assert_eq!(room.phase(), RoomPhase::Ended);
        assert_eq!(room.end_reason(), Some(EndReason::RosterBelowMinimum));
        let rankings = room.rankings().unwrap();
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[0].player_id, "a");
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let mut room = room();
        room.join("a").unwrap();
        room.join("b").unwrap();
        room.start().unwrap();
        room.advance_to(10);
        room.advance_to(7);
        assert_eq!(room.tick(), 10);
    }

    #[test]
    fn events_track_lifecycle() {
        let mut room = room();
        room.join("a").unwrap();
        room.join("b").unwrap();
        room.start().unwrap();
        let events = room.drain_events();
        assert!(matches!(events[0], RoomEvent::RoomCreated { .. }));
        assert!(events.contains(&RoomEvent::PhaseChanged {
            from: RoomPhase::Waiting,
            to: RoomPhase::Active,
            tick: 0,
        }));
        assert!(room.drain_events().is_empty());
    }
}
