use arena::board::{BOARD_WIDTH, Cell};
use arena::chaos::CollapsePolicy;
use arena::combo::Multiplier;
use arena::config::ArenaConfig;
use arena::economy::DefeatPolicy;
use arena::error::ActionError;
use arena::gimmick::GimmickKind;
use arena::piece::{Rotation, Shape, Vec2i};
use arena::protocol::{EndReason, MoveDirection, PlayerAction, RoomEvent, RoomPhase};
use arena::room::ArenaRoom;

fn started_room(config: ArenaConfig) -> ArenaRoom {
    let mut room = ArenaRoom::new("scenario", config, 77).unwrap();
    room.join("alice").unwrap();
    room.join("bob").unwrap();
    room.start().unwrap();
    room.drain_events();
    room
}

/// Fills rows `0..rows` except column `gap`, plus one stray cell above so the
/// clear never empties the board.
fn prepare_well(room: &mut ArenaRoom, player: &str, rows: i32, gap: i32) {
    let engine = room.engine_mut(player).unwrap();
    for y in 0..rows {
        for x in 0..BOARD_WIDTH as i32 {
            if x != gap {
                engine.set_cell(x, y, Cell::Garbage);
            }
        }
    }
    engine.set_cell(if gap == 0 { 1 } else { 0 }, rows, Cell::Garbage);
    // Vertical I whose column lands in `gap`.
    engine.set_active_for_test(Shape::I, Vec2i::new(gap - 2, 21), Rotation::Right);
}

#[test]
fn tetris_then_combo_carried_single() {
    let mut room = started_room(ArenaConfig::default());

    prepare_well(&mut room, "alice", 4, 9);
    let result = room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    let lock = result.lock.unwrap();
    assert_eq!(lock.lines, 4);
    assert_eq!(lock.combo, 1);
    assert_eq!(lock.multiplier, Multiplier(150));
    assert_eq!(lock.gold, 80);
    assert_eq!(lock.damage, 480);
    assert_eq!(lock.beat_damage, None);

    prepare_well(&mut room, "bob", 1, 9);
    let first = room
        .apply_action("bob", PlayerAction::HardDrop)
        .unwrap()
        .lock
        .unwrap();
    assert_eq!((first.combo, first.multiplier), (1, Multiplier::ONE));
    assert_eq!(first.damage, 40);

    // The leftover I cells fill column 9; the next single goes into column 8.
    {
        let engine = room.engine_mut("bob").unwrap();
        for x in 0..8 {
            if engine.board().cell(x, 0) == Some(Cell::Empty) {
                engine.set_cell(x, 0, Cell::Garbage);
            }
        }
        engine.set_active_for_test(Shape::I, Vec2i::new(6, 21), Rotation::Right);
    }
    let second = room
        .apply_action("bob", PlayerAction::HardDrop)
        .unwrap()
        .lock
        .unwrap();
    assert_eq!(second.lines, 1);
    assert_eq!(second.combo, 2);
    assert_eq!(second.multiplier, Multiplier(110));
    assert_eq!(second.damage, 44);

    let alice = room.economy().player_view("alice").unwrap();
    let bob = room.economy().player_view("bob").unwrap();
    assert_eq!((alice.gold, alice.damage_dealt), (80, 480));
    assert_eq!((bob.gold, bob.damage_dealt), (20, 84));
    assert_eq!(room.economy().mob().hp, 6_000 - 480 - 84);

    room.shutdown();
    let rankings = room.rankings().unwrap();
    assert_eq!(rankings[0].player_id, "alice");
    assert_eq!(rankings[0].rank, 1);
    assert_eq!(rankings[1].player_id, "bob");
    assert_eq!(rankings[1].rank, 2);

    let record = room.record().unwrap();
    assert_eq!(record.reason, EndReason::Shutdown);
    let bob_stats = record.stats.iter().find(|s| s.player_id == "bob").unwrap();
    assert_eq!(bob_stats.lines_cleared, 2);
    assert_eq!(bob_stats.pieces_locked, 2);
}

#[test]
fn empty_lock_breaks_the_combo() {
    let mut room = started_room(ArenaConfig::default());

    prepare_well(&mut room, "alice", 1, 9);
    room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    assert_eq!(room.player("alice").unwrap().scorer().combo(), 1);

    let miss = room
        .apply_action("alice", PlayerAction::HardDrop)
        .unwrap()
        .lock
        .unwrap();
    assert_eq!(miss.lines, 0);
    assert_eq!(miss.combo, 0);
    assert_eq!(room.player("alice").unwrap().scorer().combo(), 0);
}

#[test]
fn killing_blow_with_end_round_policy_ends_the_room() {
    let mut config = ArenaConfig::default();
    config.economy.mob.max_hp = 300;
    config.economy.defeat_policy = DefeatPolicy::EndRound;
    let mut room = started_room(config);

    prepare_well(&mut room, "bob", 4, 9);
    let lock = room
        .apply_action("bob", PlayerAction::HardDrop)
        .unwrap()
        .lock
        .unwrap();
    assert_eq!(lock.damage, 300, "damage is clamped to remaining hp");
    assert_eq!(room.economy().mob().hp, 0);
    assert_eq!(room.phase(), RoomPhase::Active, "defeat settles at end of tick");

    room.advance_to(1);
    assert_eq!(room.phase(), RoomPhase::Ended);
    assert_eq!(room.end_reason(), Some(EndReason::MobRoundOver));

    let events = room.drain_events();
    let defeats = events
        .iter()
        .filter(|e| matches!(e, RoomEvent::MobDefeated { .. }))
        .count();
    assert_eq!(defeats, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        RoomEvent::RoomEnded {
            reason: EndReason::MobRoundOver,
            ..
        }
    )));

    // Defeat bounty reaches both players.
    let bob = room.economy().ledger("bob").unwrap();
    let alice = room.economy().ledger("alice").unwrap();
    assert_eq!(bob.gold, 80 + 50);
    assert_eq!(alice.gold, 50);

    assert_eq!(
        room.apply_action("alice", PlayerAction::HardDrop),
        Err(ActionError::RoomNotActive)
    );
}

#[test]
fn respawn_policy_brings_a_tougher_mob() {
    let mut config = ArenaConfig::default();
    config.economy.mob.max_hp = 100;
    let mut room = started_room(config);

    prepare_well(&mut room, "alice", 4, 9);
    room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    room.advance_to(1);

    assert_eq!(room.phase(), RoomPhase::Active);
    let mob = room.economy().mob();
    assert_eq!(mob.generation, 2);
    assert_eq!(mob.max_hp, 125);
    assert_eq!(mob.hp, 125);
    assert_eq!(room.economy().defeats(), 1);
}

#[test]
fn equal_damage_shares_first_place() {
    let mut room = started_room(ArenaConfig::default());
    prepare_well(&mut room, "alice", 1, 9);
    prepare_well(&mut room, "bob", 1, 9);
    room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    room.apply_action("bob", PlayerAction::HardDrop).unwrap();

    room.shutdown();
    let rankings = room.rankings().unwrap();
    assert!(rankings.iter().all(|r| r.rank == 1));
    assert_eq!(rankings[0].player_id, "alice");
}

#[test]
fn blocked_move_changes_nothing() {
    let mut room = started_room(ArenaConfig::default());
    room.engine_mut("alice")
        .unwrap()
        .set_active_for_test(Shape::O, Vec2i::new(0, 10), Rotation::Spawn);

    let err = room.apply_action(
        "alice",
        PlayerAction::Move {
            direction: MoveDirection::Left,
        },
    );
    assert_eq!(err, Err(ActionError::Blocked));
    let piece = room.player("alice").unwrap().engine().unwrap().active().unwrap();
    assert_eq!(piece.origin, Vec2i::new(0, 10));
}

#[test]
fn topped_out_players_are_rejected_and_room_ends_when_all_are_out() {
    let mut room = started_room(ArenaConfig::default());
    for player in ["alice", "bob"] {
        let engine = room.engine_mut(player).unwrap();
        for y in 0..20 {
            for x in 0..BOARD_WIDTH as i32 {
                if (x + y) % 2 == 0 {
                    engine.set_cell(x, y, Cell::Garbage);
                }
            }
        }
    }

    let lock = room
        .apply_action("alice", PlayerAction::HardDrop)
        .unwrap()
        .lock
        .unwrap();
    assert!(lock.game_over);
    assert_eq!(
        room.apply_action("alice", PlayerAction::HardDrop),
        Err(ActionError::BoardGameOver("alice".to_string()))
    );
    assert_eq!(room.phase(), RoomPhase::Active);

    room.apply_action("bob", PlayerAction::HardDrop).unwrap();
    room.advance_to(1);
    assert_eq!(room.end_reason(), Some(EndReason::AllToppedOut));
}

#[test]
fn gravity_follows_the_clock() {
    let mut config = ArenaConfig::default();
    config.room.tick_ms = 100;
    let mut room = started_room(config);
    let start_y = room.player("alice").unwrap().engine().unwrap().active().unwrap().origin.y;

    // 800 ms gravity at base tempo: eight 100 ms ticks make one row.
    room.advance_to(8);
    let y = room.player("alice").unwrap().engine().unwrap().active().unwrap().origin.y;
    assert_eq!(y, start_y - 1);

    room.advance_to(24);
    let y = room.player("alice").unwrap().engine().unwrap().active().unwrap().origin.y;
    assert_eq!(y, start_y - 3);
}

#[test]
fn pending_defeat_settles_when_a_leave_ends_the_room() {
    let mut config = ArenaConfig::default();
    config.economy.mob.max_hp = 100;
    let mut room = started_room(config);

    prepare_well(&mut room, "alice", 4, 9);
    room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    assert_eq!(room.economy().mob().hp, 0);
    room.leave("bob").unwrap();

    assert_eq!(room.phase(), RoomPhase::Ended);
    assert_eq!(room.end_reason(), Some(EndReason::RosterBelowMinimum));
    assert_eq!(room.economy().defeats(), 1);
    let events = room.drain_events();
    let defeats = events
        .iter()
        .filter(|e| matches!(e, RoomEvent::MobDefeated { .. }))
        .count();
    assert_eq!(defeats, 1);
    assert_eq!(room.economy().ledger("alice").unwrap().gold, 80 + 50);
}

#[test]
fn pending_defeat_settles_on_shutdown() {
    let mut config = ArenaConfig::default();
    config.economy.mob.max_hp = 100;
    config.economy.defeat_policy = DefeatPolicy::EndRound;
    let mut room = started_room(config);

    prepare_well(&mut room, "bob", 4, 9);
    room.apply_action("bob", PlayerAction::HardDrop).unwrap();
    room.shutdown();

    assert_eq!(room.end_reason(), Some(EndReason::Shutdown));
    assert_eq!(room.economy().defeats(), 1);
    let events = room.drain_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, RoomEvent::MobDefeated { .. }))
            .count(),
        1
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, RoomEvent::RoomEnded { .. }))
            .count(),
        1
    );
}

/// Low thresholds so one Tetris (12 lines + 8 spike) enters the gimmick
/// tier, and a table that all but guarantees `favoured` on the first draw.
fn chaos_config(favoured: GimmickKind) -> ArenaConfig {
    let mut config = ArenaConfig::default();
    config.chaos.gimmick_threshold = 10;
    config.chaos.frenzy_threshold = 90;
    config.chaos.collapse_threshold = 95;
    config.chaos.decay_milli_per_tick = 0;
    config.gimmicks.draw_interval_ticks = 10;
    config.gimmicks.max_active = 1;
    for spec in &mut config.gimmicks.table {
        spec.weight = if spec.kind == favoured { 1_000_000_000 } else { 1 };
    }
    config
}

fn activated(events: &[RoomEvent]) -> Vec<GimmickKind> {
    events
        .iter()
        .filter_map(|e| match e {
            RoomEvent::GimmickActivated { gimmick } => Some(gimmick.kind),
            _ => None,
        })
        .collect()
}

#[test]
fn clears_raise_chaos_and_a_gimmick_runs_its_course() {
    let mut config = chaos_config(GimmickKind::Overclock);
    config.gimmicks.table.iter_mut().for_each(|spec| {
        if spec.kind == GimmickKind::Overclock {
            spec.duration_ticks = 30;
        }
    });
    // Chaos falls back below the gimmick tier before the overclock ends.
    config.chaos.decay_milli_per_tick = 400;
    let mut room = started_room(config);

    prepare_well(&mut room, "alice", 4, 9);
    room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    assert_eq!(room.chaos().value(), 20);
    assert_eq!(room.tempo().bpm(), 120);

    room.advance_to(10);
    assert_eq!(activated(&room.drain_events()), vec![GimmickKind::Overclock]);
    assert_eq!(room.modifiers().tempo_delta_bpm, 30);
    assert_eq!(room.tempo().bpm(), 150);

    room.advance_to(40);
    let events = room.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        RoomEvent::GimmickDeactivated {
            kind: GimmickKind::Overclock,
            tick: 40
        }
    )));
    assert!(activated(&events).is_empty());
    assert!(room.gimmicks().active().is_empty());
    assert_eq!(room.modifiers().tempo_delta_bpm, 0);
    assert_eq!(room.tempo().bpm(), 120);
}

#[test]
fn mirror_controls_swap_horizontal_moves() {
    let mut room = started_room(chaos_config(GimmickKind::MirrorControls));
    prepare_well(&mut room, "alice", 4, 9);
    room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    room.advance_to(10);
    assert_eq!(activated(&room.drain_events()), vec![GimmickKind::MirrorControls]);
    assert!(room.modifiers().mirror_controls);

    room.engine_mut("alice")
        .unwrap()
        .set_active_for_test(Shape::O, Vec2i::new(4, 10), Rotation::Spawn);
    room.apply_action(
        "alice",
        PlayerAction::Move {
            direction: MoveDirection::Left,
        },
    )
    .unwrap();
    let piece = room.player("alice").unwrap().engine().unwrap().active().unwrap();
    assert_eq!(piece.origin, Vec2i::new(5, 10));
}

#[test]
fn garbage_surge_pushes_rows_under_every_board() {
    let mut room = started_room(chaos_config(GimmickKind::GarbageSurge));
    prepare_well(&mut room, "alice", 4, 9);
    room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    room.advance_to(10);
    assert_eq!(activated(&room.drain_events()), vec![GimmickKind::GarbageSurge]);

    let board = room.player("bob").unwrap().engine().unwrap().board();
    for y in 0..2 {
        let filled = (0..BOARD_WIDTH as i32)
            .filter(|&x| board.cell(x, y) == Some(Cell::Garbage))
            .count();
        assert_eq!(filled, BOARD_WIDTH - 1, "row {y} keeps one hole");
    }
    assert_eq!(
        (0..BOARD_WIDTH as i32)
            .filter(|&x| board.cell(x, 2) == Some(Cell::Garbage))
            .count(),
        0
    );
}

#[test]
fn collapse_inside_a_tick_resets_chaos_and_ends_gimmicks() {
    let mut config = chaos_config(GimmickKind::Overclock);
    config.chaos.frenzy_threshold = 30;
    config.chaos.collapse_threshold = 35;
    config.chaos.collapse_policy = CollapsePolicy::ResetChaosAndClearGimmicks;
    let mut room = started_room(config);

    prepare_well(&mut room, "alice", 4, 9);
    room.apply_action("alice", PlayerAction::HardDrop).unwrap();
    room.advance_to(10);
    assert_eq!(activated(&room.drain_events()), vec![GimmickKind::Overclock]);

    prepare_well(&mut room, "bob", 4, 9);
    room.apply_action("bob", PlayerAction::HardDrop).unwrap();
    assert_eq!(room.chaos().value(), 40);

    room.advance_to(11);
    let events = room.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        RoomEvent::ChaosCollapse {
            policy: CollapsePolicy::ResetChaosAndClearGimmicks,
            tick: 11
        }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        RoomEvent::GimmickDeactivated {
            kind: GimmickKind::Overclock,
            ..
        }
    )));
    assert_eq!(room.chaos().value(), 0);
    assert_eq!(room.chaos().collapses(), 1);
    assert!(room.gimmicks().active().is_empty());
    assert_eq!(room.tempo().bpm(), 120);
}

#[test]
fn lock_delay_runs_on_the_tick_clock() {
    let mut config = ArenaConfig::default();
    config.engine.lock_delay_ms = 500;
    config.engine.lock_delay_max_ms = 5_000;
    let mut room = started_room(config);
    room.engine_mut("alice")
        .unwrap()
        .set_active_for_test(Shape::O, Vec2i::new(4, 1), Rotation::Spawn);
    let locked = |room: &ArenaRoom| {
        room.player("alice")
            .unwrap()
            .engine()
            .unwrap()
            .pieces_locked()
    };

    // 50 ms ticks: the piece rests for 450 ms, then 500 ms, well before the
    // 800 ms gravity interval comes round.
    room.advance_to(9);
    assert_eq!(locked(&room), 0);
    room.advance_to(10);
    assert_eq!(locked(&room), 1);
}
