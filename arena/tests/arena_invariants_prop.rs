//! Property tests for the time-driven and clamped parts of the arena.
//!
//! Each property drives a component with generated sequences and checks an
//! invariant that must hold no matter how ticks jitter or events pile up.

use std::sync::Arc;

use arena::chaos::{ChaosConfig, ChaosEvent, ChaosMeter, ChaosTier};
use arena::economy::{BattleEconomy, EconomyConfig, MobDef};
use arena::gimmick::{GimmickConfig, GimmickDirector, GimmickTier};
use arena::kicks::WallKickTable;
use arena::piece::RotationDir;
use arena::piece_engine::PieceEngine;
use arena::ranking::compute_rankings;
use proptest::prelude::*;

fn chaos_event() -> impl Strategy<Value = ChaosEvent> {
    prop_oneof![
        (0u8..=4).prop_map(ChaosEvent::LinesCleared),
        Just(ChaosEvent::AllClear),
        (0u64..2_000).prop_map(ChaosEvent::Damage),
        Just(ChaosEvent::MobDefeated),
        Just(ChaosEvent::TopOut),
    ]
}

proptest! {
    #[test]
    fn chaos_stays_within_bounds(
        steps in prop::collection::vec((prop::option::of(chaos_event()), 0u32..40), 1..200),
        collapse in any::<bool>(),
    ) {
        let config = ChaosConfig::default();
        let max = config.max;
        let mut meter = ChaosMeter::new(config);

        for (event, decays) in steps {
            if let Some(event) = event {
                meter.record(event);
            }
            for _ in 0..decays {
                meter.decay();
            }
            if collapse {
                meter.check_collapse();
            }
            prop_assert!(meter.value() <= max);
        }
    }

    #[test]
    fn income_is_exact_under_jitter(
        jumps in prop::collection::vec(0u64..12, 1..120),
        amount in 1u64..20,
    ) {
        let mut eco = BattleEconomy::new(EconomyConfig {
            income_interval_ticks: 5,
            income_amount: amount,
            ..EconomyConfig::default()
        });
        eco.add_player("a");
        eco.reset_income_schedule(0);

        let mut tick = 0u64;
        for jump in jumps {
            tick += jump;
            eco.passive_income_tick(tick);
            // Repeating a tick must never pay twice.
            eco.passive_income_tick(tick);
            prop_assert_eq!(eco.ledger("a").unwrap().gold, (tick / 5) * amount);
        }
    }

    #[test]
    fn mob_hp_never_underflows_and_defeat_fires_once(
        hits in prop::collection::vec(1u8..=4, 1..60),
        max_hp in 50u64..3_000,
    ) {
        let mut eco = BattleEconomy::new(EconomyConfig {
            mob: MobDef { id: "dummy".to_string(), max_hp },
            ..EconomyConfig::default()
        });
        eco.add_player("a");

        let mut dealt = 0u64;
        let mut defeats = 0;
        for lines in hits {
            let reward = eco
                .on_lines_cleared("a", lines, arena::combo::Multiplier::ONE, 0)
                .unwrap();
            dealt += reward.damage;
            if reward.defeated_mob {
                defeats += 1;
            }
            prop_assert!(eco.mob().hp <= max_hp);
            prop_assert_eq!(eco.mob().hp, max_hp - dealt);
        }
        prop_assert!(defeats <= 1);
        prop_assert_eq!(defeats == 1, eco.mob().hp == 0);
    }

    #[test]
    fn rank_counts_strictly_better_damage(
        players in prop::collection::vec((0u64..5, 0u64..5), 1..10),
    ) {
        let input: Vec<(String, u64, u64)> = players
            .iter()
            .enumerate()
            .map(|(i, &(damage, survival))| (format!("p{i}"), damage, survival))
            .collect();
        let rankings = compute_rankings(input);

        for entry in &rankings {
            let better = rankings
                .iter()
                .filter(|o| o.damage_dealt > entry.damage_dealt)
                .count() as u32;
            prop_assert_eq!(entry.rank, better + 1);
        }
        for pair in rankings.windows(2) {
            prop_assert!(pair[0].damage_dealt >= pair[1].damage_dealt);
        }
    }

    #[test]
    fn active_piece_never_overlaps_the_stack(
        seed in any::<u64>(),
        actions in prop::collection::vec(0u8..6, 1..200),
    ) {
        let mut engine = PieceEngine::new(seed, Arc::new(WallKickTable::srs()));
        engine.start().unwrap();

        for action in actions {
            if engine.is_game_over() {
                break;
            }
            match action {
                0 => { engine.try_move(-1, 0); }
                1 => { engine.try_move(1, 0); }
                2 => { engine.try_rotate(RotationDir::Cw); }
                3 => { engine.try_rotate(RotationDir::Ccw); }
                4 => { engine.soft_drop(); }
                _ => { engine.hard_drop(); }
            }
            if let Some(piece) = engine.active() {
                for cell in piece.cells() {
                    prop_assert!(engine.board().is_free(cell));
                }
            }
            prop_assert!(engine.board().full_rows().is_empty());
        }
    }
}

#[test]
fn crossing_frenzy_narrows_the_pool_before_the_next_draw() {
    let chaos_config = ChaosConfig::default();
    let mut meter = ChaosMeter::new(chaos_config.clone());
    let director = GimmickDirector::new(GimmickConfig::default(), 4);

    meter.add(chaos_config.gimmick_threshold);
    assert_eq!(meter.tier(), ChaosTier::Gimmick);
    let wide = director.eligible(meter.tier(), 10);
    assert!(wide.iter().any(|k| k.tier() == GimmickTier::Standard));

    meter.add(chaos_config.frenzy_threshold - chaos_config.gimmick_threshold);
    assert_eq!(meter.tier(), ChaosTier::Frenzy);
    let narrow = director.eligible(meter.tier(), 10);
    assert!(!narrow.is_empty());
    assert!(narrow.iter().all(|k| k.tier() == GimmickTier::High));
    assert!(narrow.len() < wide.len());
}
