//! Headless bot match: assist-driven players in one room, no network.

use std::process::ExitCode;
use std::time::Instant;

use arena::assist::AssistPolicy;
use arena::config::ConfigStore;
use arena::error::ActionError;
use arena::protocol::{PlayerAction, RoomPhase};
use arena::room::ArenaRoom;
use arena::tick_budget::{BudgetThreshold, TickBudget};
use engine::profiling::{Profiler, StepTimings};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let players = env_u64("ARENA_SIM_PLAYERS", 4).max(1) as usize;
    let ticks = env_u64("ARENA_SIM_TICKS", 6_000).max(1);
    let think_every = env_u64("ARENA_SIM_THINK_TICKS", 8).max(1);
    let seed = env_u64("ARENA_SIM_SEED", 0);

    let mut config = match ConfigStore::from_env().load() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load arena config");
            return ExitCode::FAILURE;
        }
    };
    config.room.min_players = config.room.min_players.min(players);
    config.room.max_players = config.room.max_players.max(players);

    let mut room = match ArenaRoom::new("sim", config, seed) {
        Ok(room) => room,
        Err(err) => {
            error!(%err, "invalid arena config");
            return ExitCode::FAILURE;
        }
    };

    let ids: Vec<String> = (1..=players).map(|n| format!("bot-{n}")).collect();
    for id in &ids {
        if let Err(err) = room.join(id) {
            error!(player = %id, %err, "bot could not join");
            return ExitCode::FAILURE;
        }
    }
    if let Err(err) = room.start() {
        error!(%err, "room did not start");
        return ExitCode::FAILURE;
    }

    println!("arena sim (headless)");
    println!("players={players} ticks={ticks} think_every={think_every} seed={seed}");
    println!();

    let policy = AssistPolicy::default();
    let period = room.config().room.tick_period();
    let mut budget = TickBudget::new("sim", BudgetThreshold::for_tick_period(period));
    let mut rejected = 0u64;

    for tick in 1..=ticks {
        let started = Instant::now();

        if tick % think_every == 0 {
            for id in &ids {
                let Some(plan) = room
                    .player(id)
                    .and_then(|slot| slot.engine())
                    .and_then(|engine| policy.suggest(engine))
                else {
                    continue;
                };
                for action in plan.actions {
                    match room.apply_action(id, action) {
                        Ok(_) => {}
                        Err(ActionError::Blocked) if action != PlayerAction::HardDrop => {
                            rejected += 1;
                        }
                        Err(err) => {
                            debug!(player = %id, %err, "bot plan abandoned");
                            rejected += 1;
                            break;
                        }
                    }
                }
            }
        }

        let apply = started.elapsed();
        room.advance_to(tick);
        let total = started.elapsed();
        budget.on_step(
            tick,
            StepTimings {
                apply,
                publish: total.saturating_sub(apply),
                total,
            },
        );

        if room.phase() == RoomPhase::Ended {
            break;
        }
    }
    room.shutdown();

    println!(
        "final tick={} reason={:?} mob_hp={} defeats={} chaos={} rejected_inputs={rejected}",
        room.tick(),
        room.end_reason(),
        room.economy().mob().hp,
        room.economy().defeats(),
        room.chaos().value(),
    );
    println!(
        "slow ticks: warn={} crit={} ({:.2}% over warn)",
        budget.over_warn_ticks(),
        budget.over_critical_ticks(),
        budget.warn_pct()
    );
    println!();
    println!("{:<6} {:<10} {:>10} {:>10} {:>8}", "rank", "player", "damage", "survival", "gold");
    for entry in room.rankings().unwrap_or_default() {
        let gold = room.economy().ledger(&entry.player_id).map_or(0, |l| l.gold);
        println!(
            "{:<6} {:<10} {:>10} {:>10} {:>8}",
            entry.rank, entry.player_id, entry.damage_dealt, entry.survival_ticks, gold
        );
    }

    ExitCode::SUCCESS
}
