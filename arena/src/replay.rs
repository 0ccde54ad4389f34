//! Deterministic single-board replay on top of `engine::HeadlessRunner`.
//!
//! A board is fully determined by its seed, its kick table and the ordered
//! action list, so two peers can compare fingerprints instead of full boards.

use std::sync::Arc;

use engine::profiling::Profiler;
use engine::{GameLogic, HeadlessRunner, fingerprint};
use tracing::warn;

use crate::kicks::WallKickTable;
use crate::piece_engine::{BoardSnapshot, PieceEngine};
use crate::protocol::PlayerAction;

#[derive(Debug, Clone)]
pub struct BoardLogic {
    seed: u64,
    kicks: Arc<WallKickTable>,
    gravity_ms: Option<u32>,
}

impl BoardLogic {
    pub fn new(seed: u64, kicks: Arc<WallKickTable>) -> Self {
        Self {
            seed,
            kicks,
            gravity_ms: None,
        }
    }

    /// Advance gravity by `ms` after every non-locking input.
    pub fn with_gravity(mut self, ms: u32) -> Self {
        self.gravity_ms = Some(ms);
        self
    }
}

impl GameLogic for BoardLogic {
    type State = PieceEngine;
    type Input = PlayerAction;

    fn initial_state(&self) -> Self::State {
        let mut engine = PieceEngine::new(self.seed, Arc::clone(&self.kicks));
        if let Err(err) = engine.start() {
            warn!(seed = self.seed, %err, "replay board could not spawn");
        }
        engine
    }

    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
        let mut next = state.clone();
        if next.is_game_over() {
            return next;
        }

        let mut apply_gravity = self.gravity_ms;
        match input {
            PlayerAction::Move { direction } => {
                let (dx, dy) = direction.delta();
                next.try_move(dx, dy);
            }
            PlayerAction::Rotate { direction } => {
                next.try_rotate(direction);
            }
            PlayerAction::SoftDrop => {
                next.soft_drop();
            }
            PlayerAction::HardDrop => {
                next.hard_drop();
                apply_gravity = None;
            }
            PlayerAction::Hold => {
                next.hold();
            }
        }

        if let Some(ms) = apply_gravity {
            next.advance_gravity(ms);
        }
        next
    }
}

/// Runs `actions` from a fresh board and returns the final snapshot.
pub fn replay<I>(logic: BoardLogic, actions: I) -> (usize, BoardSnapshot)
where
    I: IntoIterator<Item = PlayerAction>,
{
    // Only the final board matters, so keep a single frame of history.
    let mut runner = HeadlessRunner::with_history_limit(logic, 1);
    let frame = runner.run(actions);
    (frame, runner.state().snapshot())
}

/// Like [`replay`], reporting each step's timings to `profiler`.
pub fn replay_profiled<I, P>(
    logic: BoardLogic,
    actions: I,
    profiler: &mut P,
) -> (usize, BoardSnapshot)
where
    I: IntoIterator<Item = PlayerAction>,
    P: Profiler,
{
    let mut runner = HeadlessRunner::with_history_limit(logic, 1);
    let mut frame = runner.frame();
    for action in actions {
        frame = runner.step_profiled(action, profiler);
    }
    (frame, runner.state().snapshot())
}

/// Hex fingerprint of a board snapshot, stable across peers.
pub fn snapshot_fingerprint(snapshot: &BoardSnapshot) -> Result<String, serde_json::Error> {
    fingerprint::fingerprint(snapshot)
}
