//! Placement assist: a policy layered on top of `PieceEngine`.
//!
//! The policy never moves pieces itself. It searches placements on a cloned
//! engine and returns the input sequence a player (or bot) would send, so the
//! live engine stays the single authority on movement and rotation.

use crate::board::{BOARD_WIDTH, Board};
use crate::piece::RotationDir;
use crate::piece_engine::PieceEngine;
use crate::protocol::{MoveDirection, PlayerAction};

/// Weights for the board features, applied as a linear score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssistWeights {
    pub lines: f64,
    pub aggregate_height: f64,
    pub holes: f64,
    pub bumpiness: f64,
}

impl Default for AssistWeights {
    fn default() -> Self {
        Self {
            lines: 0.76,
            aggregate_height: -0.51,
            holes: -0.36,
            bumpiness: -0.18,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardFeatures {
    pub aggregate_height: u32,
    pub holes: u32,
    pub bumpiness: u32,
}

pub fn board_features(board: &Board) -> BoardFeatures {
    let mut heights = [0u32; BOARD_WIDTH];
    let mut holes = 0u32;
    for (x, height) in heights.iter_mut().enumerate() {
        let mut seen_block = false;
        for y in (0..board.height()).rev() {
            let filled = board
                .cell(x as i32, y as i32)
                .is_some_and(|c| c.is_occupied());
            if filled {
                if !seen_block {
                    *height = y as u32 + 1;
                    seen_block = true;
                }
            } else if seen_block {
                holes += 1;
            }
        }
    }
    let bumpiness = heights
        .windows(2)
        .map(|w| w[0].abs_diff(w[1]))
        .sum();
    BoardFeatures {
        aggregate_height: heights.iter().sum(),
        holes,
        bumpiness,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub rotations: u8,
    pub target_x: i32,
    pub score: f64,
    pub actions: Vec<PlayerAction>,
}

#[derive(Debug, Clone, Default)]
pub struct AssistPolicy {
    weights: AssistWeights,
}

impl AssistPolicy {
    pub fn new(weights: AssistWeights) -> Self {
        Self { weights }
    }

    /// Best placement for the engine's active piece, or `None` without one.
    pub fn suggest(&self, engine: &PieceEngine) -> Option<Placement> {
        engine.active()?;
        let mut best: Option<Placement> = None;

        for rotations in 0..4u8 {
            let mut rotated = engine.clone();
            let mut actions = Vec::new();
            let mut ok = true;
            for _ in 0..rotations {
                if !rotated.try_rotate(RotationDir::Cw) {
                    ok = false;
                    break;
                }
                actions.push(PlayerAction::Rotate {
                    direction: RotationDir::Cw,
                });
            }
            if !ok {
                continue;
            }
            let Some(start) = rotated.active() else {
                continue;
            };

            for target_x in -2..BOARD_WIDTH as i32 {
                let Some((candidate, moves)) = shift_to(&rotated, start.origin.x, target_x) else {
                    continue;
                };
                let mut dropped = candidate;
                let Some(outcome) = dropped.hard_drop() else {
                    continue;
                };
                let features = board_features(dropped.board());
                let mut score = self.weights.lines * outcome.lines_cleared() as f64
                    + self.weights.aggregate_height * features.aggregate_height as f64
                    + self.weights.holes * features.holes as f64
                    + self.weights.bumpiness * features.bumpiness as f64;
                if outcome.game_over {
                    score -= 1_000.0;
                }

                if best.as_ref().is_none_or(|b| score > b.score) {
                    let mut plan = actions.clone();
                    plan.extend(moves);
                    plan.push(PlayerAction::HardDrop);
                    best = Some(Placement {
                        rotations,
                        target_x,
                        score,
                        actions: plan,
                    });
                }
            }
        }

        best
    }
}

fn shift_to(
    engine: &PieceEngine,
    from_x: i32,
    to_x: i32,
) -> Option<(PieceEngine, Vec<PlayerAction>)> {
    let mut trial = engine.clone();
    let (dx, direction) = if to_x < from_x {
        (-1, MoveDirection::Left)
    } else {
        (1, MoveDirection::Right)
    };
    let mut moves = Vec::new();
    let mut x = from_x;
    while x != to_x {
        if !trial.try_move(dx, 0) {
            return None;
        }
        x += dx;
        moves.push(PlayerAction::Move { direction });
    }
    Some((trial, moves))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::board::Cell;
    use crate::kicks::WallKickTable;
    use crate::piece::{Rotation, Shape, Vec2i};

    #[test]
    fn features_count_holes_and_heights() {
        let mut engine = PieceEngine::new(1, Arc::new(WallKickTable::srs()));
        engine.set_cell(0, 0, Cell::Garbage);
        engine.set_cell(0, 2, Cell::Garbage);
        engine.set_cell(1, 0, Cell::Garbage);
        let f = board_features(engine.board());
        assert_eq!(f.aggregate_height, 4);
        assert_eq!(f.holes, 1);
        assert_eq!(f.bumpiness, 3);
    }

    #[test]
    fn suggests_completing_a_line() {
        let mut engine = PieceEngine::new(1, Arc::new(WallKickTable::srs()));
        for x in 0..BOARD_WIDTH as i32 {
            if x != 9 {
                engine.set_cell(x, 0, Cell::Garbage);
            }
        }
        engine.set_active_for_test(Shape::I, Vec2i::new(3, 21), Rotation::Spawn);

        let placement = AssistPolicy::default().suggest(&engine).expect("a placement");
        assert_eq!(placement.actions.last(), Some(&PlayerAction::HardDrop));

        let mut replay = engine.clone();
        for action in &placement.actions {
            match *action {
                PlayerAction::Rotate { direction } => assert!(replay.try_rotate(direction)),
                PlayerAction::Move { direction } => {
                    let (dx, dy) = direction.delta();
                    assert!(replay.try_move(dx, dy));
                }
                PlayerAction::HardDrop => {
                    let outcome = replay.hard_drop().unwrap();
                    assert_eq!(outcome.lines_cleared(), 1);
                }
                _ => unreachable!(),
            }
        }
    }
}
