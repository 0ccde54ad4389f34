use std::{collections::VecDeque, sync::Arc};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::board::{BOARD_WIDTH, Board, Cell, LineClear, VISIBLE_ROWS};
use crate::error::EngineError;
use crate::kicks::WallKickTable;
use crate::piece::{Rotation, RotationDir, Shape, Vec2i, piece_cells};

pub const NEXT_QUEUE_LEN: usize = 5;
pub const LOCK_DELAY_MS_DEFAULT: u32 = 500;
pub const LOCK_DELAY_MAX_MS_DEFAULT: u32 = 2_000;

/// Top row of every spawn bounding box (the second buffer row).
pub const SPAWN_TOP_ROW: i32 = VISIBLE_ROWS as i32 + 1;

pub const fn spawn_origin(shape: Shape) -> Vec2i {
    match shape {
        Shape::O => Vec2i::new(4, SPAWN_TOP_ROW),
        _ => Vec2i::new(3, SPAWN_TOP_ROW),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePiece {
    pub shape: Shape,
    pub rotation: Rotation,
    pub origin: Vec2i,
}

impl ActivePiece {
    pub fn cells(&self) -> [Vec2i; 4] {
        piece_cells(self.shape, self.rotation, self.origin)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    #[default]
    Spawning,
    Falling,
    Locked,
    GameOver,
}

/// Everything that happened when a piece was committed to the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOutcome {
    pub shape: Shape,
    pub lines: LineClear,
    pub drop_distance: u32,
    pub topped_out: bool,
    pub game_over: bool,
}

impl LockOutcome {
    pub fn lines_cleared(&self) -> u8 {
        self.lines.count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GravityStep {
    Moved,
    Grounded,
    Locked(LockOutcome),
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub cells: Vec<Vec<u8>>,
    pub active: Option<ActivePiece>,
    pub ghost: Option<Vec2i>,
    pub held: Option<Shape>,
    pub next: Vec<Shape>,
    pub game_over: bool,
}

/// 7-bag shape randomizer.
#[derive(Debug, Clone)]
struct BagRandomizer {
    rng: StdRng,
    bag: Vec<Shape>,
}

impl BagRandomizer {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bag: Vec::with_capacity(Shape::ALL.len()),
        }
    }

    fn draw(&mut self) -> Shape {
        if self.bag.is_empty() {
            self.bag.extend_from_slice(&Shape::ALL);
            self.bag.shuffle(&mut self.rng);
        }
        self.bag.pop().unwrap_or(Shape::T)
    }
}

/// Authoritative falling-piece state machine for one board.
///
/// All operations are synchronous and finish within the caller's tick. Failed
/// moves and rotations leave the engine untouched.
#[derive(Debug, Clone)]
pub struct PieceEngine {
    board: Board,
    active: Option<ActivePiece>,
    held: Option<Shape>,
    can_hold: bool,
    queue: VecDeque<Shape>,
    randomizer: BagRandomizer,
    kicks: Arc<WallKickTable>,
    phase: EnginePhase,
    lock_delay_ms: u32,
    lock_delay_max_ms: u32,
    grounded_lock_ms: u32,
    grounded_total_lock_ms: u32,
    grounded_for_lock: bool,
    last_kick_index: Option<usize>,
    pieces_locked: u32,
    lines_cleared: u32,
}

impl PieceEngine {
    pub fn new(seed: u64, kicks: Arc<WallKickTable>) -> Self {
        Self {
            board: Board::new(),
            active: None,
            held: None,
            can_hold: true,
            queue: VecDeque::with_capacity(NEXT_QUEUE_LEN + 1),
            randomizer: BagRandomizer::new(seed),
            kicks,
            phase: EnginePhase::Spawning,
            lock_delay_ms: LOCK_DELAY_MS_DEFAULT,
            lock_delay_max_ms: LOCK_DELAY_MAX_MS_DEFAULT,
            grounded_lock_ms: 0,
            grounded_total_lock_ms: 0,
            grounded_for_lock: false,
            last_kick_index: None,
            pieces_locked: 0,
            lines_cleared: 0,
        }
    }

    pub fn with_lock_delay(mut self, lock_delay_ms: u32, lock_delay_max_ms: u32) -> Self {
        self.lock_delay_ms = lock_delay_ms;
        self.lock_delay_max_ms = lock_delay_max_ms.max(lock_delay_ms);
        self
    }

    /// Fills the preview queue and spawns the first piece.
    pub fn start(&mut self) -> Result<Shape, EngineError> {
        self.fill_queue();
        self.spawn_next()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn active(&self) -> Option<ActivePiece> {
        self.active
    }

    pub fn held(&self) -> Option<Shape> {
        self.held
    }

    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    pub fn next_queue(&self) -> Vec<Shape> {
        self.queue.iter().copied().collect()
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == EnginePhase::GameOver
    }

    /// Index into the kick list used by the last successful rotation.
    pub fn last_kick_index(&self) -> Option<usize> {
        self.last_kick_index
    }

    pub fn pieces_locked(&self) -> u32 {
        self.pieces_locked
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn is_grounded_for_lock_delay(&self) -> bool {
        self.grounded_for_lock
    }

    pub fn grounded_lock_ms(&self) -> u32 {
        self.grounded_lock_ms
    }

    pub fn kicks(&self) -> &WallKickTable {
        &self.kicks
    }

    pub fn is_valid_position(&self, shape: Shape, rotation: Rotation, origin: Vec2i) -> bool {
        piece_cells(shape, rotation, origin)
            .iter()
            .all(|&cell| self.board.is_free(cell))
    }

    /// Places `shape` at its spawn cell in rotation 0.
    pub fn spawn(&mut self, shape: Shape) -> Result<(), EngineError> {
        if self.is_game_over() {
            return Err(EngineError::SpawnBlocked);
        }
        self.phase = EnginePhase::Spawning;
        let piece = ActivePiece {
            shape,
            rotation: Rotation::Spawn,
            origin: spawn_origin(shape),
        };
        self.clear_lock_delay_state();
        self.last_kick_index = None;

        if !self.is_valid_position(piece.shape, piece.rotation, piece.origin) {
            self.active = None;
            self.phase = EnginePhase::GameOver;
            return Err(EngineError::SpawnBlocked);
        }

        self.active = Some(piece);
        self.phase = EnginePhase::Falling;
        Ok(())
    }

    pub fn spawn_next(&mut self) -> Result<Shape, EngineError> {
        self.fill_queue();
        let shape = self
            .queue
            .pop_front()
            .unwrap_or_else(|| self.randomizer.draw());
        self.fill_queue();
        self.can_hold = true;
        self.spawn(shape)?;
        Ok(shape)
    }

    pub fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        let Some(piece) = self.active else {
            return false;
        };
        let target = piece.origin + Vec2i::new(dx, dy);
        if !self.is_valid_position(piece.shape, piece.rotation, target) {
            return false;
        }
        self.active = Some(ActivePiece {
            origin: target,
            ..piece
        });
        self.handle_successful_adjustment(dx != 0 || dy != 0);
        true
    }

    /// Tests the kick candidates for the transition in table order and commits
    /// the first one that fits.
    pub fn try_rotate(&mut self, dir: RotationDir) -> bool {
        let Some(piece) = self.active else {
            return false;
        };
        let to = piece.rotation.rotated(dir);
        let before = sorted_cells(piece.cells());

        let candidates = self.kicks.candidates(piece.shape.class(), piece.rotation, to);
        let hit = candidates.iter().enumerate().find_map(|(idx, &offset)| {
            let origin = piece.origin + offset;
            self.is_valid_position(piece.shape, to, origin)
                .then_some((idx, origin))
        });

        let Some((idx, origin)) = hit else {
            return false;
        };

        let rotated = ActivePiece {
            shape: piece.shape,
            rotation: to,
            origin,
        };
        self.active = Some(rotated);
        self.last_kick_index = Some(idx);
        self.handle_successful_adjustment(sorted_cells(rotated.cells()) != before);
        true
    }

    /// Moves down until blocked without locking; returns rows moved.
    pub fn soft_drop(&mut self) -> u32 {
        let mut rows = 0;
        while self.try_move(0, -1) {
            rows += 1;
        }
        rows
    }

    /// Moves down until blocked and locks immediately.
    pub fn hard_drop(&mut self) -> Option<LockOutcome> {
        let mut piece = self.active?;
        let mut distance = 0u32;
        while self.is_valid_position(piece.shape, piece.rotation, piece.origin + Vec2i::new(0, -1))
        {
            piece.origin = piece.origin + Vec2i::new(0, -1);
            distance += 1;
        }
        self.active = Some(piece);
        let mut outcome = self.lock()?;
        outcome.drop_distance = distance;
        Some(outcome)
    }

    /// Commits the active piece, resolves line clears and spawns the next one.
    pub fn lock(&mut self) -> Option<LockOutcome> {
        let piece = self.active.take()?;
        self.phase = EnginePhase::Locked;
        for cell in piece.cells() {
            self.board.set(cell, Cell::Block(piece.shape));
        }
        self.clear_lock_delay_state();
        self.pieces_locked = self.pieces_locked.saturating_add(1);

        let lines = self.detect_and_clear_lines();
        let topped_out = self.board.is_topped_out();

        let game_over = if topped_out {
            self.phase = EnginePhase::GameOver;
            true
        } else {
            self.spawn_next().is_err()
        };

        Some(LockOutcome {
            shape: piece.shape,
            lines,
            drop_distance: 0,
            topped_out,
            game_over,
        })
    }

    pub fn detect_and_clear_lines(&mut self) -> LineClear {
        let clear = self.board.clear_full_rows();
        self.lines_cleared = self.lines_cleared.saturating_add(clear.count() as u32);
        clear
    }

    /// Swaps the active piece with the hold slot. Allowed once per spawn.
    pub fn hold(&mut self) -> bool {
        if self.is_game_over() || !self.can_hold {
            return false;
        }
        let Some(current) = self.active else {
            return false;
        };

        let spawned = match self.held.replace(current.shape) {
            Some(held) => self.spawn(held),
            None => self.spawn_next().map(|_| ()),
        };
        self.can_hold = false;
        match spawned {
            Ok(()) => true,
            Err(EngineError::SpawnBlocked) => false,
        }
    }

    /// One gravity step; `dt_ms` feeds the lock-delay timers when grounded.
    pub fn advance_gravity(&mut self, dt_ms: u32) -> GravityStep {
        if self.is_game_over() || self.active.is_none() {
            return GravityStep::Idle;
        }

        if self.try_move(0, -1) {
            return GravityStep::Moved;
        }

        if !self.grounded_for_lock {
            self.grounded_for_lock = true;
            self.grounded_total_lock_ms = self.grounded_total_lock_ms.saturating_add(dt_ms);
            if self.grounded_total_lock_ms >= self.lock_delay_max_ms {
                return self.lock_for_gravity();
            }
            return GravityStep::Grounded;
        }

        self.grounded_lock_ms = self.grounded_lock_ms.saturating_add(dt_ms);
        self.grounded_total_lock_ms = self.grounded_total_lock_ms.saturating_add(dt_ms);
        if self.grounded_lock_ms >= self.lock_delay_ms
            || self.grounded_total_lock_ms >= self.lock_delay_max_ms
        {
            return self.lock_for_gravity();
        }

        GravityStep::Grounded
    }

    /// Feeds `dt_ms` to the lock-delay timers while the active piece rests on
    /// the stack. Never moves the piece; callers step gravity separately.
    pub fn advance_lock_delay(&mut self, dt_ms: u32) -> GravityStep {
        if self.is_game_over() || !self.is_active_piece_grounded() {
            return GravityStep::Idle;
        }
        self.grounded_for_lock = true;
        self.grounded_lock_ms = self.grounded_lock_ms.saturating_add(dt_ms);
        self.grounded_total_lock_ms = self.grounded_total_lock_ms.saturating_add(dt_ms);
        if self.grounded_lock_ms >= self.lock_delay_ms
            || self.grounded_total_lock_ms >= self.lock_delay_max_ms
        {
            return self.lock_for_gravity();
        }
        GravityStep::Grounded
    }

    /// Pushes garbage rows in from the bottom. The active piece is nudged up if
    /// the rising stack overlaps it. Returns true if this ended the game.
    pub fn inject_garbage(&mut self, rows: usize, hole: usize) -> bool {
        if self.is_game_over() || rows == 0 {
            return self.is_game_over();
        }
        let overflowed = self.board.push_garbage(rows, hole);

        if let Some(mut piece) = self.active {
            let mut lifts = 0;
            while !self.is_valid_position(piece.shape, piece.rotation, piece.origin)
                && lifts <= rows
            {
                piece.origin = piece.origin + Vec2i::new(0, 1);
                lifts += 1;
            }
            if self.is_valid_position(piece.shape, piece.rotation, piece.origin) {
                self.active = Some(piece);
            } else {
                self.active = None;
                self.phase = EnginePhase::GameOver;
            }
        }

        if overflowed {
            self.active = None;
            self.phase = EnginePhase::GameOver;
        }
        self.is_game_over()
    }

    /// Where the active piece would land after a hard drop.
    pub fn ghost_origin(&self) -> Option<Vec2i> {
        let piece = self.active?;
        let mut origin = piece.origin;
        while self.is_valid_position(piece.shape, piece.rotation, origin + Vec2i::new(0, -1)) {
            origin = origin + Vec2i::new(0, -1);
        }
        Some(origin)
    }

    pub fn board_with_active_piece(&self) -> Vec<Vec<u8>> {
        let mut cells = self.board.codes();
        if let Some(piece) = self.active {
            for cell in piece.cells() {
                if cell.x >= 0 && (cell.x as usize) < BOARD_WIDTH && cell.y >= 0 {
                    if let Some(row) = cells.get_mut(cell.y as usize) {
                        row[cell.x as usize] = piece.shape.code();
                    }
                }
            }
        }
        cells
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cells: self.board.codes(),
            active: self.active,
            ghost: self.ghost_origin(),
            held: self.held,
            next: self.next_queue(),
            game_over: self.is_game_over(),
        }
    }

    /// Direct board edit for scenario setup and tests.
    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell) {
        self.board.set(Vec2i::new(x, y), cell);
    }

    pub fn set_active_for_test(&mut self, shape: Shape, origin: Vec2i, rotation: Rotation) {
        self.active = Some(ActivePiece {
            shape,
            rotation,
            origin,
        });
        self.phase = EnginePhase::Falling;
        self.clear_lock_delay_state();
    }

    fn lock_for_gravity(&mut self) -> GravityStep {
        match self.lock() {
            Some(outcome) => GravityStep::Locked(outcome),
            None => GravityStep::Idle,
        }
    }

    fn fill_queue(&mut self) {
        while self.queue.len() < NEXT_QUEUE_LEN {
            let shape = self.randomizer.draw();
            self.queue.push_back(shape);
        }
    }

    fn clear_lock_delay_state(&mut self) {
        self.grounded_lock_ms = 0;
        self.grounded_total_lock_ms = 0;
        self.grounded_for_lock = false;
    }

    fn handle_successful_adjustment(&mut self, piece_changed_location: bool) {
        if !piece_changed_location {
            return;
        }

        if self.grounded_for_lock && self.is_active_piece_grounded() {
            self.grounded_lock_ms = 0;
            self.grounded_for_lock = false;
            return;
        }

        self.clear_lock_delay_state();
    }

    fn is_active_piece_grounded(&self) -> bool {
        self.active.is_some_and(|piece| {
            !self.is_valid_position(piece.shape, piece.rotation, piece.origin + Vec2i::new(0, -1))
        })
    }
}

fn sorted_cells(mut cells: [Vec2i; 4]) -> [Vec2i; 4] {
    cells.sort_unstable_by_key(|c| (c.x, c.y));
    cells
}
