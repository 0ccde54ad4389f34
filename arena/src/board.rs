use serde::{Deserialize, Serialize};

use crate::piece::{Shape, Vec2i};

pub const BOARD_WIDTH: usize = 10;
pub const VISIBLE_ROWS: usize = 20;
pub const BUFFER_ROWS: usize = 4;
pub const BOARD_HEIGHT: usize = VISIBLE_ROWS + BUFFER_ROWS;

pub const CELL_EMPTY: u8 = 0;
pub const CELL_GARBAGE: u8 = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Block(Shape),
    Garbage,
}

impl Cell {
    pub fn is_occupied(self) -> bool {
        !matches!(self, Cell::Empty)
    }

    pub fn code(self) -> u8 {
        match self {
            Cell::Empty => CELL_EMPTY,
            Cell::Block(shape) => shape.code(),
            Cell::Garbage => CELL_GARBAGE,
        }
    }
}

/// Result of one line-clear pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineClear {
    /// Cleared row indices, bottom-up, as they were before the shift.
    pub rows: Vec<usize>,
    pub all_clear: bool,
}

impl LineClear {
    pub fn count(&self) -> u8 {
        self.rows.len().min(u8::MAX as usize) as u8
    }
}

/// Player grid. Row 0 is the bottom; rows at `VISIBLE_ROWS` and above are the
/// spawn buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    rows: Vec<Vec<Cell>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            rows: vec![vec![Cell::Empty; BOARD_WIDTH]; BOARD_HEIGHT],
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        if x < 0 || y < 0 {
            return None;
        }
        self.rows
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
    }

    /// In bounds and unoccupied.
    pub fn is_free(&self, pos: Vec2i) -> bool {
        matches!(self.cell(pos.x, pos.y), Some(Cell::Empty))
    }

    pub fn occupied_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|c| c.is_occupied()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }

    /// Any occupancy in the buffer above the visible field.
    pub fn is_topped_out(&self) -> bool {
        self.rows[VISIBLE_ROWS..]
            .iter()
            .any(|row| row.iter().any(|c| c.is_occupied()))
    }

    /// Height of the tallest column, in rows.
    pub fn stack_height(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| c.is_occupied()))
            .map(|y| y + 1)
            .unwrap_or(0)
    }

    pub fn codes(&self) -> Vec<Vec<u8>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.code()).collect())
            .collect()
    }

    pub(crate) fn set(&mut self, pos: Vec2i, cell: Cell) -> bool {
        if pos.x < 0 || pos.y < 0 {
            return false;
        }
        match self
            .rows
            .get_mut(pos.y as usize)
            .and_then(|row| row.get_mut(pos.x as usize))
        {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub fn full_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|c| c.is_occupied()))
            .map(|(y, _)| y)
            .collect()
    }

    /// Removes every full row and drops the rows above by the removed count.
    pub(crate) fn clear_full_rows(&mut self) -> LineClear {
        let rows = self.full_rows();
        if rows.is_empty() {
            return LineClear::default();
        }

        let height = self.rows.len();
        let mut kept: Vec<Vec<Cell>> = self
            .rows
            .drain(..)
            .filter(|row| !row.iter().all(|c| c.is_occupied()))
            .collect();
        kept.resize(height, vec![Cell::Empty; BOARD_WIDTH]);
        self.rows = kept;

        LineClear {
            rows,
            all_clear: self.is_empty(),
        }
    }

    /// Pushes `count` garbage rows in from the bottom, each with one hole.
    /// Returns true when content was pushed into (or past) the buffer.
    pub(crate) fn push_garbage(&mut self, count: usize, hole: usize) -> bool {
        let height = self.rows.len();
        let hole = hole.min(BOARD_WIDTH - 1);
        let mut overflowed = false;
        for _ in 0..count {
            let top = self.rows.remove(height - 1);
            overflowed |= top.iter().any(|c| c.is_occupied());
            let mut row = vec![Cell::Garbage; BOARD_WIDTH];
            row[hole] = Cell::Empty;
            self.rows.insert(0, row);
        }
        overflowed || self.is_topped_out()
    }
}
