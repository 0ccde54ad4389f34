use std::{ops::Add, sync::LazyLock};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    pub const ZERO: Vec2i = Vec2i { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2i {
    type Output = Vec2i;

    fn add(self, rhs: Vec2i) -> Self::Output {
        Vec2i::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl From<(i32, i32)> for Vec2i {
    fn from((x, y): (i32, i32)) -> Self {
        Vec2i::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shape {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::I,
        Shape::O,
        Shape::T,
        Shape::S,
        Shape::Z,
        Shape::J,
        Shape::L,
    ];

    pub const fn class(self) -> ShapeClass {
        match self {
            Shape::I => ShapeClass::I,
            Shape::O => ShapeClass::O,
            Shape::T | Shape::S | Shape::Z | Shape::J | Shape::L => ShapeClass::Jlstz,
        }
    }

    /// Cell code used in board snapshots (0 is empty, 8 is garbage).
    pub const fn code(self) -> u8 {
        match self {
            Shape::I => 1,
            Shape::O => 2,
            Shape::T => 3,
            Shape::S => 4,
            Shape::Z => 5,
            Shape::J => 6,
            Shape::L => 7,
        }
    }

    const fn index(self) -> usize {
        match self {
            Shape::I => 0,
            Shape::O => 1,
            Shape::T => 2,
            Shape::S => 3,
            Shape::Z => 4,
            Shape::J => 5,
            Shape::L => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Shape::I => "I",
            Shape::O => "O",
            Shape::T => "T",
            Shape::S => "S",
            Shape::Z => "Z",
            Shape::J => "J",
            Shape::L => "L",
        }
    }
}

/// Wall-kick family a shape belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ShapeClass {
    I,
    Jlstz,
    O,
}

impl ShapeClass {
    pub const ALL: [ShapeClass; 3] = [ShapeClass::I, ShapeClass::Jlstz, ShapeClass::O];
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Spawn,
    Right,
    Reverse,
    Left,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Spawn,
        Rotation::Right,
        Rotation::Reverse,
        Rotation::Left,
    ];

    pub const fn index(self) -> usize {
        match self {
            Rotation::Spawn => 0,
            Rotation::Right => 1,
            Rotation::Reverse => 2,
            Rotation::Left => 3,
        }
    }

    pub const fn from_index(index: usize) -> Rotation {
        match index % 4 {
            0 => Rotation::Spawn,
            1 => Rotation::Right,
            2 => Rotation::Reverse,
            _ => Rotation::Left,
        }
    }

    pub const fn rotated(self, dir: RotationDir) -> Rotation {
        match dir {
            RotationDir::Cw => Rotation::from_index(self.index() + 1),
            RotationDir::Ccw => Rotation::from_index(self.index() + 3),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rotation::Spawn => "0",
            Rotation::Right => "R",
            Rotation::Reverse => "2",
            Rotation::Left => "L",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RotationDir {
    Cw,
    Ccw,
}

/// Cell offsets of a shape in one rotation state, relative to the top-left of
/// its bounding box (x grows right, y grows up, so offsets have y <= 0).
pub type CellMask = [Vec2i; 4];

static MASKS: LazyLock<[[CellMask; 4]; 7]> = LazyLock::new(|| {
    let mut masks = [[[Vec2i::ZERO; 4]; 4]; 7];
    for shape in Shape::ALL {
        let mut grid = base_grid(shape);
        for rotation in Rotation::ALL {
            masks[shape.index()][rotation.index()] = grid.mask();
            grid = grid.rotated_cw();
        }
    }
    masks
});

pub fn cell_mask(shape: Shape, rotation: Rotation) -> &'static CellMask {
    &MASKS[shape.index()][rotation.index()]
}

/// Board cells covered by `shape` with its bounding box anchored at `origin`.
pub fn piece_cells(shape: Shape, rotation: Rotation, origin: Vec2i) -> [Vec2i; 4] {
    let mask = *cell_mask(shape, rotation);
    mask.map(|offset| origin + offset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShapeGrid {
    size: usize,
    cells: [u8; 16],
}

impl ShapeGrid {
    fn cell(&self, x: usize, y: usize) -> u8 {
        self.cells[y * self.size + x]
    }

    fn rotated_cw(&self) -> ShapeGrid {
        let size = self.size;
        let mut rotated = ShapeGrid {
            size,
            cells: [0u8; 16],
        };
        for y in 0..size {
            for x in 0..size {
                // rotated[x][size-1-y] = grid[y][x]; rows run top-down.
                rotated.cells[x * size + (size - 1 - y)] = self.cells[y * size + x];
            }
        }
        rotated
    }

    fn mask(&self) -> CellMask {
        let mut mask = [Vec2i::ZERO; 4];
        let mut n = 0;
        for gy in 0..self.size {
            for gx in 0..self.size {
                if self.cell(gx, gy) == 1 && n < 4 {
                    mask[n] = Vec2i::new(gx as i32, -(gy as i32));
                    n += 1;
                }
            }
        }
        debug_assert_eq!(n, 4, "every tetromino covers four cells");
        mask
    }
}

fn base_grid(shape: Shape) -> ShapeGrid {
    match shape {
        Shape::I => ShapeGrid {
            size: 4,
            cells: [
                0, 0, 0, 0, //
                1, 1, 1, 1, //
                0, 0, 0, 0, //
                0, 0, 0, 0, //
            ],
        },
        Shape::O => ShapeGrid {
            size: 2,
            cells: [
                1, 1, //
                1, 1, //
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
        },
        Shape::T => ShapeGrid {
            size: 3,
            cells: [
                0, 1, 0, //
                1, 1, 1, //
                0, 0, 0, //
                0, 0, 0, 0, 0, 0, 0,
            ],
        },
        Shape::S => ShapeGrid {
            size: 3,
            cells: [
                0, 1, 1, //
                1, 1, 0, //
                0, 0, 0, //
                0, 0, 0, 0, 0, 0, 0,
            ],
        },
        Shape::Z => ShapeGrid {
            size: 3,
            cells: [
                1, 1, 0, //
                0, 1, 1, //
                0, 0, 0, //
                0, 0, 0, 0, 0, 0, 0,
            ],
        },
        Shape::J => ShapeGrid {
            size: 3,
            cells: [
                1, 0, 0, //
                1, 1, 1, //
                0, 0, 0, //
                0, 0, 0, 0, 0, 0, 0,
            ],
        },
        Shape::L => ShapeGrid {
            size: 3,
            cells: [
                0, 0, 1, //
                1, 1, 1, //
                0, 0, 0, //
                0, 0, 0, 0, 0, 0, 0,
            ],
        },
    }
}
