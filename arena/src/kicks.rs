//! Wall-kick tables.
//!
//! A table maps (shape class, from, to) to an ordered list of offsets. The
//! engine tries them in order and commits the first one that fits, so the
//! order of each list is part of the game rules.

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::piece::{Rotation, ShapeClass, Vec2i};

/// Every quarter-turn transition, in the order kick tables are listed.
pub const QUARTER_TURNS: [(Rotation, Rotation); 8] = [
    (Rotation::Spawn, Rotation::Right),
    (Rotation::Right, Rotation::Spawn),
    (Rotation::Right, Rotation::Reverse),
    (Rotation::Reverse, Rotation::Right),
    (Rotation::Reverse, Rotation::Left),
    (Rotation::Left, Rotation::Reverse),
    (Rotation::Left, Rotation::Spawn),
    (Rotation::Spawn, Rotation::Left),
];

// Guideline SRS offsets, +y up, indexed like QUARTER_TURNS.
const SRS_JLSTZ: [[(i32, i32); 5]; 8] = [
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
];

const SRS_I: [[(i32, i32); 5]; 8] = [
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KickEntry {
    pub class: ShapeClass,
    pub from: Rotation,
    pub to: Rotation,
    pub offsets: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallKickTable {
    entries: HashMap<(ShapeClass, Rotation, Rotation), Vec<Vec2i>>,
}

impl Default for WallKickTable {
    fn default() -> Self {
        Self::srs()
    }
}

impl WallKickTable {
    /// The guideline SRS table. O only ever tests the zero offset.
    pub fn srs() -> Self {
        let mut entries = HashMap::new();
        for (idx, &(from, to)) in QUARTER_TURNS.iter().enumerate() {
            entries.insert(
                (ShapeClass::Jlstz, from, to),
                SRS_JLSTZ[idx].iter().map(|&o| Vec2i::from(o)).collect(),
            );
            entries.insert(
                (ShapeClass::I, from, to),
                SRS_I[idx].iter().map(|&o| Vec2i::from(o)).collect(),
            );
            entries.insert((ShapeClass::O, from, to), vec![Vec2i::ZERO]);
        }
        Self { entries }
    }

    /// Builds a table and checks that every class defines every quarter turn.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = KickEntry>,
    {
        let mut map = HashMap::new();
        for entry in entries {
            if entry.offsets.is_empty() {
                return Err(ConfigError::EmptyKickEntry {
                    class: entry.class,
                    from: entry.from,
                    to: entry.to,
                });
            }
            map.insert(
                (entry.class, entry.from, entry.to),
                entry.offsets.into_iter().map(Vec2i::from).collect(),
            );
        }

        for class in ShapeClass::ALL {
            for (from, to) in QUARTER_TURNS {
                if !map.contains_key(&(class, from, to)) {
                    return Err(ConfigError::MissingKickEntry { class, from, to });
                }
            }
        }

        Ok(Self { entries: map })
    }

    pub fn from_json(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let entries: Vec<KickEntry> =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?;
        Self::from_entries(entries)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text, &path.display().to_string())
    }

    /// Ordered candidates for a transition. Tables are validated on
    /// construction, so a missing transition only happens for non-quarter turns
    /// and yields no candidates.
    pub fn candidates(&self, class: ShapeClass, from: Rotation, to: Rotation) -> &[Vec2i] {
        self.entries
            .get(&(class, from, to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn to_entries(&self) -> Vec<KickEntry> {
        let mut out = Vec::with_capacity(self.entries.len());
        for class in ShapeClass::ALL {
            for (from, to) in QUARTER_TURNS {
                if let Some(offsets) = self.entries.get(&(class, from, to)) {
                    out.push(KickEntry {
                        class,
                        from,
                        to,
                        offsets: offsets.iter().map(|o| (o.x, o.y)).collect(),
                    });
                }
            }
        }
        out
    }
}
