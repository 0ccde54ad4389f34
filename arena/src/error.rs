//! Error types for the arena core.

use thiserror::Error;

use crate::gimmick::GimmickKind;
use crate::piece::{Rotation, ShapeClass};
use crate::protocol::PlayerId;

/// Rejected player input. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown player '{0}'")]
    UnknownPlayer(PlayerId),

    #[error("room is not active")]
    RoomNotActive,

    #[error("player '{0}' has no live board")]
    BoardGameOver(PlayerId),

    #[error("action blocked by the board")]
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("room full ({capacity} players)")]
    RoomFull { capacity: usize },

    #[error("player '{0}' already joined")]
    AlreadyJoined(PlayerId),

    #[error("room no longer accepts players")]
    NotJoinable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("room is not waiting for players")]
    NotWaiting,

    #[error("roster has {have} players, need between {min} and {max}")]
    RosterSize { have: usize, min: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("spawn cells are occupied")]
    SpawnBlocked,
}

/// Fatal at load time; configuration is never silently defaulted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wall kick table has no entry for {class:?} {from:?} -> {to:?}")]
    MissingKickEntry {
        class: ShapeClass,
        from: Rotation,
        to: Rotation,
    },

    #[error("wall kick entry for {class:?} {from:?} -> {to:?} has no candidates")]
    EmptyKickEntry {
        class: ShapeClass,
        from: Rotation,
        to: Rotation,
    },

    #[error("gimmick table has no entry for {0:?}")]
    MissingGimmickSpec(GimmickKind),

    #[error("gimmick {0:?} has a zero weight")]
    ZeroGimmickWeight(GimmickKind),

    #[error("gimmick {0:?} has a zero duration")]
    ZeroGimmickDuration(GimmickKind),

    #[error("gimmick table lists {0:?} more than once")]
    DuplicateGimmickSpec(GimmickKind),

    #[error("gimmick weights sum past {max}", max = u32::MAX)]
    GimmickWeightOverflow,

    #[error("chaos thresholds must satisfy gimmick < frenzy < collapse <= max: {0}")]
    InvalidThresholds(String),

    #[error("invalid roster bounds: min {min}, max {max}")]
    InvalidRoster { min: usize, max: usize },

    #[error("invalid tempo bounds: {0}")]
    InvalidTempo(String),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to a room task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room '{0}' not found")]
    UnknownRoom(String),

    #[error("room task has shut down")]
    Closed,

    #[error("room did not respond in time")]
    TimedOut,

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Start(#[from] StartError),
}
