//! Wire shapes shared with the transport and persistence collaborators.
//!
//! Everything here is plain data, serialized as camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::chaos::CollapsePolicy;
use crate::combo::Multiplier;
use crate::economy::{Mob, MobDefeat};
use crate::gimmick::{ActiveGimmick, GimmickKind};
use crate::piece::RotationDir;
use crate::piece_engine::BoardSnapshot;
use crate::ranking::RankingEntry;

pub type PlayerId = String;
pub type RoomId = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomPhase {
    #[default]
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoveDirection {
    Left,
    Right,
    Down,
}

impl MoveDirection {
    pub fn mirrored(self) -> MoveDirection {
        match self {
            MoveDirection::Left => MoveDirection::Right,
            MoveDirection::Right => MoveDirection::Left,
            MoveDirection::Down => MoveDirection::Down,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDirection::Left => (-1, 0),
            MoveDirection::Right => (1, 0),
            MoveDirection::Down => (0, -1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerAction {
    Move { direction: MoveDirection },
    Rotate { direction: RotationDir },
    SoftDrop,
    HardDrop,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub player_id: PlayerId,
    pub action: PlayerAction,
}

/// What a lock did to the player's streak and to the shared economy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockReport {
    pub lines: u8,
    pub all_clear: bool,
    pub combo: u32,
    pub back_to_back: bool,
    pub multiplier: Multiplier,
    pub points: u32,
    pub gold: u64,
    pub damage: u64,
    pub beat_damage: Option<u64>,
    pub game_over: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    /// Rows travelled by a drop.
    pub rows: u32,
    pub lock: Option<LockReport>,
}

/// Per-player snapshot emitted to the transport at a fixed cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPayload {
    pub player_id: PlayerId,
    pub board_snapshot: BoardSnapshot,
    pub gold: u64,
    pub mob_hp: u64,
    pub combo_count: u32,
    pub chaos: u32,
    pub tempo: u32,
    pub active_gimmicks: Vec<GimmickKind>,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    TimeLimit,
    MobRoundOver,
    AllToppedOut,
    RosterBelowMinimum,
    /// Never left Waiting in time.
    Cancelled,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RoomEvent {
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    PlayerJoined { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    PhaseChanged {
        from: RoomPhase,
        to: RoomPhase,
        tick: u64,
    },
    GimmickActivated { gimmick: ActiveGimmick },
    #[serde(rename_all = "camelCase")]
    GimmickDeactivated { kind: GimmickKind, tick: u64 },
    MobDefeated { defeat: MobDefeat },
    MobRespawned { mob: Mob },
    ChaosCollapse { policy: CollapsePolicy, tick: u64 },
    #[serde(rename_all = "camelCase")]
    PlayerToppedOut { player_id: PlayerId, tick: u64 },
    RoomEnded {
        reason: EndReason,
        rankings: Vec<RankingEntry>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatDelta {
    pub player_id: PlayerId,
    pub gold: u64,
    pub damage_dealt: u64,
    pub lines_cleared: u32,
    pub pieces_locked: u32,
    pub score: u64,
    pub survival_ticks: u64,
}

/// End-of-room record handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub room_id: RoomId,
    pub reason: EndReason,
    pub final_tick: u64,
    pub rankings: Vec<RankingEntry>,
    pub stats: Vec<PlayerStatDelta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub phase: RoomPhase,
    pub tick: u64,
    pub players: Vec<PlayerId>,
    pub chaos: u32,
    pub tempo: u32,
    pub mob: Mob,
    pub active_gimmicks: Vec<ActiveGimmick>,
    pub rankings: Option<Vec<RankingEntry>>,
}
