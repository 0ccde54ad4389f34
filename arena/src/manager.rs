//! Multi-room registry and the cross-room leaderboard.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::actor::{RecordSink, RoomHandle, spawn_room};
use crate::config::ArenaConfig;
use crate::error::{ConfigError, RoomError};
use crate::kicks::WallKickTable;
use crate::protocol::{PlayerId, RoomId, RoomRecord};
use crate::room::ArenaRoom;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub rooms_played: u32,
    pub wins: u32,
    pub total_damage: u64,
    pub total_gold: u64,
    pub best_score: u64,
}

#[derive(Debug, Default)]
struct Leaderboard {
    entries: BTreeMap<PlayerId, LeaderboardEntry>,
}

impl Leaderboard {
    fn apply(&mut self, record: &RoomRecord) {
        for stat in &record.stats {
            let entry = self
                .entries
                .entry(stat.player_id.clone())
                .or_insert_with(|| LeaderboardEntry {
                    player_id: stat.player_id.clone(),
                    ..LeaderboardEntry::default()
                });
            entry.rooms_played = entry.rooms_played.saturating_add(1);
            entry.total_damage = entry.total_damage.saturating_add(stat.damage_dealt);
            entry.total_gold = entry.total_gold.saturating_add(stat.gold);
            entry.best_score = entry.best_score.max(stat.score);
            let won = record
                .rankings
                .iter()
                .any(|r| r.player_id == stat.player_id && r.rank == 1);
            if won && record.stats.len() > 1 {
                entry.wins = entry.wins.saturating_add(1);
            }
        }
    }

    fn sorted(&self) -> Vec<LeaderboardEntry> {
        let mut out: Vec<LeaderboardEntry> = self.entries.values().cloned().collect();
        out.sort_by(|a, b| {
            b.total_damage
                .cmp(&a.total_damage)
                .then(b.wins.cmp(&a.wins))
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        out
    }
}

struct ManagerInner {
    config: ArenaConfig,
    kicks: Arc<WallKickTable>,
    sink: Arc<dyn RecordSink>,
    seed: u64,
    next_room: AtomicU64,
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    leaderboard: Mutex<Leaderboard>,
}

/// Owns every live room. Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct ArenaManager {
    inner: Arc<ManagerInner>,
}

impl ArenaManager {
    pub fn new(
        config: ArenaConfig,
        sink: Arc<dyn RecordSink>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let kicks = config.engine.kick_table()?;
        Ok(Self {
            inner: Arc::new(ManagerInner {
                config,
                kicks,
                sink,
                seed,
                next_room: AtomicU64::new(1),
                rooms: Mutex::new(HashMap::new()),
                leaderboard: Mutex::new(Leaderboard::default()),
            }),
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.inner.config
    }

    /// Opens a room and spawns its task. Must run inside a tokio runtime.
    pub fn create_room(&self) -> Result<RoomHandle, ConfigError> {
        let n = self.inner.next_room.fetch_add(1, Ordering::Relaxed);
        let id = format!("room-{n}");
        let seed = self.inner.seed.wrapping_add(n.wrapping_mul(0x2545_F491_4F6C_DD1D));
        let room = ArenaRoom::with_kicks(
            id.clone(),
            self.inner.config.clone(),
            Arc::clone(&self.inner.kicks),
            seed,
        )?;

        let (handle, task) = spawn_room(room, Arc::clone(&self.inner.sink));
        self.lock_rooms().insert(id.clone(), handle.clone());

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let record = task.await.ok().flatten();
            inner
                .rooms
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            if let Some(record) = record {
                inner
                    .leaderboard
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .apply(&record);
            }
            info!(room = %id, "room removed from registry");
        });

        Ok(handle)
    }

    pub fn room(&self, id: &str) -> Result<RoomHandle, RoomError> {
        self.lock_rooms()
            .get(id)
            .cloned()
            .ok_or_else(|| RoomError::UnknownRoom(id.to_string()))
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.lock_rooms().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.inner
            .leaderboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sorted()
    }

    pub fn shutdown_all(&self) {
        for handle in self.lock_rooms().values() {
            handle.shutdown();
        }
    }

    fn lock_rooms(&self) -> std::sync::MutexGuard<'_, HashMap<RoomId, RoomHandle>> {
        self.inner
            .rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
