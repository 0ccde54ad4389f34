//! Room actor: one tokio task per room, the only writer of its `ArenaRoom`.
//!
//! Callers talk to it through a cloneable [`RoomHandle`]. Commands queue on an
//! mpsc channel and are applied in arrival order; replies come back over
//! oneshot channels with a timeout. Relay payloads and lifecycle events fan
//! out over broadcast channels, so a slow subscriber only loses old messages.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use engine::profiling::{Profiler, StepTimings};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{ActionError, JoinError, RoomError, StartError};
use crate::protocol::{
    ActionResult, PlayerAction, PlayerId, RelayPayload, RoomEvent, RoomId, RoomPhase, RoomRecord,
    RoomSummary,
};
use crate::room::ArenaRoom;
use crate::tick_budget::{BudgetThreshold, TickBudget};

#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player: PlayerId,
        respond: oneshot::Sender<Result<(), JoinError>>,
    },
    Leave {
        player: PlayerId,
        respond: oneshot::Sender<Result<(), ActionError>>,
    },
    Start {
        respond: oneshot::Sender<Result<RoomSummary, StartError>>,
    },
    Action {
        player: PlayerId,
        action: PlayerAction,
        respond: oneshot::Sender<Result<ActionResult, ActionError>>,
    },
    Summary {
        respond: oneshot::Sender<RoomSummary>,
    },
    Shutdown,
}

/// Persistence collaborator. Receives one record per finished room.
pub trait RecordSink: Send + Sync + 'static {
    fn store(&self, record: &RoomRecord);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn store(&self, _record: &RoomRecord) {}
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<RoomRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<RoomRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RecordSink for MemorySink {
    fn store(&self, record: &RoomRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    tx: mpsc::UnboundedSender<RoomCommand>,
    relay: broadcast::Sender<RelayPayload>,
    events: broadcast::Sender<RoomEvent>,
    timeout: Duration,
}

impl RoomHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn subscribe_relay(&self) -> broadcast::Receiver<RelayPayload> {
        self.relay.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub async fn join(&self, player: &str) -> Result<(), RoomError> {
        let player = player.to_string();
        self.request(|respond| RoomCommand::Join { player, respond })
            .await?
            .map_err(RoomError::from)
    }

    pub async fn leave(&self, player: &str) -> Result<(), RoomError> {
        let player = player.to_string();
        self.request(|respond| RoomCommand::Leave { player, respond })
            .await?
            .map_err(RoomError::from)
    }

    pub async fn start(&self) -> Result<RoomSummary, RoomError> {
        self.request(|respond| RoomCommand::Start { respond })
            .await?
            .map_err(RoomError::from)
    }

    pub async fn act(&self, player: &str, action: PlayerAction) -> Result<ActionResult, RoomError> {
        let player = player.to_string();
        self.request(|respond| RoomCommand::Action {
            player,
            action,
            respond,
        })
        .await?
        .map_err(RoomError::from)
    }

    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        self.request(|respond| RoomCommand::Summary { respond }).await
    }

    /// Asks the task to end the room and exit. Fire and forget.
    pub fn shutdown(&self) {
        let _ = self.tx.send(RoomCommand::Shutdown);
    }

    async fn request<T, F>(&self, build: F) -> Result<T, RoomError>
    where
        F: FnOnce(oneshot::Sender<T>) -> RoomCommand,
    {
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(build(respond))
            .map_err(|_| RoomError::Closed)?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(RoomError::Closed),
            Err(_) => Err(RoomError::TimedOut),
        }
    }
}

/// Spawns the room task. The join handle yields the end-of-room record.
pub fn spawn_room(
    room: ArenaRoom,
    sink: Arc<dyn RecordSink>,
) -> (RoomHandle, JoinHandle<Option<RoomRecord>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let capacity = room.config().room.relay_capacity.max(1);
    let (relay, _) = broadcast::channel(capacity);
    let (events, _) = broadcast::channel(capacity);

    let handle = RoomHandle {
        id: room.id().to_string(),
        tx,
        relay: relay.clone(),
        events: events.clone(),
        timeout: room.config().room.command_timeout(),
    };

    let task = tokio::spawn(run_room(room, rx, relay, events, sink));
    (handle, task)
}

async fn run_room(
    mut room: ArenaRoom,
    mut rx: mpsc::UnboundedReceiver<RoomCommand>,
    relay: broadcast::Sender<RelayPayload>,
    events: broadcast::Sender<RoomEvent>,
    sink: Arc<dyn RecordSink>,
) -> Option<RoomRecord> {
    let period = room.config().room.tick_period();
    let tick_ms = room.config().room.tick_ms.max(1) as u128;
    let relay_every = room.config().room.relay_every_ticks.max(1);

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut epoch = Instant::now();
    let mut last_relay_boundary = 0u64;
    let mut budget = TickBudget::new(
        room.id(),
        BudgetThreshold::from_env(BudgetThreshold::for_tick_period(period)),
    );

    info!(room = %room.id(), tick_ms = period.as_millis() as u64, "room task started");
    publish_events(&mut room, &events);

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!(room = %room.id(), "all handles dropped");
                    room.shutdown();
                    publish_events(&mut room, &events);
                    break;
                };
                let was_waiting = room.phase() == RoomPhase::Waiting;
                handle_command(&mut room, cmd);
                if was_waiting && room.phase() == RoomPhase::Active {
                    epoch = Instant::now();
                    last_relay_boundary = 0;
                }
            }
            _ = interval.tick() => {
                let started = Instant::now();
                let target = (epoch.elapsed().as_millis() / tick_ms) as u64;
                room.advance_to(target);
                let apply = started.elapsed();

                if room.phase() == RoomPhase::Active {
                    let boundary = room.tick() / relay_every;
                    if boundary > last_relay_boundary {
                        last_relay_boundary = boundary;
                        send_relay(&room, &relay);
                    }
                    let total = started.elapsed();
                    budget.on_step(
                        room.tick(),
                        StepTimings {
                            apply,
                            publish: total.saturating_sub(apply),
                            total,
                        },
                    );
                }
            }
        }

        publish_events(&mut room, &events);
        if room.phase() == RoomPhase::Ended {
            break;
        }
    }

    let record = room.record();
    if let Some(record) = &record {
        sink.store(record);
        info!(
            room = %record.room_id,
            reason = ?record.reason,
            final_tick = record.final_tick,
            slow_ticks = budget.over_warn_ticks(),
            "room task finished"
        );
    }
    record
}

fn handle_command(room: &mut ArenaRoom, cmd: RoomCommand) {
    match cmd {
        RoomCommand::Join { player, respond } => {
            let _ = respond.send(room.join(&player));
        }
        RoomCommand::Leave { player, respond } => {
            let _ = respond.send(room.leave(&player));
        }
        RoomCommand::Start { respond } => {
            let result = room.start().map(|()| room.summary());
            let _ = respond.send(result);
        }
        RoomCommand::Action {
            player,
            action,
            respond,
        } => {
            let result = room.apply_action(&player, action);
            if let Err(err) = &result {
                match err {
                    ActionError::Blocked => {
                        debug!(room = %room.id(), %player, ?action, "action blocked")
                    }
                    _ => warn!(room = %room.id(), %player, ?action, %err, "action rejected"),
                }
            }
            let _ = respond.send(result);
        }
        RoomCommand::Summary { respond } => {
            let _ = respond.send(room.summary());
        }
        RoomCommand::Shutdown => {
            info!(room = %room.id(), "shutdown requested");
            room.shutdown();
        }
    }
}

fn send_relay(room: &ArenaRoom, relay: &broadcast::Sender<RelayPayload>) {
    if relay.receiver_count() == 0 {
        return;
    }
    for payload in room.relay_payloads() {
        // Only fails when every subscriber is gone.
        if relay.send(payload).is_err() {
            break;
        }
    }
}

fn publish_events(room: &mut ArenaRoom, events: &broadcast::Sender<RoomEvent>) {
    for event in room.drain_events() {
        let _ = events.send(event);
    }
}
