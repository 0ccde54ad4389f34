use std::sync::Arc;
use std::time::Duration;

use arena::actor::{MemorySink, RecordSink, spawn_room};
use arena::config::ArenaConfig;
use arena::error::{JoinError, RoomError};
use arena::manager::ArenaManager;
use arena::protocol::{EndReason, PlayerAction, RoomEvent, RoomPhase};
use arena::room::ArenaRoom;

fn room(config: ArenaConfig) -> ArenaRoom {
    ArenaRoom::new("actor", config, 5).unwrap()
}

#[tokio::test(start_paused = true)]
async fn commands_apply_in_order_and_relay_flows() {
    let sink = Arc::new(MemorySink::default());
    let (handle, task) = spawn_room(room(ArenaConfig::default()), sink.clone());

    handle.join("a").await.unwrap();
    handle.join("b").await.unwrap();
    assert!(matches!(
        handle.join("a").await,
        Err(RoomError::Join(JoinError::AlreadyJoined(_)))
    ));

    let mut relay = handle.subscribe_relay();
    let summary = handle.start().await.unwrap();
    assert_eq!(summary.phase, RoomPhase::Active);
    assert_eq!(summary.players, vec!["a".to_string(), "b".to_string()]);

    let result = handle.act("a", PlayerAction::HardDrop).await.unwrap();
    assert!(result.lock.is_some());

    let payload = tokio::time::timeout(Duration::from_secs(5), relay.recv())
        .await
        .expect("relay within the window")
        .unwrap();
    assert!(payload.tick >= 4);
    assert!(payload.player_id == "a" || payload.player_id == "b");

    handle.shutdown();
    let record = task.await.unwrap().expect("record on shutdown");
    assert_eq!(record.reason, EndReason::Shutdown);
    assert_eq!(sink.records().len(), 1);
    assert_eq!(sink.records()[0].room_id, "actor");

    assert!(matches!(
        handle.act("a", PlayerAction::HardDrop).await,
        Err(RoomError::Closed)
    ));
}

#[tokio::test(start_paused = true)]
async fn lifecycle_events_are_broadcast() {
    let sink: Arc<dyn RecordSink> = Arc::new(MemorySink::default());
    let (handle, task) = spawn_room(room(ArenaConfig::default()), sink);
    let mut events = handle.subscribe_events();

    handle.join("a").await.unwrap();
    handle.join("b").await.unwrap();
    handle.start().await.unwrap();
    handle.leave("b").await.unwrap();

    let mut seen = Vec::new();
    loop {
        let event = events.recv().await.unwrap();
        let done = matches!(event, RoomEvent::RoomEnded { .. });
        seen.push(event);
        if done {
            break;
        }
    }

    assert!(seen.iter().any(|e| matches!(e, RoomEvent::PlayerJoined { .. })));
    assert!(seen.iter().any(|e| matches!(
        e,
        RoomEvent::PhaseChanged {
            to: RoomPhase::Active,
            ..
        }
    )));
    assert!(seen.iter().any(|e| matches!(e, RoomEvent::PlayerLeft { .. })));
    assert!(matches!(
        seen.last(),
        Some(RoomEvent::RoomEnded {
            reason: EndReason::RosterBelowMinimum,
            ..
        })
    ));

    let record = task.await.unwrap().unwrap();
    assert_eq!(record.reason, EndReason::RosterBelowMinimum);
}

#[tokio::test(start_paused = true)]
async fn idle_waiting_room_is_cancelled() {
    let mut config = ArenaConfig::default();
    config.room.waiting_timeout_ticks = 10;
    let sink = Arc::new(MemorySink::default());
    let (handle, task) = spawn_room(room(config), sink.clone());
    handle.join("lonely").await.unwrap();

    let record = task.await.unwrap().unwrap();
    assert_eq!(record.reason, EndReason::Cancelled);
    assert!(handle.is_closed());
    assert_eq!(sink.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn room_reaches_its_time_limit() {
    let mut config = ArenaConfig::default();
    config.room.max_duration_ticks = 40;
    let (handle, task) = spawn_room(room(config), Arc::new(MemorySink::default()));
    handle.join("a").await.unwrap();
    handle.join("b").await.unwrap();
    handle.start().await.unwrap();

    let record = task.await.unwrap().unwrap();
    assert_eq!(record.reason, EndReason::TimeLimit);
    assert!(record.final_tick >= 40);
    assert_eq!(record.rankings.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn manager_registry_and_leaderboard() {
    let mut config = ArenaConfig::default();
    config.room.max_duration_ticks = 20;
    let manager = ArenaManager::new(config, Arc::new(MemorySink::default()), 9).unwrap();

    let handle = manager.create_room().unwrap();
    let id = handle.id().to_string();
    assert_eq!(manager.room_ids(), vec![id.clone()]);
    assert!(matches!(
        manager.room("room-404"),
        Err(RoomError::UnknownRoom(_))
    ));

    let room = manager.room(&id).unwrap();
    room.join("a").await.unwrap();
    room.join("b").await.unwrap();
    room.start().await.unwrap();

    let mut events = room.subscribe_events();
    while !matches!(events.recv().await, Ok(RoomEvent::RoomEnded { .. })) {}

    // Let the cleanup task run.
    for _ in 0..10 {
        if manager.room_ids().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(manager.room_ids().is_empty());

    let board = manager.leaderboard();
    assert_eq!(board.len(), 2);
    assert!(board.iter().all(|e| e.rooms_played == 1));
}
