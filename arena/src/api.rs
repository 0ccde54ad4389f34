//! Thin HTTP surface over the arena manager.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{ActionError, JoinError, RoomError, StartError};
use crate::manager::{ArenaManager, LeaderboardEntry};
use crate::protocol::{ActionRequest, ActionResult, PlayerId, RoomId, RoomSummary};

pub const DEFAULT_API_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 4100);

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub ok: bool,
}

pub fn router(manager: ArenaManager) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/:id", get(room_summary))
        .route("/api/rooms/:id/join", post(join_room))
        .route("/api/rooms/:id/leave", post(leave_room))
        .route("/api/rooms/:id/start", post(start_room))
        .route("/api/rooms/:id/action", post(room_action))
        .route("/api/leaderboard", get(leaderboard))
        .with_state(manager)
        .layer(cors)
}

pub fn resolve_api_addr<F>(mut get_env: F) -> SocketAddr
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(addr) = get_env("ARENA_API_ADDR").and_then(|v| v.parse().ok()) {
        return addr;
    }

    if let Some(port) = get_env("ARENA_API_PORT").and_then(|v| v.parse::<u16>().ok()) {
        return SocketAddr::from(([127, 0, 0, 1], port));
    }

    DEFAULT_API_ADDR
}

pub fn status_for(err: &RoomError) -> StatusCode {
    match err {
        RoomError::UnknownRoom(_) => StatusCode::NOT_FOUND,
        RoomError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        RoomError::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        RoomError::Action(ActionError::UnknownPlayer(_)) => StatusCode::NOT_FOUND,
        RoomError::Action(ActionError::Blocked) => StatusCode::UNPROCESSABLE_ENTITY,
        RoomError::Action(ActionError::RoomNotActive | ActionError::BoardGameOver(_)) => {
            StatusCode::CONFLICT
        }
        RoomError::Join(JoinError::RoomFull { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        RoomError::Join(JoinError::AlreadyJoined(_) | JoinError::NotJoinable) => {
            StatusCode::CONFLICT
        }
        RoomError::Start(StartError::NotWaiting | StartError::RosterSize { .. }) => {
            StatusCode::CONFLICT
        }
    }
}

fn reject(err: RoomError) -> (StatusCode, String) {
    (status_for(&err), err.to_string())
}

async fn health() -> &'static str {
    "ok"
}

async fn create_room(State(manager): State<ArenaManager>) -> ApiResult<CreatedRoom> {
    let handle = manager
        .create_room()
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(Json(CreatedRoom {
        room_id: handle.id().to_string(),
    }))
}

async fn room_summary(
    State(manager): State<ArenaManager>,
    Path(id): Path<RoomId>,
) -> ApiResult<RoomSummary> {
    let handle = manager.room(&id).map_err(reject)?;
    let summary = handle.summary().await.map_err(reject)?;
    Ok(Json(summary))
}

async fn join_room(
    State(manager): State<ArenaManager>,
    Path(id): Path<RoomId>,
    Json(payload): Json<PlayerRequest>,
) -> ApiResult<Ack> {
    let handle = manager.room(&id).map_err(reject)?;
    handle.join(&payload.player_id).await.map_err(reject)?;
    Ok(Json(Ack { ok: true }))
}

async fn leave_room(
    State(manager): State<ArenaManager>,
    Path(id): Path<RoomId>,
    Json(payload): Json<PlayerRequest>,
) -> ApiResult<Ack> {
    let handle = manager.room(&id).map_err(reject)?;
    handle.leave(&payload.player_id).await.map_err(reject)?;
    Ok(Json(Ack { ok: true }))
}

async fn start_room(
    State(manager): State<ArenaManager>,
    Path(id): Path<RoomId>,
) -> ApiResult<RoomSummary> {
    let handle = manager.room(&id).map_err(reject)?;
    let summary = handle.start().await.map_err(reject)?;
    Ok(Json(summary))
}

async fn room_action(
    State(manager): State<ArenaManager>,
    Path(id): Path<RoomId>,
    Json(payload): Json<ActionRequest>,
) -> ApiResult<ActionResult> {
    let handle = manager.room(&id).map_err(reject)?;
    let result = handle
        .act(&payload.player_id, payload.action)
        .await
        .map_err(reject)?;
    Ok(Json(result))
}

async fn leaderboard(State(manager): State<ArenaManager>) -> Json<Vec<LeaderboardEntry>> {
    Json(manager.leaderboard())
}
