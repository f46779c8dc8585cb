//! WebSocket streams: live spectating and replay playback.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use redbridge_core::game::GameSnapshot;
use redbridge_core::replay::Replay;

use crate::AppState;
use crate::api::ApiError;
use crate::driver::SessionUpdate;

const DEFAULT_FRAME_MS: u64 = 100;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum StreamMessage<'a> {
    Hello {
        session_id: &'a str,
    },
    State {
        step: u64,
        snapshot: &'a GameSnapshot,
        #[serde(skip_serializing_if = "Option::is_none")]
        frame_png: Option<&'a str>,
    },
    Closed {
        reason: &'a str,
    },
}

impl StreamMessage<'_> {
    fn to_ws(&self) -> Message {
        Message::Text(serde_json::to_string(self).expect("stream message serializes"))
    }
}

/// Read-only live stream of a session. No token required; spectators
/// cannot influence the session.
pub async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.registry.subscribe(&id).await {
        Ok(updates) => ws.on_upgrade(move |socket| stream_session(socket, id, updates)),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn stream_session(
    mut socket: WebSocket,
    id: String,
    mut updates: watch::Receiver<SessionUpdate>,
) {
    if socket
        .send(StreamMessage::Hello { session_id: &id }.to_ws())
        .await
        .is_err()
    {
        return;
    }

    // Current state right away, then one message per step.
    let update = updates.borrow_and_update().clone();
    if send_update(&mut socket, &update).await.is_err() {
        return;
    }

    loop {
        match updates.changed().await {
            Ok(()) => {
                let update = updates.borrow_and_update().clone();
                if send_update(&mut socket, &update).await.is_err() {
                    return;
                }
            }
            // The driver dropped its sender: the session is over.
            Err(_) => {
                let _ = socket
                    .send(
                        StreamMessage::Closed {
                            reason: "session closed",
                        }
                        .to_ws(),
                    )
                    .await;
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
        }
    }
}

async fn send_update(
    socket: &mut WebSocket,
    update: &SessionUpdate,
) -> Result<(), axum::Error> {
    let frame = update.frame_base64();
    socket
        .send(
            StreamMessage::State {
                step: update.step,
                snapshot: &update.snapshot,
                frame_png: Some(&frame),
            }
            .to_ws(),
        )
        .await
}

#[derive(Debug, Deserialize)]
pub struct PlaybackParams {
    pub frame_ms: Option<u64>,
}

/// Stream a recorded session, paced like a live one.
pub async fn replay_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PlaybackParams>,
) -> Response {
    let replay = match state.replays.load(&id) {
        Ok(replay) => replay,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let pace = Duration::from_millis(params.frame_ms.unwrap_or(DEFAULT_FRAME_MS).max(1));
    ws.on_upgrade(move |socket| play_replay(socket, replay, pace))
}

async fn play_replay(mut socket: WebSocket, replay: Replay, pace: Duration) {
    let hello = StreamMessage::Hello {
        session_id: &replay.session.session_id,
    };
    if socket.send(hello.to_ws()).await.is_err() {
        return;
    }

    for entry in &replay.entries {
        let msg = StreamMessage::State {
            step: entry.step,
            snapshot: &entry.snapshot,
            frame_png: entry.frame_png.as_deref(),
        };
        if socket.send(msg.to_ws()).await.is_err() {
            return;
        }
        tokio::time::sleep(pace).await;
    }

    let _ = socket
        .send(
            StreamMessage::Closed {
                reason: "end of replay",
            }
            .to_ws(),
        )
        .await;
    let _ = socket.send(Message::Close(None)).await;
}
