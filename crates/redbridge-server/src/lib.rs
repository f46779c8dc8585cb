//! REST + WebSocket service multiplexing emulator sessions.
//!
//! Remote agents create a session, drive it over `/v1/sessions/:id/step`
//! with a per-session control token, and close it when done; spectators
//! follow the same session read-only over `/v1/sessions/:id/ws` or poll
//! the frame endpoint. Closed sessions leave a replay behind, playable
//! over REST or as a paced WebSocket stream.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use redbridge_core::replay::ReplayStore;

pub mod api;
pub mod config;
pub mod driver;
pub mod registry;
pub mod server;
pub mod ws;

pub use config::{ConfigFile, ServerConfig};
pub use server::{ServerHandle, start};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<ServerConfig>,
    pub registry: Arc<registry::Registry>,
    pub replays: Arc<ReplayStore>,
}

pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/readyz", get(api::readyz))
        .route("/v1/sessions", post(api::create_session).get(api::list_sessions))
        .route("/v1/sessions/:id", get(api::session_detail))
        .route("/v1/sessions/:id/step", post(api::step_session))
        .route("/v1/sessions/:id/agent", post(api::switch_agent))
        .route("/v1/sessions/:id/frame", get(api::session_frame))
        .route("/v1/sessions/:id/close", post(api::close_session))
        .route("/v1/sessions/:id/ws", get(ws::session_ws))
        .route("/v1/replays", get(api::list_replays))
        .route("/v1/replays/:id", get(api::get_replay))
        .route("/v1/replays/:id/ws", get(ws::replay_ws));

    // The poke route only exists when explicitly enabled; everything else
    // is safe to expose to spectators.
    let router = if state.cfg.debug_endpoints {
        router.route("/v1/sessions/:id/poke", post(api::poke_session))
    } else {
        router
    };

    router.with_state(state)
}
