// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

pub mod dto;
mod rest;
mod ws;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tokio::sync::broadcast;
use tracing::info;

use crate::cancel::CancelHandle;
use crate::clock::{ClockError, MasterClock, TICKS_PER_BEAT};
use crate::dmx::Controller;
use crate::fixture::{Patch, PatchError};
use crate::fx::{FxEngine, FxError, FxEvent};

pub use ws::OutboundMessage;

/// Beat sync frames go out every this many beats.
const BEAT_SYNC_INTERVAL: i64 = 16;

/// How long bridge threads wait on their channels between cancel checks.
const BRIDGE_WAIT: Duration = Duration::from_millis(250);

/// Shared state for every handler.
pub struct AppState {
    pub clock: Arc<MasterClock>,
    pub engine: Arc<FxEngine>,
    pub patch: Arc<Patch>,
    pub controller: Arc<Controller>,
    /// Fan-out to every connected WebSocket client.
    pub broadcast: broadcast::Sender<OutboundMessage>,
}

impl AppState {
    pub fn new(
        clock: Arc<MasterClock>,
        engine: Arc<FxEngine>,
        patch: Arc<Patch>,
        controller: Arc<Controller>,
    ) -> Arc<AppState> {
        let (broadcast, _) = broadcast::channel(256);
        Arc::new(AppState {
            clock,
            engine,
            patch,
            controller,
            broadcast,
        })
    }
}

/// An error response carrying the HTTP status the error kind maps to.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> ApiError {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> ApiError {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<FxError> for ApiError {
    fn from(err: FxError) -> ApiError {
        let status = match &err {
            FxError::UnknownInstance(_) => StatusCode::NOT_FOUND,
            FxError::Patch(PatchError::UnknownFixture(_))
            | FxError::Patch(PatchError::UnknownGroup(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<PatchError> for ApiError {
    fn from(err: PatchError) -> ApiError {
        let status = match &err {
            PatchError::UnknownFixture(_) | PatchError::UnknownGroup(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<ClockError> for ApiError {
    fn from(err: ClockError) -> ApiError {
        ApiError::bad_request(err.to_string())
    }
}

/// Builds the full REST + WebSocket router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/fx/clock/status", get(rest::clock_status))
        .route("/fx/clock/bpm", post(rest::set_bpm))
        .route("/fx/clock/tap", post(rest::tap))
        .route("/fx/clock/start", post(rest::start_clock))
        .route("/fx/clock/stop", post(rest::stop_clock))
        .route("/fx/active", get(rest::active_effects))
        .route("/fx/add", post(rest::add_effect))
        .route("/fx/library", get(rest::library))
        .route("/fx/clear", post(rest::clear_effects))
        .route(
            "/fx/fixture/:key",
            get(rest::fixture_effects).delete(rest::remove_fixture_effects),
        )
        .route("/fx/:id", put(rest::update_effect).delete(rest::remove_effect))
        .route("/fx/:id/pause", post(rest::pause_effect))
        .route("/fx/:id/resume", post(rest::resume_effect))
        .route("/groups", get(rest::groups))
        .route(
            "/groups/distribution-strategies",
            get(rest::distribution_strategies),
        )
        .route("/groups/:name", get(rest::group_detail))
        .route("/groups/:name/properties", get(rest::group_properties))
        .route(
            "/groups/:name/fx",
            post(rest::add_group_effect).delete(rest::remove_group_effects),
        )
        .route("/groups/:name/fx/active", get(rest::group_effects))
        .route("/universes", get(rest::universes))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

/// Serves the router until the listener fails or the process exits.
pub async fn serve(
    state: Arc<AppState>,
    bind: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind, "HTTP server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Starts the threads that bridge engine and clock events onto the WebSocket
/// broadcast: `fxChanged` for lifecycle events, `beatSync` every sixteen
/// beats and on BPM changes (with `beatNumber = -1`).
pub fn start_event_bridges(state: Arc<AppState>, cancel_handle: CancelHandle) {
    {
        let state = state.clone();
        let cancel_handle = cancel_handle.clone();
        let events = state.engine.subscribe_events();
        std::thread::spawn(move || loop {
            if cancel_handle.is_cancelled() {
                return;
            }
            match events.recv_timeout(BRIDGE_WAIT) {
                Ok(event) => {
                    let (change_type, effect_id) = match event {
                        FxEvent::Added(id) => ("added", Some(id)),
                        FxEvent::Updated(id) => ("updated", Some(id)),
                        FxEvent::Removed(id) => ("removed", Some(id)),
                        FxEvent::Paused(id) => ("paused", Some(id)),
                        FxEvent::Resumed(id) => ("resumed", Some(id)),
                        FxEvent::Cleared => ("cleared", None),
                    };
                    let _ = state.broadcast.send(OutboundMessage::FxChanged {
                        change_type: change_type.to_string(),
                        effect_id,
                    });
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
            }
        });
    }

    {
        let state = state.clone();
        let cancel_handle = cancel_handle.clone();
        let ticks = state.clock.subscribe();
        std::thread::spawn(move || loop {
            if cancel_handle.is_cancelled() {
                return;
            }
            match ticks.recv_timeout(BRIDGE_WAIT) {
                Ok(tick) => {
                    if tick.index % TICKS_PER_BEAT != 0 {
                        continue;
                    }
                    let beat_number = (tick.index / TICKS_PER_BEAT) as i64;
                    if beat_number % BEAT_SYNC_INTERVAL != 0 {
                        continue;
                    }
                    let _ = state
                        .broadcast
                        .send(ws::beat_sync(beat_number, state.clock.bpm()));
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
            }
        });
    }

    {
        let bpm_changes = state.clock.subscribe_bpm();
        std::thread::spawn(move || loop {
            if cancel_handle.is_cancelled() {
                return;
            }
            match bpm_changes.recv_timeout(BRIDGE_WAIT) {
                Ok(bpm) => {
                    let _ = state.broadcast.send(ws::beat_sync(-1, bpm));
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
            }
        });
    }
}
