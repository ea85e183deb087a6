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

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::clock::TICKS_PER_BEAT;
use crate::dmx::{ChannelChange, UniverseId};

use super::dto::{channel_mappings, ChannelLevelDto, ChannelMappingDto, EffectDto};
use super::AppState;

/// Client to server messages. All messages are JSON objects discriminated by
/// `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    Ping,
    FxState,
    #[serde(rename_all = "camelCase")]
    SetFxBpm { bpm: f64 },
    TapTempo,
    #[serde(rename_all = "camelCase")]
    RemoveFx { effect_id: u64 },
    #[serde(rename_all = "camelCase")]
    PauseFx { effect_id: u64 },
    #[serde(rename_all = "camelCase")]
    ResumeFx { effect_id: u64 },
    ClearFx,
    RequestBeatSync,
    #[serde(rename_all = "camelCase")]
    UpdateChannel {
        universe: u8,
        id: u16,
        level: u8,
        #[serde(default)]
        fade_time: u64,
    },
    ChannelState,
    ChannelMappingState,
}

/// Server to client messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    Pong,
    #[serde(rename_all = "camelCase")]
    FxState {
        bpm: f64,
        is_clock_running: bool,
        active_effects: Vec<EffectDto>,
    },
    #[serde(rename_all = "camelCase")]
    FxChanged {
        change_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        effect_id: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    BeatSync {
        beat_number: i64,
        bpm: f64,
        timestamp_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    ChannelState { channels: Vec<ChannelLevelDto> },
    #[serde(rename_all = "camelCase")]
    ChannelMappingState { mappings: Vec<ChannelMappingDto> },
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

pub fn beat_sync(beat_number: i64, bpm: f64) -> OutboundMessage {
    OutboundMessage::BeatSync {
        beat_number,
        bpm,
        timestamp_ms: timestamp_ms(),
    }
}

pub async fn upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

fn fx_state(state: &AppState) -> OutboundMessage {
    OutboundMessage::FxState {
        bpm: state.clock.bpm(),
        is_clock_running: state.clock.is_running(),
        active_effects: state
            .engine
            .active_effects()
            .iter()
            .map(EffectDto::from)
            .collect(),
    }
}

fn channel_state(state: &AppState) -> OutboundMessage {
    let mut channels = Vec::new();
    for transmitter in state.controller.transmitters() {
        let universe = transmitter.universe().port_address();
        let frame = transmitter.snapshot();
        for channel in 1..=crate::dmx::UNIVERSE_SIZE as u16 {
            let level = frame.get(channel).unwrap_or(0);
            if level > 0 {
                channels.push(ChannelLevelDto {
                    universe,
                    id: channel,
                    current_level: level,
                });
            }
        }
    }
    OutboundMessage::ChannelState { channels }
}

/// Handles one inbound message, optionally producing a direct reply.
fn handle_message(state: &AppState, message: InboundMessage) -> Option<OutboundMessage> {
    match message {
        InboundMessage::Ping => Some(OutboundMessage::Pong),
        InboundMessage::FxState => Some(fx_state(state)),
        InboundMessage::SetFxBpm { bpm } => match state.clock.set_bpm(bpm) {
            Ok(()) => None,
            Err(err) => Some(OutboundMessage::Error {
                message: err.to_string(),
            }),
        },
        InboundMessage::TapTempo => {
            state.clock.tap();
            None
        }
        InboundMessage::RemoveFx { effect_id } => match state.engine.remove_effect(effect_id) {
            Ok(()) => None,
            Err(err) => Some(OutboundMessage::Error {
                message: err.to_string(),
            }),
        },
        InboundMessage::PauseFx { effect_id } => match state.engine.pause_effect(effect_id) {
            Ok(()) => None,
            Err(err) => Some(OutboundMessage::Error {
                message: err.to_string(),
            }),
        },
        InboundMessage::ResumeFx { effect_id } => match state.engine.resume_effect(effect_id) {
            Ok(()) => None,
            Err(err) => Some(OutboundMessage::Error {
                message: err.to_string(),
            }),
        },
        InboundMessage::ClearFx => {
            state.engine.clear_all_effects();
            None
        }
        InboundMessage::RequestBeatSync => {
            let beat_number = (state.clock.current_tick() / TICKS_PER_BEAT) as i64;
            Some(beat_sync(beat_number, state.clock.bpm()))
        }
        InboundMessage::UpdateChannel {
            universe,
            id,
            level,
            fade_time,
        } => {
            let universe = UniverseId::from_port_address(universe);
            let change = ChannelChange::fade(level, Duration::from_millis(fade_time));
            match state.controller.set(universe, id, change) {
                Ok(()) => None,
                Err(err) => Some(OutboundMessage::Error {
                    message: err.to_string(),
                }),
            }
        }
        InboundMessage::ChannelState => Some(channel_state(state)),
        InboundMessage::ChannelMappingState => Some(OutboundMessage::ChannelMappingState {
            mappings: channel_mappings(&state.patch),
        }),
    }
}

async fn handle_socket(state: Arc<AppState>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let mut broadcast = state.broadcast.subscribe();
    let (replies, mut reply_receiver) = mpsc::channel::<OutboundMessage>(64);

    // Writer: merges broadcast traffic with direct replies.
    let writer = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                broadcasted = broadcast.recv() => match broadcasted {
                    Ok(message) => message,
                    // Skip over missed messages rather than dropping the client.
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_receiver.recv() => match reply {
                    Some(message) => message,
                    None => break,
                },
            };
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(err) => {
                    warn!(err = %err, "Unable to serialize WebSocket message");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let reply = match serde_json::from_str::<InboundMessage>(&text) {
            Ok(inbound) => handle_message(&state, inbound),
            Err(err) => {
                debug!(err = %err, "Malformed WebSocket message");
                Some(OutboundMessage::Error {
                    message: format!("malformed message: {}", err),
                })
            }
        };
        if let Some(reply) = reply {
            if replies.send(reply).await.is_err() {
                break;
            }
        }
    }

    writer.abort();
}
