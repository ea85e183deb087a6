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

use axum::extract::{Path, State};
use axum::Json;

use crate::dmx::TransmitterStatus;
use crate::fx::{
    build_effect, catalog, AddEffect, BlendMode, DistributionStrategy, EffectTypeInfo,
    ElementMode, FxError, FxTarget, UpdateEffect,
};

use super::dto::{
    AddEffectRequest, AddGroupFxRequest, ClockStatusDto, EffectDto, EffectIdDto,
    FixtureEffectsDto, GroupDetailDto, GroupPropertyDto, GroupSummaryDto, RemovedCountDto,
    SetBpmRequest, StrategiesDto, UniverseStatusDto, UpdateEffectRequest,
};
use super::{ApiError, AppState};

pub async fn clock_status(State(state): State<Arc<AppState>>) -> Json<ClockStatusDto> {
    Json(ClockStatusDto {
        bpm: state.clock.bpm(),
        is_running: state.clock.is_running(),
        dropped_ticks: state.engine.dropped_ticks(),
    })
}

pub async fn set_bpm(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetBpmRequest>,
) -> Result<Json<ClockStatusDto>, ApiError> {
    state.clock.set_bpm(request.bpm)?;
    Ok(Json(ClockStatusDto {
        bpm: state.clock.bpm(),
        is_running: state.clock.is_running(),
        dropped_ticks: state.engine.dropped_ticks(),
    }))
}

pub async fn tap(State(state): State<Arc<AppState>>) -> Json<ClockStatusDto> {
    state.clock.tap();
    Json(ClockStatusDto {
        bpm: state.clock.bpm(),
        is_running: state.clock.is_running(),
        dropped_ticks: state.engine.dropped_ticks(),
    })
}

pub async fn start_clock(State(state): State<Arc<AppState>>) -> Json<ClockStatusDto> {
    state.clock.start();
    Json(ClockStatusDto {
        bpm: state.clock.bpm(),
        is_running: true,
        dropped_ticks: state.engine.dropped_ticks(),
    })
}

pub async fn stop_clock(State(state): State<Arc<AppState>>) -> Json<ClockStatusDto> {
    state.clock.stop();
    Json(ClockStatusDto {
        bpm: state.clock.bpm(),
        is_running: false,
        dropped_ticks: state.engine.dropped_ticks(),
    })
}

pub async fn active_effects(State(state): State<Arc<AppState>>) -> Json<Vec<EffectDto>> {
    Json(
        state
            .engine
            .active_effects()
            .iter()
            .map(EffectDto::from)
            .collect(),
    )
}

pub async fn library() -> Json<Vec<EffectTypeInfo>> {
    Json(catalog())
}

fn parse_blend_mode(name: &str) -> Result<BlendMode, FxError> {
    BlendMode::from_name(name).ok_or_else(|| FxError::UnknownBlendMode(name.to_string()))
}

fn parse_distribution(
    name: Option<&str>,
    default: DistributionStrategy,
) -> Result<DistributionStrategy, FxError> {
    match name {
        None => Ok(default),
        Some(name) => DistributionStrategy::from_name(name)
            .ok_or_else(|| FxError::UnknownDistribution(name.to_string())),
    }
}

fn parse_element_mode(name: Option<&str>) -> Result<ElementMode, FxError> {
    match name {
        None => Ok(ElementMode::PerFixture),
        Some(name) => {
            ElementMode::from_name(name).ok_or_else(|| FxError::UnknownElementMode(name.to_string()))
        }
    }
}

pub async fn add_effect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddEffectRequest>,
) -> Result<Json<EffectIdDto>, ApiError> {
    let effect = build_effect(&request.effect_type, &request.parameters)?;
    let add = AddEffect {
        effect,
        target: FxTarget::fixture(request.fixture_key, request.property_name),
        beat_division: request.beat_division,
        start_on_beat: request.start_on_beat,
        blend_mode: parse_blend_mode(&request.blend_mode)?,
        step_timing: request.step_timing,
        phase_offset: request.phase_offset,
        distribution: parse_distribution(
            request.distribution_strategy.as_deref(),
            DistributionStrategy::Unified,
        )?,
        element_mode: parse_element_mode(request.element_mode.as_deref())?,
        preset_id: None,
    };
    let effect_id = state.engine.add_effect(add)?;
    Ok(Json(EffectIdDto { effect_id }))
}

pub async fn update_effect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateEffectRequest>,
) -> Result<Json<EffectDto>, ApiError> {
    let existing = state.engine.effect(id)?;

    // Replacing the effect needs a type and parameters; either can fall back
    // to the current instance.
    let effect = if request.effect_type.is_some() || request.parameters.is_some() {
        let effect_type = request
            .effect_type
            .unwrap_or_else(|| existing.effect.type_name().to_string());
        let parameters = request.parameters.unwrap_or_default();
        Some(build_effect(&effect_type, &parameters)?)
    } else {
        None
    };

    let update = UpdateEffect {
        effect,
        beat_division: request.beat_division,
        blend_mode: request
            .blend_mode
            .as_deref()
            .map(parse_blend_mode)
            .transpose()?,
        step_timing: request.step_timing,
        phase_offset: request.phase_offset,
        distribution: request
            .distribution_strategy
            .as_deref()
            .map(|name| parse_distribution(Some(name), DistributionStrategy::Unified))
            .transpose()?,
        element_mode: request
            .element_mode
            .as_deref()
            .map(|name| parse_element_mode(Some(name)))
            .transpose()?,
    };
    let updated = state.engine.update_effect(id, update)?;
    Ok(Json(EffectDto::from(&updated)))
}

pub async fn remove_effect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.engine.remove_effect(id)?;
    Ok(Json(serde_json::json!({ "removed": true })))
}

pub async fn pause_effect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<EffectDto>, ApiError> {
    state.engine.pause_effect(id)?;
    Ok(Json(EffectDto::from(&state.engine.effect(id)?)))
}

pub async fn resume_effect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<EffectDto>, ApiError> {
    state.engine.resume_effect(id)?;
    Ok(Json(EffectDto::from(&state.engine.effect(id)?)))
}

pub async fn fixture_effects(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<FixtureEffectsDto>, ApiError> {
    // 404 for unknown fixtures rather than an empty result.
    state.patch.fixture(&key)?;
    let (direct, indirect) = state.engine.effects_for_fixture(&key);
    Ok(Json(FixtureEffectsDto {
        direct: direct.iter().map(EffectDto::from).collect(),
        indirect: indirect.iter().map(EffectDto::from).collect(),
    }))
}

pub async fn remove_fixture_effects(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<RemovedCountDto>, ApiError> {
    state.patch.fixture(&key)?;
    Ok(Json(RemovedCountDto {
        removed_count: state.engine.remove_effects_for_fixture(&key),
    }))
}

pub async fn clear_effects(State(state): State<Arc<AppState>>) -> Json<RemovedCountDto> {
    Json(RemovedCountDto {
        removed_count: state.engine.clear_all_effects(),
    })
}

pub async fn groups(State(state): State<Arc<AppState>>) -> Json<Vec<GroupSummaryDto>> {
    Json(
        state
            .patch
            .groups()
            .into_iter()
            .map(super::dto::group_summary)
            .collect(),
    )
}

pub async fn group_detail(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<GroupDetailDto>, ApiError> {
    Ok(Json(super::dto::group_detail(state.patch.group(&name)?)))
}

pub async fn group_properties(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<GroupPropertyDto>>, ApiError> {
    let group = state.patch.group(&name)?;
    Ok(Json(super::dto::group_properties(&state.patch, group)))
}

pub async fn add_group_effect(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<AddGroupFxRequest>,
) -> Result<Json<EffectIdDto>, ApiError> {
    let effect = build_effect(&request.effect_type, &request.parameters)?;
    let add = AddEffect {
        effect,
        target: FxTarget::group(name, request.property_name),
        beat_division: request.beat_division,
        start_on_beat: request.start_on_beat,
        blend_mode: parse_blend_mode(&request.blend_mode)?,
        step_timing: request.step_timing,
        phase_offset: request.phase_offset,
        distribution: parse_distribution(
            request.distribution_strategy.as_deref(),
            DistributionStrategy::Linear,
        )?,
        element_mode: parse_element_mode(request.element_mode.as_deref())?,
        preset_id: None,
    };
    let effect_id = state.engine.add_effect(add)?;
    Ok(Json(EffectIdDto { effect_id }))
}

pub async fn remove_group_effects(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<RemovedCountDto>, ApiError> {
    state.patch.group(&name)?;
    Ok(Json(RemovedCountDto {
        removed_count: state.engine.remove_effects_for_group(&name),
    }))
}

pub async fn group_effects(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<EffectDto>>, ApiError> {
    state.patch.group(&name)?;
    Ok(Json(
        state
            .engine
            .effects_for_group(&name)
            .iter()
            .map(EffectDto::from)
            .collect(),
    ))
}

pub async fn distribution_strategies() -> Json<StrategiesDto> {
    Json(StrategiesDto {
        strategies: DistributionStrategy::names(),
    })
}

pub async fn universes(State(state): State<Arc<AppState>>) -> Json<Vec<UniverseStatusDto>> {
    Json(
        state
            .controller
            .transmitters()
            .into_iter()
            .map(|transmitter| {
                let (status, error) = match transmitter.status() {
                    TransmitterStatus::Running => ("running".to_string(), None),
                    TransmitterStatus::Terminated { message } => {
                        ("terminated".to_string(), Some(message))
                    }
                };
                let universe = transmitter.universe();
                UniverseStatusDto {
                    subnet: universe.subnet,
                    universe: universe.universe,
                    destination: transmitter.destination().to_string(),
                    status,
                    error,
                    frames_sent: transmitter.frames_sent(),
                }
            })
            .collect(),
    )
}
