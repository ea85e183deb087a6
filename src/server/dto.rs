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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fixture::{Fixture, FixtureGroup, Patch, Property, PropertyKind};
use crate::fx::{FxInstance, FxTargetRef};

/// Clock state for `GET /fx/clock/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockStatusDto {
    pub bpm: f64,
    pub is_running: bool,
    pub dropped_ticks: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetBpmRequest {
    pub bpm: f64,
}

/// One active effect instance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDto {
    pub id: u64,
    pub effect_type: String,
    pub target_type: String,
    pub target_key: String,
    pub property_name: String,
    pub is_group: bool,
    pub beat_division: f64,
    pub blend_mode: String,
    pub step_timing: bool,
    pub start_on_beat: bool,
    pub phase_offset: f64,
    pub distribution_strategy: String,
    pub element_mode: String,
    pub is_running: bool,
    pub last_phase: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
}

impl From<&FxInstance> for EffectDto {
    fn from(instance: &FxInstance) -> EffectDto {
        let target_type = match instance.target.reference {
            FxTargetRef::Fixture(_) => "fixture",
            FxTargetRef::Group(_) => "group",
        };
        EffectDto {
            id: instance.id,
            effect_type: instance.effect.type_name().to_string(),
            target_type: target_type.to_string(),
            target_key: instance.target.key().to_string(),
            property_name: instance.target.property.clone(),
            is_group: instance.target.is_group(),
            beat_division: instance.timing.beat_division,
            blend_mode: instance.blend_mode.name().to_string(),
            step_timing: instance.step_timing,
            start_on_beat: instance.timing.start_on_beat,
            phase_offset: instance.phase_offset,
            distribution_strategy: instance.distribution.name().to_string(),
            element_mode: instance.element_mode.name().to_string(),
            is_running: instance.running,
            last_phase: instance.last_phase,
            preset_id: instance.preset_id.clone(),
        }
    }
}

fn default_beat_division() -> f64 {
    1.0
}

fn default_blend_mode() -> String {
    "OVERRIDE".to_string()
}

fn default_start_on_beat() -> bool {
    true
}

/// Request body for `POST /fx/add`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEffectRequest {
    pub effect_type: String,
    pub fixture_key: String,
    pub property_name: String,
    #[serde(default = "default_beat_division")]
    pub beat_division: f64,
    #[serde(default = "default_blend_mode")]
    pub blend_mode: String,
    #[serde(default = "default_start_on_beat")]
    pub start_on_beat: bool,
    #[serde(default)]
    pub phase_offset: f64,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub distribution_strategy: Option<String>,
    #[serde(default)]
    pub step_timing: Option<bool>,
    #[serde(default)]
    pub element_mode: Option<String>,
}

/// Request body for `POST /groups/{name}/fx`. Groups default to a LINEAR
/// distribution.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGroupFxRequest {
    pub effect_type: String,
    pub property_name: String,
    #[serde(default = "default_beat_division")]
    pub beat_division: f64,
    #[serde(default = "default_blend_mode")]
    pub blend_mode: String,
    #[serde(default = "default_start_on_beat")]
    pub start_on_beat: bool,
    #[serde(default)]
    pub phase_offset: f64,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub distribution_strategy: Option<String>,
    #[serde(default)]
    pub step_timing: Option<bool>,
    #[serde(default)]
    pub element_mode: Option<String>,
}

/// Request body for `PUT /fx/{id}`. Absent fields are left unchanged; effect
/// type and parameters replace the effect as an atomic swap.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEffectRequest {
    #[serde(default)]
    pub effect_type: Option<String>,
    #[serde(default)]
    pub parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub beat_division: Option<f64>,
    #[serde(default)]
    pub blend_mode: Option<String>,
    #[serde(default)]
    pub step_timing: Option<bool>,
    #[serde(default)]
    pub phase_offset: Option<f64>,
    #[serde(default)]
    pub distribution_strategy: Option<String>,
    #[serde(default)]
    pub element_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectIdDto {
    pub effect_id: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedCountDto {
    pub removed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureEffectsDto {
    pub direct: Vec<EffectDto>,
    pub indirect: Vec<EffectDto>,
}

/// Summary row for `GET /groups`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummaryDto {
    pub name: String,
    pub member_count: usize,
    pub sub_group_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberDto {
    pub fixture_key: String,
    pub index: usize,
    pub normalized_position: f64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetailDto {
    pub name: String,
    pub members: Vec<GroupMemberDto>,
    pub sub_groups: Vec<GroupSummaryDto>,
}

/// A property exposed uniformly across a group's leaves, either directly or
/// through every element of every leaf.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPropertyDto {
    pub name: String,
    pub kind: PropertyKind,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategiesDto {
    pub strategies: Vec<&'static str>,
}

/// Transmitter observability row for `GET /universes`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseStatusDto {
    pub subnet: u8,
    pub universe: u8,
    pub destination: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub frames_sent: u64,
}

pub fn group_summary(group: &FixtureGroup) -> GroupSummaryDto {
    GroupSummaryDto {
        name: group.name.clone(),
        member_count: group.all_members().len(),
        sub_group_count: group.sub_groups().len(),
    }
}

pub fn group_detail(group: &FixtureGroup) -> GroupDetailDto {
    GroupDetailDto {
        name: group.name.clone(),
        members: group
            .all_members()
            .into_iter()
            .map(|member| GroupMemberDto {
                fixture_key: member.fixture_key,
                index: member.index,
                normalized_position: member.normalized_position,
                tags: member.meta.tags,
            })
            .collect(),
        sub_groups: group.sub_groups().iter().map(group_summary).collect(),
    }
}

fn property_entries(fixture: &Fixture) -> Vec<(String, PropertyKind)> {
    fixture
        .properties()
        .map(|property| (property.name().to_string(), property.kind()))
        .collect()
}

/// The properties every leaf of the group exposes with an identical kind,
/// plus properties exposed by every element of every leaf.
pub fn group_properties(patch: &Patch, group: &FixtureGroup) -> Vec<GroupPropertyDto> {
    let fixtures: Vec<&Fixture> = group
        .flatten()
        .iter()
        .filter_map(|key| patch.fixture(key).ok())
        .collect();
    if fixtures.is_empty() {
        return Vec::new();
    }

    let mut properties = Vec::new();
    for (name, kind) in property_entries(fixtures[0]) {
        if fixtures
            .iter()
            .all(|fixture| fixture.exposes(&name, kind))
        {
            properties.push(GroupPropertyDto {
                name,
                kind,
                source: "fixture".to_string(),
            });
        }
    }

    // Element-exposed properties, when every leaf is multi-element.
    if fixtures.iter().all(|fixture| fixture.is_multi_element()) {
        let first_elements = fixtures[0].elements();
        if let Some(first_element) = first_elements.first() {
            for property in first_element.properties() {
                let name = property.name().to_string();
                let kind = property.kind();
                if fixtures
                    .iter()
                    .all(|fixture| fixture.elements_expose(&name, kind))
                    && !properties.iter().any(|existing| existing.name == name)
                {
                    properties.push(GroupPropertyDto {
                        name,
                        kind,
                        source: "elements".to_string(),
                    });
                }
            }
        }
    }

    properties
}

/// One channel's current level, universe given as the ArtNet SubUni byte.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLevelDto {
    pub universe: u8,
    pub id: u16,
    pub current_level: u8,
}

/// One property-to-channel binding.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMappingDto {
    pub fixture_key: String,
    pub property: String,
    pub universe: u8,
    pub channel: u16,
}

fn push_property_mappings(
    mappings: &mut Vec<ChannelMappingDto>,
    owner_key: &str,
    property: &Property,
) {
    let mut push = |name: &str, universe: u8, channel: u16| {
        mappings.push(ChannelMappingDto {
            fixture_key: owner_key.to_string(),
            property: name.to_string(),
            universe,
            channel,
        });
    };
    match property {
        Property::Slider(slider) => push(
            &slider.name,
            slider.binding.universe.port_address(),
            slider.binding.channel,
        ),
        Property::Colour(colour) => {
            for slider in [&colour.red, &colour.green, &colour.blue] {
                push(
                    &slider.name,
                    slider.binding.universe.port_address(),
                    slider.binding.channel,
                );
            }
        }
        Property::Position(position) => {
            for slider in [&position.pan, &position.tilt] {
                push(
                    &slider.name,
                    slider.binding.universe.port_address(),
                    slider.binding.channel,
                );
            }
        }
        Property::Setting(setting) => push(
            &setting.name,
            setting.binding.universe.port_address(),
            setting.binding.channel,
        ),
        Property::Strobe(strobe) => push(
            &strobe.name,
            strobe.binding.universe.port_address(),
            strobe.binding.channel,
        ),
    }
}

/// Every property-to-channel binding in the patch, fixtures then elements.
pub fn channel_mappings(patch: &Patch) -> Vec<ChannelMappingDto> {
    let mut mappings = Vec::new();
    for fixture in patch.fixtures() {
        for property in fixture.properties() {
            push_property_mappings(&mut mappings, &fixture.key, property);
        }
        for element in fixture.elements() {
            for property in element.properties() {
                push_property_mappings(&mut mappings, &element.key, property);
            }
        }
    }
    mappings
}
