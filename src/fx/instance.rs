// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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

use super::distribution::DistributionStrategy;
use super::effect::Effect;

/// Per-channel combinator for concurrent effects. Blending operates
/// component-wise on bytes against a per-tick accumulator that is reset to
/// neutral values each tick, so non-OVERRIDE modes cannot ratchet across
/// ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Override,
    Additive,
    Multiply,
    Max,
    Min,
}

impl BlendMode {
    /// Combines an accumulator byte with an effect output byte.
    pub fn blend(&self, accumulator: u8, output: u8) -> u8 {
        match self {
            BlendMode::Override => output,
            BlendMode::Additive => accumulator.saturating_add(output),
            BlendMode::Multiply => {
                ((u32::from(accumulator) * u32::from(output) + 127) / 255) as u8
            }
            BlendMode::Max => accumulator.max(output),
            BlendMode::Min => accumulator.min(output),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Override => "OVERRIDE",
            BlendMode::Additive => "ADDITIVE",
            BlendMode::Multiply => "MULTIPLY",
            BlendMode::Max => "MAX",
            BlendMode::Min => "MIN",
        }
    }

    pub fn from_name(name: &str) -> Option<BlendMode> {
        match name.to_uppercase().as_str() {
            "OVERRIDE" => Some(BlendMode::Override),
            "ADDITIVE" => Some(BlendMode::Additive),
            "MULTIPLY" => Some(BlendMode::Multiply),
            "MAX" => Some(BlendMode::Max),
            "MIN" => Some(BlendMode::Min),
            _ => None,
        }
    }
}

/// How a group of multi-element fixtures is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementMode {
    /// Distribute within each parent; phase is identical across parents.
    PerFixture,
    /// Concatenate all elements and distribute across the whole.
    Flat,
}

impl ElementMode {
    pub fn name(&self) -> &'static str {
        match self {
            ElementMode::PerFixture => "PER_FIXTURE",
            ElementMode::Flat => "FLAT",
        }
    }

    pub fn from_name(name: &str) -> Option<ElementMode> {
        match name.to_uppercase().as_str() {
            "PER_FIXTURE" => Some(ElementMode::PerFixture),
            "FLAT" => Some(ElementMode::Flat),
            _ => None,
        }
    }
}

/// What an effect instance is pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FxTargetRef {
    Fixture(String),
    Group(String),
}

/// A target reference plus the property the effect drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxTarget {
    pub reference: FxTargetRef,
    pub property: String,
}

impl FxTarget {
    pub fn fixture(key: impl Into<String>, property: impl Into<String>) -> FxTarget {
        FxTarget {
            reference: FxTargetRef::Fixture(key.into()),
            property: property.into(),
        }
    }

    pub fn group(name: impl Into<String>, property: impl Into<String>) -> FxTarget {
        FxTarget {
            reference: FxTargetRef::Group(name.into()),
            property: property.into(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.reference, FxTargetRef::Group(_))
    }

    /// The fixture key or group name.
    pub fn key(&self) -> &str {
        match &self.reference {
            FxTargetRef::Fixture(key) => key,
            FxTargetRef::Group(name) => name,
        }
    }
}

/// Timing configuration fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FxTiming {
    /// Beats per effect cycle (or per step, with step timing).
    pub beat_division: f64,
    /// Whether the effect waits for the next beat boundary to start.
    pub start_on_beat: bool,
}

/// A running effect. The effect, target, timing, blend mode, and step timing
/// are immutable; replacing them installs a new instance under the same id.
/// Phase offset, distribution, element mode, and the running flag are tuned in
/// place.
#[derive(Debug, Clone)]
pub struct FxInstance {
    pub id: u64,
    pub effect: Effect,
    pub target: FxTarget,
    pub timing: FxTiming,
    pub blend_mode: BlendMode,
    /// When true, the beat division is per distribution step rather than per
    /// full cycle.
    pub step_timing: bool,
    /// The tick the effect's phase is anchored to.
    pub start_epoch_tick: u64,

    pub phase_offset: f64,
    pub distribution: DistributionStrategy,
    pub element_mode: ElementMode,
    pub running: bool,
    /// The member phase of the last processed member, for observability.
    pub last_phase: f64,
    pub preset_id: Option<String>,
}
