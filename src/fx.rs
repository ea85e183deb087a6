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

mod color;
mod colour;
mod distribution;
mod effect;
mod engine;
mod error;
mod instance;
mod library;
mod position;
mod slider;

pub use color::{Color, BLACK};
pub use colour::ColourEffect;
pub use distribution::DistributionStrategy;
pub use effect::{
    deterministic_unit, Effect, EffectContext, FxOutput, OutputKind, POSITION_CENTER,
};
pub use engine::{AddEffect, FxEngine, FxEvent, UpdateEffect};
pub use error::FxError;
pub use instance::{BlendMode, ElementMode, FxInstance, FxTarget, FxTargetRef, FxTiming};
pub use library::{build_effect, catalog, validate_beat_division, EffectTypeInfo, ParamSpec};
pub use position::PositionEffect;
pub use slider::{Curve, SliderEffect};
