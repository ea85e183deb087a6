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

use std::f64::consts::PI;

use super::effect::{deterministic_unit, EffectContext, POSITION_CENTER};
use super::slider::{triangle_wave, Curve};

/// Position jumps per cycle for RandomPosition.
const RANDOM_POSITION_STEPS: f64 = 8.0;

/// Pan/tilt effects for moving heads. Outputs are in DMX byte space; fixture
/// specific degree ranges and hang corrections are applied at the binding,
/// not here.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEffect {
    Circle {
        pan_center: u8,
        tilt_center: u8,
        pan_radius: u8,
        tilt_radius: u8,
    },
    Figure8 {
        pan_center: u8,
        tilt_center: u8,
        pan_radius: u8,
        tilt_radius: u8,
    },
    /// A there-and-back sweep between two positions.
    Sweep {
        pan_start: u8,
        pan_end: u8,
        tilt_start: u8,
        tilt_end: u8,
        curve: Curve,
    },
    PanSweep {
        min: u8,
        max: u8,
        tilt: u8,
    },
    TiltSweep {
        min: u8,
        max: u8,
        pan: u8,
    },
    /// Deterministic jumps around a center position.
    RandomPosition {
        pan_center: u8,
        tilt_center: u8,
        range: u8,
    },
    /// Windowed static position: active for 1/slots of the cycle, else center.
    StaticPosition {
        pan: u8,
        tilt: u8,
    },
}

fn offset_byte(center: u8, offset: f64) -> u8 {
    (f64::from(center) + offset).round().clamp(0.0, 255.0) as u8
}

fn lerp_byte(start: u8, end: u8, t: f64) -> u8 {
    (f64::from(start) + (f64::from(end) - f64::from(start)) * t.clamp(0.0, 1.0)).round() as u8
}

impl PositionEffect {
    pub fn type_name(&self) -> &'static str {
        match self {
            PositionEffect::Circle { .. } => "Circle",
            PositionEffect::Figure8 { .. } => "Figure8",
            PositionEffect::Sweep { .. } => "Sweep",
            PositionEffect::PanSweep { .. } => "PanSweep",
            PositionEffect::TiltSweep { .. } => "TiltSweep",
            PositionEffect::RandomPosition { .. } => "RandomPosition",
            PositionEffect::StaticPosition { .. } => "StaticPosition",
        }
    }

    pub fn calculate(&self, phase: f64, ctx: &EffectContext) -> (u8, u8) {
        let angle = 2.0 * PI * phase;
        match self {
            PositionEffect::Circle {
                pan_center,
                tilt_center,
                pan_radius,
                tilt_radius,
            } => (
                offset_byte(*pan_center, f64::from(*pan_radius) * angle.cos()),
                offset_byte(*tilt_center, f64::from(*tilt_radius) * angle.sin()),
            ),
            PositionEffect::Figure8 {
                pan_center,
                tilt_center,
                pan_radius,
                tilt_radius,
            } => (
                offset_byte(*pan_center, f64::from(*pan_radius) * angle.sin()),
                offset_byte(*tilt_center, f64::from(*tilt_radius) * (2.0 * angle).sin()),
            ),
            PositionEffect::Sweep {
                pan_start,
                pan_end,
                tilt_start,
                tilt_end,
                curve,
            } => {
                let t = curve.apply(triangle_wave(phase));
                (
                    lerp_byte(*pan_start, *pan_end, t),
                    lerp_byte(*tilt_start, *tilt_end, t),
                )
            }
            PositionEffect::PanSweep { min, max, tilt } => {
                (lerp_byte(*min, *max, triangle_wave(phase)), *tilt)
            }
            PositionEffect::TiltSweep { min, max, pan } => {
                (*pan, lerp_byte(*min, *max, triangle_wave(phase)))
            }
            PositionEffect::RandomPosition {
                pan_center,
                tilt_center,
                range,
            } => {
                let bucket = (phase * RANDOM_POSITION_STEPS).floor() as u64;
                let pan_unit = deterministic_unit(ctx.salt, bucket.wrapping_mul(2));
                let tilt_unit = deterministic_unit(ctx.salt, bucket.wrapping_mul(2) + 1);
                (
                    offset_byte(*pan_center, (pan_unit * 2.0 - 1.0) * f64::from(*range)),
                    offset_byte(*tilt_center, (tilt_unit * 2.0 - 1.0) * f64::from(*range)),
                )
            }
            PositionEffect::StaticPosition { pan, tilt } => {
                if ctx.static_active(phase) {
                    (*pan, *tilt)
                } else {
                    (POSITION_CENTER, POSITION_CENTER)
                }
            }
        }
    }
}
