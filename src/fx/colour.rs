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

use super::color::{Color, BLACK};
use super::effect::{deterministic_unit, EffectContext};
use super::slider::{triangle_wave, FLICKER_GRANULARITY};

/// Colour-valued effects targeting RGB properties.
#[derive(Debug, Clone, PartialEq)]
pub enum ColourEffect {
    /// Steps through a palette, crossfading over the tail of each segment.
    ColourCycle {
        palette: Vec<Color>,
        fade_ratio: f64,
    },
    /// Maps phase to HSV hue around the full wheel.
    RainbowCycle {
        saturation: f64,
        brightness: f64,
    },
    ColourStrobe {
        on: Color,
        off: Color,
        on_ratio: f64,
    },
    /// Triangle blend from a to b and back.
    ColourPulse {
        a: Color,
        b: Color,
    },
    ColourFade {
        from: Color,
        to: Color,
        ping_pong: bool,
    },
    ColourFlicker {
        base: Color,
        variation: f64,
    },
    /// Windowed static colour: active for 1/slots of the cycle, else black.
    StaticColour {
        colour: Color,
    },
}

impl ColourEffect {
    pub fn type_name(&self) -> &'static str {
        match self {
            ColourEffect::ColourCycle { .. } => "ColourCycle",
            ColourEffect::RainbowCycle { .. } => "RainbowCycle",
            ColourEffect::ColourStrobe { .. } => "ColourStrobe",
            ColourEffect::ColourPulse { .. } => "ColourPulse",
            ColourEffect::ColourFade { .. } => "ColourFade",
            ColourEffect::ColourFlicker { .. } => "ColourFlicker",
            ColourEffect::StaticColour { .. } => "StaticColour",
        }
    }

    pub fn calculate(&self, phase: f64, ctx: &EffectContext) -> Color {
        match self {
            ColourEffect::ColourCycle { palette, fade_ratio } => {
                if palette.is_empty() {
                    return BLACK;
                }
                let count = palette.len();
                let scaled = phase * count as f64;
                let index = (scaled.floor() as usize).min(count - 1);
                let local = scaled - index as f64;
                let fade = fade_ratio.clamp(0.0, 1.0);
                if fade > 0.0 && local > 1.0 - fade {
                    let t = (local - (1.0 - fade)) / fade;
                    palette[index].lerp(&palette[(index + 1) % count], t)
                } else {
                    palette[index]
                }
            }
            ColourEffect::RainbowCycle {
                saturation,
                brightness,
            } => Color::from_hsv(
                (phase * 360.0).rem_euclid(360.0),
                saturation.clamp(0.0, 1.0),
                brightness.clamp(0.0, 1.0),
            ),
            ColourEffect::ColourStrobe { on, off, on_ratio } => {
                if phase < *on_ratio {
                    *on
                } else {
                    *off
                }
            }
            ColourEffect::ColourPulse { a, b } => a.lerp(b, triangle_wave(phase)),
            ColourEffect::ColourFade {
                from,
                to,
                ping_pong,
            } => {
                let t = if *ping_pong {
                    triangle_wave(phase)
                } else {
                    phase
                };
                from.lerp(to, t)
            }
            ColourEffect::ColourFlicker { base, variation } => {
                let bucket = (phase * FLICKER_GRANULARITY).floor() as u64;
                let variation = variation.clamp(0.0, 1.0);
                base.scaled(1.0 - variation * deterministic_unit(ctx.salt, bucket))
            }
            ColourEffect::StaticColour { colour } => {
                if ctx.static_active(phase) {
                    *colour
                } else {
                    BLACK
                }
            }
        }
    }
}
