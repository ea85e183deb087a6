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

use super::effect::{deterministic_unit, EffectContext};

/// Phase buckets per cycle for flicker-style effects.
pub(super) const FLICKER_GRANULARITY: f64 = 64.0;

/// Shaping curve for ramps and sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    Exponential,
    Logarithmic,
    Sine,
}

impl Curve {
    /// Maps t in [0, 1] through the curve.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Curve::Linear => t,
            Curve::Exponential => t * t,
            Curve::Logarithmic => t.sqrt(),
            Curve::Sine => (1.0 - (PI * t).cos()) / 2.0,
        }
    }

    pub fn from_name(name: &str) -> Option<Curve> {
        match name.to_lowercase().as_str() {
            "linear" => Some(Curve::Linear),
            "exponential" => Some(Curve::Exponential),
            "logarithmic" => Some(Curve::Logarithmic),
            "sine" => Some(Curve::Sine),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Curve::Linear => "linear",
            Curve::Exponential => "exponential",
            Curve::Logarithmic => "logarithmic",
            Curve::Sine => "sine",
        }
    }
}

/// Scales a unit value into the [min, max] byte range.
fn scale(min: u8, max: u8, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    (f64::from(min) + (f64::from(max) - f64::from(min)) * t).round() as u8
}

/// Byte-valued effects, typically targeting dimmer or uv properties.
#[derive(Debug, Clone, PartialEq)]
pub enum SliderEffect {
    SineWave {
        min: u8,
        max: u8,
    },
    RampUp {
        min: u8,
        max: u8,
        curve: Curve,
    },
    RampDown {
        min: u8,
        max: u8,
        curve: Curve,
    },
    Triangle {
        min: u8,
        max: u8,
        curve: Curve,
    },
    /// Linear attack, hold at max, then linear decay over the remainder.
    Pulse {
        min: u8,
        max: u8,
        attack_ratio: f64,
        hold_ratio: f64,
    },
    SquareWave {
        min: u8,
        max: u8,
        duty_cycle: f64,
    },
    Strobe {
        off_value: u8,
        on_value: u8,
        on_ratio: f64,
    },
    Flicker {
        min: u8,
        max: u8,
    },
    Breathe {
        min: u8,
        max: u8,
    },
    /// Windowed static level: active for 1/slots of the cycle, else zero.
    StaticValue {
        value: u8,
    },
}

/// The triangle wave `1 - |2p - 1|`.
pub(super) fn triangle_wave(phase: f64) -> f64 {
    1.0 - (2.0 * phase - 1.0).abs()
}

impl SliderEffect {
    pub fn type_name(&self) -> &'static str {
        match self {
            SliderEffect::SineWave { .. } => "SineWave",
            SliderEffect::RampUp { .. } => "RampUp",
            SliderEffect::RampDown { .. } => "RampDown",
            SliderEffect::Triangle { .. } => "Triangle",
            SliderEffect::Pulse { .. } => "Pulse",
            SliderEffect::SquareWave { .. } => "SquareWave",
            SliderEffect::Strobe { .. } => "Strobe",
            SliderEffect::Flicker { .. } => "Flicker",
            SliderEffect::Breathe { .. } => "Breathe",
            SliderEffect::StaticValue { .. } => "StaticValue",
        }
    }

    pub fn calculate(&self, phase: f64, ctx: &EffectContext) -> u8 {
        match self {
            SliderEffect::SineWave { min, max } => {
                scale(*min, *max, (1.0 + (2.0 * PI * phase).sin()) / 2.0)
            }
            SliderEffect::RampUp { min, max, curve } => scale(*min, *max, curve.apply(phase)),
            SliderEffect::RampDown { min, max, curve } => {
                scale(*min, *max, curve.apply(1.0 - phase))
            }
            SliderEffect::Triangle { min, max, curve } => {
                scale(*min, *max, curve.apply(triangle_wave(phase)))
            }
            SliderEffect::Pulse {
                min,
                max,
                attack_ratio,
                hold_ratio,
            } => {
                let attack = attack_ratio.clamp(0.0, 1.0);
                let hold = hold_ratio.clamp(0.0, 1.0 - attack);
                let decay = 1.0 - attack - hold;
                let t = if phase < attack {
                    phase / attack
                } else if phase < attack + hold {
                    1.0
                } else if decay > 0.0 {
                    1.0 - (phase - attack - hold) / decay
                } else {
                    1.0
                };
                scale(*min, *max, t)
            }
            SliderEffect::SquareWave {
                min,
                max,
                duty_cycle,
            } => {
                if phase < *duty_cycle {
                    *max
                } else {
                    *min
                }
            }
            SliderEffect::Strobe {
                off_value,
                on_value,
                on_ratio,
            } => {
                if phase < *on_ratio {
                    *on_value
                } else {
                    *off_value
                }
            }
            SliderEffect::Flicker { min, max } => {
                let bucket = (phase * FLICKER_GRANULARITY).floor() as u64;
                scale(*min, *max, deterministic_unit(ctx.salt, bucket))
            }
            SliderEffect::Breathe { min, max } => {
                // A breath dwells near the bottom longer than a plain sine.
                let t = (1.0 - (2.0 * PI * phase).cos()) / 2.0;
                scale(*min, *max, t.powf(1.5))
            }
            SliderEffect::StaticValue { value } => {
                if ctx.static_active(phase) {
                    *value
                } else {
                    0
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn solo() -> EffectContext {
        EffectContext::solo()
    }

    #[test]
    fn test_sine_wave() {
        let effect = SliderEffect::SineWave { min: 0, max: 255 };
        assert_eq!(effect.calculate(0.0, &solo()), 128);
        assert_eq!(effect.calculate(0.25, &solo()), 255);
        assert_eq!(effect.calculate(0.75, &solo()), 0);
    }

    #[test]
    fn test_sine_wave_respects_range() {
        let effect = SliderEffect::SineWave { min: 50, max: 100 };
        for sample in 0..100 {
            let value = effect.calculate(sample as f64 / 100.0, &solo());
            assert!((50..=100).contains(&value));
        }
    }

    #[test]
    fn test_ramps() {
        let up = SliderEffect::RampUp {
            min: 0,
            max: 200,
            curve: Curve::Linear,
        };
        assert_eq!(up.calculate(0.0, &solo()), 0);
        assert_eq!(up.calculate(0.5, &solo()), 100);

        let down = SliderEffect::RampDown {
            min: 0,
            max: 200,
            curve: Curve::Linear,
        };
        assert_eq!(down.calculate(0.0, &solo()), 200);
        assert_eq!(down.calculate(0.5, &solo()), 100);
    }

    #[test]
    fn test_triangle() {
        let effect = SliderEffect::Triangle {
            min: 0,
            max: 100,
            curve: Curve::Linear,
        };
        assert_eq!(effect.calculate(0.0, &solo()), 0);
        assert_eq!(effect.calculate(0.5, &solo()), 100);
        assert_eq!(effect.calculate(0.75, &solo()), 50);
    }

    #[test]
    fn test_pulse_attack_hold_decay() {
        let effect = SliderEffect::Pulse {
            min: 0,
            max: 255,
            attack_ratio: 0.25,
            hold_ratio: 0.0,
        };
        assert_eq!(effect.calculate(0.0, &solo()), 0);
        assert_eq!(effect.calculate(0.25, &solo()), 255);
        // Halfway through the decay.
        assert_eq!(effect.calculate(0.625, &solo()), 128);

        let held = SliderEffect::Pulse {
            min: 0,
            max: 255,
            attack_ratio: 0.2,
            hold_ratio: 0.4,
        };
        assert_eq!(held.calculate(0.3, &solo()), 255);
        assert_eq!(held.calculate(0.59, &solo()), 255);
    }

    #[test]
    fn test_square_and_strobe() {
        let square = SliderEffect::SquareWave {
            min: 10,
            max: 250,
            duty_cycle: 0.25,
        };
        assert_eq!(square.calculate(0.1, &solo()), 250);
        assert_eq!(square.calculate(0.25, &solo()), 10);

        let strobe = SliderEffect::Strobe {
            off_value: 0,
            on_value: 255,
            on_ratio: 0.1,
        };
        assert_eq!(strobe.calculate(0.05, &solo()), 255);
        assert_eq!(strobe.calculate(0.5, &solo()), 0);
    }

    #[test]
    fn test_flicker_deterministic() {
        let effect = SliderEffect::Flicker { min: 0, max: 255 };
        let ctx = solo();
        assert_eq!(effect.calculate(0.3, &ctx), effect.calculate(0.3, &ctx));
        // Same bucket, same output.
        assert_eq!(
            effect.calculate(0.301, &ctx),
            effect.calculate(0.302, &ctx)
        );
    }

    #[test]
    fn test_breathe_bounds() {
        let effect = SliderEffect::Breathe { min: 20, max: 220 };
        assert_eq!(effect.calculate(0.0, &solo()), 20);
        assert_eq!(effect.calculate(0.5, &solo()), 220);
        for sample in 0..100 {
            let value = effect.calculate(sample as f64 / 100.0, &solo());
            assert!((20..=220).contains(&value));
        }
    }

    #[test]
    fn test_static_value_windowed() {
        let effect = SliderEffect::StaticValue { value: 200 };
        assert_eq!(effect.calculate(0.9, &solo()), 200);

        let ctx = EffectContext {
            group_size: 4,
            member_index: 0,
            distribution_offset: 0.0,
            has_spread: true,
            distinct_slots: 4,
            triangle_phase: false,
            salt: 0,
        };
        assert_eq!(effect.calculate(0.1, &ctx), 200);
        assert_eq!(effect.calculate(0.25, &ctx), 0);
        assert_eq!(effect.calculate(0.9, &ctx), 0);
    }

    #[test]
    fn test_curves() {
        assert_eq!(Curve::Linear.apply(0.5), 0.5);
        assert_eq!(Curve::Exponential.apply(0.5), 0.25);
        assert!((Curve::Logarithmic.apply(0.25) - 0.5).abs() < 1e-9);
        assert!((Curve::Sine.apply(0.5) - 0.5).abs() < 1e-9);
        assert_eq!(Curve::from_name("exponential"), Some(Curve::Exponential));
        assert_eq!(Curve::from_name("bogus"), None);
    }
}
