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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::color::Color;
use super::colour::ColourEffect;
use super::position::PositionEffect;
use super::slider::SliderEffect;

/// The neutral pan/tilt byte.
pub const POSITION_CENTER: u8 = 128;

/// What an effect produces each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputKind {
    Slider,
    Colour,
    Position,
}

/// A single computed effect output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxOutput {
    Slider(u8),
    Colour(Color),
    Position { pan: u8, tilt: u8 },
}

/// Per-member context handed to effect calculation.
#[derive(Debug, Clone, Copy)]
pub struct EffectContext {
    pub group_size: usize,
    pub member_index: usize,
    /// This member's distribution offset in [0, 1).
    pub distribution_offset: f64,
    /// True when the distribution spreads members across distinct offsets.
    pub has_spread: bool,
    /// The number of distinct offsets the distribution produces.
    pub distinct_slots: usize,
    /// True when the distribution remaps the clock with a triangle wave.
    pub triangle_phase: bool,
    /// Stable per-instance salt for deterministic randomness.
    pub salt: u64,
}

impl EffectContext {
    /// A context for a single undistributed target.
    pub fn solo() -> EffectContext {
        EffectContext {
            group_size: 1,
            member_index: 0,
            distribution_offset: 0.0,
            has_spread: false,
            distinct_slots: 1,
            triangle_phase: false,
            salt: 0,
        }
    }

    /// The group-wide phase reconstructed from a member-shifted phase.
    pub fn base_phase(&self, shifted: f64) -> f64 {
        (shifted + self.distribution_offset).rem_euclid(1.0)
    }

    /// Whether a windowed static effect is active at this member phase.
    ///
    /// Static effects light each member for a window of `1 / distinct_slots`
    /// of the cycle. Ping-pong distributions test distance from the member's
    /// offset instead, which avoids floating point edge cases at the sweep
    /// turnarounds.
    pub fn static_active(&self, phase: f64) -> bool {
        if !self.has_spread || self.distinct_slots <= 1 {
            return true;
        }
        let window = 1.0 / self.distinct_slots as f64;
        let base = self.base_phase(phase);
        if self.triangle_phase {
            (base - self.distribution_offset).abs() < window / 2.0
        } else {
            (base - self.distribution_offset).rem_euclid(1.0) < window
        }
    }
}

/// Deterministic pseudo-random unit value for a (salt, bucket) pair. Identical
/// inputs always produce identical outputs, which keeps flicker-style effects
/// reproducible in tests.
pub fn deterministic_unit(salt: u64, bucket: u64) -> f64 {
    let seed = salt ^ bucket.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(seed).gen::<f64>()
}

/// A pure phase -> output function. All variants are total over their
/// parameters; computation cannot fail at tick time.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Slider(SliderEffect),
    Colour(ColourEffect),
    Position(PositionEffect),
}

impl Effect {
    pub fn output_kind(&self) -> OutputKind {
        match self {
            Effect::Slider(_) => OutputKind::Slider,
            Effect::Colour(_) => OutputKind::Colour,
            Effect::Position(_) => OutputKind::Position,
        }
    }

    /// Static effects default to step timing: their beat division denotes the
    /// per-step duration rather than the full cycle.
    pub fn default_step_timing(&self) -> bool {
        matches!(
            self,
            Effect::Slider(SliderEffect::StaticValue { .. })
                | Effect::Colour(ColourEffect::StaticColour { .. })
                | Effect::Position(PositionEffect::StaticPosition { .. })
        )
    }

    /// The wire name of this effect's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Effect::Slider(effect) => effect.type_name(),
            Effect::Colour(effect) => effect.type_name(),
            Effect::Position(effect) => effect.type_name(),
        }
    }

    /// Computes the output for a phase in [0, 1).
    pub fn calculate(&self, phase: f64, ctx: &EffectContext) -> FxOutput {
        let phase = phase.rem_euclid(1.0);
        match self {
            Effect::Slider(effect) => FxOutput::Slider(effect.calculate(phase, ctx)),
            Effect::Colour(effect) => FxOutput::Colour(effect.calculate(phase, ctx)),
            Effect::Position(effect) => {
                let (pan, tilt) = effect.calculate(phase, ctx);
                FxOutput::Position { pan, tilt }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deterministic_unit_is_stable() {
        let a = deterministic_unit(7, 3);
        let b = deterministic_unit(7, 3);
        assert_eq!(a, b);
        assert!((0.0..1.0).contains(&a));
        assert_ne!(deterministic_unit(7, 3), deterministic_unit(7, 4));
        assert_ne!(deterministic_unit(7, 3), deterministic_unit(8, 3));
    }

    #[test]
    fn test_static_window_coverage_linear() {
        // Four members distributed linearly: over one cycle the active windows
        // partition [0, 1) with no overlap and no gap.
        let slots = 4usize;
        let samples = 400;
        for sample in 0..samples {
            let clock = sample as f64 / samples as f64 + 0.5 / samples as f64;
            let mut active = 0;
            for index in 0..slots {
                let offset = index as f64 / slots as f64;
                let ctx = EffectContext {
                    group_size: slots,
                    member_index: index,
                    distribution_offset: offset,
                    has_spread: true,
                    distinct_slots: slots,
                    triangle_phase: false,
                    salt: 0,
                };
                let member_phase = (clock - offset).rem_euclid(1.0);
                if ctx.static_active(member_phase) {
                    active += 1;
                }
            }
            assert_eq!(active, 1, "exactly one member active at clock {}", clock);
        }
    }

    #[test]
    fn test_static_window_unified() {
        let ctx = EffectContext::solo();
        for sample in 0..10 {
            assert!(ctx.static_active(sample as f64 / 10.0));
        }
    }
}
