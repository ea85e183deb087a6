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

use super::common::{channel_value, rig};
use crate::clock::TICKS_PER_BEAT;
use crate::fx::{AddEffect, DistributionStrategy, Effect, FxTarget, SliderEffect};

#[test]
fn test_step_timing_gives_one_beat_per_step() {
    let rig = rig();
    // StaticValue defaults to step timing: a beat division of 1 means one
    // beat per member, so the full chase takes four beats.
    rig.engine
        .add_effect(AddEffect {
            start_on_beat: false,
            distribution: DistributionStrategy::Linear,
            ..AddEffect::new(
                Effect::Slider(SliderEffect::StaticValue { value: 200 }),
                FxTarget::group("dimmers", "dimmer"),
            )
        })
        .unwrap();

    rig.engine.process_tick(0);
    assert_eq!(channel_value(&rig, 1), 200);
    assert_eq!(channel_value(&rig, 2), 0);

    // One beat later the chase has advanced exactly one member.
    rig.engine.process_tick(TICKS_PER_BEAT);
    assert_eq!(channel_value(&rig, 1), 0);
    assert_eq!(channel_value(&rig, 2), 200);

    rig.engine.process_tick(3 * TICKS_PER_BEAT);
    assert_eq!(channel_value(&rig, 4), 200);

    // The cycle wraps after four beats.
    rig.engine.process_tick(4 * TICKS_PER_BEAT);
    assert_eq!(channel_value(&rig, 1), 200);
}

#[test]
fn test_beat_division_stretches_the_cycle() {
    let rig = rig();
    rig.engine
        .add_effect(AddEffect {
            start_on_beat: false,
            beat_division: 2.0,
            ..AddEffect::new(
                Effect::Slider(SliderEffect::SineWave { min: 0, max: 255 }),
                FxTarget::fixture("dim0", "dimmer"),
            )
        })
        .unwrap();

    // With two beats per cycle, the peak lands at half a beat later than the
    // one-beat case: phase 0.25 is tick 12.
    rig.engine.process_tick(12);
    assert_eq!(channel_value(&rig, 1), 255);
    rig.engine.process_tick(36);
    assert_eq!(channel_value(&rig, 1), 0);
}

#[test]
fn test_phase_offset_shifts_both_clock_and_member() {
    let rig = rig();
    rig.engine
        .add_effect(AddEffect {
            start_on_beat: false,
            phase_offset: 0.125,
            ..AddEffect::new(
                Effect::Slider(SliderEffect::SineWave { min: 0, max: 255 }),
                FxTarget::fixture("dim0", "dimmer"),
            )
        })
        .unwrap();

    // The offset shifts the clock before distribution and the member after
    // it, so an eighth of phase offset lands tick zero on the quarter peak.
    rig.engine.process_tick(0);
    assert_eq!(channel_value(&rig, 1), 255);
}

#[test]
fn test_start_on_beat_anchors_to_a_beat_boundary() {
    let rig = rig();
    let id = rig
        .engine
        .add_effect(AddEffect {
            start_on_beat: true,
            step_timing: Some(false),
            ..AddEffect::new(
                Effect::Slider(SliderEffect::StaticValue { value: 200 }),
                FxTarget::fixture("dim0", "dimmer"),
            )
        })
        .unwrap();

    let epoch = rig.engine.effect(id).unwrap().start_epoch_tick;
    assert_eq!(epoch % TICKS_PER_BEAT, 0);

    // Ticks before the epoch are skipped entirely.
    if epoch > 0 {
        rig.engine.process_tick(epoch - 1);
        assert_eq!(channel_value(&rig, 1), 0);
    }
    rig.engine.process_tick(epoch);
    assert_eq!(channel_value(&rig, 1), 200);
}

#[test]
fn test_immediate_start_uses_current_tick() {
    let rig = rig();
    let id = rig
        .engine
        .add_effect(AddEffect {
            start_on_beat: false,
            ..AddEffect::new(
                Effect::Slider(SliderEffect::SineWave { min: 0, max: 255 }),
                FxTarget::fixture("dim0", "dimmer"),
            )
        })
        .unwrap();

    let instance = rig.engine.effect(id).unwrap();
    assert_eq!(instance.start_epoch_tick, rig.clock.current_tick());
}
