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
use crate::fx::{AddEffect, Effect, FxTarget, PositionEffect};

fn circle() -> Effect {
    Effect::Position(PositionEffect::Circle {
        pan_center: 128,
        tilt_center: 128,
        pan_radius: 40,
        tilt_radius: 40,
    })
}

#[test]
fn test_circle_writes_pan_and_tilt() {
    let rig = rig();
    rig.engine
        .add_effect(AddEffect {
            start_on_beat: false,
            ..AddEffect::new(circle(), FxTarget::fixture("mover0", "position"))
        })
        .unwrap();

    // Phase 0: pan at the right extreme, tilt centered.
    rig.engine.process_tick(0);
    assert_eq!(channel_value(&rig, 20), 168);
    assert_eq!(channel_value(&rig, 21), 128);

    // Quarter cycle: pan centered, tilt at the top.
    rig.engine.process_tick(6);
    assert_eq!(channel_value(&rig, 20), 128);
    assert_eq!(channel_value(&rig, 21), 168);
}

#[test]
fn test_member_pan_corrections_applied_at_binding() {
    let rig = rig();
    rig.engine
        .add_effect(AddEffect {
            start_on_beat: false,
            ..AddEffect::new(circle(), FxTarget::group("movers", "position"))
        })
        .unwrap();

    rig.engine.process_tick(0);
    // mover0 carries a +10 pan correction.
    assert_eq!(channel_value(&rig, 20), 178);
    // mover1 is hung inverted: its pan mirrors before corrections.
    assert_eq!(channel_value(&rig, 25), 87);
    // Tilt is unaffected by either correction.
    assert_eq!(channel_value(&rig, 21), 128);
    assert_eq!(channel_value(&rig, 26), 128);
}

#[test]
fn test_static_position_neutral_resets_each_tick() {
    let rig = rig();
    let id = rig
        .engine
        .add_effect(AddEffect {
            start_on_beat: false,
            ..AddEffect::new(
                Effect::Position(PositionEffect::StaticPosition { pan: 30, tilt: 40 }),
                FxTarget::fixture("mover0", "position"),
            )
        })
        .unwrap();

    rig.engine.process_tick(0);
    assert_eq!(channel_value(&rig, 20), 30);
    assert_eq!(channel_value(&rig, 21), 40);

    // After removal another instance owns the channels; the neutral is the
    // position center, not zero.
    rig.engine.remove_effect(id).unwrap();
    rig.engine
        .add_effect(AddEffect {
            start_on_beat: false,
            blend_mode: crate::fx::BlendMode::Max,
            ..AddEffect::new(
                Effect::Position(PositionEffect::StaticPosition { pan: 10, tilt: 10 }),
                FxTarget::fixture("mover0", "position"),
            )
        })
        .unwrap();
    rig.engine.process_tick(1);
    // MAX against the center neutral keeps the center.
    assert_eq!(channel_value(&rig, 20), 128);
    assert_eq!(channel_value(&rig, 21), 128);
}
