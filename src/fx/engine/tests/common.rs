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

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;

use crate::cancel::CancelHandle;
use crate::clock::MasterClock;
use crate::dmx::{Controller, TransmitterConfig, UniverseId};
use crate::fixture::{
    ChannelBinding, ColourProperty, Element, Fixture, FixtureGroup, MemberMeta, Patch,
    PositionProperty, Property, SliderProperty, COLOUR_PROPERTY, DIMMER_PROPERTY,
    POSITION_PROPERTY,
};
use crate::fx::FxEngine;

/// A complete engine rig against one loopback universe. The clock is stopped
/// immediately so tests drive ticks by hand; effects are added with
/// `start_on_beat = false` so their epoch is tick zero.
pub struct Rig {
    pub cancel_handle: CancelHandle,
    pub patch: Arc<Patch>,
    pub controller: Arc<Controller>,
    pub clock: Arc<MasterClock>,
    pub engine: FxEngine,
    // Held so the destination port stays open for the transmitter.
    _receiver: UdpSocket,
}

pub fn universe() -> UniverseId {
    UniverseId::new(0, 0).unwrap()
}

fn dimmer_fixture(key: &str, channel: u16) -> Fixture {
    Fixture::new(
        key,
        key,
        "dimmer",
        vec![Property::Slider(SliderProperty::new(
            DIMMER_PROPERTY,
            ChannelBinding::new(universe(), channel),
        ))],
        vec![],
    )
}

fn rgb_fixture(key: &str, first_channel: u16) -> Fixture {
    Fixture::new(
        key,
        key,
        "rgb",
        vec![Property::Colour(ColourProperty::new(
            COLOUR_PROPERTY,
            ChannelBinding::new(universe(), first_channel),
            ChannelBinding::new(universe(), first_channel + 1),
            ChannelBinding::new(universe(), first_channel + 2),
        ))],
        vec![],
    )
}

fn mover_fixture(key: &str, pan_channel: u16) -> Fixture {
    Fixture::new(
        key,
        key,
        "mover",
        vec![Property::Position(PositionProperty::new(
            POSITION_PROPERTY,
            ChannelBinding::new(universe(), pan_channel),
            ChannelBinding::new(universe(), pan_channel + 1),
        ))],
        vec![],
    )
}

fn bar_fixture(key: &str, first_channel: u16, cells: usize) -> Fixture {
    let elements = (0..cells)
        .map(|index| {
            Element::new(
                key,
                &format!("{}", index + 1),
                index,
                vec![Property::Slider(SliderProperty::new(
                    DIMMER_PROPERTY,
                    ChannelBinding::new(universe(), first_channel + index as u16),
                ))],
            )
        })
        .collect();
    Fixture::new(key, key, "bar", vec![], elements)
}

/// A bar that exposes its own dimmer in addition to per-cell dimmers.
fn bar_with_master(key: &str, master_channel: u16, first_cell: u16) -> Fixture {
    let elements = (0..2)
        .map(|index| {
            Element::new(
                key,
                &format!("{}", index + 1),
                index,
                vec![Property::Slider(SliderProperty::new(
                    DIMMER_PROPERTY,
                    ChannelBinding::new(universe(), first_cell + index as u16),
                ))],
            )
        })
        .collect();
    Fixture::new(
        key,
        key,
        "bar",
        vec![Property::Slider(SliderProperty::new(
            DIMMER_PROPERTY,
            ChannelBinding::new(universe(), master_channel),
        ))],
        elements,
    )
}

pub fn rig() -> Rig {
    let cancel_handle = CancelHandle::new();
    let receiver = UdpSocket::bind(SocketAddr::new(
        std::net::IpAddr::V4(Ipv4Addr::LOCALHOST),
        0,
    ))
    .unwrap();
    let controller = Arc::new(Controller::new(
        vec![TransmitterConfig {
            universe: universe(),
            destination: receiver.local_addr().unwrap(),
            broadcast: false,
            needs_refresh: false,
        }],
        cancel_handle.clone(),
    ));

    let mut patch = Patch::new();
    for (index, key) in ["dim0", "dim1", "dim2", "dim3"].iter().enumerate() {
        patch
            .add_fixture(dimmer_fixture(key, index as u16 + 1))
            .unwrap();
    }
    patch.add_fixture(rgb_fixture("rgb0", 10)).unwrap();
    patch.add_fixture(rgb_fixture("rgb1", 13)).unwrap();
    patch.add_fixture(mover_fixture("mover0", 20)).unwrap();
    patch.add_fixture(mover_fixture("mover1", 25)).unwrap();
    patch.add_fixture(bar_fixture("bar0", 30, 4)).unwrap();
    patch.add_fixture(bar_fixture("bar1", 34, 4)).unwrap();
    patch.add_fixture(bar_with_master("bard", 40, 41)).unwrap();

    patch
        .add_group(FixtureGroup::new(
            "dimmers",
            vec![
                "dim0".to_string(),
                "dim1".to_string(),
                "dim2".to_string(),
                "dim3".to_string(),
            ],
        ))
        .unwrap();
    patch
        .add_group(FixtureGroup::new(
            "rgbs",
            vec!["rgb0".to_string(), "rgb1".to_string()],
        ))
        .unwrap();
    patch
        .add_group(FixtureGroup::new(
            "bars",
            vec!["bar0".to_string(), "bar1".to_string()],
        ))
        .unwrap();
    patch
        .add_group(FixtureGroup::with_members(
            "movers",
            vec![
                (
                    "mover0".to_string(),
                    MemberMeta {
                        pan_offset: 10,
                        ..MemberMeta::default()
                    },
                ),
                (
                    "mover1".to_string(),
                    MemberMeta {
                        symmetric_invert: true,
                        ..MemberMeta::default()
                    },
                ),
            ],
        ))
        .unwrap();
    let patch = Arc::new(patch);

    // Slow BPM so the clock cannot emit a second tick before it is stopped;
    // tests drive processing with explicit tick indices.
    let clock = Arc::new(MasterClock::new(20.0, cancel_handle.clone()).unwrap());
    clock.stop();

    let engine = FxEngine::new(
        patch.clone(),
        controller.clone(),
        clock.clone(),
        cancel_handle.clone(),
    );

    Rig {
        cancel_handle,
        patch,
        controller,
        clock,
        engine,
        _receiver: receiver,
    }
}

/// The committed byte at a 1-based channel of the rig's universe.
pub fn channel_value(rig: &Rig, channel: u16) -> u8 {
    rig.controller
        .transmitter(universe())
        .unwrap()
        .value(channel)
        .unwrap()
}
