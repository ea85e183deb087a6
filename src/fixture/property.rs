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

use std::time::Duration;

use serde::Serialize;

use crate::dmx::{ChannelChange, DmxError, Transaction, UniverseId};
use crate::fx::Color;

/// Typed errors for the property model.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("setting {property} has no value named {name}")]
    UnknownSettingValue { property: String, name: String },
    #[error("setting {property} has duplicate value name {name}")]
    DuplicateSettingValue { property: String, name: String },
    #[error("setting {property} has no values")]
    EmptySetting { property: String },
    #[error(transparent)]
    Dmx(#[from] DmxError),
}

/// Attaches a property to one DMX channel, with a clamp range applied on both
/// the set and fade paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelBinding {
    pub universe: UniverseId,
    pub channel: u16,
    pub min: u8,
    pub max: u8,
}

impl ChannelBinding {
    /// A full-range binding.
    pub fn new(universe: UniverseId, channel: u16) -> ChannelBinding {
        ChannelBinding {
            universe,
            channel,
            min: 0,
            max: 255,
        }
    }

    /// Restricts the binding to a byte range.
    pub fn with_range(mut self, min: u8, max: u8) -> ChannelBinding {
        self.min = min;
        self.max = max;
        self
    }

    pub fn clamp(&self, value: u8) -> u8 {
        value.clamp(self.min, self.max)
    }

    /// The projected byte as seen by the transaction.
    pub fn read(&self, tx: &Transaction) -> Result<u8, DmxError> {
        tx.get_value(self.universe, self.channel)
    }

    /// Stages an immediate set of the clamped value.
    pub fn write(&self, tx: &mut Transaction, value: u8) -> Result<(), DmxError> {
        tx.set_value(
            self.universe,
            self.channel,
            ChannelChange::set(self.clamp(value)),
        )
    }

    /// Stages a fade towards the clamped value.
    pub fn fade(&self, tx: &mut Transaction, value: u8, fade: Duration) -> Result<(), DmxError> {
        tx.set_value(
            self.universe,
            self.channel,
            ChannelChange::fade(self.clamp(value), fade),
        )
    }
}

/// A single-channel byte property.
#[derive(Debug, Clone)]
pub struct SliderProperty {
    pub name: String,
    pub binding: ChannelBinding,
}

impl SliderProperty {
    pub fn new(name: impl Into<String>, binding: ChannelBinding) -> SliderProperty {
        SliderProperty {
            name: name.into(),
            binding,
        }
    }

    pub fn read(&self, tx: &Transaction) -> Result<u8, DmxError> {
        self.binding.read(tx)
    }

    pub fn write(&self, tx: &mut Transaction, value: u8) -> Result<(), DmxError> {
        self.binding.write(tx, value)
    }

    pub fn fade_to(&self, tx: &mut Transaction, value: u8, fade: Duration) -> Result<(), DmxError> {
        self.binding.fade(tx, value, fade)
    }
}

/// An RGB colour property built from three sliders.
#[derive(Debug, Clone)]
pub struct ColourProperty {
    pub name: String,
    pub red: SliderProperty,
    pub green: SliderProperty,
    pub blue: SliderProperty,
}

impl ColourProperty {
    pub fn new(
        name: impl Into<String>,
        red: ChannelBinding,
        green: ChannelBinding,
        blue: ChannelBinding,
    ) -> ColourProperty {
        let name = name.into();
        ColourProperty {
            red: SliderProperty::new(format!("{}.red", name), red),
            green: SliderProperty::new(format!("{}.green", name), green),
            blue: SliderProperty::new(format!("{}.blue", name), blue),
            name,
        }
    }

    pub fn read(&self, tx: &Transaction) -> Result<Color, DmxError> {
        Ok(Color {
            r: self.red.read(tx)?,
            g: self.green.read(tx)?,
            b: self.blue.read(tx)?,
        })
    }

    pub fn write(&self, tx: &mut Transaction, colour: Color) -> Result<(), DmxError> {
        self.red.write(tx, colour.r)?;
        self.green.write(tx, colour.g)?;
        self.blue.write(tx, colour.b)
    }

    pub fn fade_to(
        &self,
        tx: &mut Transaction,
        colour: Color,
        fade: Duration,
    ) -> Result<(), DmxError> {
        self.red.fade_to(tx, colour.r, fade)?;
        self.green.fade_to(tx, colour.g, fade)?;
        self.blue.fade_to(tx, colour.b, fade)
    }
}

/// A pan/tilt pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanTilt {
    pub pan: u8,
    pub tilt: u8,
}

/// A moving-head position property.
#[derive(Debug, Clone)]
pub struct PositionProperty {
    pub name: String,
    pub pan: SliderProperty,
    pub tilt: SliderProperty,
}

impl PositionProperty {
    pub fn new(name: impl Into<String>, pan: ChannelBinding, tilt: ChannelBinding) -> PositionProperty {
        let name = name.into();
        PositionProperty {
            pan: SliderProperty::new(format!("{}.pan", name), pan),
            tilt: SliderProperty::new(format!("{}.tilt", name), tilt),
            name,
        }
    }

    pub fn read(&self, tx: &Transaction) -> Result<PanTilt, DmxError> {
        Ok(PanTilt {
            pan: self.pan.read(tx)?,
            tilt: self.tilt.read(tx)?,
        })
    }

    pub fn write(&self, tx: &mut Transaction, position: PanTilt) -> Result<(), DmxError> {
        self.pan.write(tx, position.pan)?;
        self.tilt.write(tx, position.tilt)
    }

    pub fn fade_to(
        &self,
        tx: &mut Transaction,
        position: PanTilt,
        fade: Duration,
    ) -> Result<(), DmxError> {
        self.pan.fade_to(tx, position.pan, fade)?;
        self.tilt.fade_to(tx, position.tilt, fade)
    }
}

/// One named level of a setting property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingValue {
    pub name: String,
    pub level: u8,
}

/// An enumerated property, e.g. gobo wheels or fixture modes. Values are kept
/// sorted by level.
#[derive(Debug, Clone)]
pub struct SettingProperty {
    pub name: String,
    pub binding: ChannelBinding,
    values: Vec<SettingValue>,
}

impl SettingProperty {
    pub fn new(
        name: impl Into<String>,
        binding: ChannelBinding,
        mut values: Vec<SettingValue>,
    ) -> Result<SettingProperty, PropertyError> {
        let name = name.into();
        if values.is_empty() {
            return Err(PropertyError::EmptySetting { property: name });
        }
        values.sort_by_key(|value| value.level);
        // Names must be unique within a setting.
        let mut names: Vec<&str> = values.iter().map(|value| value.name.as_str()).collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                return Err(PropertyError::DuplicateSettingValue {
                    property: name,
                    name: pair[0].to_string(),
                });
            }
        }
        Ok(SettingProperty {
            name,
            binding,
            values,
        })
    }

    pub fn values(&self) -> &[SettingValue] {
        &self.values
    }

    /// The first value whose level is at or above the given level, or the
    /// lowest value if none is.
    pub fn value_for_level(&self, level: u8) -> &SettingValue {
        self.values
            .iter()
            .find(|value| value.level >= level)
            .unwrap_or(&self.values[0])
    }

    /// Looks up a value by name.
    pub fn value_named(&self, name: &str) -> Result<&SettingValue, PropertyError> {
        self.values
            .iter()
            .find(|value| value.name == name)
            .ok_or_else(|| PropertyError::UnknownSettingValue {
                property: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Writes the level of the named value.
    pub fn set(&self, tx: &mut Transaction, name: &str) -> Result<(), PropertyError> {
        let level = self.value_named(name)?.level;
        self.binding.write(tx, level)?;
        Ok(())
    }

    /// The value corresponding to the projected channel byte.
    pub fn current(&self, tx: &Transaction) -> Result<&SettingValue, DmxError> {
        Ok(self.value_for_level(self.binding.read(tx)?))
    }
}

/// A strobe property with the hardware's usable strobe window.
#[derive(Debug, Clone)]
pub struct StrobeProperty {
    pub name: String,
    pub binding: ChannelBinding,
    /// The channel value that holds the shutter open without strobing.
    pub open_value: u8,
    /// The slowest strobe value of the hardware window.
    pub window_min: u8,
    /// The fastest strobe value of the hardware window.
    pub window_max: u8,
}

impl StrobeProperty {
    /// Opens the shutter fully.
    pub fn full_on(&self, tx: &mut Transaction) -> Result<(), DmxError> {
        self.binding.write(tx, self.open_value)
    }

    /// Maps an intensity in [0, 255] into the hardware's strobe window.
    pub fn strobe(&self, tx: &mut Transaction, intensity: u8) -> Result<(), DmxError> {
        let span = f64::from(self.window_max) - f64::from(self.window_min);
        let value =
            f64::from(self.window_min) + span * f64::from(intensity) / 255.0;
        self.binding.write(tx, value.round() as u8)
    }
}

/// The kind of a property, used by capability checks and the REST surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Slider,
    Colour,
    Position,
    Setting,
    Strobe,
}

/// A trait-typed view over one or more channels of a fixture.
#[derive(Debug, Clone)]
pub enum Property {
    Slider(SliderProperty),
    Colour(ColourProperty),
    Position(PositionProperty),
    Setting(SettingProperty),
    Strobe(StrobeProperty),
}

impl Property {
    pub fn name(&self) -> &str {
        match self {
            Property::Slider(property) => &property.name,
            Property::Colour(property) => &property.name,
            Property::Position(property) => &property.name,
            Property::Setting(property) => &property.name,
            Property::Strobe(property) => &property.name,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            Property::Slider(_) => PropertyKind::Slider,
            Property::Colour(_) => PropertyKind::Colour,
            Property::Position(_) => PropertyKind::Position,
            Property::Setting(_) => PropertyKind::Setting,
            Property::Strobe(_) => PropertyKind::Strobe,
        }
    }
}

#[cfg(test)]
mod test {
    use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

    use crate::cancel::CancelHandle;
    use crate::dmx::{Controller, TransmitterConfig};

    use super::*;

    fn universe() -> UniverseId {
        UniverseId::new(0, 0).unwrap()
    }

    fn controller() -> (Controller, UdpSocket, CancelHandle) {
        let cancel_handle = CancelHandle::new();
        let socket = UdpSocket::bind(SocketAddr::new(
            std::net::IpAddr::V4(Ipv4Addr::LOCALHOST),
            0,
        ))
        .unwrap();
        let controller = Controller::new(
            vec![TransmitterConfig {
                universe: universe(),
                destination: socket.local_addr().unwrap(),
                broadcast: false,
                needs_refresh: false,
            }],
            cancel_handle.clone(),
        );
        (controller, socket, cancel_handle)
    }

    #[test]
    fn test_binding_clamps() {
        let binding = ChannelBinding::new(universe(), 1).with_range(10, 200);
        assert_eq!(binding.clamp(0), 10);
        assert_eq!(binding.clamp(100), 100);
        assert_eq!(binding.clamp(255), 200);
    }

    #[test]
    fn test_setting_sorted_and_round_trip() {
        let setting = SettingProperty::new(
            "gobo",
            ChannelBinding::new(universe(), 7),
            vec![
                SettingValue {
                    name: "stars".to_string(),
                    level: 100,
                },
                SettingValue {
                    name: "open".to_string(),
                    level: 0,
                },
                SettingValue {
                    name: "dots".to_string(),
                    level: 50,
                },
            ],
        )
        .unwrap();

        // Sorted by level.
        let names: Vec<&str> = setting.values().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["open", "dots", "stars"]);

        // Every enumerated value round-trips through its own level.
        for value in setting.values() {
            assert_eq!(setting.value_for_level(value.level), value);
        }
    }

    #[test]
    fn test_setting_value_for_level_picks_next_or_lowest() {
        let setting = SettingProperty::new(
            "gobo",
            ChannelBinding::new(universe(), 7),
            vec![
                SettingValue {
                    name: "open".to_string(),
                    level: 10,
                },
                SettingValue {
                    name: "dots".to_string(),
                    level: 50,
                },
            ],
        )
        .unwrap();

        assert_eq!(setting.value_for_level(10).name, "open");
        assert_eq!(setting.value_for_level(11).name, "dots");
        assert_eq!(setting.value_for_level(50).name, "dots");
        // Beyond the top level falls back to the lowest entry.
        assert_eq!(setting.value_for_level(51).name, "open");
    }

    #[test]
    fn test_setting_rejects_duplicates_and_empty() {
        assert!(matches!(
            SettingProperty::new("s", ChannelBinding::new(universe(), 1), vec![]),
            Err(PropertyError::EmptySetting { .. })
        ));
        assert!(matches!(
            SettingProperty::new(
                "s",
                ChannelBinding::new(universe(), 1),
                vec![
                    SettingValue {
                        name: "open".to_string(),
                        level: 0
                    },
                    SettingValue {
                        name: "open".to_string(),
                        level: 20
                    },
                ],
            ),
            Err(PropertyError::DuplicateSettingValue { .. })
        ));
    }

    #[test]
    fn test_properties_read_projected_values() {
        let (controller, _socket, _cancel) = controller();
        let colour = ColourProperty::new(
            "colour",
            ChannelBinding::new(universe(), 1),
            ChannelBinding::new(universe(), 2),
            ChannelBinding::new(universe(), 3),
        );

        let mut tx = controller.begin();
        colour
            .write(&mut tx, Color { r: 10, g: 20, b: 30 })
            .unwrap();

        // Staged values are visible inside the transaction before apply.
        assert_eq!(colour.read(&tx).unwrap(), Color { r: 10, g: 20, b: 30 });
        // The transmitter still reports the committed state.
        assert_eq!(
            controller.transmitter(universe()).unwrap().value(1).unwrap(),
            0
        );

        tx.apply().unwrap();
        let tx = controller.begin();
        assert_eq!(colour.read(&tx).unwrap(), Color { r: 10, g: 20, b: 30 });
    }

    #[test]
    fn test_clamped_write_through_transaction() {
        let (controller, _socket, _cancel) = controller();
        let slider = SliderProperty::new(
            "dimmer",
            ChannelBinding::new(universe(), 1).with_range(10, 200),
        );

        let mut tx = controller.begin();
        slider.write(&mut tx, 255).unwrap();
        assert_eq!(slider.read(&tx).unwrap(), 200);
        slider.write(&mut tx, 0).unwrap();
        assert_eq!(slider.read(&tx).unwrap(), 10);
    }

    #[test]
    fn test_strobe_maps_into_hardware_window() {
        let (controller, _socket, _cancel) = controller();
        let strobe = StrobeProperty {
            name: "strobe".to_string(),
            binding: ChannelBinding::new(universe(), 1),
            open_value: 255,
            window_min: 16,
            window_max: 216,
        };

        let mut tx = controller.begin();
        strobe.strobe(&mut tx, 0).unwrap();
        assert_eq!(tx.get_value(universe(), 1).unwrap(), 16);
        strobe.strobe(&mut tx, 255).unwrap();
        assert_eq!(tx.get_value(universe(), 1).unwrap(), 216);
        strobe.strobe(&mut tx, 128).unwrap();
        assert_eq!(tx.get_value(universe(), 1).unwrap(), 116);
        strobe.full_on(&mut tx).unwrap();
        assert_eq!(tx.get_value(universe(), 1).unwrap(), 255);
    }

    #[test]
    fn test_setting_set_and_current_through_transaction() {
        let (controller, _socket, _cancel) = controller();
        let setting = SettingProperty::new(
            "gobo",
            ChannelBinding::new(universe(), 4),
            vec![
                SettingValue {
                    name: "open".to_string(),
                    level: 0,
                },
                SettingValue {
                    name: "stars".to_string(),
                    level: 80,
                },
            ],
        )
        .unwrap();

        let mut tx = controller.begin();
        setting.set(&mut tx, "stars").unwrap();
        assert_eq!(setting.current(&tx).unwrap().name, "stars");
        assert!(setting.set(&mut tx, "missing").is_err());
    }

    #[test]
    fn test_unknown_setting_name() {
        let setting = SettingProperty::new(
            "gobo",
            ChannelBinding::new(universe(), 7),
            vec![SettingValue {
                name: "open".to_string(),
                level: 0,
            }],
        )
        .unwrap();
        assert!(matches!(
            setting.value_named("missing"),
            Err(PropertyError::UnknownSettingValue { .. })
        ));
    }
}
