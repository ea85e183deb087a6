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

use serde::Deserialize;

use crate::dmx::{UniverseId, UNIVERSE_SIZE};
use crate::fixture::{
    ChannelBinding, ColourProperty, Element, Fixture, PositionProperty, Property, SettingProperty,
    SettingValue, SliderProperty, StrobeProperty,
};

use super::error::ConfigError;

/// One enumerated value of a setting property.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingValueConfig {
    pub name: String,
    pub level: u8,
}

fn default_strobe_open() -> u8 {
    255
}

/// A property descriptor within a fixture type. Channels are 1-based offsets
/// from the fixture's base address.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PropertyConfig {
    Slider {
        name: String,
        channel: u16,
        #[serde(default)]
        min: Option<u8>,
        #[serde(default)]
        max: Option<u8>,
    },
    Colour {
        name: String,
        red: u16,
        green: u16,
        blue: u16,
    },
    Position {
        name: String,
        pan: u16,
        tilt: u16,
    },
    Setting {
        name: String,
        channel: u16,
        values: Vec<SettingValueConfig>,
    },
    Strobe {
        name: String,
        channel: u16,
        #[serde(default = "default_strobe_open")]
        open: u8,
        window_min: u8,
        window_max: u8,
    },
}

impl PropertyConfig {
    pub fn name(&self) -> &str {
        match self {
            PropertyConfig::Slider { name, .. } => name,
            PropertyConfig::Colour { name, .. } => name,
            PropertyConfig::Position { name, .. } => name,
            PropertyConfig::Setting { name, .. } => name,
            PropertyConfig::Strobe { name, .. } => name,
        }
    }

    /// Binds the descriptor at a fixture's base address.
    fn to_property(
        &self,
        fixture_key: &str,
        universe: UniverseId,
        address: u16,
    ) -> Result<Property, ConfigError> {
        let bind = |offset: u16| -> Result<ChannelBinding, ConfigError> {
            let channel = u32::from(address) + u32::from(offset) - 1;
            if channel == 0 || channel > UNIVERSE_SIZE as u32 {
                return Err(ConfigError::ChannelOutOfRange {
                    fixture: fixture_key.to_string(),
                    property: self.name().to_string(),
                    channel,
                });
            }
            Ok(ChannelBinding::new(universe, channel as u16))
        };

        Ok(match self {
            PropertyConfig::Slider {
                name,
                channel,
                min,
                max,
            } => {
                let binding = bind(*channel)?.with_range(min.unwrap_or(0), max.unwrap_or(255));
                Property::Slider(SliderProperty::new(name.clone(), binding))
            }
            PropertyConfig::Colour {
                name,
                red,
                green,
                blue,
            } => Property::Colour(ColourProperty::new(
                name.clone(),
                bind(*red)?,
                bind(*green)?,
                bind(*blue)?,
            )),
            PropertyConfig::Position { name, pan, tilt } => Property::Position(
                PositionProperty::new(name.clone(), bind(*pan)?, bind(*tilt)?),
            ),
            PropertyConfig::Setting {
                name,
                channel,
                values,
            } => Property::Setting(SettingProperty::new(
                name.clone(),
                bind(*channel)?,
                values
                    .iter()
                    .map(|value| SettingValue {
                        name: value.name.clone(),
                        level: value.level,
                    })
                    .collect(),
            )?),
            PropertyConfig::Strobe {
                name,
                channel,
                open,
                window_min,
                window_max,
            } => Property::Strobe(StrobeProperty {
                name: name.clone(),
                binding: bind(*channel)?,
                open_value: *open,
                window_min: *window_min,
                window_max: *window_max,
            }),
        })
    }
}

/// One element of a multi-element fixture type.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementConfig {
    pub suffix: String,
    pub properties: Vec<PropertyConfig>,
}

/// A fixture type: the explicit descriptor table fixtures are patched from.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureTypeConfig {
    #[serde(default)]
    pub properties: Vec<PropertyConfig>,
    #[serde(default)]
    pub elements: Vec<ElementConfig>,
}

/// One patched fixture.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchedFixtureConfig {
    pub key: String,
    /// Human-readable name; defaults to the key.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_key: String,
    pub subnet: u8,
    pub universe: u8,
    /// 1-based DMX base address.
    pub address: u16,
}

impl PatchedFixtureConfig {
    /// Builds the fixture from its type descriptor.
    pub fn to_fixture(&self, fixture_type: &FixtureTypeConfig) -> Result<Fixture, ConfigError> {
        let universe = UniverseId::new(self.subnet, self.universe)?;

        let mut properties = Vec::new();
        for property in &fixture_type.properties {
            properties.push(property.to_property(&self.key, universe, self.address)?);
        }

        let mut elements = Vec::new();
        for (index, element) in fixture_type.elements.iter().enumerate() {
            let mut element_properties = Vec::new();
            for property in &element.properties {
                element_properties.push(property.to_property(&self.key, universe, self.address)?);
            }
            elements.push(Element::new(
                &self.key,
                &element.suffix,
                index,
                element_properties,
            ));
        }

        Ok(Fixture::new(
            self.key.clone(),
            self.name.clone().unwrap_or_else(|| self.key.clone()),
            self.type_key.clone(),
            properties,
            elements,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rgb_type() -> FixtureTypeConfig {
        serde_yml::from_str(
            r#"
properties:
  - name: dimmer
    kind: slider
    channel: 1
  - name: colour
    kind: colour
    red: 2
    green: 3
    blue: 4
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_channel_offsets_from_address() {
        let patched = PatchedFixtureConfig {
            key: "par1".to_string(),
            name: None,
            type_key: "rgb".to_string(),
            subnet: 0,
            universe: 0,
            address: 10,
        };
        let fixture = patched.to_fixture(&rgb_type()).unwrap();
        assert_eq!(fixture.dimmer().unwrap().binding.channel, 10);
        let colour = fixture.colour().unwrap();
        assert_eq!(colour.red.binding.channel, 11);
        assert_eq!(colour.blue.binding.channel, 13);
    }

    #[test]
    fn test_channel_overflow_rejected() {
        let patched = PatchedFixtureConfig {
            key: "par1".to_string(),
            name: None,
            type_key: "rgb".to_string(),
            subnet: 0,
            universe: 0,
            address: 511,
        };
        assert!(matches!(
            patched.to_fixture(&rgb_type()),
            Err(ConfigError::ChannelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_elements_built_in_order() {
        let fixture_type: FixtureTypeConfig = serde_yml::from_str(
            r#"
elements:
  - suffix: "1"
    properties:
      - name: dimmer
        kind: slider
        channel: 1
  - suffix: "2"
    properties:
      - name: dimmer
        kind: slider
        channel: 2
"#,
        )
        .unwrap();
        let patched = PatchedFixtureConfig {
            key: "bar1".to_string(),
            name: None,
            type_key: "bar".to_string(),
            subnet: 0,
            universe: 0,
            address: 100,
        };
        let fixture = patched.to_fixture(&fixture_type).unwrap();
        assert_eq!(fixture.elements().len(), 2);
        assert_eq!(fixture.elements()[0].key, "bar1.1");
        assert_eq!(fixture.elements()[1].index, 1);
    }
}
