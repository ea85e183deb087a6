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

use std::collections::BTreeMap;

use super::property::{
    ColourProperty, PositionProperty, Property, PropertyKind, SettingProperty, SliderProperty,
    StrobeProperty,
};

/// The conventional property names the capability checks look for.
pub const DIMMER_PROPERTY: &str = "dimmer";
pub const COLOUR_PROPERTY: &str = "colour";
pub const POSITION_PROPERTY: &str = "position";
pub const UV_PROPERTY: &str = "uv";
pub const STROBE_PROPERTY: &str = "strobe";

/// Bitwise flags for fixture capabilities
/// This allows for fast bitwise operations instead of repeated name lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(u32);

impl Capabilities {
    /// No capabilities
    pub const NONE: Capabilities = Capabilities(0);

    /// Dimming capability
    pub const DIMMER: Capabilities = Capabilities(1 << 0);
    /// RGB colour mixing capability
    pub const COLOUR: Capabilities = Capabilities(1 << 1);
    /// Pan/tilt capability
    pub const POSITION: Capabilities = Capabilities(1 << 2);
    /// UV output capability
    pub const UV: Capabilities = Capabilities(1 << 3);
    /// Strobing capability
    pub const STROBE: Capabilities = Capabilities(1 << 4);

    /// Check if this set contains a specific capability
    #[inline]
    pub fn contains(&self, capability: Capabilities) -> bool {
        (self.0 & capability.0) != 0
    }

    /// Add a capability to this set
    #[inline]
    pub fn with(&self, capability: Capabilities) -> Capabilities {
        Capabilities(self.0 | capability.0)
    }
}

/// A named handle over a set of properties. A fixture has a capability iff it
/// exposes the corresponding property name.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Stable key used for targeting.
    pub key: String,
    /// Human readable name.
    pub display_name: String,
    /// The fixture type this was patched from.
    pub type_key: String,
    properties: BTreeMap<String, Property>,
    elements: Vec<Element>,
}

/// One element of a multi-element fixture, e.g. a single cell of a pixel bar.
/// Elements expose properties the same way fixtures do.
#[derive(Debug, Clone)]
pub struct Element {
    /// `{parent_key}.{suffix}`.
    pub key: String,
    /// The parent fixture key.
    pub parent_key: String,
    /// 0-based position within the parent.
    pub index: usize,
    properties: BTreeMap<String, Property>,
}

impl Element {
    pub fn new(
        parent_key: &str,
        suffix: &str,
        index: usize,
        properties: Vec<Property>,
    ) -> Element {
        Element {
            key: format!("{}.{}", parent_key, suffix),
            parent_key: parent_key.to_string(),
            index,
            properties: properties
                .into_iter()
                .map(|property| (property.name().to_string(), property))
                .collect(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }
}

impl Fixture {
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        type_key: impl Into<String>,
        properties: Vec<Property>,
        elements: Vec<Element>,
    ) -> Fixture {
        Fixture {
            key: key.into(),
            display_name: display_name.into(),
            type_key: type_key.into(),
            properties: properties
                .into_iter()
                .map(|property| (property.name().to_string(), property))
                .collect(),
            elements,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn is_multi_element(&self) -> bool {
        !self.elements.is_empty()
    }

    /// Derive fixture capabilities from exposed property names.
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::NONE;
        if self.dimmer().is_some() {
            capabilities = capabilities.with(Capabilities::DIMMER);
        }
        if self.colour().is_some() {
            capabilities = capabilities.with(Capabilities::COLOUR);
        }
        if self.position().is_some() {
            capabilities = capabilities.with(Capabilities::POSITION);
        }
        if self.uv().is_some() {
            capabilities = capabilities.with(Capabilities::UV);
        }
        if self.strobe().is_some() {
            capabilities = capabilities.with(Capabilities::STROBE);
        }
        capabilities
    }

    pub fn dimmer(&self) -> Option<&SliderProperty> {
        match self.properties.get(DIMMER_PROPERTY) {
            Some(Property::Slider(property)) => Some(property),
            _ => None,
        }
    }

    pub fn colour(&self) -> Option<&ColourProperty> {
        match self.properties.get(COLOUR_PROPERTY) {
            Some(Property::Colour(property)) => Some(property),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<&PositionProperty> {
        match self.properties.get(POSITION_PROPERTY) {
            Some(Property::Position(property)) => Some(property),
            _ => None,
        }
    }

    pub fn uv(&self) -> Option<&SliderProperty> {
        match self.properties.get(UV_PROPERTY) {
            Some(Property::Slider(property)) => Some(property),
            _ => None,
        }
    }

    pub fn strobe(&self) -> Option<&StrobeProperty> {
        match self.properties.get(STROBE_PROPERTY) {
            Some(Property::Strobe(property)) => Some(property),
            _ => None,
        }
    }

    pub fn setting(&self, name: &str) -> Option<&SettingProperty> {
        match self.properties.get(name) {
            Some(Property::Setting(property)) => Some(property),
            _ => None,
        }
    }

    /// True if the fixture itself exposes the named property with the given kind.
    pub fn exposes(&self, name: &str, kind: PropertyKind) -> bool {
        self.properties
            .get(name)
            .map(|property| property.kind() == kind)
            .unwrap_or(false)
    }

    /// True if every element exposes the named property with the given kind.
    /// False for fixtures without elements.
    pub fn elements_expose(&self, name: &str, kind: PropertyKind) -> bool {
        !self.elements.is_empty()
            && self.elements.iter().all(|element| {
                element
                    .property(name)
                    .map(|property| property.kind() == kind)
                    .unwrap_or(false)
            })
    }
}

#[cfg(test)]
mod test {
    use crate::dmx::UniverseId;
    use crate::fixture::property::ChannelBinding;

    use super::*;

    fn universe() -> UniverseId {
        UniverseId::new(0, 0).unwrap()
    }

    fn dimmer_fixture() -> Fixture {
        Fixture::new(
            "wash1",
            "Wash 1",
            "wash",
            vec![Property::Slider(SliderProperty::new(
                DIMMER_PROPERTY,
                ChannelBinding::new(universe(), 1),
            ))],
            vec![],
        )
    }

    #[test]
    fn test_capabilities_from_properties() {
        let fixture = dimmer_fixture();
        let capabilities = fixture.capabilities();
        assert!(capabilities.contains(Capabilities::DIMMER));
        assert!(!capabilities.contains(Capabilities::COLOUR));
        assert!(!capabilities.contains(Capabilities::POSITION));
    }

    #[test]
    fn test_element_keys() {
        let element = Element::new(
            "bar1",
            "cell2",
            1,
            vec![Property::Slider(SliderProperty::new(
                DIMMER_PROPERTY,
                ChannelBinding::new(universe(), 4),
            ))],
        );
        assert_eq!(element.key, "bar1.cell2");
        assert_eq!(element.parent_key, "bar1");
        assert_eq!(element.index, 1);
    }

    #[test]
    fn test_elements_expose() {
        let elements = vec![
            Element::new(
                "bar1",
                "1",
                0,
                vec![Property::Slider(SliderProperty::new(
                    DIMMER_PROPERTY,
                    ChannelBinding::new(universe(), 1),
                ))],
            ),
            Element::new(
                "bar1",
                "2",
                1,
                vec![Property::Slider(SliderProperty::new(
                    DIMMER_PROPERTY,
                    ChannelBinding::new(universe(), 2),
                ))],
            ),
        ];
        let fixture = Fixture::new("bar1", "Bar 1", "bar", vec![], elements);
        assert!(fixture.elements_expose(DIMMER_PROPERTY, PropertyKind::Slider));
        assert!(!fixture.elements_expose(COLOUR_PROPERTY, PropertyKind::Colour));
        assert!(!dimmer_fixture().elements_expose(DIMMER_PROPERTY, PropertyKind::Slider));
    }
}
