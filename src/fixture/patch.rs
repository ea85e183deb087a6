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

use std::collections::HashMap;

use super::group::FixtureGroup;
use super::model::Fixture;

/// Typed errors for patch registration and lookup.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("unknown fixture {0}")]
    UnknownFixture(String),
    #[error("unknown group {0}")]
    UnknownGroup(String),
    #[error("{target} has no property named {property}")]
    UnknownProperty { target: String, property: String },
    #[error("fixture {0} is already patched")]
    DuplicateFixture(String),
    #[error("group {0} already exists")]
    DuplicateGroup(String),
    #[error("group {group} references unknown fixture {fixture}")]
    UnknownGroupMember { group: String, fixture: String },
}

/// The registry of patched fixtures and configured groups. Built once at
/// construction from explicit descriptors; lookups are by key/name.
#[derive(Debug, Default)]
pub struct Patch {
    fixtures: HashMap<String, Fixture>,
    groups: HashMap<String, FixtureGroup>,
}

impl Patch {
    pub fn new() -> Patch {
        Patch::default()
    }

    /// Registers a fixture. Keys must be unique.
    pub fn add_fixture(&mut self, fixture: Fixture) -> Result<(), PatchError> {
        if self.fixtures.contains_key(&fixture.key) {
            return Err(PatchError::DuplicateFixture(fixture.key));
        }
        self.fixtures.insert(fixture.key.clone(), fixture);
        Ok(())
    }

    /// Registers a group after checking every member (including sub-group
    /// members) refers to a patched fixture.
    pub fn add_group(&mut self, group: FixtureGroup) -> Result<(), PatchError> {
        if self.groups.contains_key(&group.name) {
            return Err(PatchError::DuplicateGroup(group.name));
        }
        for member in group.all_members() {
            if !self.fixtures.contains_key(&member.fixture_key) {
                return Err(PatchError::UnknownGroupMember {
                    group: group.name,
                    fixture: member.fixture_key,
                });
            }
        }
        self.groups.insert(group.name.clone(), group);
        Ok(())
    }

    pub fn fixture(&self, key: &str) -> Result<&Fixture, PatchError> {
        self.fixtures
            .get(key)
            .ok_or_else(|| PatchError::UnknownFixture(key.to_string()))
    }

    pub fn group(&self, name: &str) -> Result<&FixtureGroup, PatchError> {
        self.groups
            .get(name)
            .ok_or_else(|| PatchError::UnknownGroup(name.to_string()))
    }

    pub fn has_fixture(&self, key: &str) -> bool {
        self.fixtures.contains_key(key)
    }

    /// All fixtures sorted by key.
    pub fn fixtures(&self) -> Vec<&Fixture> {
        let mut fixtures: Vec<&Fixture> = self.fixtures.values().collect();
        fixtures.sort_by(|a, b| a.key.cmp(&b.key));
        fixtures
    }

    /// All groups sorted by name.
    pub fn groups(&self) -> Vec<&FixtureGroup> {
        let mut groups: Vec<&FixtureGroup> = self.groups.values().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        groups
    }
}

#[cfg(test)]
mod test {
    use crate::dmx::UniverseId;
    use crate::fixture::model::DIMMER_PROPERTY;
    use crate::fixture::property::{ChannelBinding, Property, SliderProperty};

    use super::*;

    fn fixture(key: &str) -> Fixture {
        Fixture::new(
            key,
            key,
            "dimmer",
            vec![Property::Slider(SliderProperty::new(
                DIMMER_PROPERTY,
                ChannelBinding::new(UniverseId::new(0, 0).unwrap(), 1),
            ))],
            vec![],
        )
    }

    #[test]
    fn test_duplicate_fixture_rejected() {
        let mut patch = Patch::new();
        patch.add_fixture(fixture("a")).unwrap();
        assert!(matches!(
            patch.add_fixture(fixture("a")),
            Err(PatchError::DuplicateFixture(_))
        ));
    }

    #[test]
    fn test_group_members_validated() {
        let mut patch = Patch::new();
        patch.add_fixture(fixture("a")).unwrap();

        assert!(patch
            .add_group(FixtureGroup::new("good", vec!["a".to_string()]))
            .is_ok());
        assert!(matches!(
            patch.add_group(FixtureGroup::new("bad", vec!["missing".to_string()])),
            Err(PatchError::UnknownGroupMember { .. })
        ));
    }

    #[test]
    fn test_lookups() {
        let mut patch = Patch::new();
        patch.add_fixture(fixture("a")).unwrap();
        assert!(patch.fixture("a").is_ok());
        assert!(matches!(
            patch.fixture("b"),
            Err(PatchError::UnknownFixture(_))
        ));
        assert!(matches!(
            patch.group("none"),
            Err(PatchError::UnknownGroup(_))
        ));
    }
}
