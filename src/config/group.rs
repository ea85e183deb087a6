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

use crate::fixture::{FixtureGroup, MemberMeta};

/// One group member.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMemberConfig {
    pub fixture: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Pan correction in DMX byte space.
    #[serde(default)]
    pub pan_offset: i16,
    /// Tilt correction in DMX byte space.
    #[serde(default)]
    pub tilt_offset: i16,
    /// Mirrors pan for fixtures hung facing the opposite way.
    #[serde(default)]
    pub invert: bool,
}

/// A group, with optional nested sub-groups.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub members: Vec<GroupMemberConfig>,
    #[serde(default)]
    pub sub_groups: Vec<GroupConfig>,
}

impl GroupConfig {
    pub fn to_group(&self) -> FixtureGroup {
        let mut group = FixtureGroup::with_members(
            self.name.clone(),
            self.members
                .iter()
                .map(|member| {
                    (
                        member.fixture.clone(),
                        MemberMeta {
                            pan_offset: member.pan_offset,
                            tilt_offset: member.tilt_offset,
                            symmetric_invert: member.invert,
                            tags: member.tags.clone(),
                        },
                    )
                })
                .collect(),
        );
        for sub_group in &self.sub_groups {
            group.add_sub_group(sub_group.to_group());
        }
        group
    }
}
