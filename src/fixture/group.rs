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

/// Per-member metadata carried through group derivations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberMeta {
    /// Pan correction applied when writing position outputs, in DMX byte space.
    pub pan_offset: i16,
    /// Tilt correction applied when writing position outputs, in DMX byte space.
    pub tilt_offset: i16,
    /// Mirrors pan for fixtures hung facing the opposite way.
    pub symmetric_invert: bool,
    pub tags: Vec<String>,
}

/// One member of a group: a fixture key plus its position in the group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMember {
    pub fixture_key: String,
    /// 0-based position within the flattened group.
    pub index: usize,
    /// `index / (N - 1)` for N > 1, else 0.5.
    pub normalized_position: f64,
    pub meta: MemberMeta,
}

fn normalized_position(index: usize, count: usize) -> f64 {
    if count > 1 {
        index as f64 / (count - 1) as f64
    } else {
        0.5
    }
}

/// A named collection of fixtures with optional sub-groups. Groups compose via
/// `sub_groups` only; a group is never a member of another group.
#[derive(Debug, Clone)]
pub struct FixtureGroup {
    pub name: String,
    members: Vec<GroupMember>,
    sub_groups: Vec<FixtureGroup>,
}

impl FixtureGroup {
    /// Builds a group from fixture keys with default metadata.
    pub fn new(name: impl Into<String>, fixture_keys: Vec<String>) -> FixtureGroup {
        Self::with_members(
            name,
            fixture_keys
                .into_iter()
                .map(|fixture_key| (fixture_key, MemberMeta::default()))
                .collect(),
        )
    }

    /// Builds a group from (fixture key, metadata) pairs, indexing members in
    /// the given order.
    pub fn with_members(
        name: impl Into<String>,
        members: Vec<(String, MemberMeta)>,
    ) -> FixtureGroup {
        let count = members.len();
        FixtureGroup {
            name: name.into(),
            members: members
                .into_iter()
                .enumerate()
                .map(|(index, (fixture_key, meta))| GroupMember {
                    fixture_key,
                    index,
                    normalized_position: normalized_position(index, count),
                    meta,
                })
                .collect(),
            sub_groups: Vec::new(),
        }
    }

    /// Adds a sub-group whose members follow this group's direct members in
    /// the flattened ordering.
    pub fn add_sub_group(&mut self, group: FixtureGroup) {
        self.sub_groups.push(group);
    }

    pub fn sub_groups(&self) -> &[FixtureGroup] {
        &self.sub_groups
    }

    pub fn direct_members(&self) -> &[GroupMember] {
        &self.members
    }

    /// All members: direct members then each sub-group's members recursively,
    /// reindexed with recomputed normalized positions.
    pub fn all_members(&self) -> Vec<GroupMember> {
        let mut members: Vec<GroupMember> = self.members.clone();
        for sub_group in &self.sub_groups {
            members.extend(sub_group.all_members());
        }
        let count = members.len();
        for (index, member) in members.iter_mut().enumerate() {
            member.index = index;
            member.normalized_position = normalized_position(index, count);
        }
        members
    }

    /// All leaf fixture keys in stable order.
    pub fn flatten(&self) -> Vec<String> {
        self.all_members()
            .into_iter()
            .map(|member| member.fixture_key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len() + self.sub_groups.iter().map(|g| g.all_members().len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn derive(&self, suffix: &str, members: Vec<GroupMember>) -> FixtureGroup {
        Self::with_members(
            format!("{}:{}", self.name, suffix),
            members
                .into_iter()
                .map(|member| (member.fixture_key, member.meta))
                .collect(),
        )
    }

    /// Every nth member, starting from the first.
    pub fn every_nth(&self, n: usize) -> FixtureGroup {
        let n = n.max(1);
        let members = self
            .all_members()
            .into_iter()
            .filter(|member| member.index % n == 0)
            .collect();
        self.derive(&format!("every_{}", n), members)
    }

    /// The first half; the middle member of an odd-sized group lands here.
    pub fn left_half(&self) -> FixtureGroup {
        let members = self.all_members();
        let mid = members.len().div_ceil(2);
        self.derive("left", members.into_iter().take(mid).collect())
    }

    /// The second half.
    pub fn right_half(&self) -> FixtureGroup {
        let members = self.all_members();
        let mid = members.len().div_ceil(2);
        self.derive("right", members.into_iter().skip(mid).collect())
    }

    /// Members in reverse order.
    pub fn reversed(&self) -> FixtureGroup {
        let mut members = self.all_members();
        members.reverse();
        self.derive("reversed", members)
    }

    /// Members carrying at least one of the given tags.
    pub fn with_tags(&self, tags: &[&str]) -> FixtureGroup {
        let members = self
            .all_members()
            .into_iter()
            .filter(|member| member.meta.tags.iter().any(|tag| tags.contains(&tag.as_str())))
            .collect();
        self.derive("tagged", members)
    }

    /// Splits the flattened group before the given index.
    pub fn split_at(&self, index: usize) -> (FixtureGroup, FixtureGroup) {
        let members = self.all_members();
        let index = index.min(members.len());
        let (head, tail) = (
            members[..index].to_vec(),
            members[index..].to_vec(),
        );
        (self.derive("head", head), self.derive("tail", tail))
    }

    /// The middle member, or the middle pair for even-sized groups.
    pub fn center(&self) -> FixtureGroup {
        let members = self.all_members();
        let count = members.len();
        let selected: Vec<GroupMember> = match count {
            0 => Vec::new(),
            n if n % 2 == 1 => vec![members[n / 2].clone()],
            n => vec![members[n / 2 - 1].clone(), members[n / 2].clone()],
        };
        self.derive("center", selected)
    }

    /// The first and last members.
    pub fn edges(&self) -> FixtureGroup {
        let members = self.all_members();
        let selected: Vec<GroupMember> = match members.len() {
            0 => Vec::new(),
            1 => vec![members[0].clone()],
            n => vec![members[0].clone(), members[n - 1].clone()],
        };
        self.derive("edges", selected)
    }

    /// Members matching a predicate.
    pub fn filter(&self, predicate: impl Fn(&GroupMember) -> bool) -> FixtureGroup {
        let members = self
            .all_members()
            .into_iter()
            .filter(|member| predicate(member))
            .collect();
        self.derive("filtered", members)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn keys(group: &FixtureGroup) -> Vec<String> {
        group.flatten()
    }

    fn group_of(n: usize) -> FixtureGroup {
        FixtureGroup::new(
            "test",
            (0..n).map(|i| format!("f{}", i)).collect(),
        )
    }

    #[test]
    fn test_normalized_positions() {
        let group = group_of(5);
        let members = group.all_members();
        let positions: Vec<f64> = members.iter().map(|m| m.normalized_position).collect();
        assert_eq!(positions, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let single = group_of(1);
        assert_eq!(single.all_members()[0].normalized_position, 0.5);
    }

    #[test]
    fn test_flatten_recurses_in_order() {
        let mut group = FixtureGroup::new("front", vec!["a".to_string(), "b".to_string()]);
        let mut rear = FixtureGroup::new("rear", vec!["c".to_string()]);
        rear.add_sub_group(FixtureGroup::new("corners", vec!["d".to_string()]));
        group.add_sub_group(rear);

        assert_eq!(keys(&group), vec!["a", "b", "c", "d"]);

        // Flattened members are reindexed across the whole traversal.
        let members = group.all_members();
        assert_eq!(members[3].fixture_key, "d");
        assert_eq!(members[3].index, 3);
        assert_eq!(members[3].normalized_position, 1.0);
    }

    #[test]
    fn test_every_nth() {
        let group = group_of(6);
        assert_eq!(keys(&group.every_nth(2)), vec!["f0", "f2", "f4"]);
        assert_eq!(keys(&group.every_nth(3)), vec!["f0", "f3"]);
    }

    #[test]
    fn test_halves_reindex() {
        let group = group_of(5);
        let left = group.left_half();
        let right = group.right_half();
        assert_eq!(keys(&left), vec!["f0", "f1", "f2"]);
        assert_eq!(keys(&right), vec!["f3", "f4"]);

        // Derived groups get fresh indices and positions.
        let members = right.all_members();
        assert_eq!(members[0].index, 0);
        assert_eq!(members[0].normalized_position, 0.0);
        assert_eq!(members[1].normalized_position, 1.0);
    }

    #[test]
    fn test_reversed() {
        let group = group_of(3);
        assert_eq!(keys(&group.reversed()), vec!["f2", "f1", "f0"]);
    }

    #[test]
    fn test_with_tags() {
        let group = FixtureGroup::with_members(
            "test",
            vec![
                (
                    "a".to_string(),
                    MemberMeta {
                        tags: vec!["front".to_string()],
                        ..MemberMeta::default()
                    },
                ),
                ("b".to_string(), MemberMeta::default()),
                (
                    "c".to_string(),
                    MemberMeta {
                        tags: vec!["front".to_string(), "wash".to_string()],
                        ..MemberMeta::default()
                    },
                ),
            ],
        );
        assert_eq!(keys(&group.with_tags(&["front"])), vec!["a", "c"]);
        assert_eq!(keys(&group.with_tags(&["wash"])), vec!["c"]);
    }

    #[test]
    fn test_split_center_edges() {
        let group = group_of(4);
        let (head, tail) = group.split_at(1);
        assert_eq!(keys(&head), vec!["f0"]);
        assert_eq!(keys(&tail), vec!["f1", "f2", "f3"]);

        assert_eq!(keys(&group.center()), vec!["f1", "f2"]);
        assert_eq!(keys(&group_of(5).center()), vec!["f2"]);
        assert_eq!(keys(&group.edges()), vec!["f0", "f3"]);
    }

    #[test]
    fn test_filter() {
        let group = group_of(4);
        let derived = group.filter(|member| member.index >= 2);
        assert_eq!(keys(&derived), vec!["f2", "f3"]);
    }
}
