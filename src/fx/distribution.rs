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

/// Assigns each group member a phase offset in [0, 1).
///
/// Symmetric strategies (CENTER_OUT, EDGES_IN, SPLIT) produce fewer distinct
/// offsets than members: mirrored positions share a slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistributionStrategy {
    /// Every member shares offset zero.
    Unified,
    /// Offsets march up with the member index.
    Linear,
    /// Linear, from the other end.
    Reverse,
    /// The center leads, the edges trail.
    CenterOut,
    /// The edges lead, the center trails.
    EdgesIn,
    /// Mirrored halves share offsets.
    Split,
    /// Linear offsets swept with a triangle-remapped clock.
    PingPong,
    /// A seeded shuffle of the linear offsets.
    Random { seed: u64 },
    /// The member's normalized position is its offset.
    Positional,
}

/// The symmetric rank of a member: 0 at the center, growing towards the edges.
fn center_rank(index: usize, count: usize) -> usize {
    let center = (count as f64 - 1.0) / 2.0;
    (index as f64 - center).abs().floor() as usize
}

impl DistributionStrategy {
    /// The phase offset for the member at `index` in a group of `count`.
    /// `normalized_position` is only consulted by POSITIONAL.
    pub fn offset_for(&self, index: usize, count: usize, normalized_position: f64) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let slots = self.distinct_slots(count) as f64;
        match self {
            DistributionStrategy::Unified => 0.0,
            DistributionStrategy::Linear | DistributionStrategy::PingPong => {
                index as f64 / count as f64
            }
            DistributionStrategy::Reverse => (count - 1 - index) as f64 / count as f64,
            DistributionStrategy::CenterOut => center_rank(index, count) as f64 / slots,
            DistributionStrategy::EdgesIn => {
                (self.distinct_slots(count) - 1 - center_rank(index, count)) as f64 / slots
            }
            DistributionStrategy::Split => index.min(count - 1 - index) as f64 / slots,
            DistributionStrategy::Random { seed } => {
                let mut order: Vec<usize> = (0..count).collect();
                let mut rng = StdRng::seed_from_u64(*seed);
                // Fisher-Yates over the linear offsets.
                for i in (1..count).rev() {
                    let j = rng.gen_range(0..=i);
                    order.swap(i, j);
                }
                order[index] as f64 / count as f64
            }
            DistributionStrategy::Positional => {
                normalized_position.clamp(0.0, 1.0).min(1.0 - f64::EPSILON)
            }
        }
    }

    /// True when members get distinct offsets.
    pub fn has_spread(&self) -> bool {
        !matches!(self, DistributionStrategy::Unified)
    }

    /// True when the clock is remapped with a triangle wave before
    /// distribution.
    pub fn uses_triangle_phase(&self) -> bool {
        matches!(self, DistributionStrategy::PingPong)
    }

    /// The number of distinct offsets produced for a group of `count`.
    pub fn distinct_slots(&self, count: usize) -> usize {
        if count == 0 {
            return 1;
        }
        match self {
            DistributionStrategy::Unified => 1,
            DistributionStrategy::Linear
            | DistributionStrategy::Reverse
            | DistributionStrategy::PingPong
            | DistributionStrategy::Random { .. }
            | DistributionStrategy::Positional => count,
            DistributionStrategy::CenterOut
            | DistributionStrategy::EdgesIn
            | DistributionStrategy::Split => count.div_ceil(2),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistributionStrategy::Unified => "UNIFIED",
            DistributionStrategy::Linear => "LINEAR",
            DistributionStrategy::Reverse => "REVERSE",
            DistributionStrategy::CenterOut => "CENTER_OUT",
            DistributionStrategy::EdgesIn => "EDGES_IN",
            DistributionStrategy::Split => "SPLIT",
            DistributionStrategy::PingPong => "PING_PONG",
            DistributionStrategy::Random { .. } => "RANDOM",
            DistributionStrategy::Positional => "POSITIONAL",
        }
    }

    /// All strategy names, for the REST surface.
    pub fn names() -> Vec<&'static str> {
        vec![
            "UNIFIED",
            "LINEAR",
            "REVERSE",
            "CENTER_OUT",
            "EDGES_IN",
            "SPLIT",
            "PING_PONG",
            "RANDOM",
            "POSITIONAL",
        ]
    }

    /// Parses a strategy name. RANDOM takes an optional seed suffix, e.g.
    /// `RANDOM:42`.
    pub fn from_name(name: &str) -> Option<DistributionStrategy> {
        let upper = name.to_uppercase();
        if let Some(seed) = upper.strip_prefix("RANDOM:") {
            return seed.parse().ok().map(|seed| DistributionStrategy::Random { seed });
        }
        match upper.as_str() {
            "UNIFIED" => Some(DistributionStrategy::Unified),
            "LINEAR" => Some(DistributionStrategy::Linear),
            "REVERSE" => Some(DistributionStrategy::Reverse),
            "CENTER_OUT" => Some(DistributionStrategy::CenterOut),
            "EDGES_IN" => Some(DistributionStrategy::EdgesIn),
            "SPLIT" => Some(DistributionStrategy::Split),
            "PING_PONG" => Some(DistributionStrategy::PingPong),
            "RANDOM" => Some(DistributionStrategy::Random { seed: 0 }),
            "POSITIONAL" => Some(DistributionStrategy::Positional),
            _ => None,
        }
    }
}
