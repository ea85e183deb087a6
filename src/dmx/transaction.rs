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

use std::collections::{HashMap, HashSet};

use super::controller::Controller;
use super::error::DmxError;
use super::fade::ChannelChange;
use super::universe::{channel_index, UniverseId};

/// A staged batch of channel changes across universes, applied atomically from
/// the caller's perspective. Reads inside the transaction see staged values
/// before they are committed.
///
/// Transactions are single-writer by construction: staging requires `&mut self`
/// and `apply` consumes the transaction.
pub struct Transaction<'a> {
    controller: &'a Controller,
    staged: HashMap<(UniverseId, u16), ChannelChange>,
}

impl<'a> Transaction<'a> {
    pub(super) fn new(controller: &'a Controller) -> Transaction<'a> {
        Transaction {
            controller,
            staged: HashMap::new(),
        }
    }

    /// Stages a channel change, overwriting any prior staged change for the
    /// same channel.
    pub fn set_value(
        &mut self,
        universe: UniverseId,
        channel: u16,
        change: ChannelChange,
    ) -> Result<(), DmxError> {
        channel_index(channel)?;
        // Validate the universe up front so apply cannot partially fail.
        self.controller.transmitter(universe)?;
        self.staged.insert((universe, channel), change);
        Ok(())
    }

    /// Returns the projected value: the staged target if one exists, otherwise
    /// the transmitter's current materialized byte.
    pub fn get_value(&self, universe: UniverseId, channel: u16) -> Result<u8, DmxError> {
        if let Some(change) = self.staged.get(&(universe, channel)) {
            return Ok(change.target);
        }
        self.controller.transmitter(universe)?.value(channel)
    }

    /// True if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// The number of staged changes.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Commits every staged change into its universe's fade engine, then
    /// signals each affected transmitter exactly once.
    pub fn apply(self) -> Result<(), DmxError> {
        let mut touched: HashSet<UniverseId> = HashSet::new();
        for ((universe, channel), change) in &self.staged {
            self.controller
                .transmitter(*universe)?
                .stage(*channel, *change)?;
            touched.insert(*universe);
        }
        for universe in touched {
            self.controller.transmitter(universe)?.wake();
        }
        Ok(())
    }
}
