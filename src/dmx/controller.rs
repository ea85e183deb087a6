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

use tracing::info;

use crate::cancel::CancelHandle;

use super::error::DmxError;
use super::fade::ChannelChange;
use super::transaction::Transaction;
use super::transmitter::{TransmitterConfig, UniverseTransmitter};
use super::universe::UniverseId;

/// The DMX controller owns one transmitter per configured universe and hands
/// out transactions that stage changes across them.
pub struct Controller {
    transmitters: HashMap<UniverseId, UniverseTransmitter>,
    cancel_handle: CancelHandle,
}

impl Controller {
    /// Creates a controller with one running transmitter per configuration.
    pub fn new(configs: Vec<TransmitterConfig>, cancel_handle: CancelHandle) -> Controller {
        let transmitters = configs
            .into_iter()
            .map(|config| {
                (
                    config.universe,
                    UniverseTransmitter::new(config, cancel_handle.clone()),
                )
            })
            .collect();
        Controller {
            transmitters,
            cancel_handle,
        }
    }

    /// Gets the transmitter for a universe.
    pub fn transmitter(&self, universe: UniverseId) -> Result<&UniverseTransmitter, DmxError> {
        self.transmitters
            .get(&universe)
            .ok_or(DmxError::UnknownUniverse(universe))
    }

    /// All transmitters, in universe order.
    pub fn transmitters(&self) -> Vec<&UniverseTransmitter> {
        let mut transmitters: Vec<&UniverseTransmitter> = self.transmitters.values().collect();
        transmitters.sort_by_key(|transmitter| transmitter.universe());
        transmitters
    }

    /// Begins a transaction against this controller's universes.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Applies a single channel change immediately, outside a transaction.
    pub fn set(
        &self,
        universe: UniverseId,
        channel: u16,
        change: ChannelChange,
    ) -> Result<(), DmxError> {
        self.transmitter(universe)?.set(channel, change)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.cancel_handle.cancel();
        for transmitter in self.transmitters.values() {
            // Unblock the output thread so it observes the cancellation.
            transmitter.wake();
            transmitter.join();
        }
        info!("DMX controller stopped");
    }
}
