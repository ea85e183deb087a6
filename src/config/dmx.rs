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

use std::net::SocketAddr;

use serde::Deserialize;

use crate::dmx::{TransmitterConfig, UniverseId};

use super::error::ConfigError;

fn default_broadcast() -> bool {
    true
}

/// One output universe.
#[derive(Debug, Clone, Deserialize)]
pub struct UniverseConfig {
    pub subnet: u8,
    pub universe: u8,
    /// The UDP destination, `host:port`.
    pub destination: String,
    /// Whether to open the socket with broadcast permission.
    #[serde(default = "default_broadcast")]
    pub broadcast: bool,
    /// Force a full frame every second for hardware that forgets.
    #[serde(default)]
    pub needs_refresh: bool,
}

impl UniverseConfig {
    pub fn universe_id(&self) -> Result<UniverseId, ConfigError> {
        Ok(UniverseId::new(self.subnet, self.universe)?)
    }

    /// Converts to a transmitter configuration, validating the destination.
    pub fn to_transmitter_config(&self) -> Result<TransmitterConfig, ConfigError> {
        let destination: SocketAddr =
            self.destination
                .parse()
                .map_err(|err: std::net::AddrParseError| ConfigError::InvalidDestination {
                    address: self.destination.clone(),
                    message: err.to_string(),
                })?;
        Ok(TransmitterConfig {
            universe: self.universe_id()?,
            destination,
            broadcast: self.broadcast,
            needs_refresh: self.needs_refresh,
        })
    }
}
