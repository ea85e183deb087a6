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

use super::universe::UniverseId;

/// Typed errors for the DMX layer so callers can distinguish addressing mistakes
/// from output failures without string matching.
#[derive(Debug, thiserror::Error)]
pub enum DmxError {
    #[error("subnet {0} out of range, must be 0-15")]
    InvalidSubnet(u8),
    #[error("universe {0} out of range, must be 0-15")]
    InvalidUniverse(u8),
    #[error("channel {0} out of range, must be 1-512")]
    InvalidChannel(u16),
    #[error("universe {0} has no transmitter")]
    UnknownUniverse(UniverseId),
    #[error("transmitter for universe {universe} terminated: {message}")]
    TransmitterTerminated { universe: UniverseId, message: String },
    #[error("invalid destination address {address}: {message}")]
    InvalidDestination { address: String, message: String },
}
