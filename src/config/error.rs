// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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

use crate::dmx::DmxError;
use crate::fixture::{PatchError, PropertyError};

/// Typed error for config load/parse/build failures so callers can
/// distinguish e.g. file-not-found from a bad patch without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("error parsing config: {0}")]
    Parse(#[from] serde_yml::Error),
    #[error("fixture {fixture} references unknown type {type_key}")]
    UnknownFixtureType { fixture: String, type_key: String },
    #[error("fixture {fixture} property {property} lands on channel {channel}, outside 1-512")]
    ChannelOutOfRange {
        fixture: String,
        property: String,
        channel: u32,
    },
    #[error("invalid destination {address}: {message}")]
    InvalidDestination { address: String, message: String },
    #[error(transparent)]
    Dmx(#[from] DmxError),
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error(transparent)]
    Patch(#[from] PatchError),
}
