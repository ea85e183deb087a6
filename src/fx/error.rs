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

use crate::fixture::PatchError;

/// Typed errors for the effects engine and library.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    #[error("unknown effect type {0}")]
    UnknownEffectType(String),
    #[error("invalid parameter {name}={value}: {message}")]
    InvalidParameter {
        name: String,
        value: String,
        message: String,
    },
    #[error("invalid beat division {0}, must be a positive number of beats")]
    InvalidBeatDivision(String),
    #[error("unknown blend mode {0}")]
    UnknownBlendMode(String),
    #[error("unknown distribution strategy {0}")]
    UnknownDistribution(String),
    #[error("unknown element mode {0}")]
    UnknownElementMode(String),
    #[error("no effect with id {0}")]
    UnknownInstance(u64),
    #[error("{target} cannot drive a {kind:?} effect on property {property}")]
    IncompatibleTarget {
        target: String,
        property: String,
        kind: crate::fx::OutputKind,
    },
    #[error(transparent)]
    Patch(#[from] PatchError),
}
