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

mod artnet;
mod controller;
mod error;
mod fade;
mod transaction;
mod transmitter;
mod universe;

pub use artnet::{artdmx_packet, ARTNET_PORT};
pub use controller::Controller;
pub use error::DmxError;
pub use fade::{ChannelChange, FadeEngine, FADE_STEP};
pub use transaction::Transaction;
pub use transmitter::{
    ChangeListener, TransmitterConfig, TransmitterStatus, UniverseTransmitter,
};
pub use universe::{channel_index, DmxFrame, UniverseId, UNIVERSE_SIZE};
