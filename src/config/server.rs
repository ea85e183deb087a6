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

fn default_bind() -> String {
    "127.0.0.1:8111".to_string()
}

fn default_bpm() -> f64 {
    120.0
}

/// The HTTP/WebSocket server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
        }
    }
}

/// The master clock configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_bpm")]
    pub bpm: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig { bpm: default_bpm() }
    }
}
