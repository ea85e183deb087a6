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
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::dmx::TransmitterConfig;
use crate::fixture::Patch;

mod dmx;
mod error;
mod fixture;
mod group;
mod server;

pub use error::ConfigError;
pub use fixture::{
    ElementConfig, FixtureTypeConfig, PatchedFixtureConfig, PropertyConfig, SettingValueConfig,
};
pub use group::{GroupConfig, GroupMemberConfig};
pub use server::{ClockConfig, ServerConfig};
pub use self::dmx::UniverseConfig;

/// The complete configuration: universes, fixture types, the patch, groups,
/// clock, and server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub universes: Vec<UniverseConfig>,
    #[serde(default)]
    pub fixture_types: HashMap<String, FixtureTypeConfig>,
    #[serde(default)]
    pub fixtures: Vec<PatchedFixtureConfig>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl Config {
    /// Loads and parses a YAML config file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        Ok(serde_yml::from_str(&fs::read_to_string(path)?)?)
    }

    /// Parses a YAML config from a string.
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        Ok(serde_yml::from_str(content)?)
    }

    /// Builds the transmitter configurations, validating addressing.
    pub fn transmitter_configs(&self) -> Result<Vec<TransmitterConfig>, ConfigError> {
        self.universes
            .iter()
            .map(|universe| universe.to_transmitter_config())
            .collect()
    }

    /// Builds the patch: every fixture from its type descriptor, then every
    /// group with membership validation.
    pub fn build_patch(&self) -> Result<Patch, ConfigError> {
        let mut patch = Patch::new();
        for patched in &self.fixtures {
            let fixture_type = self.fixture_types.get(&patched.type_key).ok_or_else(|| {
                ConfigError::UnknownFixtureType {
                    fixture: patched.key.clone(),
                    type_key: patched.type_key.clone(),
                }
            })?;
            patch.add_fixture(patched.to_fixture(fixture_type)?)?;
        }
        for group in &self.groups {
            patch.add_group(group.to_group())?;
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    const EXAMPLE: &str = r#"
clock:
  bpm: 128.0
server:
  bind: "127.0.0.1:9000"
universes:
  - subnet: 0
    universe: 0
    destination: "255.255.255.255:6454"
fixture_types:
  rgb_par:
    properties:
      - name: dimmer
        kind: slider
        channel: 1
      - name: colour
        kind: colour
        red: 2
        green: 3
        blue: 4
fixtures:
  - key: par1
    type: rgb_par
    subnet: 0
    universe: 0
    address: 1
  - key: par2
    type: rgb_par
    subnet: 0
    universe: 0
    address: 5
groups:
  - name: pars
    members:
      - fixture: par1
      - fixture: par2
"#;

    #[test]
    fn test_parse_and_build() {
        let config = Config::parse(EXAMPLE).unwrap();
        assert_eq!(config.clock.bpm, 128.0);
        assert_eq!(config.server.bind, "127.0.0.1:9000");

        let transmitters = config.transmitter_configs().unwrap();
        assert_eq!(transmitters.len(), 1);

        let patch = config.build_patch().unwrap();
        assert_eq!(patch.fixtures().len(), 2);
        assert_eq!(patch.group("pars").unwrap().flatten().len(), 2);
        assert_eq!(
            patch.fixture("par2").unwrap().dimmer().unwrap().binding.channel,
            5
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse(
            r#"
universes:
  - subnet: 0
    universe: 0
    destination: "127.0.0.1:6454"
"#,
        )
        .unwrap();
        assert_eq!(config.clock.bpm, 120.0);
        assert_eq!(config.server.bind, "127.0.0.1:8111");
        assert!(config.fixtures.is_empty());
    }

    #[test]
    fn test_unknown_fixture_type_rejected() {
        let config = Config::parse(
            r#"
universes:
  - subnet: 0
    universe: 0
    destination: "127.0.0.1:6454"
fixtures:
  - key: par1
    type: missing
    subnet: 0
    universe: 0
    address: 1
"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_patch(),
            Err(ConfigError::UnknownFixtureType { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.fixtures.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Config::load(Path::new("/definitely/not/here.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
