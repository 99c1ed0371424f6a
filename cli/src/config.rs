// Freezer: stake locking and yield calculation for Cardano
//
// SPDX-License-Identifier: Apache-2.0
//
// Designed in 2023-2025 by Freezer Contributors <dev@freezer.finance>
// Written in 2023-2025 by Freezer Contributors <dev@freezer.finance>
//
// Copyright (C) 2023-2025 Freezer Contributors.
// All rights under the above copyrights are reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use frztx::Network;
use serde_crate::Deserialize;

pub const CONFIG_FILE: &str = "freezer.toml";

const AWAIT_INTERVAL_SECS: u64 = 5;
const AWAIT_TIMEOUT_SECS: u64 = 600;

/// Defaults read from `freezer.toml` in the data directory. Command-line flags and environment
/// variables take precedence.
#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    pub network: Option<Network>,
    pub blockfrost: Option<String>,
    pub blueprint: Option<PathBuf>,
    /// Seconds between checks whether a submitted transaction is seen.
    pub await_interval: Option<u64>,
    /// Seconds to wait for a submitted transaction before giving up.
    pub await_timeout: Option<u64>,
}

impl Config {
    pub fn load(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            debug!("No configuration file at '{}', using defaults", path.display());
            return Ok(default!());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("unable to read configuration file '{}'", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("invalid configuration file '{}'", path.display()))?;
        debug!("Loaded configuration from '{}'", path.display());
        Ok(config)
    }

    pub fn await_interval(&self) -> Duration {
        Duration::from_secs(self.await_interval.unwrap_or(AWAIT_INTERVAL_SECS))
    }

    pub fn await_timeout(&self) -> Duration {
        Duration::from_secs(self.await_timeout.unwrap_or(AWAIT_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn parse() {
        let config: Config = toml::from_str(
            r#"
            network = "preprod"
            blockfrost = "preprodXYZ"
            blueprint = "/opt/freezer/plutus.json"
            await-interval = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.network, Some(Network::Preprod));
        assert_eq!(config.blockfrost.as_deref(), Some("preprodXYZ"));
        assert_eq!(config.await_interval(), Duration::from_secs(2));
        assert_eq!(config.await_timeout(), Duration::from_secs(AWAIT_TIMEOUT_SECS));

        assert!(toml::from_str::<Config>("network = \"testnet\"").is_err());
        assert!(toml::from_str::<Config>("netwrok = \"preview\"").is_err());
    }

    #[test]
    fn load() {
        let dir = env::temp_dir().join(format!("freezer-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        assert_eq!(Config::load(&dir).unwrap(), Config::default());

        fs::write(dir.join(CONFIG_FILE), "network = \"mainnet\"\n").unwrap();
        assert_eq!(Config::load(&dir).unwrap().network, Some(Network::Mainnet));

        fs::write(dir.join(CONFIG_FILE), "network = [").unwrap();
        assert!(Config::load(&dir).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}
