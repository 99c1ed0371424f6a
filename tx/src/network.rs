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

use std::str::FromStr;

use pallas_addresses::{Address, Network as LedgerNetwork};

/// Cardano network a transaction is built for.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, Default)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "lowercase")]
#[display(lowercase)]
pub enum Network {
    #[default]
    Preview,
    Preprod,
    Mainnet,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display("unknown network '{0}'; use one of preview, preprod or mainnet")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preview" => Ok(Network::Preview),
            "preprod" => Ok(Network::Preprod),
            "mainnet" => Ok(Network::Mainnet),
            _ => Err(UnknownNetwork(s.to_owned())),
        }
    }
}

impl Network {
    pub fn is_mainnet(self) -> bool { self == Network::Mainnet }

    /// Base URL of the Blockfrost API serving this network.
    pub fn blockfrost_url(self) -> String { format!("https://cardano-{self}.blockfrost.io/api/v0") }

    /// Network discriminant used in addresses; every non-mainnet network is a testnet.
    pub fn ledger(self) -> LedgerNetwork {
        if self.is_mainnet() {
            LedgerNetwork::Mainnet
        } else {
            LedgerNetwork::Testnet
        }
    }

    pub fn network_id(self) -> u8 { self.is_mainnet() as u8 }
}

/// Bech32 form of an address, falling back to hex for addresses without one.
pub fn display_address(address: &Address) -> String {
    address
        .to_bech32()
        .unwrap_or_else(|_| hex::encode(address.to_vec()))
}
