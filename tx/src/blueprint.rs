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
use std::path::Path;

use minicbor::Encoder;
use pallas_addresses::{Address, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart};
use pallas_crypto::hash::{Hash, Hasher};

use crate::Network;

/// Blueprint location relative to the working directory of the off-chain tooling.
pub const DEFAULT_BLUEPRINT: &str = "../contracts/freezer/plutus.json";

/// Script language tag prepended to Plutus V2 code before hashing.
const PLUTUS_V2_TAG: u8 = 0x02;

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum BlueprintError {
    /// unable to read blueprint file '{0}': {1}
    Read(String, std::io::Error),

    /// blueprint is not a valid JSON document: {0}
    #[from]
    Json(serde_json::Error),

    /// blueprint does not define any validators.
    NoValidators,

    /// compiled code of validator '{0}' is not a hex string: {1}
    Hex(String, hex::FromHexError),
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
struct Blueprint {
    #[serde(default)]
    validators: Vec<BlueprintValidator>,
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
struct BlueprintValidator {
    #[serde(default)]
    title: String,
    compiled_code: String,
}

/// Plutus V2 validator taken from the first entry of a blueprint.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Validator {
    pub title: String,
    code: Vec<u8>,
}

impl Validator {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BlueprintError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|err| BlueprintError::Read(path.display().to_string(), err))?;
        let validator = Self::from_json(&json)?;
        debug!("Loaded validator '{}' from {}", validator.title, path.display());
        Ok(validator)
    }

    pub fn from_json(json: &str) -> Result<Self, BlueprintError> {
        let blueprint: Blueprint = serde_json::from_str(json)?;
        let first = blueprint
            .validators
            .into_iter()
            .next()
            .ok_or(BlueprintError::NoValidators)?;
        let code = hex::decode(first.compiled_code.trim())
            .map_err(|err| BlueprintError::Hex(first.title.clone(), err))?;
        Ok(Validator { title: first.title, code })
    }

    /// Compiled code as found in the blueprint: a CBOR bytestring wrapping the flat-encoded
    /// program. This is the form carried in witness sets and reference scripts.
    pub fn compiled_code(&self) -> &[u8] { &self.code }

    /// Compiled code wrapped into one more CBOR bytestring.
    pub fn double_cbor(&self) -> Vec<u8> {
        let mut encoder = Encoder::new(Vec::with_capacity(self.code.len() + 5));
        encoder
            .bytes(&self.code)
            .expect("in-memory CBOR encoding never fails");
        encoder.into_writer()
    }

    pub fn script_hash(&self) -> Hash<28> {
        let mut hasher = Hasher::<224>::new();
        hasher.input(&[PLUTUS_V2_TAG]);
        hasher.input(&self.code);
        hasher.finalize()
    }

    /// Enterprise address paying to the validator.
    pub fn address(&self, network: Network) -> Address {
        Address::Shelley(ShelleyAddress::new(
            network.ledger(),
            ShelleyPaymentPart::script_hash(self.script_hash()),
            ShelleyDelegationPart::Null,
        ))
    }
}
