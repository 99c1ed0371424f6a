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

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::thread::sleep;
use std::time::{Duration, Instant};

use freezer::Value;
use pallas_addresses::Address;
use pallas_crypto::hash::Hash;

/// Reference to a transaction output, written as `<tx hash>#<output index>`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[display("{tx_hash}#{index}")]
pub struct OutPoint {
    pub tx_hash: Hash<32>,
    pub index: u64,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum OutPointParseError {
    /// output reference '{0}' must have the form <tx hash>#<output index>.
    Format(String),

    /// '{0}' is not a valid transaction hash.
    TxHash(String),

    /// '{0}' is not a valid output index.
    Index(String),
}

impl OutPoint {
    pub fn new(tx_hash: Hash<32>, index: u64) -> Self { OutPoint { tx_hash, index } }
}

impl FromStr for OutPoint {
    type Err = OutPointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, index) = s
            .split_once('#')
            .ok_or_else(|| OutPointParseError::Format(s.to_owned()))?;
        let tx_hash = Hash::<32>::from_str(hash).map_err(|_| OutPointParseError::TxHash(hash.to_owned()))?;
        let index = index
            .parse()
            .map_err(|_| OutPointParseError::Index(index.to_owned()))?;
        Ok(OutPoint { tx_hash, index })
    }
}

/// Unspent transaction output as reported by a [`Provider`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub address: String,
    pub value: Value,
    pub datum_hash: Option<String>,
    /// CBOR of the inline datum.
    pub inline_datum: Option<Vec<u8>>,
    pub reference_script_hash: Option<String>,
}

impl Utxo {
    pub fn lovelace(&self) -> u64 { self.value.coin() }

    /// Whether the output carries nothing but ADA, which is required from collateral.
    pub fn is_pure_ada(&self) -> bool {
        self.value.assets().next().is_none() &&
            self.inline_datum.is_none() &&
            self.datum_hash.is_none() &&
            self.reference_script_hash.is_none()
    }
}

impl Display for Utxo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.outpoint)?;
        writeln!(f, "  lovelace: {}", self.lovelace())?;
        for (asset, amount) in self.value.assets() {
            writeln!(f, "  {}: {amount}", asset.to_unit())?;
        }
        Ok(())
    }
}

/// Memory and CPU budget of a script execution.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Display)]
#[display("{mem} mem, {steps} steps")]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

impl ExUnits {
    pub fn new(mem: u64, steps: u64) -> Self { ExUnits { mem, steps } }

    pub fn is_zero(&self) -> bool { self.mem == 0 && self.steps == 0 }
}

impl std::ops::Add for ExUnits {
    type Output = ExUnits;

    fn add(self, rhs: Self) -> Self::Output {
        ExUnits { mem: self.mem.saturating_add(rhs.mem), steps: self.steps.saturating_add(rhs.steps) }
    }
}

/// Protocol parameters the transaction builder depends on.
#[derive(Clone, PartialEq, Debug)]
pub struct ProtocolParams {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub max_tx_size: u64,
    pub coins_per_utxo_byte: u64,
    pub price_mem: f64,
    pub price_step: f64,
    pub max_tx_ex_units: ExUnits,
    pub collateral_percent: u64,
    pub plutus_v2_cost_model: Vec<i64>,
}

/// Fixed overhead the ledger adds to the serialized size of every output.
const UTXO_ENTRY_OVERHEAD: u64 = 160;

impl ProtocolParams {
    /// Linear fee for a transaction of `tx_size` bytes, plus the price of the execution
    /// budget of its scripts.
    pub fn min_fee(&self, tx_size: u64, ex_units: ExUnits) -> u64 {
        let script_fee = self.price_mem * ex_units.mem as f64 + self.price_step * ex_units.steps as f64;
        self.min_fee_a * tx_size + self.min_fee_b + script_fee.ceil() as u64
    }

    /// Minimum lovelace an output of `output_size` serialized bytes must carry.
    pub fn min_ada(&self, output_size: u64) -> u64 {
        self.coins_per_utxo_byte * (UTXO_ENTRY_OVERHEAD + output_size)
    }

    /// Collateral required for a fee.
    pub fn min_collateral(&self, fee: u64) -> u64 { (fee * self.collateral_percent).div_ceil(100) }
}

#[derive(Debug, Display, Error)]
#[display(doc_comments)]
pub enum ProviderError {
    /// cannot connect to the chain provider: {0}
    Connectivity(String),

    /// chain provider uses an unexpected protocol: {0}
    Protocol(String),

    /// the chain provider has returned an error {0}: "{1}"
    ServerSide(u16, String),

    /// script evaluation has failed: {0}
    Evaluation(String),

    /// transaction {0} was not seen on chain within {1} seconds.
    Timeout(Hash<32>, u64),
}

/// Read and write access to the chain.
pub trait Provider {
    fn utxos_at(&self, address: &Address) -> Result<Vec<Utxo>, ProviderError>;

    fn protocol_params(&self) -> Result<ProtocolParams, ProviderError>;

    /// Evaluates the scripts of a transaction, returning the budget of each spend redeemer keyed
    /// by the index of the spent input.
    fn evaluate(&self, tx: &[u8]) -> Result<BTreeMap<u32, ExUnits>, ProviderError>;

    fn submit(&self, tx: &[u8]) -> Result<Hash<32>, ProviderError>;

    /// Whether the chain indexer already knows the transaction.
    fn is_seen(&self, tx_hash: Hash<32>) -> Result<bool, ProviderError>;

    /// Polls [`Provider::is_seen`] every `interval` until the transaction shows up or `timeout`
    /// elapses.
    fn await_tx(&self, tx_hash: Hash<32>, interval: Duration, timeout: Duration) -> Result<(), ProviderError> {
        let start = Instant::now();
        loop {
            if self.is_seen(tx_hash)? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(ProviderError::Timeout(tx_hash, timeout.as_secs()));
            }
            trace!("Transaction {tx_hash} is not seen yet, retrying in {interval:?}");
            sleep(interval);
        }
    }
}
