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

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use freezer::{AssetId, LockDatum, MultisigScript, PlutusData, Value, VOID};
use pallas_addresses::Address;
use pallas_crypto::hash::Hash;
use pallas_txbuilder::{
    BuildBabbage, ExUnits as BudgetUnits, Input, Output, ScriptKind, StagingTransaction,
};

use crate::network::display_address;
use crate::{
    CoinselectStrategy, ExUnits, Network, OutPoint, ProtocolParams, Provider, ProviderError, Utxo,
    Validator, Wallet,
};

/// Smallest ADA-only wallet UTXO accepted as collateral.
pub const MIN_COLLATERAL: u64 = 5_000_000;
/// Lovelace sent along with a published reference script.
pub const PUBLISH_LOVELACE: u64 = 2_000_000;

const MAX_BALANCE_ROUNDS: usize = 10;

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum BuildError {
    /// Nothing to unlock
    NothingToUnlock,

    /// wallet funds are insufficient: {0} more lovelace and {1} native asset(s) are missing.
    InsufficientFunds(u64, usize),

    /// wallet has no ADA-only UTXO of at least {0} lovelace to serve as collateral.
    NoCollateral(u64),

    /// asset '{0}' is not a valid pair of policy id and hex-encoded asset name.
    InvalidAsset(AssetId),

    /// script evaluation returned no budget for the input {0}.
    NoBudget(OutPoint),

    /// transaction of {0} bytes exceeds the maximum transaction size of {1} bytes.
    TooLarge(u64, u64),

    /// transaction fee has not settled after {0} balancing rounds.
    FeeDivergence(usize),

    /// unable to assemble the transaction: {0}
    Builder(String),

    #[from]
    #[display(inner)]
    Provider(ProviderError),
}

fn builder_err(err: impl ToString) -> BuildError { BuildError::Builder(err.to_string()) }

/// Transaction output before it is handed to the transaction builder.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TxOut {
    pub address: Address,
    pub value: Value,
    /// CBOR of the inline datum.
    pub datum: Option<Vec<u8>>,
    /// Plutus V2 reference script.
    pub script: Option<Vec<u8>>,
}

impl TxOut {
    pub fn new(address: Address, value: Value) -> Self { TxOut { address, value, datum: None, script: None } }

    pub fn with_datum(mut self, datum: Vec<u8>) -> Self {
        self.datum = Some(datum);
        self
    }

    pub fn with_script(mut self, script: Vec<u8>) -> Self {
        self.script = Some(script);
        self
    }

    /// Upper estimate of the serialized size of the output.
    pub fn estimated_size(&self) -> u64 {
        // map header, address bytestring and a full-width coin
        let mut size = 1 + 3 + self.address.to_vec().len() as u64 + 9;
        let mut policies = BTreeSet::new();
        for (asset, _) in self.value.assets() {
            policies.insert(asset.policy_id());
            size += 2 + asset.asset_name().len() as u64 / 2 + 9;
        }
        if !policies.is_empty() {
            size += 3 + policies.len() as u64 * (2 + 28 + 3);
        }
        if let Some(datum) = &self.datum {
            size += 6 + datum.len() as u64;
        }
        if let Some(script) = &self.script {
            size += 8 + script.len() as u64;
        }
        size
    }

    /// Raises the lovelace of the output to the ledger minimum, if needed.
    fn ensure_min_ada(&mut self, params: &ProtocolParams) {
        let min_ada = params.min_ada(self.estimated_size());
        let coin = self.value.coin();
        if coin < min_ada {
            debug!(
                "Raising output to {} from {coin} to the minimum of {min_ada} lovelace",
                display_address(&self.address)
            );
            self.value.add(AssetId::ada(), min_ada - coin);
        }
    }

    fn to_output(&self) -> Result<Output, BuildError> {
        let mut output = Output::new(self.address.clone(), self.value.coin());
        for (asset, amount) in self.value.assets() {
            let policy =
                Hash::<28>::from_str(asset.policy_id()).map_err(|_| BuildError::InvalidAsset(asset.clone()))?;
            let name = hex::decode(asset.asset_name()).map_err(|_| BuildError::InvalidAsset(asset.clone()))?;
            output = output.add_asset(policy, name, amount).map_err(builder_err)?;
        }
        if let Some(datum) = &self.datum {
            output = output.set_inline_datum(datum.clone());
        }
        if let Some(script) = &self.script {
            output = output.set_inline_script(ScriptKind::PlutusV2, script.clone());
        }
        Ok(output)
    }
}

/// Signed transaction together with the choices made while balancing it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignedTx {
    pub hash: Hash<32>,
    pub cbor: Vec<u8>,
    pub fee: u64,
    /// Spent outputs in ledger order.
    pub inputs: Vec<OutPoint>,
    /// Outputs, with the change output last.
    pub outputs: Vec<TxOut>,
    pub collateral: Option<OutPoint>,
}

impl SignedTx {
    pub fn to_hex(&self) -> String { hex::encode(&self.cbor) }
}

/// Fixed part of a transaction, which balancing completes with wallet inputs, change and fee.
struct Draft {
    script_inputs: Vec<Utxo>,
    outputs: Vec<TxOut>,
}

fn total<'a>(values: impl IntoIterator<Item = &'a Value>) -> Value {
    values.into_iter().fold(Value::new(), |mut acc, value| {
        acc.merge(value);
        acc
    })
}

/// Part of `required` which `available` does not cover.
fn shortfall(required: &Value, available: &Value) -> Value {
    required
        .iter()
        .filter_map(|(asset, amount)| {
            let held = available.amount_of(asset);
            (*amount > held).then(|| (asset.clone(), amount - held))
        })
        .collect()
}

fn input(outpoint: &OutPoint) -> Input { Input::new(outpoint.tx_hash, outpoint.index) }

/// Script UTXOs picked for unlocking: all of them, or those named in `selection`, each at most
/// once.
pub fn select_script_utxos(available: &[Utxo], selection: &[OutPoint], all: bool) -> Vec<Utxo> {
    if all {
        let mut seen = BTreeSet::new();
        return available
            .iter()
            .filter(|utxo| seen.insert(utxo.outpoint))
            .cloned()
            .collect();
    }
    let mut res = Vec::new();
    for outpoint in selection.iter().collect::<BTreeSet<_>>() {
        match available.iter().find(|utxo| utxo.outpoint == *outpoint) {
            Some(utxo) => res.push(utxo.clone()),
            None => warn!("UTXO {outpoint} is not held by the validator and is skipped"),
        }
    }
    res
}

fn select_collateral(utxos: &[Utxo]) -> Result<&Utxo, BuildError> {
    utxos
        .iter()
        .filter(|utxo| utxo.is_pure_ada() && utxo.lovelace() >= MIN_COLLATERAL)
        .min_by_key(|utxo| (utxo.lovelace(), utxo.outpoint))
        .ok_or(BuildError::NoCollateral(MIN_COLLATERAL))
}

/// Assembles, balances and signs the transactions of the locking validator.
pub struct TxBuilder<'a, P: Provider> {
    provider: &'a P,
    wallet: &'a Wallet,
    validator: &'a Validator,
    network: Network,
    strategy: CoinselectStrategy,
}

impl<'a, P: Provider> TxBuilder<'a, P> {
    pub fn new(provider: &'a P, wallet: &'a Wallet, validator: &'a Validator, network: Network) -> Self {
        TxBuilder { provider, wallet, validator, network, strategy: default!() }
    }

    pub fn with_strategy(mut self, strategy: CoinselectStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn wallet_address(&self) -> Address { self.wallet.address(self.network) }

    pub fn script_address(&self) -> Address { self.validator.address(self.network) }

    pub fn wallet_utxos(&self) -> Result<Vec<Utxo>, BuildError> {
        Ok(self.provider.utxos_at(&self.wallet_address())?)
    }

    pub fn script_utxos(&self) -> Result<Vec<Utxo>, BuildError> {
        Ok(self.provider.utxos_at(&self.script_address())?)
    }

    /// Pays `value` to the validator under a lock datum owned by the wallet's payment key.
    pub fn lock(&self, value: Value, datum: Option<PlutusData>) -> Result<SignedTx, BuildError> {
        let datum = LockDatum {
            owner: MultisigScript::signature(self.wallet.payment_key_hash().to_vec()),
            arbitrary: datum.unwrap_or_else(PlutusData::void),
        };
        trace!("Lock datum: {}", hex::encode(datum.to_cbor()));
        let output = TxOut::new(self.script_address(), value).with_datum(datum.to_cbor());
        self.balance(Draft { script_inputs: vec![], outputs: vec![output] })
    }

    /// Spends script UTXOs back to the wallet with a void redeemer.
    pub fn unlock(&self, selection: &[OutPoint], all: bool) -> Result<SignedTx, BuildError> {
        let available = self.script_utxos()?;
        let script_inputs = select_script_utxos(&available, selection, all);
        if script_inputs.is_empty() {
            return Err(BuildError::NothingToUnlock);
        }
        for utxo in script_inputs.iter().filter(|utxo| utxo.inline_datum.is_none()) {
            warn!("UTXO {} carries no inline datum, the validator is likely to reject it", utxo.outpoint);
        }
        info!("Unlocking {} UTXO(s) from {}", script_inputs.len(), display_address(&self.script_address()));
        self.balance(Draft { script_inputs, outputs: vec![] })
    }

    /// Sends the validator as a reference script to the wallet's own address.
    pub fn publish(&self) -> Result<SignedTx, BuildError> {
        let output = TxOut::new(self.wallet_address(), Value::lovelace(PUBLISH_LOVELACE))
            .with_script(self.validator.compiled_code().to_vec());
        self.balance(Draft { script_inputs: vec![], outputs: vec![output] })
    }

    fn balance(&self, mut draft: Draft) -> Result<SignedTx, BuildError> {
        let params = self.provider.protocol_params()?;
        for output in &mut draft.outputs {
            output.ensure_min_ada(&params);
        }

        let wallet_address = self.wallet_address();
        let wallet_utxos = self.provider.utxos_at(&wallet_address)?;
        let collateral = if draft.script_inputs.is_empty() {
            None
        } else {
            Some(select_collateral(&wallet_utxos)?)
        };

        let spent = total(draft.script_inputs.iter().map(|utxo| &utxo.value));
        let paid = total(draft.outputs.iter().map(|output| &output.value));

        let mut fee = 0u64;
        // lovelace held back so that the change output can meet its minimum
        let mut reserve = 0u64;
        for round in 1..=MAX_BALANCE_ROUNDS {
            let mut required = paid.clone();
            required.add(AssetId::ada(), fee + reserve);
            let missing = shortfall(&required, &spent);
            let selected = self
                .strategy
                .coinselect(&missing, &wallet_utxos)
                .ok_or_else(|| BuildError::InsufficientFunds(missing.coin(), missing.assets().count()))?;

            let mut outgoing = paid.clone();
            outgoing.add(AssetId::ada(), fee);
            let change = total(selected.iter().map(|utxo| &utxo.value).chain([&spent]))
                .checked_sub(&outgoing)
                .ok_or(BuildError::InsufficientFunds(fee, 0))?;

            let mut outputs = draft.outputs.clone();
            if !change.is_empty() {
                let change = TxOut::new(wallet_address.clone(), change);
                let min_ada = params.min_ada(change.estimated_size());
                if change.value.coin() < min_ada {
                    debug!("Round {round}: change is below {min_ada} lovelace, selecting more funds");
                    reserve = min_ada;
                    continue;
                }
                outputs.push(change);
            }

            let mut inputs = draft
                .script_inputs
                .iter()
                .chain(selected)
                .map(|utxo| utxo.outpoint)
                .collect::<Vec<_>>();
            inputs.sort();

            let budgets = self.budgets(&draft.script_inputs, &inputs, &outputs, fee, collateral, &params)?;
            let (hash, cbor) = self.assemble(&inputs, &outputs, fee, collateral, &budgets, &params, true)?;
            let size = cbor.len() as u64;
            if size > params.max_tx_size {
                return Err(BuildError::TooLarge(size, params.max_tx_size));
            }

            let units = budgets.values().fold(ExUnits::default(), |acc, units| acc + *units);
            let min_fee = params.min_fee(size, units);
            if min_fee > fee {
                debug!("Round {round}: {size} bytes and {units} require a fee of {min_fee} lovelace");
                fee = min_fee;
                continue;
            }

            if let Some(collateral) = collateral {
                let required = params.min_collateral(fee);
                if collateral.lovelace() < required {
                    return Err(BuildError::NoCollateral(required));
                }
            }
            info!("Built transaction {hash} of {size} bytes paying {fee} lovelace in fees");
            return Ok(SignedTx {
                hash,
                cbor,
                fee,
                inputs,
                outputs,
                collateral: collateral.map(|utxo| utxo.outpoint),
            });
        }
        Err(BuildError::FeeDivergence(MAX_BALANCE_ROUNDS))
    }

    /// Execution budget of each script input, as evaluated by the provider.
    fn budgets(
        &self,
        script_inputs: &[Utxo],
        inputs: &[OutPoint],
        outputs: &[TxOut],
        fee: u64,
        collateral: Option<&Utxo>,
        params: &ProtocolParams,
    ) -> Result<BTreeMap<OutPoint, ExUnits>, BuildError> {
        if script_inputs.is_empty() {
            return Ok(none!());
        }
        let count = script_inputs.len() as u64;
        let limit = params.max_tx_ex_units;
        let placeholder = ExUnits::new(limit.mem / count, limit.steps / count);
        let placeholders = script_inputs
            .iter()
            .map(|utxo| (utxo.outpoint, placeholder))
            .collect::<BTreeMap<_, _>>();

        let (_, unsigned) = self.assemble(inputs, outputs, fee, collateral, &placeholders, params, false)?;
        let evaluated = self.provider.evaluate(&unsigned)?;
        script_inputs
            .iter()
            .map(|utxo| {
                let units = inputs
                    .iter()
                    .position(|outpoint| *outpoint == utxo.outpoint)
                    .and_then(|index| evaluated.get(&(index as u32)))
                    .ok_or(BuildError::NoBudget(utxo.outpoint))?;
                Ok((utxo.outpoint, *units))
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        inputs: &[OutPoint],
        outputs: &[TxOut],
        fee: u64,
        collateral: Option<&Utxo>,
        budgets: &BTreeMap<OutPoint, ExUnits>,
        params: &ProtocolParams,
        sign: bool,
    ) -> Result<(Hash<32>, Vec<u8>), BuildError> {
        let mut tx = StagingTransaction::new()
            .network_id(self.network.network_id())
            .fee(fee);
        for outpoint in inputs {
            tx = tx.input(input(outpoint));
        }
        for output in outputs {
            tx = tx.output(output.to_output()?);
        }
        if !budgets.is_empty() {
            tx = tx
                .script(ScriptKind::PlutusV2, self.validator.compiled_code().to_vec())
                .language_view(ScriptKind::PlutusV2, params.plutus_v2_cost_model.clone())
                .disclosed_signer(self.wallet.payment_key_hash());
            for (outpoint, units) in budgets {
                let units = BudgetUnits { mem: units.mem, steps: units.steps };
                tx = tx.add_spend_redeemer(input(outpoint), VOID.to_vec(), Some(units));
            }
        }
        if let Some(collateral) = collateral {
            tx = tx.collateral_input(input(&collateral.outpoint));
        }

        let mut built = tx.build_babbage_raw().map_err(builder_err)?;
        if sign {
            built = built.sign(self.wallet.private_key()).map_err(builder_err)?;
        }
        Ok((Hash::new(built.tx_hash.0), built.tx_bytes.0))
    }
}
