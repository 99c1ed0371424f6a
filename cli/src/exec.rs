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
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{bail, Context};
use freezer::farming::{self, YieldOutputs};
use freezer::{
    incentive, Delegation, IncentiveProgram, LockDatum, MultisigScript, PlutusData, PoolIndex, Position,
    StakeDatum, Value, YieldProgram,
};
use frztx::{
    Blockfrost, BuildError, Network, Provider, SignedTx, TxBuilder, Utxo, Validator, Wallet, DEFAULT_BLUEPRINT,
};
use serde_crate::de::DeserializeOwned;
use serde_crate::Serialize;

use crate::{Args, CalcOpts, Cmd, Config, TxOpts};

/// Chain access and keys used by the transaction commands.
struct Session {
    provider: Blockfrost,
    wallet: Wallet,
    validator: Validator,
    network: Network,
    config: Config,
}

impl Session {
    fn builder(&self, tx: &TxOpts) -> TxBuilder<'_, Blockfrost> {
        TxBuilder::new(&self.provider, &self.wallet, &self.validator, self.network)
            .with_strategy(tx.coinselect)
    }

    fn finish(&self, signed: SignedTx, dry: bool) -> anyhow::Result<()> {
        report_tx(&self.provider, &self.config, &signed, dry, &mut io::stdout().lock())
    }
}

/// Prints a signed transaction on a dry run. Otherwise submits it, then waits until the provider
/// sees it.
fn report_tx(
    provider: &impl Provider,
    config: &Config,
    signed: &SignedTx,
    dry: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    info!(
        "Signed transaction spending {} input(s) into {} output(s) with fee {}",
        signed.inputs.len(),
        signed.outputs.len(),
        signed.fee
    );
    if dry {
        writeln!(out, "DRY: transaction not submitted")?;
        writeln!(out, "Tx: {}", signed.to_hex())?;
        writeln!(out, "Transaction Hash: {}", signed.hash)?;
        return Ok(());
    }

    let hash = provider.submit(&signed.cbor)?;
    if hash != signed.hash {
        warn!("Provider reports transaction hash {hash} instead of {}", signed.hash);
    }
    writeln!(out, "Transaction Hash: {hash}")?;
    writeln!(out, "Waiting for tx {hash}...")?;
    out.flush()?;
    provider.await_tx(hash, config.await_interval(), config.await_timeout())?;
    writeln!(out, "Tx Seen.")?;
    Ok(())
}

/// Owner of a decoded datum.
#[derive(Serialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
struct DatumOwner {
    kind: &'static str,
    owner_hash: String,
    key_hashes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    delegations: Vec<Delegation>,
}

impl DatumOwner {
    fn new(kind: &'static str, owner: &MultisigScript, delegations: Vec<Delegation>) -> Self {
        DatumOwner {
            kind,
            owner_hash: owner.hash().to_string(),
            key_hashes: owner.key_hashes().into_iter().map(hex::encode).collect(),
            delegations,
        }
    }
}

impl Args {
    pub fn exec(&self) -> anyhow::Result<()> {
        debug!("Executing {} command", self.command.name());
        match &self.command {
            Cmd::Lock { tx, lock, datum } => {
                let session = self.session(tx)?;
                let builder = session.builder(tx);
                if tx.list_utxos {
                    print_utxos(&builder.wallet_utxos()?);
                    return Ok(());
                }
                let value = lock.iter().cloned().collect::<Value>();
                let signed = builder.lock(value, datum.clone())?;
                session.finish(signed, tx.dry)?;
            }
            Cmd::Unlock { tx, unlock, all } => {
                let session = self.session(tx)?;
                let builder = session.builder(tx);
                if tx.list_utxos {
                    print_utxos(&builder.script_utxos()?);
                    return Ok(());
                }
                let signed = match builder.unlock(unlock, *all) {
                    Err(BuildError::NothingToUnlock) => {
                        println!("Nothing to unlock");
                        exit(1);
                    }
                    res => res?,
                };
                session.finish(signed, tx.dry)?;
            }
            Cmd::Publish { tx } => {
                let session = self.session(tx)?;
                let builder = session.builder(tx);
                if tx.list_utxos {
                    print_utxos(&builder.wallet_utxos()?);
                    return Ok(());
                }
                let signed = builder.publish()?;
                session.finish(signed, tx.dry)?;
            }
            Cmd::Yield { calc, date, previous } => {
                let program: YieldProgram = read_input(&calc.program)?;
                let positions: Vec<Position> = read_input(&calc.positions)?;
                let pools = pool_index(calc)?;

                // The window counts the calculated day, so only the last `window - 1` days apply.
                let skip = previous.len().saturating_sub(program.consecutive_delegation_window.saturating_sub(1));
                if skip > 0 {
                    info!("Ignoring {skip} previous day(s) outside of the delegation window");
                }
                let history = previous[skip..]
                    .iter()
                    .map(|path| read_input::<YieldOutputs>(path))
                    .collect::<Result<Vec<_>, _>>()?;

                let outputs = farming::calculate_earnings(
                    *date,
                    calc.start_slot,
                    calc.end_slot,
                    &program,
                    &history,
                    &positions,
                    &pools,
                )?;
                info!(
                    "Program {} emits {} on {date} to {} owner(s)",
                    program.id,
                    outputs.total_emissions,
                    outputs.emissions_by_owner.len()
                );
                self.print(&outputs)?;
            }
            Cmd::Incentive { calc, start_date, end_date, emission } => {
                if end_date < start_date {
                    bail!("incentive period ends on {end_date}, before it starts on {start_date}");
                }
                let program: IncentiveProgram = read_input(&calc.program)?;
                let positions: Vec<Position> = read_input(&calc.positions)?;
                let pools = pool_index(calc)?;
                let outputs = incentive::calculate_earnings(
                    *start_date,
                    *end_date,
                    calc.start_slot,
                    calc.end_slot,
                    *emission,
                    &program,
                    &positions,
                    &pools,
                )?;
                self.print(&outputs)?;
            }
            Cmd::Datum { hex: datum } => {
                let bytes = hex::decode(datum.trim()).context("datum is not a hex string")?;
                let owner = if let Ok(datum) = StakeDatum::from_cbor(&bytes) {
                    DatumOwner::new("stake", &datum.owner, datum.delegations)
                } else if let Ok(datum) = LockDatum::from_cbor(&bytes) {
                    DatumOwner::new("lock", &datum.owner, vec![])
                } else {
                    PlutusData::from_cbor(&bytes)?;
                    bail!("datum is valid Plutus data, but neither a stake nor a lock datum");
                };
                self.print(&owner)?;
            }
        }
        Ok(())
    }

    fn session(&self, tx: &TxOpts) -> anyhow::Result<Session> {
        let config = Config::load(&self.data_dir)?;
        let network = self.network.or(config.network).unwrap_or_default();
        let wallet = Wallet::load(&tx.wallet_source()?)?;
        let blueprint = tx
            .blueprint
            .clone()
            .or_else(|| config.blueprint.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BLUEPRINT));
        let validator = Validator::load(&blueprint)?;
        let project_id = self.blockfrost.clone().or_else(|| config.blockfrost.clone()).context(
            "no Blockfrost project id; use --blockfrost, BLOCKFROST_API_KEY or the configuration file",
        )?;
        let provider = Blockfrost::new(network, project_id)?;
        info!("Operating on {network} with validator '{}'", validator.title);
        Ok(Session { provider, wallet, validator, network, config })
    }

    fn print(&self, data: &impl Serialize) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(data)?);
        } else {
            print!("{}", serde_yaml::to_string(data)?);
        }
        Ok(())
    }
}

fn print_utxos(utxos: &[Utxo]) {
    for utxo in utxos {
        print!("{utxo}");
    }
}

/// Reads a YAML or JSON input file.
fn read_input<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("unable to read '{}'", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("invalid content of '{}'", path.display()))
}

fn pool_index(calc: &CalcOpts) -> anyhow::Result<PoolIndex> {
    let path = &calc.pools;
    let text = fs::read_to_string(path).with_context(|| format!("unable to read '{}'", path.display()))?;
    let index = PoolIndex::from_yaml(&text).with_context(|| format!("invalid pools in '{}'", path.display()))?;
    debug!("Loaded {} pool(s) from '{}'", index.len(), path.display());
    Ok(match &calc.lp_policy {
        Some(policy) => index.with_lp_policy(policy),
        None => index,
    })
}
