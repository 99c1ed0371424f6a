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

use std::path::PathBuf;

use clap::{Parser, ValueHint};
use frztx::{CoinselectStrategy, Network, WalletError, WalletSource};

use crate::Cmd;

pub const FREEZER_DATA_DIR_ENV: &str = "FREEZER_DATA_DIR";
pub const FREEZER_NETWORK_ENV: &str = "FREEZER_NETWORK";
pub const BLOCKFROST_API_KEY_ENV: &str = "BLOCKFROST_API_KEY";

#[cfg(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd", target_os = "netbsd"))]
pub const FREEZER_DATA_DIR: &str = "~/.freezer";
#[cfg(target_os = "macos")]
pub const FREEZER_DATA_DIR: &str = "~/Library/Application Support/Freezer";
#[cfg(target_os = "windows")]
pub const FREEZER_DATA_DIR: &str = "~\\AppData\\Local\\Freezer";
#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "macos",
    target_os = "windows"
)))]
pub const FREEZER_DATA_DIR: &str = ".";

#[derive(Parser, Clone, PartialEq, Eq, Debug)]
#[command(author, version, name = "freezer", about = "Lock stake with the Freezer contract and calculate its rewards")]
pub struct Args {
    /// Set verbosity level.
    ///
    /// Can be used multiple times to increase verbosity.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Data directory path, holding the optional `freezer.toml` configuration file.
    #[arg(
        short,
        long,
        global = true,
        default_value = FREEZER_DATA_DIR,
        env = FREEZER_DATA_DIR_ENV,
        value_hint = ValueHint::DirPath
    )]
    pub data_dir: PathBuf,

    /// Network to operate on: preview, preprod or mainnet.
    #[arg(long = "env", global = true, env = FREEZER_NETWORK_ENV)]
    pub network: Option<Network>,

    /// Blockfrost project id.
    #[arg(long, global = true, env = BLOCKFROST_API_KEY_ENV, hide_env_values = true)]
    pub blockfrost: Option<String>,

    /// Print outputs as JSON instead of YAML.
    #[arg(long, global = true)]
    pub json: bool,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Cmd,
}

impl Args {
    pub fn process(&mut self) {
        self.data_dir =
            PathBuf::from(shellexpand::tilde(&self.data_dir.display().to_string()).to_string());
    }
}

/// Options of the commands building a transaction.
#[derive(clap::Args, Clone, PartialEq, Eq, Debug)]
pub struct TxOpts {
    /// Wallet secret key file: a bech32 `ed25519_sk` key or a `cardano-cli` text envelope.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub skey_file: Option<PathBuf>,

    /// Wallet seed phrase.
    #[arg(long)]
    pub mnemonic: Option<String>,

    /// File holding the wallet seed phrase.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub mnemonic_file: Option<PathBuf>,

    /// Blueprint JSON of the validator [default: ../contracts/freezer/plutus.json].
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub blueprint: Option<PathBuf>,

    /// Build and sign the transaction, but do not submit it.
    #[arg(long)]
    pub dry: bool,

    /// List the UTXOs the command spends from and exit.
    #[arg(long)]
    pub list_utxos: bool,

    /// Coin selection strategy over the wallet UTXOs: aggregate or smallsize.
    #[arg(long, default_value = "aggregate")]
    pub coinselect: CoinselectStrategy,
}

impl TxOpts {
    pub fn wallet_source(&self) -> Result<WalletSource, WalletError> {
        WalletSource::select(self.skey_file.clone(), self.mnemonic.clone(), self.mnemonic_file.clone())
    }
}

/// Inputs shared by the reward calculations. Files are YAML or JSON.
#[derive(clap::Args, Clone, PartialEq, Eq, Debug)]
pub struct CalcOpts {
    /// Program definition.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub program: PathBuf,

    /// Stake positions held at the locking contract.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub positions: PathBuf,

    /// Pool snapshot.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub pools: PathBuf,

    /// First slot of the period.
    #[arg(long)]
    pub start_slot: u64,

    /// Last slot of the period, at which LP holdings are snapshotted.
    #[arg(long)]
    pub end_slot: u64,

    /// Policy id of the DEX LP tokens. Without it, only the LP assets of the snapshotted pools
    /// count as LP tokens.
    #[arg(long)]
    pub lp_policy: Option<String>,
}
