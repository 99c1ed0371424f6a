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

use chrono::NaiveDate;
use clap::Subcommand;
use freezer::{AssetId, PlutusData};
use frztx::OutPoint;

use crate::{CalcOpts, TxOpts};

#[derive(Subcommand, Clone, PartialEq, Eq, Debug)]
pub enum Cmd {
    /// Lock funds at the validator address, owned by the wallet payment key.
    Lock {
        #[clap(flatten)]
        tx: TxOpts,

        /// Value to lock, as `<unit>:<amount>`. The unit is `lovelace`, `<policy>.<name>` or the
        /// concatenated hex of policy id and asset name. May be repeated.
        #[clap(long = "lock", value_name = "UNIT:AMOUNT", value_parser = parse_lock_amount)]
        lock: Vec<(AssetId, u64)>,

        /// Plutus data, as hex-encoded CBOR, placed next to the owner in the lock datum.
        #[clap(long, value_parser = parse_datum)]
        datum: Option<PlutusData>,
    },

    /// Spend UTXOs locked at the validator address back to the wallet.
    Unlock {
        #[clap(flatten)]
        tx: TxOpts,

        /// Script UTXO to spend, as `<txhash>#<index>`. May be repeated.
        #[clap(long = "unlock", value_name = "TXHASH#INDEX")]
        unlock: Vec<OutPoint>,

        /// Spend every UTXO at the validator address.
        #[clap(long)]
        all: bool,
    },

    /// Publish the validator as a reference script held by the wallet.
    Publish {
        #[clap(flatten)]
        tx: TxOpts,
    },

    /// Calculate a day of earnings of a yield farming program.
    Yield {
        #[clap(flatten)]
        calc: CalcOpts,

        /// Day to calculate, as `YYYY-MM-DD`.
        #[clap(long)]
        date: NaiveDate,

        /// Outputs of the preceding days, oldest first. Only the days within the delegation
        /// window of the program are used.
        #[clap(long, value_hint = clap::ValueHint::FilePath)]
        previous: Vec<PathBuf>,
    },

    /// Split the emission of an incentive program over a period among its delegators.
    Incentive {
        #[clap(flatten)]
        calc: CalcOpts,

        /// First day of the period, as `YYYY-MM-DD`.
        #[clap(long)]
        start_date: NaiveDate,

        /// Last day of the period, as `YYYY-MM-DD`.
        #[clap(long)]
        end_date: NaiveDate,

        /// Amount of the emitted asset to distribute.
        #[clap(long)]
        emission: u64,
    },

    /// Decode a stake or lock datum and print its owner.
    Datum {
        /// Hex-encoded CBOR of the datum.
        hex: String,
    },
}

impl Cmd {
    pub fn name(&self) -> &'static str {
        match self {
            Cmd::Lock { .. } => "lock",
            Cmd::Unlock { .. } => "unlock",
            Cmd::Publish { .. } => "publish",
            Cmd::Yield { .. } => "yield",
            Cmd::Incentive { .. } => "incentive",
            Cmd::Datum { .. } => "datum",
        }
    }
}

fn parse_lock_amount(s: &str) -> Result<(AssetId, u64), String> {
    let (unit, amount) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("'{s}' must have the form <unit>:<amount>"))?;
    if unit.is_empty() {
        return Err(format!("'{s}' has no unit"));
    }
    let amount = amount
        .parse()
        .map_err(|err| format!("invalid amount '{amount}' of {unit}: {err}"))?;
    Ok((AssetId::from_unit(unit), amount))
}

fn parse_datum(s: &str) -> Result<PlutusData, String> { s.parse().map_err(|err: freezer::DataError| err.to_string()) }
