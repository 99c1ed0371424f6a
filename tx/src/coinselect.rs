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

use core::str::FromStr;

use freezer::Value;

use crate::Utxo;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, Default)]
#[display(lowercase)]
pub enum CoinselectStrategy {
    /// Collect the most small outputs unless the required value is reached
    #[default]
    Aggregate,

    /// Collect the minimum number of outputs (with the large value) to reduce the resulting input
    /// count
    SmallSize,
}

impl FromStr for CoinselectStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aggregate" => Ok(CoinselectStrategy::Aggregate),
            "smallsize" => Ok(CoinselectStrategy::SmallSize),
            s => Err(s.to_string()),
        }
    }
}

impl CoinselectStrategy {
    /// Picks wallet UTXOs whose joint value covers `target`. Outputs holding the native assets
    /// of `target` are taken first, then lovelace is topped up in the order of the strategy.
    ///
    /// Returns `None` if all of `utxos` together cannot cover the target.
    pub fn coinselect<'a>(&self, target: &Value, utxos: &'a [Utxo]) -> Option<Vec<&'a Utxo>> {
        let mut ordered = utxos.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|utxo| (utxo.lovelace(), utxo.outpoint));
        if *self == CoinselectStrategy::SmallSize {
            ordered.reverse();
        }

        fn take<'a>(utxo: &'a Utxo, selected: &mut Vec<&'a Utxo>, acc: &mut Value) {
            if !selected.iter().any(|s| s.outpoint == utxo.outpoint) {
                acc.merge(&utxo.value);
                selected.push(utxo);
            }
        }

        let mut selected = Vec::<&Utxo>::new();
        let mut acc = Value::new();
        for (asset, amount) in target.assets() {
            for &utxo in &ordered {
                if acc.amount_of(asset) >= amount {
                    break;
                }
                if utxo.value.amount_of(asset) > 0 {
                    take(utxo, &mut selected, &mut acc);
                }
            }
        }
        for &utxo in &ordered {
            if acc.covers(target) {
                break;
            }
            take(utxo, &mut selected, &mut acc);
        }

        if !acc.covers(target) {
            return None;
        }
        Some(selected)
    }
}
