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

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Canonical identifier of ADA in a [`Value`].
pub const ADA_ASSET_ID: &str = "ada.lovelace";

/// Native asset identifier in `policy.name` form, with both parts hex-encoded.
///
/// ADA is represented as `ada.lovelace`; pool records may also leave the ADA side of a pool as
/// an empty identifier, which [`AssetId::is_ada`] treats the same way.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
pub struct AssetId(String);

impl AssetId {
    pub fn ada() -> Self { AssetId(s!(ADA_ASSET_ID)) }

    pub fn from_parts(policy: &str, name: &str) -> Self { AssetId(format!("{policy}.{name}")) }

    /// Parses a unit as reported by chain indexers: `lovelace`, `policy.name` or the
    /// concatenated hex of a 28-byte policy id and the asset name.
    pub fn from_unit(unit: &str) -> Self {
        if unit == "lovelace" || unit == ADA_ASSET_ID {
            return Self::ada();
        }
        if unit.contains('.') || unit.len() < 56 {
            return AssetId(unit.to_owned());
        }
        let (policy, name) = unit.split_at(56);
        Self::from_parts(policy, name)
    }

    /// Unit string in the concatenated form used by chain indexers.
    pub fn to_unit(&self) -> String {
        if self.is_ada() {
            return s!("lovelace");
        }
        self.0.replace('.', "")
    }

    pub fn is_ada(&self) -> bool { self.0.is_empty() || self.0 == ADA_ASSET_ID || self.0 == "lovelace" }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn policy_id(&self) -> &str { self.0.split_once('.').map(|(p, _)| p).unwrap_or(&self.0) }

    pub fn asset_name(&self) -> &str { self.0.split_once('.').map(|(_, n)| n).unwrap_or_default() }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for AssetId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(AssetId(s.to_owned())) }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self { AssetId(s.to_owned()) }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self { AssetId(s) }
}

/// Multi-asset bundle held by a position or a transaction output.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
pub struct Value(BTreeMap<AssetId, u64>);

impl Value {
    pub fn new() -> Self { Value::default() }

    pub fn lovelace(amount: u64) -> Self { Value::new().with(AssetId::ada(), amount) }

    pub fn with(mut self, asset: impl Into<AssetId>, amount: u64) -> Self {
        self.add(asset.into(), amount);
        self
    }

    pub fn add(&mut self, asset: AssetId, amount: u64) {
        let entry = self.0.entry(asset).or_default();
        *entry = entry.saturating_add(amount);
    }

    pub fn amount_of(&self, asset: &AssetId) -> u64 {
        if asset.is_ada() {
            return self.coin();
        }
        self.0.get(asset).copied().unwrap_or_default()
    }

    /// ADA held, counting every spelling of the ADA asset id.
    pub fn coin(&self) -> u64 {
        self.0
            .iter()
            .filter(|(asset, _)| asset.is_ada())
            .map(|(_, amount)| *amount)
            .sum()
    }

    /// Non-ADA assets with a positive amount.
    pub fn assets(&self) -> impl Iterator<Item = (&AssetId, u64)> {
        self.0
            .iter()
            .filter(|(asset, amount)| !asset.is_ada() && **amount > 0)
            .map(|(asset, amount)| (asset, *amount))
    }

    pub fn iter(&self) -> btree_map::Iter<'_, AssetId, u64> { self.0.iter() }

    pub fn is_empty(&self) -> bool { self.0.values().all(|amount| *amount == 0) }

    pub fn merge(&mut self, other: &Value) {
        for (asset, amount) in other.iter() {
            self.add(asset.clone(), *amount);
        }
    }

    /// Subtracts `other`, returning `None` if any asset would become negative.
    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        let mut res = self.clone();
        for (asset, amount) in other.iter() {
            let ada = asset.is_ada();
            let held = if ada { res.coin() } else { res.amount_of(asset) };
            let left = held.checked_sub(*amount)?;
            if ada {
                res.0.retain(|asset, _| !asset.is_ada());
                res.0.insert(AssetId::ada(), left);
            } else {
                res.0.insert(asset.clone(), left);
            }
        }
        res.0.retain(|asset, amount| *amount > 0 || asset.is_ada());
        Some(res)
    }

    /// Whether this value holds at least every amount of `other`.
    pub fn covers(&self, other: &Value) -> bool { self.checked_sub(other).is_some() }
}

impl FromIterator<(AssetId, u64)> for Value {
    fn from_iter<T: IntoIterator<Item = (AssetId, u64)>>(iter: T) -> Self {
        let mut value = Value::new();
        for (asset, amount) in iter {
            value.add(asset, amount);
        }
        value
    }
}

impl<'a> IntoIterator for &'a Value {
    type Item = (&'a AssetId, &'a u64);
    type IntoIter = btree_map::Iter<'a, AssetId, u64>;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}
