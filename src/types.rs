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

use chrono::{DateTime, NaiveDate, Utc};

use crate::{AssetId, MultisigScript, Value};

/// Ordered pair of pool assets.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct AssetPair {
    pub asset_a: AssetId,
    pub asset_b: AssetId,
}

impl AssetPair {
    pub fn matches(&self, pool: &Pool) -> bool { self.asset_a == pool.asset_a && self.asset_b == pool.asset_b }
}

/// Yield farming program parameters.
///
/// The `eligible_*` lists are optional: a program which sets none of them treats every pool as
/// eligible, while setting any of them (even to an empty list) makes eligibility opt-in.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase", default)
)]
pub struct YieldProgram {
    pub id: String,

    /// Number of days after the earning date when unclaimed earnings expire.
    pub earning_expiration_days: Option<u32>,
    pub first_daily_rewards: NaiveDate,
    pub last_daily_rewards: Option<NaiveDate>,

    pub daily_emission: u64,
    pub emitted_asset: AssetId,
    pub staked_asset: AssetId,
    /// Pool used to estimate the lovelace value of the emitted asset.
    pub reference_pool: Option<String>,

    /// Number of consecutive days (today included) whose qualifying delegation is summed.
    pub consecutive_delegation_window: usize,

    /// Pools receiving a fixed daily amount regardless of their delegation.
    pub fixed_emissions: BTreeMap<String, u64>,
    /// Per-pool cap on the non-fixed emissions; zero disables the cap.
    pub emission_cap: u64,

    pub eligible_versions: Option<Vec<String>>,
    pub eligible_pools: Option<Vec<String>>,
    pub eligible_assets: Option<Vec<AssetId>>,
    pub eligible_pairs: Option<Vec<AssetPair>>,

    pub disqualified_versions: Option<Vec<String>>,
    pub disqualified_pools: Option<Vec<String>>,
    pub disqualified_assets: Option<Vec<AssetId>>,
    pub disqualified_pairs: Option<Vec<AssetPair>>,

    /// Pools always selected for emissions, provided they have any qualifying delegation.
    pub nepotism_pools: Vec<String>,

    /// Delegation to a key pool counts as delegation to the value pool.
    pub delegation_remap: BTreeMap<String, String>,

    pub min_lp_integer_percent: u64,
    pub max_pool_count: usize,
    pub max_pool_integer_percent: u64,
}

impl YieldProgram {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        date >= self.first_daily_rewards && self.last_daily_rewards.map_or(true, |last| date <= last)
    }

    pub fn is_fixed(&self, pool_ident: &str) -> bool { self.fixed_emissions.contains_key(pool_ident) }

    pub fn fixed_emission_total(&self) -> u64 { self.fixed_emissions.values().sum() }

    pub fn remap<'a>(&'a self, pool_ident: &'a str) -> &'a str {
        self.delegation_remap
            .get(pool_ident)
            .map(String::as_str)
            .unwrap_or(pool_ident)
    }
}

/// Incentive program distributing a fixed emission among delegators over a period.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase", default)
)]
pub struct IncentiveProgram {
    pub id: String,
    pub first_daily_rewards: NaiveDate,
    pub last_daily_rewards: Option<NaiveDate>,
    pub staked_asset: AssetId,
    pub emitted_asset: AssetId,
    pub staked_reference_pool: String,
    pub emitted_reference_pool: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase", default)
)]
pub struct Pool {
    pub pool_ident: String,
    pub version: String,
    pub transaction_hash: String,
    pub slot: u64,
    pub total_lp_tokens: u64,
    pub lp_asset: AssetId,
    pub asset_a: AssetId,
    pub asset_a_quantity: u64,
    pub asset_b: AssetId,
    pub asset_b_quantity: u64,
}

impl Pool {
    pub fn has_asset(&self, asset: &AssetId) -> bool { self.asset_a == *asset || self.asset_b == *asset }

    /// Quantity of `asset` backing `lp_amount` LP tokens, or `None` if the pool doesn't hold the
    /// asset or has no liquidity left.
    pub fn share_of(&self, asset: &AssetId, lp_amount: u64) -> Option<u64> {
        if self.total_lp_tokens == 0 {
            return None;
        }
        let reserve = if self.asset_a == *asset {
            self.asset_a_quantity
        } else if self.asset_b == *asset {
            self.asset_b_quantity
        } else {
            return None;
        };
        Some(crate::math::mul_div(lp_amount, reserve, self.total_lp_tokens))
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase", default)
)]
pub struct Delegation {
    pub program: String,
    pub pool_ident: String,
    pub weight: u32,
}

/// UTXO locked at the stake contract, together with the delegation it carries.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct Position {
    pub owner_id: String,
    pub owner: MultisigScript,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transaction_hash: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub slot: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spent_transaction: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spent_slot: u64,
    pub value: Value,
    #[cfg_attr(feature = "serde", serde(default))]
    pub delegation: Vec<Delegation>,
}

impl Position {
    pub fn is_spent(&self) -> bool { self.spent_transaction.is_some() }

    /// Slot range `[start, end)` during which the position was locked, truncated to the given
    /// window. Returns `None` if the position doesn't overlap the window.
    pub fn locked_within(&self, min_slot: u64, max_slot: u64) -> Option<(u64, u64)> {
        let start = self.slot.max(min_slot);
        let end = if !self.is_spent() || self.spent_slot > max_slot { max_slot } else { self.spent_slot };
        (end > start).then_some((start, end))
    }

    /// Whether the position is still locked at the snapshot slot.
    pub fn is_active_at(&self, snapshot_slot: u64) -> bool {
        !self.is_spent() || (self.slot < snapshot_slot && self.spent_slot >= snapshot_slot)
    }
}

/// Reward earned by an owner from a single program on a single date.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct Earning {
    pub owner_id: String,
    pub owner: Option<MultisigScript>,
    pub program: String,
    pub earned_date: NaiveDate,
    pub expiration_date: Option<DateTime<Utc>>,
    pub value: Value,
    pub value_by_lp_token: BTreeMap<AssetId, Value>,
}

/// Unique owners of a set of positions.
pub fn owners(positions: &[Position]) -> BTreeMap<String, MultisigScript> {
    positions
        .iter()
        .map(|position| (position.owner_id.clone(), position.owner.clone()))
        .collect()
}

/// Pool idents referenced by a program's delegations in a set of positions.
pub fn delegated_pools(program_id: &str, positions: &[Position]) -> BTreeSet<String> {
    positions
        .iter()
        .flat_map(|position| &position.delegation)
        .filter(|delegation| delegation.program == program_id)
        .map(|delegation| delegation.pool_ident.clone())
        .collect()
}
