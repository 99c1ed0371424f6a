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

//! Incentive programs: a fixed emission split among everyone delegating stake over a period,
//! in proportion to the amount of staked asset and the time it stayed locked.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::math::mul_div;
use crate::{AssetId, CalcError, Earning, IncentiveProgram, MultisigScript, PoolLookup, Position, Value};

#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase", default)
)]
pub struct IncentiveOutputs {
    pub timestamp: Option<DateTime<Utc>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_emissions: u64,
    pub emitted_asset: AssetId,
    pub emitted_asset_lovelace_value: u64,
    pub staked_asset_lovelace_value: u64,

    pub total_delegators: u64,
    pub delegator_weights: BTreeMap<String, u64>,
    pub emissions_by_owner: BTreeMap<String, u64>,

    pub earnings: Vec<Earning>,
}

pub fn positions_to_owners(positions: &[Position]) -> BTreeMap<String, MultisigScript> {
    crate::types::owners(positions)
}

/// Time-weighted delegation of each owner over the `[start_slot, end_slot)` window, and the
/// total weight.
///
/// Positions count if they delegate to any pool at all. The weight of a position is its staked
/// asset, including the staked side of its LP tokens, scaled by the fraction of the window
/// during which it was locked.
pub fn delegation_weights(
    program: &IncentiveProgram,
    positions: &[Position],
    start_slot: u64,
    end_slot: u64,
    lookup: &impl PoolLookup,
) -> Result<(BTreeMap<String, u64>, u64), CalcError> {
    let mut weights = BTreeMap::<String, u64>::new();
    let mut total = 0u64;
    let window = end_slot.saturating_sub(start_slot);
    for position in positions.iter().filter(|position| !position.delegation.is_empty()) {
        let Some((start, end)) = position.locked_within(start_slot, end_slot) else {
            continue;
        };

        let mut staked = position.value.amount_of(&program.staked_asset);
        for (asset, qty) in position.value.iter() {
            if !lookup.is_lp_token(asset) {
                continue;
            }
            let pool = lookup
                .pool_by_lp_token(asset)
                .map_err(|err| CalcError::LpLookup(asset.clone(), err))?;
            if let Some(share) = pool.share_of(&program.staked_asset, *qty) {
                staked = staked.saturating_add(share);
            }
        }

        let weight = mul_div(staked, end - start, window);
        if weight == 0 {
            continue;
        }
        total = total.saturating_add(weight);
        *weights.entry(position.owner_id.clone()).or_default() += weight;
    }
    Ok((weights, total))
}

/// Splits `emission` in proportion to the owners' weights.
///
/// The rounding remainder goes one unit each to the owners with the smallest allocation.
pub fn split_emission_per_owner(
    emission: u64,
    weights: &BTreeMap<String, u64>,
    total: u64,
) -> BTreeMap<String, u64> {
    if total == 0 {
        return empty!();
    }
    let mut by_owner = weights
        .iter()
        .map(|(owner_id, weight)| (owner_id.clone(), mul_div(*weight, emission, total)))
        .collect::<BTreeMap<_, _>>();
    let mut remainder = emission.saturating_sub(by_owner.values().sum());

    let mut owners = by_owner.iter().map(|(owner_id, amount)| (*amount, owner_id.clone())).collect::<Vec<_>>();
    owners.sort();
    for (_, owner_id) in owners {
        if remainder == 0 {
            break;
        }
        if let Some(amount) = by_owner.get_mut(&owner_id) {
            *amount += 1;
            remainder -= 1;
        }
    }
    by_owner
}

/// One earning per owner, in owner id order.
pub fn emissions_to_earnings(
    program: &IncentiveProgram,
    date: NaiveDate,
    emissions_by_owner: &BTreeMap<String, u64>,
    owners: &BTreeMap<String, MultisigScript>,
) -> Vec<Earning> {
    emissions_by_owner
        .iter()
        .map(|(owner_id, amount)| Earning {
            owner_id: owner_id.clone(),
            owner: owners.get(owner_id).cloned(),
            program: program.id.clone(),
            earned_date: date,
            expiration_date: None,
            value: Value::new().with(program.emitted_asset.clone(), *amount),
            value_by_lp_token: empty!(),
        })
        .collect()
}

/// Lovelace value of `amount` of `asset`, priced by an ADA reference pool.
pub fn estimate_lovelace_value(
    amount: u64,
    asset: &AssetId,
    pool_ident: &str,
    lookup: &impl PoolLookup,
) -> Result<u64, CalcError> {
    let pool = lookup
        .pool_by_ident(pool_ident)
        .map_err(|err| CalcError::PoolLookup(pool_ident.to_owned(), err))?;
    if !pool.asset_a.is_ada() {
        return Err(CalcError::NonAdaReferencePool(pool_ident.to_owned()));
    }
    if asset.is_ada() {
        return Ok(amount);
    }
    if *asset != pool.asset_b {
        return Err(CalcError::WrongReferenceAsset(pool_ident.to_owned(), pool.asset_b, asset.clone()));
    }
    if pool.asset_b_quantity == 0 {
        return Err(CalcError::EmptyReferencePool(pool_ident.to_owned()));
    }
    Ok(mul_div(amount, pool.asset_a_quantity, pool.asset_b_quantity))
}

/// Splits `emission` among the delegators of the period between `start_slot` and `end_slot`.
#[allow(clippy::too_many_arguments)]
pub fn calculate_earnings(
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_slot: u64,
    end_slot: u64,
    emission: u64,
    program: &IncentiveProgram,
    positions: &[Position],
    lookup: &impl PoolLookup,
) -> Result<IncentiveOutputs, CalcError> {
    debug!(
        "Calculating incentive {} from {start_date} to {end_date} over {} position(s)",
        program.id,
        positions.len()
    );
    let (weights, total) = delegation_weights(program, positions, start_slot, end_slot, lookup)?;
    let emissions_by_owner = split_emission_per_owner(emission, &weights, total);
    let earnings =
        emissions_to_earnings(program, end_date, &emissions_by_owner, &positions_to_owners(positions));

    let emitted_value =
        estimate_lovelace_value(emission, &program.emitted_asset, &program.emitted_reference_pool, lookup)?;
    let staked_value =
        estimate_lovelace_value(total, &program.staked_asset, &program.staked_reference_pool, lookup)?;
    info!("Incentive {} emits {emission} to {} delegator(s)", program.id, weights.len());

    Ok(IncentiveOutputs {
        timestamp: Some(Utc::now()),
        start_date: Some(start_date),
        end_date: Some(end_date),
        total_emissions: emission,
        emitted_asset: program.emitted_asset.clone(),
        emitted_asset_lovelace_value: emitted_value,
        staked_asset_lovelace_value: staked_value,
        total_delegators: weights.len() as u64,
        delegator_weights: weights,
        emissions_by_owner,
        earnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::mock::MockLookup;
    use crate::{Delegation, LookupError, Pool};

    const MONTH: u64 = 2_592_000;

    fn program() -> IncentiveProgram {
        IncentiveProgram {
            id: s!("TestIncentive"),
            first_daily_rewards: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            last_daily_rewards: NaiveDate::from_ymd_opt(2099, 1, 1),
            staked_asset: AssetId::from("Staked"),
            emitted_asset: AssetId::from("Emitted"),
            staked_reference_pool: s!("X"),
            emitted_reference_pool: s!("Y"),
        }
    }

    fn delegation() -> Vec<Delegation> {
        vec![Delegation { program: s!("A"), pool_ident: s!("B"), weight: 10 }]
    }

    fn position(owner: &str, staked: u64, delegation: Vec<Delegation>) -> Position {
        Position {
            owner_id: owner.to_owned(),
            owner: MultisigScript::signature(owner.as_bytes().to_vec()),
            transaction_hash: none!(),
            slot: 0,
            spent_transaction: None,
            spent_slot: 0,
            value: Value::new().with("Staked", staked),
            delegation,
        }
    }

    fn timed(owner: &str, staked: u64, start: u64, end: u64) -> Position {
        Position {
            slot: start,
            spent_slot: end,
            spent_transaction: Some(s!("SPENT")),
            ..position(owner, staked, delegation())
        }
    }

    fn lp_pool() -> MockLookup {
        MockLookup::new([("X", Pool {
            pool_ident: s!("X"),
            lp_asset: AssetId::from("LP_X"),
            asset_a: AssetId::ada(),
            asset_b: AssetId::from("Staked"),
            total_lp_tokens: 500,
            asset_a_quantity: 1000,
            asset_b_quantity: 1000,
            ..default!()
        })])
    }

    fn lp_holding() -> Value { Value::lovelace(100).with("Staked", 100).with("LP_X", 100) }

    #[test]
    fn owners() {
        let positions = [position("A", 100, vec![]), position("A", 200, vec![]), position("B", 150, vec![])];
        let owners = positions_to_owners(&positions);
        assert_eq!(owners.len(), 2);
        assert_eq!(owners["A"], MultisigScript::signature(b"A".to_vec()));
        assert!(!owners.contains_key("C"));
    }

    #[test]
    fn weights() {
        let positions = [
            position("A", 100, delegation()),
            position("A", 200, delegation()),
            position("B", 150, delegation()),
            position("C", 150, vec![]),
            position("D", 0, delegation()),
        ];
        let (weights, total) = delegation_weights(&program(), &positions, 0, MONTH, &MockLookup::default()).unwrap();
        assert_eq!(total, 450);
        assert_eq!(weights, bmap! { s!("A") => 300, s!("B") => 150 });
    }

    #[test]
    fn weights_with_lp() {
        let mut positions = [position("A", 100, delegation()), position("A", 200, delegation()), position("B", 150, delegation())];
        positions[0].value = lp_holding();
        let (weights, total) = delegation_weights(&program(), &positions, 0, MONTH, &lp_pool()).unwrap();
        assert_eq!(total, 650);
        assert_eq!(weights, bmap! { s!("A") => 500, s!("B") => 150 });
    }

    #[test]
    fn weights_of_timed_positions() {
        let mut positions = [
            timed("A", 100, 0, 648_000),
            timed("A", 200, 648_000, 1_296_000),
            timed("B", 150, 0, 4_592_000),
        ];
        positions[0].value = lp_holding();
        let (weights, total) = delegation_weights(&program(), &positions, 0, MONTH, &lp_pool()).unwrap();
        assert_eq!(weights, bmap! { s!("A") => 300 / 4 + 200 / 4, s!("B") => 150 });
        assert_eq!(total, 275);
    }

    #[test]
    fn split() {
        let weights = bmap! { s!("A") => 150, s!("B") => 125 };
        let split = split_emission_per_owner(100_000_000, &weights, 275);
        assert_eq!(split, bmap! { s!("A") => 54_545_454, s!("B") => 45_454_546 });
        assert!(split_emission_per_owner(100, &weights, 0).is_empty());
    }

    #[test]
    fn lovelace_value() {
        let lookup = MockLookup::new([("X", Pool {
            pool_ident: s!("X"),
            lp_asset: AssetId::from("LP_X"),
            asset_a: AssetId::ada(),
            asset_b: AssetId::from("Staked"),
            total_lp_tokens: 500,
            asset_a_quantity: 2_116_632_505_378,
            asset_b_quantity: 153_408_311_896_675,
            ..default!()
        })]);
        let staked = AssetId::from("Staked");
        assert_eq!(estimate_lovelace_value(191_000_000_000_000, &staked, "X", &lookup), Ok(2_635_299_245_059));
        assert_eq!(estimate_lovelace_value(42, &AssetId::ada(), "X", &lookup), Ok(42));
        assert_eq!(
            estimate_lovelace_value(42, &AssetId::from("Other"), "X", &lookup),
            Err(CalcError::WrongReferenceAsset(s!("X"), staked, AssetId::from("Other")))
        );
        assert_eq!(
            estimate_lovelace_value(42, &AssetId::ada(), "Y", &lookup),
            Err(CalcError::PoolLookup(s!("Y"), LookupError::UnknownPool(s!("Y"))))
        );
    }

    #[test]
    fn lovelace_value_needs_ada_pool() {
        let lookup = MockLookup::new([("X", Pool { asset_a: AssetId::from("Staked"), ..default!() })]);
        assert_eq!(
            estimate_lovelace_value(1, &AssetId::ada(), "X", &lookup),
            Err(CalcError::NonAdaReferencePool(s!("X")))
        );
    }

    #[test]
    fn full_calculation() {
        let mut program = program();
        program.emitted_reference_pool = s!("X");
        program.emitted_asset = AssetId::from("Staked");
        let positions = [position("A", 150, delegation()), position("B", 125, delegation())];
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();

        let outputs = calculate_earnings(start, end, 0, MONTH, 100_000_000, &program, &positions, &lp_pool()).unwrap();
        assert_eq!(outputs.total_delegators, 2);
        assert_eq!(outputs.emitted_asset_lovelace_value, 100_000_000);
        assert_eq!(outputs.staked_asset_lovelace_value, 275);
        assert_eq!(outputs.earnings.len(), 2);
        assert_eq!(outputs.earnings[0].owner_id, "A");
        assert_eq!(outputs.earnings[0].earned_date, end);
        assert_eq!(outputs.earnings[1].value, Value::new().with("Staked", 45_454_546));
        assert_eq!(outputs.emissions_by_owner.values().sum::<u64>(), 100_000_000);
    }
}
