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

//! Daily yield farming calculation.
//!
//! Every day the staked asset held at the locking contract is delegated to liquidity pools.
//! Pools which keep enough of their LP tokens locked qualify, the most delegated of them are
//! selected for emissions, and each pool's emission is then split among the owners of its
//! locked LP tokens in proportion to the time-weighted amount they kept locked.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::math::{at_least_integer_percent, mul_div};
use crate::types::owners;
use crate::{AssetId, CalcError, Earning, MultisigScript, Pool, PoolLookup, Position, Value, YieldProgram};

/// Results of a single day of a yield program, also used as the history of the following days.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase", default)
)]
pub struct YieldOutputs {
    pub timestamp: Option<DateTime<Utc>>,

    pub total_delegations: u64,
    pub delegation_by_pool: BTreeMap<String, u64>,

    pub qualifying_delegation_by_pool: BTreeMap<String, u64>,
    pub pool_disqualification_reasons: BTreeMap<String, String>,

    pub num_delegation_days: usize,
    pub delegation_over_window_by_pool: BTreeMap<String, u64>,

    pub pools_eligible_for_emissions: BTreeMap<String, u64>,

    #[cfg_attr(feature = "serde", serde(rename = "lockedLPByPool"))]
    pub locked_lp_by_pool: BTreeMap<String, u64>,
    #[cfg_attr(feature = "serde", serde(rename = "totalLPByPool"))]
    pub total_lp_by_pool: BTreeMap<String, u64>,

    pub estimated_locked_lovelace: u64,
    pub estimated_locked_lovelace_by_pool: BTreeMap<String, u64>,

    pub total_emissions: u64,
    pub untruncated_emissions_by_pool: BTreeMap<String, u64>,
    pub emissions_by_pool: BTreeMap<String, u64>,
    pub emissions_by_owner: BTreeMap<String, u64>,

    pub estimated_emissions_lovelace_value: u64,
    pub estimated_emissions_lovelace_by_pool: BTreeMap<String, u64>,

    pub earnings: Vec<Earning>,
}

/// LP tokens locked at a snapshot slot, together with an estimate of their lovelace value.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct LpSnapshot {
    pub locked_lp_by_pool: BTreeMap<String, u64>,
    pub total_lp_by_pool: BTreeMap<String, u64>,
    pub value_by_pool: BTreeMap<String, u64>,
    pub total_value: u64,
}

fn lp_pool(lookup: &impl PoolLookup, lp_token: &AssetId) -> Result<Pool, CalcError> {
    lookup
        .pool_by_lp_token(lp_token)
        .map_err(|err| CalcError::LpLookup(lp_token.clone(), err))
}

fn ident_pool(lookup: &impl PoolLookup, pool_ident: &str) -> Result<Pool, CalcError> {
    lookup
        .pool_by_ident(pool_ident)
        .map_err(|err| CalcError::PoolLookup(pool_ident.to_owned(), err))
}

/// Amount of staked asset each pool is delegated, and the total amount delegated.
///
/// A position's delegation power is its staked asset plus the staked-side share of the LP
/// tokens it holds. Positions without a weighted delegation for the program count towards the
/// unallocated pool `""`.
pub fn total_delegations(
    program: &YieldProgram,
    positions: &[Position],
    lookup: &impl PoolLookup,
) -> Result<(BTreeMap<String, u64>, u64), CalcError> {
    let mut by_pool = BTreeMap::<String, u64>::new();

    // Programs without a staked asset simply split emissions among the listed pools. The total
    // counts every listed entry, repeated ones included.
    if program.staked_asset.is_empty() {
        let eligible = program.eligible_pools.as_deref().unwrap_or_default();
        for pool in eligible {
            by_pool.insert(pool.clone(), 1);
        }
        return Ok((by_pool, eligible.len() as u64));
    }

    let mut total = 0u64;
    for position in positions {
        let mut amount = position.value.amount_of(&program.staked_asset);
        for (asset, qty) in position.value.iter() {
            if !lookup.is_lp_token(asset) {
                continue;
            }
            let pool = lp_pool(lookup, asset)?;
            if let Some(share) = pool.share_of(&program.staked_asset, *qty) {
                amount = amount.saturating_add(share);
            }
        }
        total = total.saturating_add(amount);

        let delegations = position
            .delegation
            .iter()
            .filter(|delegation| delegation.program == program.id)
            .collect::<Vec<_>>();
        let total_weight: u64 = delegations.iter().map(|d| d.weight as u64).sum();
        if total_weight == 0 {
            *by_pool.entry(none!()).or_default() += amount;
            continue;
        }

        let mut allocated = 0u64;
        for delegation in &delegations {
            let share = mul_div(amount, delegation.weight as u64, total_weight);
            allocated += share;
            *by_pool.entry(program.remap(&delegation.pool_ident).to_owned()).or_default() += share;
        }
        let remainder = amount - allocated;
        for delegation in delegations.iter().cycle().take(remainder as usize) {
            *by_pool.entry(program.remap(&delegation.pool_ident).to_owned()).or_default() += 1;
        }
    }

    trace!("Delegation by pool for program {}: {by_pool:?}", program.id);
    Ok((by_pool, total))
}

/// LP tokens locked at the contract as of `max_slot`.
pub fn lp_at_snapshot(
    max_slot: u64,
    positions: &[Position],
    lookup: &impl PoolLookup,
) -> Result<LpSnapshot, CalcError> {
    let mut snapshot = LpSnapshot::default();
    for position in positions.iter().filter(|position| position.is_active_at(max_slot)) {
        for (asset, qty) in position.value.iter() {
            if !lookup.is_lp_token(asset) {
                continue;
            }
            let pool = lp_pool(lookup, asset)?;
            *snapshot.locked_lp_by_pool.entry(pool.pool_ident.clone()).or_default() += qty;
            snapshot.total_lp_by_pool.insert(pool.pool_ident.clone(), pool.total_lp_tokens);
            if pool.asset_a.is_ada() && pool.total_lp_tokens > 0 {
                let lovelace = mul_div(*qty, pool.asset_a_quantity, pool.total_lp_tokens);
                let value = lovelace.saturating_mul(2);
                *snapshot.value_by_pool.entry(pool.pool_ident).or_default() += value;
                snapshot.total_value = snapshot.total_value.saturating_add(value);
            }
        }
    }
    Ok(snapshot)
}

/// Checks a pool against the program's eligibility rules, returning whether it qualifies and
/// the reasons it doesn't.
pub fn is_pool_qualified(program: &YieldProgram, pool: &Pool, locked_lp: u64) -> (bool, String) {
    if pool.total_lp_tokens == 0 {
        return (false, s!("pool has 0 lp tokens"));
    }
    if !at_least_integer_percent(locked_lp, pool.total_lp_tokens, program.min_lp_integer_percent) {
        return (false, format!("less than {}% of LP tokens locked", program.min_lp_integer_percent));
    }

    // Without any eligibility list every pool is a candidate; any list turns on opt-in mode.
    let mut qualified = program.eligible_versions.is_none()
        && program.eligible_pools.is_none()
        && program.eligible_assets.is_none()
        && program.eligible_pairs.is_none();
    let mut reason = String::new();

    if let Some(versions) = &program.eligible_versions {
        if versions.contains(&pool.version) {
            qualified = true;
        } else {
            reason += &format!(
                "Program lists eligible versions, but doesn't list this version ({}); ",
                pool.version
            );
        }
    }
    if let Some(pools) = &program.eligible_pools {
        if pools.contains(&pool.pool_ident) {
            qualified = true;
        } else {
            reason += "Program lists eligible pools, but doesn't list this pool; ";
        }
    }
    if let Some(assets) = &program.eligible_assets {
        if assets.iter().any(|asset| pool.has_asset(asset)) {
            qualified = true;
        } else {
            reason += "Program lists eligible assets, but doesn't list either asset from this pool; ";
        }
    }
    if let Some(pairs) = &program.eligible_pairs {
        if pairs.iter().any(|pair| pair.matches(pool)) {
            qualified = true;
        } else {
            reason += "Program lists eligible pairs, but doesn't list these two assets as an eligible pair; ";
        }
    }

    if let Some(versions) = &program.disqualified_versions {
        if versions.contains(&pool.version) {
            qualified = false;
            reason += &format!("Version ({}) is explicitly disqualified; ", pool.version);
        }
    }
    if let Some(pools) = &program.disqualified_pools {
        if pools.contains(&pool.pool_ident) {
            qualified = false;
            reason += "Pool is explicitly disqualified; ";
        }
    }
    if let Some(assets) = &program.disqualified_assets {
        if assets.iter().any(|asset| pool.has_asset(asset)) {
            qualified = false;
            reason += "One of the assets in this pool is explicitly disqualified; ";
        }
    }
    if let Some(pairs) = &program.disqualified_pairs {
        if pairs.iter().any(|pair| pair.matches(pool)) {
            qualified = false;
            reason += "Pair is explicitly disqualified; ";
        }
    }

    (qualified, reason)
}

/// Delegation to pools which qualify for the program. The delegation of disqualified pools is
/// moved to the unallocated pool `""`, and the reason of disqualification is recorded.
///
/// Only pools with LP tokens locked at the contract are considered.
pub fn disqualify_pools(
    program: &YieldProgram,
    locked_lp_by_pool: &BTreeMap<String, u64>,
    delegation_by_pool: &BTreeMap<String, u64>,
    lookup: &impl PoolLookup,
) -> Result<(BTreeMap<String, u64>, BTreeMap<String, String>), CalcError> {
    let mut qualifying = BTreeMap::<String, u64>::new();
    let mut reasons = BTreeMap::new();
    for (pool_ident, locked) in locked_lp_by_pool {
        let pool = ident_pool(lookup, pool_ident)?;
        let delegation = delegation_by_pool.get(pool_ident).copied().unwrap_or_default();
        let (qualified, reason) = is_pool_qualified(program, &pool, *locked);
        if qualified {
            *qualifying.entry(pool_ident.clone()).or_default() += delegation;
        } else {
            debug!("Pool {pool_ident} is disqualified from program {}: {reason}", program.id);
            *qualifying.entry(none!()).or_default() += delegation;
            reasons.insert(pool_ident.clone(), reason);
        }
    }
    Ok((qualifying, reasons))
}

/// Sums today's qualifying delegation with the qualifying delegation of the previous days in
/// the program's delegation window.
pub fn sum_delegation_window(
    program: &YieldProgram,
    qualifying_delegation_by_pool: &BTreeMap<String, u64>,
    previous: &[YieldOutputs],
) -> Result<BTreeMap<String, u64>, CalcError> {
    let window = program.consecutive_delegation_window;
    if previous.len() > window.saturating_sub(1) {
        return Err(CalcError::TooManySnapshots(window, previous.len()));
    }

    let mut windowed = BTreeMap::<String, u64>::new();
    for day in previous.iter().map(|day| &day.qualifying_delegation_by_pool).chain([qualifying_delegation_by_pool]) {
        for (pool_ident, amount) in day {
            let entry = windowed.entry(pool_ident.clone()).or_default();
            *entry = entry.saturating_add(*amount);
        }
    }
    Ok(windowed)
}

/// Selects the pools receiving emissions today.
///
/// Nepotism pools are selected first. The remaining pools are taken in order of decreasing
/// delegation until either the maximum pool count is reached, or the selected pools hold the
/// configured share of the total delegation.
pub fn select_pools_for_emission(
    program: &YieldProgram,
    delegation_by_pool: &BTreeMap<String, u64>,
    lookup: &impl PoolLookup,
) -> Result<BTreeMap<String, u64>, CalcError> {
    let mut candidates = delegation_by_pool
        .iter()
        .filter(|(pool_ident, _)| !pool_ident.is_empty())
        .map(|(pool_ident, amount)| (pool_ident.as_str(), *amount))
        .collect::<Vec<_>>();

    // Ties are broken by the pool's total LP tokens, so only tied pools need to be fetched.
    let mut seen = BTreeSet::new();
    let tied = candidates
        .iter()
        .map(|(_, amount)| *amount)
        .filter(|amount| !seen.insert(*amount))
        .collect::<BTreeSet<_>>();
    let mut total_lp = BTreeMap::<&str, u64>::new();
    for (pool_ident, _) in candidates.iter().filter(|(_, amount)| tied.contains(amount)) {
        total_lp.insert(*pool_ident, ident_pool(lookup, pool_ident)?.total_lp_tokens);
    }
    candidates.sort_by_key(|(pool_ident, amount)| {
        (Reverse(*amount), total_lp.get(pool_ident).copied().unwrap_or_default(), *pool_ident)
    });

    let total_delegation: u64 = candidates.iter().map(|(_, amount)| amount).sum();
    let mut selected = BTreeMap::new();
    for pool_ident in &program.nepotism_pools {
        if let Some((_, amount)) = candidates.iter().find(|(ident, _)| *ident == pool_ident.as_str()) {
            selected.insert(pool_ident.clone(), *amount);
        }
    }

    let mut selected_total: u64 = selected.values().sum();
    for (pool_ident, amount) in candidates {
        if selected.contains_key(pool_ident) {
            continue;
        }
        selected.insert(pool_ident.to_owned(), amount);
        selected_total += amount;
        if selected.len() == program.max_pool_count {
            break;
        }
        if at_least_integer_percent(selected_total, total_delegation, program.max_pool_integer_percent) {
            break;
        }
    }
    debug!("Selected {} pool(s) for emissions of program {}", selected.len(), program.id);
    Ok(selected)
}

/// Splits the daily emission among the selected pools.
///
/// Fixed emissions are paid first; the rest is split in proportion to the pools' delegation.
/// The rounding remainder goes one unit at a time to the pools with the largest delegation.
pub fn distribute_emissions_to_pools(
    program: &YieldProgram,
    eligible_pools: &BTreeMap<String, u64>,
) -> Result<BTreeMap<String, u64>, CalcError> {
    let fixed_total = program
        .fixed_emissions
        .values()
        .try_fold(0u64, |sum, amount| sum.checked_add(*amount))
        .unwrap_or(u64::MAX);
    if fixed_total > program.daily_emission {
        return Err(CalcError::FixedEmissionsExceedDaily(fixed_total, program.daily_emission));
    }

    let mut emissions = program.fixed_emissions.clone();
    let mut weights = eligible_pools
        .iter()
        .filter(|(pool_ident, _)| !program.is_fixed(pool_ident))
        .map(|(pool_ident, weight)| (pool_ident.as_str(), *weight))
        .collect::<Vec<_>>();
    let total_weight = weights.iter().map(|(_, weight)| *weight as u128).sum::<u128>();
    if total_weight == 0 {
        return Ok(emissions);
    }

    let dynamic = program.daily_emission - fixed_total;
    let mut allocated = 0u64;
    for (pool_ident, weight) in &weights {
        let amount = (dynamic as u128 * *weight as u128 / total_weight) as u64;
        allocated += amount;
        *emissions.entry((*pool_ident).to_owned()).or_default() += amount;
    }

    weights.sort_by_key(|(pool_ident, weight)| (Reverse(*weight), *pool_ident));
    let remainder = dynamic - allocated;
    for (pool_ident, _) in weights.iter().cycle().take(remainder as usize) {
        *emissions.entry((*pool_ident).to_owned()).or_default() += 1;
    }
    Ok(emissions)
}

/// Caps the emission of every non-fixed pool at the program's emission cap.
pub fn truncate_emissions(program: &YieldProgram, emissions: &BTreeMap<String, u64>) -> BTreeMap<String, u64> {
    emissions
        .iter()
        .map(|(pool_ident, amount)| {
            let amount = if program.emission_cap == 0 || program.is_fixed(pool_ident) {
                *amount
            } else {
                (*amount).min(program.emission_cap)
            };
            (pool_ident.clone(), amount)
        })
        .collect()
}

/// LP tokens held by each owner and in total, weighted by the fraction of the `[min_slot,
/// max_slot)` window they were locked for.
pub fn lp_days_by_owner_and_asset(
    positions: &[Position],
    lookup: &impl PoolLookup,
    min_slot: u64,
    max_slot: u64,
) -> (BTreeMap<String, BTreeMap<AssetId, u64>>, BTreeMap<AssetId, u64>) {
    let mut by_owner = BTreeMap::<String, BTreeMap<AssetId, u64>>::new();
    let mut by_asset = BTreeMap::<AssetId, u64>::new();
    if max_slot <= min_slot {
        return (by_owner, by_asset);
    }
    let window = max_slot - min_slot;
    for position in positions {
        let Some((start, end)) = position.locked_within(min_slot, max_slot) else {
            continue;
        };
        for (asset, qty) in position.value.iter() {
            if !lookup.is_lp_token(asset) {
                continue;
            }
            let weight = mul_div(end - start, *qty, window);
            *by_owner
                .entry(position.owner_id.clone())
                .or_default()
                .entry(asset.clone())
                .or_default() += weight;
            *by_asset.entry(asset.clone()).or_default() += weight;
        }
    }
    (by_owner, by_asset)
}

/// Re-keys per-pool amounts by the pools' LP tokens. Zero amounts are dropped.
pub fn regroup_by_asset(
    by_pool: &BTreeMap<String, u64>,
    lookup: &impl PoolLookup,
) -> Result<BTreeMap<AssetId, u64>, CalcError> {
    let mut by_asset = BTreeMap::new();
    for (pool_ident, amount) in by_pool.iter().filter(|(_, amount)| **amount > 0) {
        let pool = ident_pool(lookup, pool_ident)?;
        *by_asset.entry(pool.lp_asset).or_default() += amount;
    }
    Ok(by_asset)
}

/// Re-keys per-LP token amounts by the pools issuing them. Zero amounts are dropped.
pub fn regroup_by_pool(
    by_asset: &BTreeMap<AssetId, u64>,
    lookup: &impl PoolLookup,
) -> Result<BTreeMap<String, u64>, CalcError> {
    let mut by_pool = BTreeMap::new();
    for (asset, amount) in by_asset.iter().filter(|(_, amount)| **amount > 0) {
        let pool_ident = lookup
            .lp_token_to_pool_ident(asset)
            .map_err(|err| CalcError::LpLookup(asset.clone(), err))?;
        *by_pool.entry(pool_ident).or_default() += amount;
    }
    Ok(by_pool)
}

/// Splits each LP token's emission among its owners, in proportion to their LP days.
///
/// The rounding remainder of every LP token goes one unit at a time to all owners with LP days
/// in it, in owner id order, including those whose floored share is zero.
pub fn distribute_emissions_to_owners(
    lp_days_by_owner: &BTreeMap<String, BTreeMap<AssetId, u64>>,
    emissions_by_asset: &BTreeMap<AssetId, u64>,
    lp_days_by_asset: &BTreeMap<AssetId, u64>,
) -> BTreeMap<String, BTreeMap<AssetId, u64>> {
    let mut by_owner = BTreeMap::<String, BTreeMap<AssetId, u64>>::new();
    let mut allocated = BTreeMap::<AssetId, u64>::new();
    for (owner_id, lp_days) in lp_days_by_owner {
        for (asset, amount) in lp_days {
            let emission = emissions_by_asset.get(asset).copied().unwrap_or_default();
            let total = lp_days_by_asset.get(asset).copied().unwrap_or_default();
            let share = mul_div(emission, *amount, total);
            if share == 0 {
                continue;
            }
            *by_owner.entry(owner_id.clone()).or_default().entry(asset.clone()).or_default() += share;
            *allocated.entry(asset.clone()).or_default() += share;
        }
    }

    for (asset, emission) in emissions_by_asset {
        let allocated = allocated.get(asset).copied().unwrap_or_default();
        let remainder = emission.saturating_sub(allocated);
        if remainder == 0 || lp_days_by_asset.get(asset).copied().unwrap_or_default() == 0 {
            continue;
        }
        let holders = lp_days_by_owner
            .iter()
            .filter(|(_, lp_days)| lp_days.get(asset).is_some_and(|amount| *amount > 0))
            .map(|(owner_id, _)| owner_id)
            .collect::<Vec<_>>();
        for owner_id in holders.iter().cycle().take(remainder as usize) {
            *by_owner.entry((*owner_id).clone()).or_default().entry(asset.clone()).or_default() += 1;
        }
    }
    by_owner
}

/// Turns per-owner emissions into earnings, sorted by owner id, and per-owner totals.
pub fn emissions_to_earnings(
    date: NaiveDate,
    program: &YieldProgram,
    emissions_by_owner: &BTreeMap<String, BTreeMap<AssetId, u64>>,
    owners: &BTreeMap<String, MultisigScript>,
) -> (Vec<Earning>, BTreeMap<String, u64>) {
    let expiration_date = program.earning_expiration_days.map(|days| {
        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)) + Duration::days(days as i64)
    });

    let mut earnings = vec![];
    let mut totals = BTreeMap::new();
    for (owner_id, by_lp) in emissions_by_owner {
        if by_lp.is_empty() {
            continue;
        }
        let total = by_lp.values().sum::<u64>();
        totals.insert(owner_id.clone(), total);
        if total == 0 {
            continue;
        }
        earnings.push(Earning {
            owner_id: owner_id.clone(),
            owner: owners.get(owner_id).cloned(),
            program: program.id.clone(),
            earned_date: date,
            expiration_date,
            value: Value::new().with(program.emitted_asset.clone(), total),
            value_by_lp_token: by_lp
                .iter()
                .filter(|(_, amount)| **amount > 0)
                .map(|(asset, amount)| (asset.clone(), Value::new().with(program.emitted_asset.clone(), *amount)))
                .collect(),
        });
    }
    (earnings, totals)
}

/// Runs the whole daily calculation of a yield program.
///
/// `previous` holds the outputs of the preceding days of the delegation window. Days outside
/// of the program's reward period yield empty outputs; days on which no pool qualifies yield
/// outputs without emissions.
pub fn calculate_earnings(
    date: NaiveDate,
    start_slot: u64,
    end_slot: u64,
    program: &YieldProgram,
    previous: &[YieldOutputs],
    positions: &[Position],
    lookup: &impl PoolLookup,
) -> Result<YieldOutputs, CalcError> {
    if !program.is_active_on(date) {
        info!("Program {} is not active on {date}, nothing to calculate", program.id);
        return Ok(YieldOutputs::default());
    }

    debug!("Calculating earnings of program {} for {date} over {} position(s)", program.id, positions.len());
    let (delegation_by_pool, total_delegations) = total_delegations(program, positions, lookup)?;
    let snapshot = lp_at_snapshot(end_slot, positions, lookup)?;
    let (qualifying, reasons) =
        disqualify_pools(program, &snapshot.locked_lp_by_pool, &delegation_by_pool, lookup)?;
    let windowed = sum_delegation_window(program, &qualifying, previous)?;

    let mut outputs = YieldOutputs {
        timestamp: Some(Utc::now()),
        total_delegations,
        delegation_by_pool,
        qualifying_delegation_by_pool: qualifying,
        pool_disqualification_reasons: reasons,
        num_delegation_days: program.consecutive_delegation_window,
        delegation_over_window_by_pool: windowed,
        locked_lp_by_pool: snapshot.locked_lp_by_pool,
        total_lp_by_pool: snapshot.total_lp_by_pool,
        estimated_locked_lovelace: snapshot.total_value,
        estimated_locked_lovelace_by_pool: snapshot.value_by_pool,
        ..default!()
    };

    if outputs.delegation_over_window_by_pool.keys().all(String::is_empty) {
        warn!("No pool qualifies for program {} on {date}, emissions are withheld", program.id);
        return Ok(outputs);
    }

    let eligible = select_pools_for_emission(program, &outputs.delegation_over_window_by_pool, lookup)?;
    let untruncated = distribute_emissions_to_pools(program, &eligible)?;
    let emissions_by_pool = truncate_emissions(program, &untruncated);
    let emissions_by_asset = regroup_by_asset(&emissions_by_pool, lookup)?;

    let (lp_days_by_owner, lp_days_by_asset) =
        lp_days_by_owner_and_asset(positions, lookup, start_slot, end_slot);
    let emissions_by_owner =
        distribute_emissions_to_owners(&lp_days_by_owner, &emissions_by_asset, &lp_days_by_asset);

    if let Some(reference) = &program.reference_pool {
        let pool = ident_pool(lookup, reference)?;
        if pool.asset_b_quantity == 0 {
            return Err(CalcError::EmptyReferencePool(reference.clone()));
        }
        for (pool_ident, amount) in &emissions_by_pool {
            let lovelace = mul_div(*amount, pool.asset_a_quantity, pool.asset_b_quantity);
            outputs.estimated_emissions_lovelace_value += lovelace;
            *outputs.estimated_emissions_lovelace_by_pool.entry(pool_ident.clone()).or_default() += lovelace;
        }
    }

    let (earnings, totals) = emissions_to_earnings(date, program, &emissions_by_owner, &owners(positions));
    outputs.total_emissions = emissions_by_owner.values().flat_map(BTreeMap::values).sum();
    info!(
        "Program {} emits {} to {} owner(s) across {} pool(s) on {date}",
        program.id,
        outputs.total_emissions,
        earnings.len(),
        emissions_by_pool.len()
    );

    outputs.pools_eligible_for_emissions = eligible;
    outputs.untruncated_emissions_by_pool = untruncated;
    outputs.emissions_by_pool = emissions_by_pool;
    outputs.emissions_by_owner = totals;
    outputs.earnings = earnings;
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::lookup::mock::MockLookup;
    use crate::{AssetPair, Delegation};

    fn program(emission: u64) -> YieldProgram {
        YieldProgram {
            id: s!("Test"),
            first_daily_rewards: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            last_daily_rewards: NaiveDate::from_ymd_opt(2099, 1, 1),
            staked_asset: AssetId::from("Staked"),
            emitted_asset: AssetId::from("Emitted"),
            min_lp_integer_percent: 1,
            daily_emission: emission,
            ..default!()
        }
    }

    fn delegation(program: &str, pool: &str, weight: u32) -> Delegation {
        Delegation { program: program.to_owned(), pool_ident: pool.to_owned(), weight }
    }

    fn position(owner: &str, value: Value, delegation: Vec<Delegation>) -> Position {
        Position {
            owner_id: owner.to_owned(),
            owner: MultisigScript::signature(owner.as_bytes().to_vec()),
            transaction_hash: none!(),
            slot: 0,
            spent_transaction: None,
            spent_slot: 0,
            value,
            delegation,
        }
    }

    fn staked(owner: &str, amount: u64, delegation: Vec<Delegation>) -> Position {
        position(owner, Value::new().with("Staked", amount), delegation)
    }

    fn lp(owner: &str, slot: u64, spent: Option<u64>, value: Value) -> Position {
        Position {
            slot,
            spent_transaction: spent.map(|_| s!("spent")),
            spent_slot: spent.unwrap_or_default(),
            ..position(owner, value, vec![])
        }
    }

    fn map<K: Ord + From<&'static str>>(entries: &[(&'static str, u64)]) -> BTreeMap<K, u64> {
        entries.iter().map(|(k, v)| (K::from(*k), *v)).collect()
    }

    fn lp_pools() -> MockLookup {
        MockLookup::new([
            ("X", Pool { pool_ident: s!("X"), lp_asset: AssetId::from("LP_X"), ..default!() }),
            ("Y", Pool { pool_ident: s!("Y"), lp_asset: AssetId::from("LP_Y"), ..default!() }),
        ])
    }

    #[test]
    fn delegations() {
        let program = program(500_000_000_000);
        let id = program.id.as_str();
        let lookup = MockLookup::default();

        let (by_pool, total) =
            total_delegations(&program, &[staked("Me", 100_000, vec![delegation(id, "01", 1)])], &lookup).unwrap();
        assert_eq!(by_pool, map(&[("01", 100_000)]));
        assert_eq!(total, 100_000);

        let (by_pool, total) = total_delegations(&program, &[staked("Me", 100_000, vec![])], &lookup).unwrap();
        assert_eq!(by_pool, map(&[("", 100_000)]));
        assert_eq!(total, 100_000);

        let even = staked("Me", 100_000, vec![delegation(id, "01", 1), delegation(id, "02", 1)]);
        let (by_pool, _) = total_delegations(&program, &[even.clone()], &lookup).unwrap();
        assert_eq!(by_pool, map(&[("01", 50_000), ("02", 50_000)]));

        let uneven = staked("Me", 100_000, vec![delegation(id, "01", 1), delegation(id, "02", 2)]);
        let (by_pool, _) = total_delegations(&program, &[uneven], &lookup).unwrap();
        assert_eq!(by_pool, map(&[("01", 33_334), ("02", 66_666)]));

        let second = staked("Me", 200_000, vec![delegation(id, "02", 1), delegation(id, "03", 1)]);
        let (by_pool, total) = total_delegations(&program, &[even, second.clone()], &lookup).unwrap();
        assert_eq!(by_pool, map(&[("01", 50_000), ("02", 150_000), ("03", 100_000)]));
        assert_eq!(total, 300_000);

        let mixed = staked("Me", 100_000, vec![
            delegation(id, "01", 1),
            delegation("OTHER_PROGRAM", "99", 100),
            delegation(id, "02", 1),
        ]);
        let (by_pool, total) = total_delegations(&program, &[mixed, second], &lookup).unwrap();
        assert_eq!(by_pool, map(&[("01", 50_000), ("02", 150_000), ("03", 100_000)]));
        assert_eq!(total, 300_000);
    }

    #[test]
    fn delegations_with_lp_tokens() {
        let program = program(500_000_000_000);
        let lookup = MockLookup::new([("01", Pool {
            pool_ident: s!("01"),
            total_lp_tokens: 100_000,
            lp_asset: AssetId::from("LP_01"),
            asset_a: AssetId::default(),
            asset_a_quantity: 200_000,
            asset_b: AssetId::from("Staked"),
            asset_b_quantity: 100_000,
            ..default!()
        })]);
        let holder = position(
            "Me",
            Value::new().with("Staked", 100_000).with("LP_01", 50_000),
            vec![delegation("Test", "01", 1), delegation("Test", "02", 1)],
        );
        let (by_pool, total) = total_delegations(&program, &[holder], &lookup).unwrap();
        assert_eq!(by_pool, map(&[("01", 75_000), ("02", 75_000)]));
        assert_eq!(total, 150_000);
    }

    #[test]
    fn delegation_remap() {
        let mut program = program(1);
        program.delegation_remap.insert(s!("old"), s!("new"));
        let positions = [staked("Me", 10, vec![delegation("Test", "old", 1), delegation("Test", "new", 1)])];
        let (by_pool, _) = total_delegations(&program, &positions, &MockLookup::default()).unwrap();
        assert_eq!(by_pool, map(&[("new", 10)]));
    }

    #[test]
    fn delegations_without_staked_asset() {
        let mut program = program(1);
        program.staked_asset = AssetId::default();
        program.eligible_pools = Some(vec![s!("01"), s!("02")]);
        let (by_pool, total) = total_delegations(&program, &[], &MockLookup::default()).unwrap();
        assert_eq!(by_pool, map(&[("01", 1), ("02", 1)]));
        assert_eq!(total, 2);

        program.eligible_pools = Some(vec![s!("01"), s!("02"), s!("01")]);
        let (by_pool, total) = total_delegations(&program, &[], &MockLookup::default()).unwrap();
        assert_eq!(by_pool, map(&[("01", 1), ("02", 1)]));
        assert_eq!(total, 3);

        program.eligible_pools = None;
        let (by_pool, total) = total_delegations(&program, &[], &MockLookup::default()).unwrap();
        assert!(by_pool.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn delegation_sums_to_stake() {
        let program = program(1);
        let weights = [u32::MAX, 7, 0, 1 << 30, 12_345, u32::MAX - 1, 3];
        let delegations = weights
            .iter()
            .enumerate()
            .map(|(no, weight)| delegation("Test", &format!("{}", no % 4), *weight))
            .collect();
        let stake = 9_223_372_036_854_775_783;
        let (by_pool, total) = total_delegations(&program, &[staked("Me", stake, delegations)], &MockLookup::default())
            .unwrap();
        assert_eq!(by_pool.values().sum::<u64>(), stake);
        assert_eq!(total, stake);
    }

    #[test]
    fn window() {
        let mut program = program(1);
        program.consecutive_delegation_window = 2;
        let previous = [YieldOutputs { qualifying_delegation_by_pool: map(&[("B", 300), ("C", 400)]), ..default!() }];
        let windowed = sum_delegation_window(&program, &map(&[("A", 100), ("B", 200)]), &previous).unwrap();
        assert_eq!(windowed, map(&[("A", 100), ("B", 500), ("C", 400)]));

        program.consecutive_delegation_window = 1;
        assert_eq!(
            sum_delegation_window(&program, &map(&[("A", 100)]), &previous),
            Err(CalcError::TooManySnapshots(1, 1))
        );
        program.consecutive_delegation_window = 0;
        assert!(sum_delegation_window(&program, &map(&[("A", 100)]), &[]).is_ok());
    }

    #[test]
    fn snapshot() {
        let positions = [
            position("A", Value::new().with("LP_X", 100), vec![]),
            position("B", Value::new().with("LP_X", 200), vec![]),
            position("C", Value::new().with("LP_Y", 500), vec![]),
        ];
        let lookup = MockLookup::new([
            ("X", Pool {
                pool_ident: s!("X"),
                lp_asset: AssetId::from("LP_X"),
                total_lp_tokens: 500,
                asset_a_quantity: 1000,
                ..default!()
            }),
            ("Y", Pool {
                pool_ident: s!("Y"),
                lp_asset: AssetId::from("LP_Y"),
                total_lp_tokens: 1000,
                asset_a_quantity: 100,
                ..default!()
            }),
        ]);
        let snapshot = lp_at_snapshot(0, &positions, &lookup).unwrap();
        assert_eq!(snapshot.locked_lp_by_pool, map(&[("X", 300), ("Y", 500)]));
        assert_eq!(snapshot.total_lp_by_pool, map(&[("X", 500), ("Y", 1000)]));
        assert_eq!(snapshot.value_by_pool, map(&[("X", 1200), ("Y", 100)]));
        assert_eq!(snapshot.total_value, 1300);
    }

    #[test]
    fn snapshot_skips_unlocked_positions() {
        let lookup = MockLookup::new([("X", Pool {
            pool_ident: s!("X"),
            lp_asset: AssetId::from("LP_X"),
            total_lp_tokens: 500,
            ..default!()
        })]);
        let positions = [lp("A", 10, Some(50), Value::new().with("LP_X", 100)), lp("B", 10, None, Value::new().with("LP_X", 7))];
        let snapshot = lp_at_snapshot(100, &positions, &lookup).unwrap();
        assert_eq!(snapshot.locked_lp_by_pool, map(&[("X", 7)]));
    }

    fn pool(ident: &str, version: &str, a: &str, b: &str) -> Pool {
        Pool {
            pool_ident: ident.to_owned(),
            version: version.to_owned(),
            asset_a: AssetId::from(a),
            asset_b: AssetId::from(b),
            total_lp_tokens: 1500,
            ..default!()
        }
    }

    #[test]
    fn qualification() {
        let base = program(500_000);
        let a = pool("A", "V1", "A", "X");
        let b = pool("B", "V1", "B", "X");
        let c = pool("C", "V1", "C", "Y");
        let d = pool("D", "V3", "A", "X");
        let e = pool("D", "V3-stable", "A", "X");
        let check = |program: &YieldProgram, pool: &Pool| is_pool_qualified(program, pool, 500).0;

        assert!(is_pool_qualified(&base, &a, 150).0);
        assert!(check(&base, &a));
        assert_eq!(is_pool_qualified(&base, &a, 10), (false, s!("less than 1% of LP tokens locked")));
        assert_eq!(is_pool_qualified(&base, &Pool { total_lp_tokens: 0, ..a.clone() }, 10).1, "pool has 0 lp tokens");

        let program = YieldProgram { eligible_versions: Some(vec![s!("V1")]), ..base.clone() };
        assert!(check(&program, &a));
        assert!(!check(&program, &d));
        assert_eq!(
            is_pool_qualified(&program, &e, 500).1,
            "Program lists eligible versions, but doesn't list this version (V3-stable); "
        );

        let program = YieldProgram { eligible_versions: Some(vec![s!("V1"), s!("V3")]), ..base.clone() };
        assert!(check(&program, &a));
        assert!(check(&program, &d));
        assert!(!check(&program, &e));

        let program = YieldProgram { eligible_pools: Some(vec![s!("A")]), ..base.clone() };
        assert!(check(&program, &a));
        assert!(!check(&program, &b));

        let program = YieldProgram { eligible_assets: Some(vec![AssetId::from("A")]), ..base.clone() };
        assert!(check(&program, &a));
        assert!(!check(&program, &b));

        let program = YieldProgram { eligible_assets: Some(vec![AssetId::from("X")]), ..base.clone() };
        assert!(check(&program, &a));
        assert!(check(&program, &b));
        assert!(!check(&program, &c));

        let pair = AssetPair { asset_a: AssetId::from("A"), asset_b: AssetId::from("X") };
        let program = YieldProgram { eligible_pairs: Some(vec![pair]), ..base.clone() };
        assert!(check(&program, &a));
        assert!(!check(&program, &b));
        assert!(!check(&program, &c));

        let program = YieldProgram { disqualified_versions: Some(vec![s!("V1")]), ..base.clone() };
        assert!(!check(&program, &a));
        assert!(check(&program, &d));
        assert!(check(&program, &e));

        let program = YieldProgram { disqualified_versions: Some(vec![s!("V1"), s!("V3-stable")]), ..base.clone() };
        assert!(!check(&program, &a));
        assert!(check(&program, &d));
        assert_eq!(is_pool_qualified(&program, &e, 500), (false, s!("Version (V3-stable) is explicitly disqualified; ")));

        let program = YieldProgram { disqualified_pools: Some(vec![s!("A")]), ..base.clone() };
        assert!(!check(&program, &a));
        assert!(check(&program, &b));

        let program = YieldProgram { disqualified_assets: Some(vec![AssetId::from("X")]), ..base.clone() };
        assert!(!check(&program, &a));
        assert!(!check(&program, &b));
        assert!(check(&program, &c));

        let pair = AssetPair { asset_a: AssetId::from("B"), asset_b: AssetId::from("X") };
        let program = YieldProgram { disqualified_pairs: Some(vec![pair]), ..base };
        assert!(check(&program, &a));
        assert!(!check(&program, &b));
        assert!(check(&program, &c));
    }

    #[test]
    fn disqualified_delegation_is_unallocated() {
        let program = YieldProgram { disqualified_pools: Some(vec![s!("B")]), ..program(1) };
        let lookup = MockLookup::new([("A", pool("A", "V1", "A", "X")), ("B", pool("B", "V1", "B", "X"))]);
        let (qualifying, reasons) = disqualify_pools(
            &program,
            &map(&[("A", 500), ("B", 500)]),
            &map(&[("A", 10), ("B", 20), ("", 5)]),
            &lookup,
        )
        .unwrap();
        assert_eq!(qualifying, map(&[("A", 10), ("", 20)]));
        assert_eq!(reasons.get("B").map(String::as_str), Some("Pool is explicitly disqualified; "));
        assert!(!reasons.contains_key("A"));
    }

    #[test]
    fn pool_selection() {
        let mut program = program(500_000);
        program.max_pool_count = 2;
        program.max_pool_integer_percent = 100;
        let lookup = MockLookup::new(["A", "B", "C", "D", "E", "F"].map(|id| (id, Pool::default())));

        let selected = select_pools_for_emission(&program, &map(&[("A", 100), ("B", 200), ("C", 300)]), &lookup);
        assert_eq!(selected.unwrap(), map(&[("C", 300), ("B", 200)]));

        program.max_pool_integer_percent = 30;
        let selected = select_pools_for_emission(&program, &map(&[("A", 100), ("B", 101), ("C", 202)]), &lookup);
        assert_eq!(selected.unwrap(), map(&[("C", 202)]));

        program.max_pool_count = 10;
        program.max_pool_integer_percent = 33;
        let delegation = map(&[("A", 997), ("B", 998), ("C", 999), ("D", 1000), ("E", 1001), ("F", 1002)]);
        let selected = select_pools_for_emission(&program, &delegation, &lookup);
        assert_eq!(selected.unwrap(), map(&[("F", 1002), ("E", 1001)]));
    }

    #[test]
    fn pool_selection_with_nepotism() {
        let mut program = program(500_000);
        program.nepotism_pools = vec![s!("B")];
        program.max_pool_count = 2;
        program.max_pool_integer_percent = 20;
        let lookup = MockLookup::new(["A", "B", "C", "D"].map(|id| (id, Pool::default())));
        let delegation = map(&[("A", 50), ("B", 100), ("C", 200), ("D", 300), ("", 1000)]);
        let selected = select_pools_for_emission(&program, &delegation, &lookup);
        assert_eq!(selected.unwrap(), map(&[("D", 300), ("B", 100)]));
    }

    #[test]
    fn pool_selection_ties() {
        let mut program = program(1);
        program.max_pool_count = 1;
        let lookup = MockLookup::new([
            ("A", Pool { total_lp_tokens: 900, ..default!() }),
            ("B", Pool { total_lp_tokens: 100, ..default!() }),
        ]);
        let selected = select_pools_for_emission(&program, &map(&[("A", 50), ("B", 50)]), &lookup);
        assert_eq!(selected.unwrap(), map(&[("B", 50)]));

        let selected = select_pools_for_emission(&program, &map(&[("A", 50), ("Z", 50)]), &lookup);
        assert!(matches!(selected, Err(CalcError::PoolLookup(ident, _)) if ident == "Z"));
    }

    #[test]
    fn pool_emissions() {
        let mut program = program(500_000_000_000);
        let emissions = distribute_emissions_to_pools(&program, &map(&[("A", 1000)])).unwrap();
        assert_eq!(emissions, map(&[("A", 500_000_000_000)]));

        let emissions = distribute_emissions_to_pools(&program, &map(&[("A", 1000), ("B", 1000)])).unwrap();
        assert_eq!(emissions, map(&[("A", 250_000_000_000), ("B", 250_000_000_000)]));

        let emissions = distribute_emissions_to_pools(&program, &map(&[("A", 1000), ("B", 2000)])).unwrap();
        assert_eq!(emissions, map(&[("A", 166_666_666_666), ("B", 333_333_333_334)]));

        program.fixed_emissions = map(&[("C", 1_000_000_000)]);
        let emissions =
            distribute_emissions_to_pools(&program, &map(&[("A", 1000), ("B", 2000), ("C", 1000)])).unwrap();
        assert_eq!(emissions, map(&[("A", 166_333_333_333), ("B", 332_666_666_667), ("C", 1_000_000_000)]));

        program.emission_cap = 200_000_000_000;
        let emissions = distribute_emissions_to_pools(&program, &map(&[("A", 1000), ("B", 2000)])).unwrap();
        assert_eq!(
            truncate_emissions(&program, &emissions),
            map(&[("A", 166_333_333_333), ("B", 200_000_000_000), ("C", 1_000_000_000)])
        );
    }

    #[test]
    fn pool_emissions_misconfigured() {
        let mut program = program(100);
        program.fixed_emissions = map(&[("A", 60), ("B", 60)]);
        assert_eq!(
            distribute_emissions_to_pools(&program, &map(&[("C", 1)])),
            Err(CalcError::FixedEmissionsExceedDaily(120, 100))
        );

        program.fixed_emissions = map(&[("A", 60)]);
        let emissions = distribute_emissions_to_pools(&program, &BTreeMap::new()).unwrap();
        assert_eq!(emissions, map(&[("A", 60)]));
    }

    #[test]
    fn lp_days() {
        let lookup = lp_pools();
        let (by_owner, by_asset) = lp_days_by_owner_and_asset(
            &[
                position("A", Value::new().with("LP_X", 100), vec![]),
                position("B", Value::new().with("LP_X", 200).with("LP_Y", 150), vec![]),
                position("B", Value::new().with("LP_X", 300), vec![]),
            ],
            &lookup,
            0,
            86400,
        );
        assert_eq!(by_owner["A"], map(&[("LP_X", 100)]));
        assert_eq!(by_owner["B"], map(&[("LP_X", 500), ("LP_Y", 150)]));
        assert_eq!(by_asset, map(&[("LP_X", 600), ("LP_Y", 150)]));
    }

    #[test]
    fn lp_days_are_time_weighted() {
        let (by_owner, by_asset) = lp_days_by_owner_and_asset(
            &[
                lp("A", 143200, None, Value::new().with("LP_X", 100)),
                lp("B", 143200, Some(164800), Value::new().with("LP_X", 200).with("LP_Y", 150)),
                lp("C", 12, None, Value::new().with("LP_X", 300)),
                lp("D", 143200, Some(164800), Value::new().with("LP_X", 300)),
                lp("D", 164800, Some(264800), Value::new().with("LP_X", 300)),
            ],
            &lp_pools(),
            100000,
            186400,
        );
        assert_eq!(by_owner.len(), 4);
        assert_eq!(by_owner["A"], map(&[("LP_X", 50)]));
        assert_eq!(by_owner["B"], map(&[("LP_X", 50), ("LP_Y", 37)]));
        assert_eq!(by_owner["C"], map(&[("LP_X", 300)]));
        assert_eq!(by_owner["D"], map(&[("LP_X", 150)]));
        assert_eq!(by_asset, map(&[("LP_X", 550), ("LP_Y", 37)]));
    }

    #[test]
    fn regroup() {
        let lookup = lp_pools();
        assert_eq!(regroup_by_asset(&map(&[("X", 100)]), &lookup).unwrap(), map(&[("LP_X", 100)]));
        let by_asset = regroup_by_asset(&map(&[("X", 100), ("Y", 200), ("Z", 0)]), &lookup).unwrap();
        assert_eq!(by_asset, map(&[("LP_X", 100), ("LP_Y", 200)]));
        assert_eq!(regroup_by_pool(&by_asset, &lookup).unwrap(), map(&[("X", 100), ("Y", 200)]));
        assert!(matches!(regroup_by_asset(&map(&[("Z", 1)]), &lookup), Err(CalcError::PoolLookup(..))));
    }

    fn lp_by_owner(allocations: &[(&str, &'static str, u64)]) -> BTreeMap<String, BTreeMap<AssetId, u64>> {
        let mut res = BTreeMap::<String, BTreeMap<AssetId, u64>>::new();
        for (owner, asset, amount) in allocations {
            *res.entry(owner.to_string()).or_default().entry(AssetId::from(*asset)).or_default() += amount;
        }
        res
    }

    #[test]
    fn owner_emissions() {
        let emissions = map(&[("LP_X", 1000)]);
        let res = distribute_emissions_to_owners(&lp_by_owner(&[("A", "LP_X", 100)]), &emissions, &map(&[("LP_X", 100)]));
        assert_eq!(res, lp_by_owner(&[("A", "LP_X", 1000)]));

        let owners = lp_by_owner(&[("A", "LP_X", 100), ("B", "LP_X", 200)]);
        let res = distribute_emissions_to_owners(&owners, &emissions, &map(&[("LP_X", 300)]));
        assert_eq!(res, lp_by_owner(&[("A", "LP_X", 334), ("B", "LP_X", 666)]));

        let emissions = map(&[("LP_X", 1000), ("LP_Y", 500)]);
        let owners = lp_by_owner(&[("A", "LP_X", 100), ("B", "LP_X", 200), ("A", "LP_Y", 300)]);
        let res = distribute_emissions_to_owners(&owners, &emissions, &map(&[("LP_X", 300), ("LP_Y", 300)]));
        let expected = lp_by_owner(&[("A", "LP_X", 334), ("A", "LP_Y", 500), ("B", "LP_X", 666)]);
        assert_eq!(res, expected);

        let owners = lp_by_owner(&[("z", "LP_Z", 100), ("A", "LP_X", 100), ("B", "LP_X", 200), ("A", "LP_Y", 300)]);
        let totals = map(&[("LP_X", 300), ("LP_Y", 300), ("LP_Z", 500)]);
        assert_eq!(distribute_emissions_to_owners(&owners, &emissions, &totals), expected);
    }

    #[rstest]
    #[case(&[("A", 1), ("B", 1)], 1, &[("A", 1)])]
    #[case(&[("A", 1000), ("B", 1)], 10, &[("A", 10)])]
    #[case(&[("A", 1), ("B", 1), ("C", 1)], 2, &[("A", 1), ("B", 1)])]
    #[case(&[("A", 10), ("B", 1), ("C", 1)], 5, &[("A", 5)])]
    #[case(&[("A", 10), ("B", 1), ("C", 1)], 7, &[("A", 6), ("B", 1)])]
    fn owner_remainders_of_small_emissions(
        #[case] lp_days: &[(&str, u64)],
        #[case] emission: u64,
        #[case] expected: &[(&str, u64)],
    ) {
        let owners = lp_by_owner(&lp_days.iter().map(|(owner, days)| (*owner, "LP_X", *days)).collect::<Vec<_>>());
        let total = lp_days.iter().map(|(_, days)| days).sum();
        let res = distribute_emissions_to_owners(&owners, &map(&[("LP_X", emission)]), &map(&[("LP_X", total)]));
        let distributed = res.values().flat_map(|shares| shares.get(&AssetId::from("LP_X"))).sum::<u64>();
        assert_eq!(distributed, emission);
        let expected = lp_by_owner(&expected.iter().map(|(owner, amount)| (*owner, "LP_X", *amount)).collect::<Vec<_>>());
        assert_eq!(res, expected);
    }

    #[test]
    fn earnings() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let program = program(500_000);
        let emitted = |amount| Value::new().with("Emitted", amount);
        let owners = ["A", "B", "C"]
            .map(|id| (id.to_owned(), MultisigScript::signature(id.as_bytes().to_vec())))
            .into_iter()
            .collect::<BTreeMap<_, _>>();
        let mut by_owner = lp_by_owner(&[
            ("A", "LP_X", 900),
            ("A", "LP_Y", 100),
            ("B", "LP_X", 1000),
            ("B", "LP_Y", 200),
            ("B", "LP_Z", 300),
        ]);
        by_owner.insert(s!("C"), BTreeMap::new());

        let (earnings, totals) = emissions_to_earnings(date, &program, &by_owner, &owners);
        assert_eq!(totals, map(&[("A", 1000), ("B", 1500)]));
        assert_eq!(earnings.len(), 2);
        assert_eq!(earnings[0], Earning {
            owner_id: s!("A"),
            owner: owners.get("A").cloned(),
            program: s!("Test"),
            earned_date: date,
            expiration_date: None,
            value: emitted(1000),
            value_by_lp_token: bmap! { AssetId::from("LP_X") => emitted(900), AssetId::from("LP_Y") => emitted(100) },
        });
        assert_eq!(earnings[1].owner_id, "B");
        assert_eq!(earnings[1].value, emitted(1500));
        assert_eq!(earnings[1].value_by_lp_token.len(), 3);
    }

    #[test]
    fn earnings_expire() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let program = YieldProgram { earning_expiration_days: Some(30), ..program(1) };
        let (earnings, _) =
            emissions_to_earnings(date, &program, &lp_by_owner(&[("A", "LP_X", 1)]), &BTreeMap::new());
        let expires = earnings[0].expiration_date.unwrap();
        assert_eq!(expires.date_naive(), NaiveDate::from_ymd_opt(2023, 7, 1).unwrap());
        assert_eq!(expires.time(), NaiveTime::MIN);
        assert_eq!(earnings[0].owner, None);
    }

    #[test]
    fn inactive_program() {
        let program = program(1);
        let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let outputs = calculate_earnings(date, 0, 86400, &program, &[], &[], &MockLookup::default()).unwrap();
        assert_eq!(outputs, YieldOutputs::default());
    }

    #[test]
    fn no_qualifying_pools() {
        let program = program(1000);
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let positions = [staked("A", 100, vec![delegation("Test", "X", 1)])];
        let outputs = calculate_earnings(date, 0, 86400, &program, &[], &positions, &lp_pools()).unwrap();
        assert!(outputs.timestamp.is_some());
        assert_eq!(outputs.total_delegations, 100);
        assert!(outputs.delegation_over_window_by_pool.is_empty());
        assert!(outputs.earnings.is_empty());
        assert_eq!(outputs.total_emissions, 0);
    }
}
