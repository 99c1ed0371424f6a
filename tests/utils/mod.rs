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

#![allow(dead_code)]

use std::collections::BTreeMap;

use amplify::Display;
use chrono::NaiveDate;
use freezer::{
    AssetId, Delegation, IncentiveProgram, LookupError, MultisigScript, Pool, PoolLookup, Position, Value,
    YieldProgram,
};

pub const DAY: u64 = 86_400;

/// Pools keyed by ident; every `LP_*` asset is an LP token.
#[derive(Clone, Debug, Default)]
pub struct MockLookup(pub BTreeMap<String, Pool>);

impl MockLookup {
    pub fn insert(&mut self, pool: Pool) { self.0.insert(pool.pool_ident.clone(), pool); }
}

impl PoolLookup for MockLookup {
    fn pool_by_ident(&self, pool_ident: &str) -> Result<Pool, LookupError> {
        self.0
            .get(pool_ident)
            .cloned()
            .ok_or_else(|| LookupError::UnknownPool(pool_ident.to_owned()))
    }

    fn pool_by_lp_token(&self, lp_token: &AssetId) -> Result<Pool, LookupError> {
        if !self.is_lp_token(lp_token) {
            return Err(LookupError::NotLpToken(lp_token.clone()));
        }
        self.0
            .values()
            .find(|pool| pool.lp_asset == *lp_token)
            .cloned()
            .ok_or_else(|| LookupError::UnknownLpToken(lp_token.clone()))
    }

    fn is_lp_token(&self, asset: &AssetId) -> bool { asset.as_str().starts_with("LP_") }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[display(lowercase)]
pub enum Staking {
    Plain,
    WithLp,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

pub fn yield_program(emission: u64) -> YieldProgram {
    YieldProgram {
        id: "TestYield".to_owned(),
        first_daily_rewards: date(2001, 1, 1),
        last_daily_rewards: Some(date(2099, 1, 1)),
        staked_asset: AssetId::from("Staked"),
        emitted_asset: AssetId::from("Emitted"),
        min_lp_integer_percent: 1,
        daily_emission: emission,
        ..Default::default()
    }
}

pub fn incentive_program() -> IncentiveProgram {
    IncentiveProgram {
        id: "TestIncentive".to_owned(),
        first_daily_rewards: date(2001, 1, 1),
        last_daily_rewards: Some(date(2099, 1, 1)),
        staked_asset: AssetId::from("Staked"),
        emitted_asset: AssetId::from("Emitted"),
        staked_reference_pool: "X".to_owned(),
        emitted_reference_pool: "Y".to_owned(),
    }
}

pub fn position(owner: &str, value: Value, delegation: Vec<Delegation>) -> Position {
    Position {
        owner_id: owner.to_owned(),
        owner: MultisigScript::signature(owner.as_bytes().to_vec()),
        transaction_hash: String::new(),
        slot: 0,
        spent_transaction: None,
        spent_slot: 0,
        value,
        delegation,
    }
}

pub fn delegate(program: &str, pool_ident: &str, weight: u32) -> Delegation {
    Delegation { program: program.to_owned(), pool_ident: pool_ident.to_owned(), weight }
}

/// Deterministic xorshift generator, so that randomized scenarios are reproducible.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self { Rng(seed.max(1)) }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform-ish value in `0..n`.
    pub fn below(&mut self, n: u64) -> u64 { self.next() % n.max(1) }
}

/// Random population of stake positions delegating to, and providing liquidity in, `pools`
/// pools named `Pool_<n>` with LP tokens `LP_<n>`.
pub fn random_market(
    rng: &mut Rng,
    program: &YieldProgram,
    positions: usize,
    owners: u64,
    pools: u64,
) -> (Vec<Position>, MockLookup) {
    let mut locked = BTreeMap::<u64, u64>::new();
    let mut res = Vec::with_capacity(positions);
    for no in 0..positions {
        let owner = format!("Owner_{}", rng.below(owners));
        let mut value = Value::new().with("Staked", rng.below(50_000_000_000_000));

        let mut delegation = vec![];
        for _ in 0..rng.below(40) {
            let pool = format!("Pool_{}", rng.below(pools));
            let weight = rng.below(50_000) as u32;
            let program_id = if rng.below(4) < 3 { program.id.as_str() } else { "OTHER PROGRAM" };
            delegation.push(delegate(program_id, &pool, weight));
        }

        // Every pool gets at least one liquidity provider.
        let mut lp_pools = vec![no as u64 % pools];
        lp_pools.extend((0..rng.below(15)).map(|_| rng.below(pools)));
        for pool in lp_pools {
            let amount = rng.below(30_000_000) + 1;
            value.add(AssetId::from(format!("LP_{pool}")), amount);
            *locked.entry(pool).or_default() += amount;
        }
        for _ in 0..rng.below(5) {
            value.add(AssetId::from(format!("Random_{}", rng.below(5))), rng.below(30_000_000_000));
        }
        res.push(position(&owner, value, delegation));
    }

    let mut lookup = MockLookup::default();
    for pool in 0..pools {
        lookup.insert(Pool {
            pool_ident: format!("Pool_{pool}"),
            total_lp_tokens: locked.get(&pool).copied().unwrap_or_default() + rng.below(100_000_000_000),
            lp_asset: AssetId::from(format!("LP_{pool}")),
            ..Default::default()
        });
    }
    (res, lookup)
}
