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

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::{AssetId, Pool};

#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum LookupError {
    /// pool with ident '{0}' is not known.
    UnknownPool(String),

    /// asset {0} is not an LP token.
    NotLpToken(AssetId),

    /// no pool issues LP token {0}.
    UnknownLpToken(AssetId),
}

/// Source of pool state as of the calculation snapshot.
pub trait PoolLookup {
    fn pool_by_ident(&self, pool_ident: &str) -> Result<Pool, LookupError>;

    fn pool_by_lp_token(&self, lp_token: &AssetId) -> Result<Pool, LookupError>;

    fn is_lp_token(&self, asset: &AssetId) -> bool;

    fn lp_token_to_pool_ident(&self, lp_token: &AssetId) -> Result<String, LookupError> {
        self.pool_by_lp_token(lp_token).map(|pool| pool.pool_ident)
    }
}

impl<T: PoolLookup + ?Sized> PoolLookup for &T {
    fn pool_by_ident(&self, pool_ident: &str) -> Result<Pool, LookupError> {
        (**self).pool_by_ident(pool_ident)
    }

    fn pool_by_lp_token(&self, lp_token: &AssetId) -> Result<Pool, LookupError> {
        (**self).pool_by_lp_token(lp_token)
    }

    fn is_lp_token(&self, asset: &AssetId) -> bool { (**self).is_lp_token(asset) }
}

/// In-memory pool snapshot.
///
/// LP tokens are recognized by the policy id of the DEX when one is configured; otherwise any
/// asset registered as the LP asset of a known pool counts as an LP token.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct PoolIndex {
    pools: IndexMap<String, Pool>,
    by_lp: HashMap<AssetId, String>,
    lp_policy: Option<String>,
}

impl PoolIndex {
    pub fn new() -> Self { PoolIndex::default() }

    pub fn with_lp_policy(mut self, policy: impl Into<String>) -> Self {
        self.lp_policy = Some(policy.into());
        self
    }

    pub fn insert(&mut self, pool: Pool) -> Option<Pool> {
        let prev = self.pools.insert(pool.pool_ident.clone(), pool.clone());
        if let Some(prev) = &prev {
            if self.by_lp.get(&prev.lp_asset) == Some(&prev.pool_ident) {
                self.by_lp.remove(&prev.lp_asset);
            }
        }
        self.by_lp.insert(pool.lp_asset, pool.pool_ident);
        prev
    }

    pub fn len(&self) -> usize { self.pools.len() }

    pub fn is_empty(&self) -> bool { self.pools.is_empty() }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> { self.pools.values() }

    #[cfg(feature = "serde")]
    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
        let pools: Vec<Pool> = serde_yaml::from_str(s)?;
        Ok(pools.into_iter().collect())
    }
}

impl FromIterator<Pool> for PoolIndex {
    fn from_iter<T: IntoIterator<Item = Pool>>(iter: T) -> Self {
        let mut index = PoolIndex::new();
        for pool in iter {
            index.insert(pool);
        }
        index
    }
}

impl PoolLookup for PoolIndex {
    fn pool_by_ident(&self, pool_ident: &str) -> Result<Pool, LookupError> {
        self.pools
            .get(pool_ident)
            .cloned()
            .ok_or_else(|| LookupError::UnknownPool(pool_ident.to_owned()))
    }

    fn pool_by_lp_token(&self, lp_token: &AssetId) -> Result<Pool, LookupError> {
        if !self.is_lp_token(lp_token) {
            return Err(LookupError::NotLpToken(lp_token.clone()));
        }
        self.by_lp
            .get(lp_token)
            .and_then(|ident| self.pools.get(ident))
            .cloned()
            .ok_or_else(|| LookupError::UnknownLpToken(lp_token.clone()))
    }

    fn is_lp_token(&self, asset: &AssetId) -> bool {
        match &self.lp_policy {
            Some(policy) => asset.policy_id() == policy,
            None => self.by_lp.contains_key(asset),
        }
    }
}
