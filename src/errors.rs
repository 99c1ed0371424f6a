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

use crate::{AssetId, LookupError};

/// Errors of the yield and incentive calculations.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum CalcError {
    /// failed to look up pool for LP token {0}: {1}
    LpLookup(AssetId, LookupError),

    /// failed to look up pool with ident '{0}': {1}
    PoolLookup(String, LookupError),

    /// too many historical snapshots: the delegation window spans {0} day(s) including today,
    /// but {1} previous day(s) were provided.
    TooManySnapshots(usize, usize),

    /// program is misconfigured: fixed emissions of {0} exceed the daily emission of {1}.
    FixedEmissionsExceedDaily(u64, u64),

    /// reference pool '{0}' has no liquidity to price against.
    EmptyReferencePool(String),

    /// reference pool '{0}' must be an ADA pool.
    NonAdaReferencePool(String),

    /// reference pool '{0}' trades {1} rather than {2}.
    WrongReferenceAsset(String, AssetId, AssetId),
}
