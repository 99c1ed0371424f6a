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

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Off-chain core of the Freezer stake locking contract.
//!
//! The crate owns the datum model of the locking validator ([`StakeDatum`], [`LockDatum`] and
//! the [`MultisigScript`] owner), and the two reward engines which consume locked positions:
//! the daily yield farming calculation ([`farming`]) and the flat incentive calculation
//! ([`incentive`]).

#[macro_use]
extern crate amplify;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_crate as serde;
#[macro_use]
extern crate log;

mod asset;
mod types;
mod multisig;
mod data;
mod datum;
mod lookup;
mod math;
mod errors;
pub mod farming;
pub mod incentive;

pub use asset::{AssetId, Value, ADA_ASSET_ID};
pub use errors::CalcError;
pub use math::at_least_integer_percent;
pub use data::{DataError, PlutusData};
pub use datum::{LockDatum, StakeDatum, VOID};
pub use lookup::{LookupError, PoolIndex, PoolLookup};
pub use multisig::{MultisigScript, ScriptDecodeError};
pub use types::{AssetPair, Delegation, Earning, IncentiveProgram, Pool, Position, YieldProgram};
