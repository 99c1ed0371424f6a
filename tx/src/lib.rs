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

//! Transaction assembly for the Freezer locking validator.
//!
//! The crate loads the validator from its blueprint, the signing key from a wallet source, and
//! talks to the chain through a [`Provider`]. [`TxBuilder`] assembles the three transactions the
//! contract needs: locking funds under a [`freezer::LockDatum`], unlocking them again and
//! publishing the validator as a reference script. Key derivation, transaction encoding and
//! signing are left to the `pallas` crates.

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate serde_crate as serde;
#[macro_use]
extern crate log;

mod network;
mod blueprint;
mod wallet;
mod provider;
mod blockfrost;
mod coinselect;
mod builder;

pub use blockfrost::Blockfrost;
pub use blueprint::{BlueprintError, Validator, DEFAULT_BLUEPRINT};
pub use builder::{BuildError, SignedTx, TxBuilder, TxOut, MIN_COLLATERAL, PUBLISH_LOVELACE};
pub use coinselect::CoinselectStrategy;
pub use network::{display_address, Network, UnknownNetwork};
pub use provider::{ExUnits, OutPoint, OutPointParseError, ProtocolParams, Provider, ProviderError, Utxo};
pub use wallet::{Wallet, WalletError, WalletSource};
