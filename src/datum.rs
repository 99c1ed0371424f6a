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

use std::str::FromStr;

use minicbor::data::Tag;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

use crate::data::{end_array, read_list};
use crate::multisig::CONSTR_BASE;
use crate::{DataError, Delegation, MultisigScript, PlutusData};

/// CBOR of `Constr 0 []`, used as the spending redeemer.
pub const VOID: [u8; 3] = [0xd8, 0x79, 0x80];

/// Datum of a stake position: the owner and the pools the stake is delegated to.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct StakeDatum {
    pub owner: MultisigScript,
    pub delegations: Vec<Delegation>,
}

impl StakeDatum {
    /// Fails if a pool ident is not a hex string, since it is carried on chain as bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, DataError> {
        if let Some(delegation) = self
            .delegations
            .iter()
            .find(|delegation| hex::decode(&delegation.pool_ident).is_err())
        {
            return Err(DataError::PoolIdent(delegation.pool_ident.clone()));
        }
        Ok(minicbor::to_vec(self).expect("in-memory CBOR encoding never fails"))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, DataError> {
        let mut d = Decoder::new(bytes);
        let datum = StakeDatum::decode(&mut d, &mut ())?;
        match bytes.len() - d.position() {
            0 => Ok(datum),
            extra => Err(DataError::TrailingBytes(extra)),
        }
    }

    /// Assigns the delegations to a program; the on-chain datum doesn't record it.
    pub fn for_program(mut self, program: &str) -> Self {
        for delegation in &mut self.delegations {
            delegation.program = program.to_owned();
        }
        self
    }
}

impl FromStr for StakeDatum {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::from_cbor(&hex::decode(s.trim())?) }
}

impl<C> Encode<C> for StakeDatum {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.tag(Tag::new(CONSTR_BASE))?.begin_array()?;
        self.owner.encode(e, ctx)?;
        e.begin_array()?;
        for delegation in &self.delegations {
            let ident = hex::decode(&delegation.pool_ident)
                .map_err(|_| encode::Error::message("pool ident is not a hex string"))?;
            e.tag(Tag::new(CONSTR_BASE))?
                .begin_array()?
                .bytes(&ident)?
                .u32(delegation.weight)?
                .end()?;
        }
        e.end()?.end()?;
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for StakeDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        expect_constr(d, 0)?;
        let len = d.array()?;
        let owner = MultisigScript::decode(d, ctx)?;
        let delegations = read_list(d, |d| {
            expect_constr(d, 0)?;
            let len = d.array()?;
            let pool_ident = hex::encode(d.bytes()?);
            let weight = d.u32()?;
            end_array(d, len, 2)?;
            Ok(Delegation { program: none!(), pool_ident, weight })
        })?;
        end_array(d, len, 2)?;
        Ok(StakeDatum { owner, delegations })
    }
}

/// Datum attached to funds locked by the `lock` operation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LockDatum {
    pub owner: MultisigScript,
    pub arbitrary: PlutusData,
}

impl LockDatum {
    /// Lock datum owned by a single payment key hash, with a void arbitrary datum.
    pub fn with_key_hash(key_hash: impl Into<Vec<u8>>) -> Self {
        LockDatum { owner: MultisigScript::signature(key_hash), arbitrary: PlutusData::void() }
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("in-memory CBOR encoding never fails")
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, DataError> {
        let mut d = Decoder::new(bytes);
        let datum = LockDatum::decode(&mut d, &mut ())?;
        match bytes.len() - d.position() {
            0 => Ok(datum),
            extra => Err(DataError::TrailingBytes(extra)),
        }
    }
}

impl<C> Encode<C> for LockDatum {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.tag(Tag::new(CONSTR_BASE))?.begin_array()?;
        self.owner.encode(e, ctx)?;
        self.arbitrary.encode(e, ctx)?;
        e.end()?;
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for LockDatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
        expect_constr(d, 0)?;
        let len = d.array()?;
        let owner = MultisigScript::decode(d, ctx)?;
        let arbitrary = PlutusData::decode(d, ctx)?;
        end_array(d, len, 2)?;
        Ok(LockDatum { owner, arbitrary })
    }
}

fn expect_constr(d: &mut Decoder, constr: u64) -> Result<(), decode::Error> {
    let tag = d.tag()?.as_u64();
    if tag != CONSTR_BASE + constr {
        return Err(decode::Error::message(format!(
            "expected constructor {constr}, found CBOR tag {tag}"
        )));
    }
    Ok(())
}
