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

use chrono::{DateTime, Utc};
use minicbor::data::Tag;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use pallas_crypto::hash::{Hash, Hasher};

use crate::data::{end_array, read_list, MAX_DEPTH};

/// Constructor tag of the first alternative of a Plutus data type.
pub(crate) const CONSTR_BASE: u64 = 121;

/// Owner of a locked position: a native-script style multisig expressed as Plutus data.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub enum MultisigScript {
    Signature {
        #[cfg_attr(feature = "serde", serde(with = "hex::serde"))]
        key_hash: Vec<u8>,
    },
    AllOf {
        scripts: Vec<MultisigScript>,
    },
    AnyOf {
        scripts: Vec<MultisigScript>,
    },
    AtLeast {
        required: u64,
        scripts: Vec<MultisigScript>,
    },
    /// Satisfied only before the given time.
    Before {
        time: DateTime<Utc>,
    },
    /// Satisfied only after the given time.
    After {
        time: DateTime<Utc>,
    },
}

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ScriptDecodeError {
    /// invalid hex encoding of multisig script. Details: {0}
    #[from]
    Hex(hex::FromHexError),

    /// invalid CBOR encoding of multisig script. Details: {0}
    #[from]
    Cbor(decode::Error),

    /// multisig script is followed by {0} unexpected bytes.
    TrailingBytes(usize),
}

impl MultisigScript {
    pub fn signature(key_hash: impl Into<Vec<u8>>) -> Self {
        MultisigScript::Signature { key_hash: key_hash.into() }
    }

    fn constructor(&self) -> u64 {
        match self {
            MultisigScript::Signature { .. } => 0,
            MultisigScript::AllOf { .. } => 1,
            MultisigScript::AnyOf { .. } => 2,
            MultisigScript::AtLeast { .. } => 3,
            MultisigScript::Before { .. } => 4,
            MultisigScript::After { .. } => 5,
        }
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("in-memory CBOR encoding never fails")
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ScriptDecodeError> {
        let mut d = Decoder::new(bytes);
        let script = MultisigScript::decode(&mut d, &mut ())?;
        match bytes.len() - d.position() {
            0 => Ok(script),
            extra => Err(ScriptDecodeError::TrailingBytes(extra)),
        }
    }

    /// Blake2b-224 hash of the CBOR encoding, which identifies the owner off-chain.
    pub fn hash(&self) -> Hash<28> { Hasher::<224>::hash(&self.to_cbor()) }

    /// All key hashes which may take part in satisfying the script.
    pub fn key_hashes(&self) -> Vec<&[u8]> {
        match self {
            MultisigScript::Signature { key_hash } => vec![key_hash.as_slice()],
            MultisigScript::AllOf { scripts }
            | MultisigScript::AnyOf { scripts }
            | MultisigScript::AtLeast { scripts, .. } => {
                scripts.iter().flat_map(MultisigScript::key_hashes).collect()
            }
            MultisigScript::Before { .. } | MultisigScript::After { .. } => vec![],
        }
    }

    /// Checks whether a transaction signed by `signers` at `now` would satisfy the script.
    pub fn is_satisfied(&self, signers: &[&[u8]], now: DateTime<Utc>) -> bool {
        match self {
            MultisigScript::Signature { key_hash } => signers.contains(&key_hash.as_slice()),
            MultisigScript::AllOf { scripts } => scripts.iter().all(|s| s.is_satisfied(signers, now)),
            MultisigScript::AnyOf { scripts } => scripts.iter().any(|s| s.is_satisfied(signers, now)),
            MultisigScript::AtLeast { required, scripts } => {
                let satisfied = scripts.iter().filter(|s| s.is_satisfied(signers, now)).count();
                satisfied as u64 >= *required
            }
            MultisigScript::Before { time } => now < *time,
            MultisigScript::After { time } => now > *time,
        }
    }
}

impl FromStr for MultisigScript {
    type Err = ScriptDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::from_cbor(&hex::decode(s)?) }
}

impl<C> Encode<C> for MultisigScript {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.tag(Tag::new(CONSTR_BASE + self.constructor()))?
            .begin_array()?;
        match self {
            MultisigScript::Signature { key_hash } => {
                e.bytes(key_hash)?;
            }
            MultisigScript::AllOf { scripts } | MultisigScript::AnyOf { scripts } => {
                encode_scripts(scripts, e, ctx)?;
            }
            MultisigScript::AtLeast { required, scripts } => {
                e.u64(*required)?;
                encode_scripts(scripts, e, ctx)?;
            }
            MultisigScript::Before { time } | MultisigScript::After { time } => {
                e.i64(time.timestamp())?;
            }
        }
        e.end()?;
        Ok(())
    }
}

fn encode_scripts<W: encode::Write, C>(
    scripts: &[MultisigScript],
    e: &mut Encoder<W>,
    ctx: &mut C,
) -> Result<(), encode::Error<W::Error>> {
    e.begin_array()?;
    for script in scripts {
        script.encode(e, ctx)?;
    }
    e.end()?;
    Ok(())
}

impl<'b, C> Decode<'b, C> for MultisigScript {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> { decode_script(d, 0) }
}

fn decode_script(d: &mut Decoder, depth: usize) -> Result<MultisigScript, decode::Error> {
    if depth > MAX_DEPTH {
        return Err(decode::Error::message(format!("multisig script is nested deeper than {MAX_DEPTH} levels")));
    }
    let tag = d.tag()?.as_u64();
    let len = d.array()?;
    let (script, fields) = match tag.checked_sub(CONSTR_BASE) {
        Some(0) => (MultisigScript::Signature { key_hash: d.bytes()?.to_vec() }, 1),
        Some(1) => (MultisigScript::AllOf { scripts: decode_scripts(d, depth + 1)? }, 1),
        Some(2) => (MultisigScript::AnyOf { scripts: decode_scripts(d, depth + 1)? }, 1),
        Some(3) => {
            let required = d.u64()?;
            (MultisigScript::AtLeast { required, scripts: decode_scripts(d, depth + 1)? }, 2)
        }
        Some(4) => (MultisigScript::Before { time: decode_time(d)? }, 1),
        Some(5) => (MultisigScript::After { time: decode_time(d)? }, 1),
        _ => return Err(decode::Error::message(format!("unrecognized multisig script tag {tag}"))),
    };
    end_array(d, len, fields)?;
    Ok(script)
}

fn decode_scripts(d: &mut Decoder, depth: usize) -> Result<Vec<MultisigScript>, decode::Error> {
    read_list(d, |d| decode_script(d, depth))
}

fn decode_time(d: &mut Decoder) -> Result<DateTime<Utc>, decode::Error> {
    let secs = d.i64()?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| decode::Error::message(format!("timestamp {secs} is out of range")))
}
