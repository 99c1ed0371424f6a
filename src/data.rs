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

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use minicbor::data::{Int, Tag, Type};
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

use crate::multisig::CONSTR_BASE;

/// Bytestrings longer than this are chunked, as the ledger requires for Plutus data.
const BYTES_CHUNK: usize = 64;

/// Nesting limit of decoded Plutus data.
pub(crate) const MAX_DEPTH: usize = 256;

const POS_BIGNUM: u64 = 2;
const NEG_BIGNUM: u64 = 3;

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum DataError {
    /// invalid hex encoding of Plutus data. Details: {0}
    #[from]
    Hex(hex::FromHexError),

    /// invalid CBOR encoding of Plutus data. Details: {0}
    #[from]
    Cbor(decode::Error),

    /// Plutus data is followed by {0} unexpected bytes.
    TrailingBytes(usize),

    /// pool ident '{0}' is not a hex string.
    PoolIdent(String),
}

/// Generic Plutus data, as carried by datums and redeemers.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum PlutusData {
    Constr(u64, Vec<PlutusData>),
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Int(i128),
    Bytes(Vec<u8>),
}

impl PlutusData {
    /// The unit value `Constr 0 []`.
    pub fn void() -> Self { PlutusData::Constr(0, vec![]) }

    pub fn to_cbor(&self) -> Vec<u8> {
        // Every value has an encoding and writing to a vector cannot fail.
        minicbor::to_vec(self).expect("in-memory CBOR encoding never fails")
    }

    pub fn to_hex(&self) -> String { hex::encode(self.to_cbor()) }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, DataError> {
        let mut d = Decoder::new(bytes);
        let data = PlutusData::decode(&mut d, &mut ())?;
        match bytes.len() - d.position() {
            0 => Ok(data),
            extra => Err(DataError::TrailingBytes(extra)),
        }
    }

    pub fn as_constr(&self) -> Option<(u64, &[PlutusData])> {
        match self {
            PlutusData::Constr(n, fields) => Some((*n, fields)),
            _ => None,
        }
    }
}

impl FromStr for PlutusData {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::from_cbor(&hex::decode(s.trim())?) }
}

impl Display for PlutusData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fn seq<T>(
            f: &mut Formatter<'_>,
            items: &[T],
            mut item: impl FnMut(&mut Formatter<'_>, &T) -> fmt::Result,
        ) -> fmt::Result {
            for (no, i) in items.iter().enumerate() {
                if no > 0 {
                    f.write_str(", ")?;
                }
                item(f, i)?;
            }
            Ok(())
        }

        match self {
            PlutusData::Constr(n, fields) => {
                write!(f, "Constr {n} [")?;
                seq(f, fields, |f, d| Display::fmt(d, f))?;
                f.write_str("]")
            }
            PlutusData::Map(entries) => {
                f.write_str("{")?;
                seq(f, entries, |f, (k, v)| write!(f, "{k}: {v}"))?;
                f.write_str("}")
            }
            PlutusData::List(items) => {
                f.write_str("[")?;
                seq(f, items, |f, d| Display::fmt(d, f))?;
                f.write_str("]")
            }
            PlutusData::Int(i) => write!(f, "{i}"),
            PlutusData::Bytes(bytes) => write!(f, "#{}", hex::encode(bytes)),
        }
    }
}

/// Empty sequences use a definite-length array, all others an indefinite one.
fn encode_seq<W: encode::Write, C>(
    items: &[PlutusData],
    e: &mut Encoder<W>,
    ctx: &mut C,
) -> Result<(), encode::Error<W::Error>> {
    if items.is_empty() {
        e.array(0)?;
        return Ok(());
    }
    e.begin_array()?;
    for item in items {
        item.encode(e, ctx)?;
    }
    e.end()?;
    Ok(())
}

impl<C> Encode<C> for PlutusData {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            PlutusData::Constr(n, fields) => {
                match *n {
                    0..=6 => {
                        e.tag(Tag::new(CONSTR_BASE + n))?;
                    }
                    7..=127 => {
                        e.tag(Tag::new(1280 + n - 7))?;
                    }
                    _ => {
                        e.tag(Tag::new(102))?.array(2)?.u64(*n)?;
                    }
                }
                encode_seq(fields, e, ctx)
            }
            PlutusData::Map(entries) => {
                e.map(entries.len() as u64)?;
                for (k, v) in entries {
                    k.encode(e, ctx)?;
                    v.encode(e, ctx)?;
                }
                Ok(())
            }
            PlutusData::List(items) => encode_seq(items, e, ctx),
            PlutusData::Int(i) => {
                if let Ok(int) = Int::try_from(*i) {
                    e.int(int)?;
                    return Ok(());
                }
                let (tag, magnitude) = match u128::try_from(*i) {
                    Ok(n) => (POS_BIGNUM, n),
                    Err(_) => (NEG_BIGNUM, (-1 - *i) as u128),
                };
                let bytes = magnitude.to_be_bytes();
                let zeros = bytes.iter().take_while(|b| **b == 0).count();
                e.tag(Tag::new(tag))?.bytes(&bytes[zeros..])?;
                Ok(())
            }
            PlutusData::Bytes(bytes) if bytes.len() <= BYTES_CHUNK => {
                e.bytes(bytes)?;
                Ok(())
            }
            PlutusData::Bytes(bytes) => {
                e.begin_bytes()?;
                for chunk in bytes.chunks(BYTES_CHUNK) {
                    e.bytes(chunk)?;
                }
                e.end()?;
                Ok(())
            }
        }
    }
}

impl<'b, C> Decode<'b, C> for PlutusData {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> { decode_nested(d, 0) }
}

fn decode_nested(d: &mut Decoder, depth: usize) -> Result<PlutusData, decode::Error> {
    if depth > MAX_DEPTH {
        return Err(decode::Error::message(format!("Plutus data is nested deeper than {MAX_DEPTH} levels")));
    }
    let depth = depth + 1;
    match d.datatype()? {
        Type::Tag => {
            let tag = d.tag()?.as_u64();
            let constr = match tag {
                POS_BIGNUM | NEG_BIGNUM => return decode_bignum(d, tag),
                121..=127 => tag - CONSTR_BASE,
                1280..=1400 => tag - 1280 + 7,
                102 => {
                    let len = d.array()?;
                    let n = d.u64()?;
                    let fields = read_list(d, |d| decode_nested(d, depth))?;
                    end_array(d, len, 2)?;
                    return Ok(PlutusData::Constr(n, fields));
                }
                _ => return Err(decode::Error::message(format!("unsupported Plutus data tag {tag}"))),
            };
            Ok(PlutusData::Constr(constr, read_list(d, |d| decode_nested(d, depth))?))
        }
        Type::Map | Type::MapIndef => {
            let len = d.map()?;
            let mut entries = vec![];
            let mut item = |d: &mut Decoder| -> Result<(), decode::Error> {
                let k = decode_nested(d, depth)?;
                let v = decode_nested(d, depth)?;
                entries.push((k, v));
                Ok(())
            };
            match len {
                Some(n) => {
                    for _ in 0..n {
                        item(d)?;
                    }
                }
                None => {
                    while !at_break(d)? {
                        item(d)?;
                    }
                    skip_break(d);
                }
            }
            Ok(PlutusData::Map(entries))
        }
        Type::Array | Type::ArrayIndef => Ok(PlutusData::List(read_list(d, |d| decode_nested(d, depth))?)),
        Type::Bytes | Type::BytesIndef => Ok(PlutusData::Bytes(read_bytes(d)?)),
        Type::U8
        | Type::U16
        | Type::U32
        | Type::U64
        | Type::I8
        | Type::I16
        | Type::I32
        | Type::I64 => Ok(PlutusData::Int(i128::from(d.int()?))),
        other => Err(decode::Error::message(format!("unexpected CBOR type {other:?} in Plutus data"))),
    }
}

fn read_bytes(d: &mut Decoder) -> Result<Vec<u8>, decode::Error> {
    if d.datatype()? == Type::Bytes {
        return Ok(d.bytes()?.to_vec());
    }
    let mut bytes = vec![];
    for chunk in d.bytes_iter()? {
        bytes.extend_from_slice(chunk?);
    }
    Ok(bytes)
}

/// Reads the big-endian magnitude following a bignum tag. Tag 2 carries `n`, tag 3 carries
/// `-1 - n`.
fn decode_bignum(d: &mut Decoder, tag: u64) -> Result<PlutusData, decode::Error> {
    let bytes = read_bytes(d)?;
    let digits = &bytes[bytes.iter().take_while(|b| **b == 0).count()..];
    let too_big = || decode::Error::message("big integer exceeds 128 bits");
    if digits.len() > 16 {
        return Err(too_big());
    }
    let mut buf = [0u8; 16];
    buf[16 - digits.len()..].copy_from_slice(digits);
    let n = i128::try_from(u128::from_be_bytes(buf)).map_err(|_| too_big())?;
    Ok(PlutusData::Int(if tag == NEG_BIGNUM { -1 - n } else { n }))
}

fn at_break(d: &mut Decoder) -> Result<bool, decode::Error> { Ok(d.datatype()? == Type::Break) }

fn skip_break(d: &mut Decoder) { d.set_position(d.position() + 1) }

/// Reads a definite or indefinite array, decoding each element with `item`.
pub(crate) fn read_list<'b, T>(
    d: &mut Decoder<'b>,
    mut item: impl FnMut(&mut Decoder<'b>) -> Result<T, decode::Error>,
) -> Result<Vec<T>, decode::Error> {
    let mut items = vec![];
    match d.array()? {
        Some(n) => {
            for _ in 0..n {
                items.push(item(d)?);
            }
        }
        None => {
            while !at_break(d)? {
                items.push(item(d)?);
            }
            skip_break(d);
        }
    }
    Ok(items)
}

/// Closes an array of exactly `fields` elements, all of which were read one by one. A definite
/// array must have declared that length; an indefinite one must end with a break marker here.
pub(crate) fn end_array(d: &mut Decoder, len: Option<u64>, fields: u64) -> Result<(), decode::Error> {
    match len {
        Some(n) if n == fields => Ok(()),
        Some(n) => Err(decode::Error::message(format!("expected an array of {fields} elements, found {n}"))),
        None if at_break(d)? => {
            skip_break(d);
            Ok(())
        }
        None => Err(decode::Error::message(format!("indefinite array has more than {fields} elements"))),
    }
}
