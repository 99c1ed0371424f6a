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

use std::fmt::{self, Debug, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use bech32::FromBase32;
use pallas_addresses::{Address, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart};
use pallas_crypto::hash::{Hash, Hasher};
use pallas_crypto::key::ed25519::SecretKey;
use pallas_wallet::hd::Bip32PrivateKey;
use pallas_wallet::PrivateKey;

use crate::Network;

const HARDENED: u32 = 0x8000_0000;
const SKEY_HRP: &str = "ed25519_sk";
/// CBOR bytestring header of a 32-byte key inside a text envelope.
const SKEY_CBOR_PREFIX: [u8; 2] = [0x58, 0x20];

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum WalletError {
    /// must specify a wallet source: skeyFile, mnemonic, or mnemonicFile
    NoSource,

    /// unable to read wallet file '{0}': {1}
    Read(String, std::io::Error),

    /// secret key is not a valid bech32 string: {0}
    #[from]
    Bech32(bech32::Error),

    /// secret key has human-readable part '{0}' instead of 'ed25519_sk'.
    WrongHrp(String),

    /// secret key envelope is not valid: {0}
    #[from]
    Envelope(serde_json::Error),

    /// secret key envelope holds '{0}', which is not a CBOR-encoded 32-byte key.
    EnvelopePayload(String),

    /// secret key must be 32 bytes long, while {0} bytes were provided.
    KeyLength(usize),

    /// invalid mnemonic phrase: {0}
    Mnemonic(String),
}

/// Where the signing key comes from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum WalletSource {
    SkeyFile(PathBuf),
    MnemonicFile(PathBuf),
    Mnemonic(String),
}

impl WalletSource {
    /// Picks the first source present, in the order secret key file, mnemonic file, mnemonic.
    pub fn select(
        skey_file: Option<PathBuf>,
        mnemonic: Option<String>,
        mnemonic_file: Option<PathBuf>,
    ) -> Result<Self, WalletError> {
        skey_file
            .map(WalletSource::SkeyFile)
            .or(mnemonic_file.map(WalletSource::MnemonicFile))
            .or(mnemonic.map(WalletSource::Mnemonic))
            .ok_or(WalletError::NoSource)
    }
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
struct TextEnvelope {
    #[serde(rename = "type", default)]
    kind: String,
    cbor_hex: String,
}

enum KeyMaterial {
    Normal([u8; 32]),
    Extended(Bip32PrivateKey),
}

impl KeyMaterial {
    fn private_key(&self) -> PrivateKey {
        match self {
            KeyMaterial::Normal(bytes) => PrivateKey::Normal(SecretKey::from(*bytes)),
            KeyMaterial::Extended(xpriv) => xpriv.to_ed25519_private_key(),
        }
    }
}

/// Signing wallet: a payment key and, for mnemonic wallets, a stake key hash.
pub struct Wallet {
    key: KeyMaterial,
    payment_key_hash: Hash<28>,
    stake_key_hash: Option<Hash<28>>,
}

impl Debug for Wallet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("payment_key_hash", &self.payment_key_hash)
            .field("stake_key_hash", &self.stake_key_hash)
            .finish_non_exhaustive()
    }
}

fn read(path: &Path) -> Result<String, WalletError> {
    fs::read_to_string(path).map_err(|err| WalletError::Read(path.display().to_string(), err))
}

fn key_hash(key: &PrivateKey) -> Hash<28> { Hasher::<224>::hash(key.public_key().as_ref()) }

impl Wallet {
    pub fn load(source: &WalletSource) -> Result<Self, WalletError> {
        let wallet = match source {
            WalletSource::SkeyFile(path) => Self::from_skey(&read(path)?)?,
            WalletSource::MnemonicFile(path) => Self::from_mnemonic(&read(path)?)?,
            WalletSource::Mnemonic(phrase) => Self::from_mnemonic(phrase)?,
        };
        debug!("Using wallet with payment key hash {}", wallet.payment_key_hash);
        Ok(wallet)
    }

    /// Parses a secret key given either as a bech32 `ed25519_sk` string or as a cardano-cli
    /// text envelope.
    pub fn from_skey(text: &str) -> Result<Self, WalletError> {
        let text = text.trim();
        let bytes = if text.starts_with('{') {
            let envelope: TextEnvelope = serde_json::from_str(text)?;
            trace!("Reading secret key from '{}' text envelope", envelope.kind);
            let payload = hex::decode(envelope.cbor_hex.trim())
                .map_err(|_| WalletError::EnvelopePayload(envelope.cbor_hex.clone()))?;
            match payload.strip_prefix(&SKEY_CBOR_PREFIX[..]) {
                Some(key) => key.to_vec(),
                None => return Err(WalletError::EnvelopePayload(envelope.cbor_hex)),
            }
        } else {
            let (hrp, data, _) = bech32::decode(text)?;
            if hrp != SKEY_HRP {
                return Err(WalletError::WrongHrp(hrp));
            }
            Vec::<u8>::from_base32(&data)?
        };
        let bytes = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| WalletError::KeyLength(bytes.len()))?;

        let key = KeyMaterial::Normal(bytes);
        let payment_key_hash = key_hash(&key.private_key());
        Ok(Wallet { key, payment_key_hash, stake_key_hash: None })
    }

    /// Derives the first payment and stake keys of account 0 following CIP-1852.
    pub fn from_mnemonic(phrase: &str) -> Result<Self, WalletError> {
        let phrase = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        let root = Bip32PrivateKey::from_bip39_mnenomic(phrase, s!(""))
            .map_err(|err| WalletError::Mnemonic(err.to_string()))?;
        let account = root
            .derive(HARDENED | 1852)
            .derive(HARDENED | 1815)
            .derive(HARDENED);
        let payment = account.derive(0).derive(0);
        let stake = account.derive(2).derive(0);

        let stake_key_hash = Some(key_hash(&stake.to_ed25519_private_key()));
        let key = KeyMaterial::Extended(payment);
        let payment_key_hash = key_hash(&key.private_key());
        Ok(Wallet { key, payment_key_hash, stake_key_hash })
    }

    pub fn payment_key_hash(&self) -> Hash<28> { self.payment_key_hash }

    pub fn stake_key_hash(&self) -> Option<Hash<28>> { self.stake_key_hash }

    /// Base address for mnemonic wallets, enterprise address for bare secret keys.
    pub fn address(&self, network: Network) -> Address {
        let delegation = match self.stake_key_hash {
            Some(hash) => ShelleyDelegationPart::key_hash(hash),
            None => ShelleyDelegationPart::Null,
        };
        Address::Shelley(ShelleyAddress::new(
            network.ledger(),
            ShelleyPaymentPart::key_hash(self.payment_key_hash),
            delegation,
        ))
    }

    pub fn private_key(&self) -> PrivateKey { self.key.private_key() }
}
