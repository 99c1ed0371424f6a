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

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use freezer::{AssetId, Value};
use pallas_addresses::Address;
use pallas_crypto::hash::Hash;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_crate::de::DeserializeOwned;

use crate::{ExUnits, Network, OutPoint, ProtocolParams, Provider, ProviderError, Utxo};

const PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Provider`] backed by the Blockfrost REST API.
pub struct Blockfrost {
    client: Client,
    base_url: String,
    project_id: String,
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate")]
struct BfAmount {
    unit: String,
    quantity: String,
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate")]
struct BfUtxo {
    tx_hash: String,
    output_index: u64,
    address: String,
    amount: Vec<BfAmount>,
    data_hash: Option<String>,
    inline_datum: Option<String>,
    reference_script_hash: Option<String>,
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate")]
struct BfParams {
    min_fee_a: u64,
    min_fee_b: u64,
    max_tx_size: u64,
    coins_per_utxo_size: Option<String>,
    price_mem: Option<f64>,
    price_step: Option<f64>,
    max_tx_ex_mem: Option<String>,
    max_tx_ex_steps: Option<String>,
    collateral_percent: Option<u64>,
    #[serde(default)]
    cost_models_raw: Option<BTreeMap<String, Vec<i64>>>,
}

fn protocol_err(err: impl ToString) -> ProviderError { ProviderError::Protocol(err.to_string()) }

fn parse_amount(value: &str, what: &str) -> Result<u64, ProviderError> {
    value
        .parse()
        .map_err(|_| ProviderError::Protocol(format!("{what} '{value}' is not a number")))
}

impl TryFrom<BfUtxo> for Utxo {
    type Error = ProviderError;

    fn try_from(utxo: BfUtxo) -> Result<Self, Self::Error> {
        let tx_hash = Hash::<32>::from_str(&utxo.tx_hash).map_err(protocol_err)?;
        let value = utxo
            .amount
            .iter()
            .map(|amount| Ok((AssetId::from_unit(&amount.unit), parse_amount(&amount.quantity, "quantity")?)))
            .collect::<Result<Value, ProviderError>>()?;
        let inline_datum = utxo
            .inline_datum
            .map(|datum| hex::decode(datum).map_err(protocol_err))
            .transpose()?;
        Ok(Utxo {
            outpoint: OutPoint::new(tx_hash, utxo.output_index),
            address: utxo.address,
            value,
            datum_hash: utxo.data_hash,
            inline_datum,
            reference_script_hash: utxo.reference_script_hash,
        })
    }
}

impl TryFrom<BfParams> for ProtocolParams {
    type Error = ProviderError;

    fn try_from(params: BfParams) -> Result<Self, Self::Error> {
        let opt_amount = |value: Option<String>, what: &str| -> Result<u64, ProviderError> {
            value.map_or(Ok(0), |value| parse_amount(&value, what))
        };
        let plutus_v2_cost_model = params
            .cost_models_raw
            .and_then(|mut models| models.remove("PlutusV2"))
            .ok_or_else(|| protocol_err("protocol parameters lack the PlutusV2 cost model"))?;
        Ok(ProtocolParams {
            min_fee_a: params.min_fee_a,
            min_fee_b: params.min_fee_b,
            max_tx_size: params.max_tx_size,
            coins_per_utxo_byte: opt_amount(params.coins_per_utxo_size, "coins_per_utxo_size")?,
            price_mem: params.price_mem.unwrap_or_default(),
            price_step: params.price_step.unwrap_or_default(),
            max_tx_ex_units: ExUnits::new(
                opt_amount(params.max_tx_ex_mem, "max_tx_ex_mem")?,
                opt_amount(params.max_tx_ex_steps, "max_tx_ex_steps")?,
            ),
            collateral_percent: params.collateral_percent.unwrap_or(150),
            plutus_v2_cost_model,
        })
    }
}

/// Reads redeemer budgets out of an Ogmios `EvaluateTx` response.
fn parse_evaluation(response: serde_json::Value) -> Result<BTreeMap<u32, ExUnits>, ProviderError> {
    let result = &response["result"];
    if let Some(failure) = result.get("EvaluationFailure") {
        return Err(ProviderError::Evaluation(failure.to_string()));
    }
    let budgets = result["EvaluationResult"]
        .as_object()
        .ok_or_else(|| protocol_err(format!("unexpected evaluation response {response}")))?;
    let mut res = BTreeMap::new();
    for (tag, budget) in budgets {
        let Some(index) = tag.strip_prefix("spend:") else {
            debug!("Ignoring budget of non-spend redeemer {tag}");
            continue;
        };
        let index = index.parse().map_err(|_| protocol_err(format!("invalid redeemer tag '{tag}'")))?;
        let mem = budget["memory"].as_u64();
        let steps = budget["steps"].as_u64();
        let (Some(mem), Some(steps)) = (mem, steps) else {
            return Err(protocol_err(format!("invalid budget for redeemer '{tag}': {budget}")));
        };
        res.insert(index, ExUnits::new(mem, steps));
    }
    Ok(res)
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Protocol(err.to_string())
        } else {
            ProviderError::Connectivity(err.to_string())
        }
    }
}

impl Blockfrost {
    pub fn new(network: Network, project_id: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_url(network.blockfrost_url(), project_id)
    }

    pub fn with_url(base_url: impl Into<String>, project_id: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Blockfrost { client, base_url: base_url.into(), project_id: project_id.into() })
    }

    fn url(&self, path: &str) -> String { format!("{}{path}", self.base_url) }

    /// Sends the request, mapping 404 to `None` and other failures to errors.
    fn send(&self, request: RequestBuilder) -> Result<Option<Response>, ProviderError> {
        let response = request.header("project_id", &self.project_id).send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::ServerSide(status.as_u16(), body));
        }
        Ok(Some(response))
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ProviderError> {
        trace!("GET {path}");
        match self.send(self.client.get(self.url(path)))? {
            Some(response) => Ok(Some(response.json()?)),
            None => Ok(None),
        }
    }
}

impl Provider for Blockfrost {
    fn utxos_at(&self, address: &Address) -> Result<Vec<Utxo>, ProviderError> {
        let address = address.to_bech32().map_err(protocol_err)?;
        let mut res = Vec::new();
        for page in 1.. {
            let path = format!("/addresses/{address}/utxos?page={page}");
            let Some(utxos) = self.get::<Vec<BfUtxo>>(&path)? else {
                break;
            };
            let last = utxos.len() < PAGE_SIZE;
            for utxo in utxos {
                res.push(Utxo::try_from(utxo)?);
            }
            if last {
                break;
            }
        }
        debug!("Found {} UTXO(s) at {address}", res.len());
        Ok(res)
    }

    fn protocol_params(&self) -> Result<ProtocolParams, ProviderError> {
        let params = self
            .get::<BfParams>("/epochs/latest/parameters")?
            .ok_or_else(|| protocol_err("protocol parameters are not available"))?;
        ProtocolParams::try_from(params)
    }

    fn evaluate(&self, tx: &[u8]) -> Result<BTreeMap<u32, ExUnits>, ProviderError> {
        let request = self
            .client
            .post(self.url("/utils/txs/evaluate"))
            .header(CONTENT_TYPE, "application/cbor")
            .body(hex::encode(tx));
        let response = self
            .send(request)?
            .ok_or_else(|| protocol_err("evaluation endpoint is not available"))?;
        parse_evaluation(response.json()?)
    }

    fn submit(&self, tx: &[u8]) -> Result<Hash<32>, ProviderError> {
        let request = self
            .client
            .post(self.url("/tx/submit"))
            .header(CONTENT_TYPE, "application/cbor")
            .body(tx.to_vec());
        let response = self
            .send(request)?
            .ok_or_else(|| protocol_err("submission endpoint is not available"))?;
        let hash: String = response.json()?;
        Hash::<32>::from_str(&hash).map_err(protocol_err)
    }

    fn is_seen(&self, tx_hash: Hash<32>) -> Result<bool, ProviderError> {
        Ok(self
            .get::<serde_json::Value>(&format!("/txs/{tx_hash}"))?
            .is_some())
    }
}
