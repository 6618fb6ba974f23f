/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Ledger-facing types and the external collaborators the control plane
//! talks to. Collaborators are traits; the crate never performs network
//! or storage I/O on its own.

use std::fmt;

use async_trait::async_trait;

use crate::{
    model::Credential,
    plutus::{self, FromPlutusData, KeyHash, ScriptHash, TxHash},
    util::time::Timestamp,
    Error, Result,
};

/// Multi-asset bundles
pub mod value;
pub use value::{AssetId, Value};

/// Shelley-style address: payment credential plus optional staking part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub payment: Credential,
    pub stake: Option<Credential>,
}

impl Address {
    /// Enterprise address locked by a script.
    pub fn script(hash: ScriptHash) -> Self {
        Self { payment: Credential::Script(hash), stake: None }
    }

    /// Enterprise address owned by a key.
    pub fn key(hash: KeyHash) -> Self {
        Self { payment: Credential::Key(hash), stake: None }
    }

    pub fn script_hash(&self) -> Option<ScriptHash> {
        match self.payment {
            Credential::Script(h) => Some(h),
            Credential::Key(_) => None,
        }
    }
}

impl From<Credential> for Address {
    fn from(payment: Credential) -> Self {
        Self { payment, stake: None }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.stake {
            Some(stake) => write!(f, "{}+{}", self.payment, stake),
            None => write!(f, "{}", self.payment),
        }
    }
}

/// Reference to a transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutRef {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl fmt::Display for OutRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

/// An unspent output as reported by the ledger collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub out_ref: OutRef,
    pub address: Address,
    pub assets: Value,
    /// Inline datum bytes
    pub datum: Option<Vec<u8>>,
    /// Hash of the reference script stored in this output, if any
    pub script_ref: Option<ScriptHash>,
}

impl Utxo {
    /// Decode the inline datum as `T`.
    pub fn decode_datum<T: FromPlutusData>(&self) -> Result<T> {
        let datum = self.datum.as_ref().ok_or_else(|| Error::MissingDatum(self.out_ref.to_string()))?;
        plutus::decode(datum)
    }

    pub fn holds(&self, asset: &AssetId) -> bool {
        self.assets.get(asset) > 0
    }
}

/// Output produced by a transaction shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub address: Address,
    pub assets: Value,
    pub datum: Option<Vec<u8>>,
    /// Script deployed as a reference script in this output
    pub script_ref: Option<ScriptHash>,
}

impl TxOutput {
    pub fn new(address: Address, assets: Value) -> Self {
        Self { address, assets, datum: None, script_ref: None }
    }

    pub fn with_datum(mut self, datum: Vec<u8>) -> Self {
        self.datum = Some(datum);
        self
    }

    pub fn with_script_ref(mut self, script: ScriptHash) -> Self {
        self.script_ref = Some(script);
        self
    }

    /// The unspent output this becomes once the transaction lands.
    pub fn into_utxo(self, out_ref: OutRef) -> Utxo {
        Utxo {
            out_ref,
            address: self.address,
            assets: self.assets,
            datum: self.datum,
            script_ref: self.script_ref,
        }
    }
}

/// Ledger node or indexer.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn fetch_utxos_at(&self, address: &Address) -> Result<Vec<Utxo>>;

    /// The single output holding `unit`, if one exists.
    async fn fetch_utxo_by_unit(&self, unit: &AssetId) -> Result<Option<Utxo>>;

    async fn fetch_utxos_by_ref(&self, refs: &[OutRef]) -> Result<Vec<Utxo>>;

    async fn current_time(&self) -> Result<Timestamp>;

    async fn submit(&self, signed_tx: &[u8]) -> Result<TxHash>;

    /// Number of blocks built on top of the block holding `tx_hash`.
    async fn confirmations(&self, tx_hash: &TxHash) -> Result<u64>;
}

/// Content-addressed store for effect payloads too large to keep on chain.
#[async_trait]
pub trait Archive: Send + Sync {
    async fn store(&self, content: &[u8]) -> Result<String>;

    async fn fetch(&self, content_id: &str) -> Result<Vec<u8>>;
}

/// Key of off-chain bookkeeping entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub dao_id: String,
    pub proposal_id: Option<u64>,
}

/// Confirmation state of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Pending(TxHash),
    Confirmed(TxHash),
}

/// Off-chain metadata and confirmation bookkeeping.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn record_pending(&self, key: &RecordKey, tx_hash: &TxHash) -> Result<()>;

    async fn mark_confirmed(&self, tx_hash: &TxHash) -> Result<()>;

    async fn lookup(&self, key: &RecordKey) -> Result<Option<Confirmation>>;
}
