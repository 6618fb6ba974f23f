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

use std::fmt;

use super::{FromPlutusData, PlutusData, ToPlutusData};
use crate::{Error, Result};

/// Fixed-size ledger hash. Ordering is lexicographic over the raw bytes,
/// which is the order inner effect maps are sorted in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const N: usize>(pub [u8; N]);

/// Blake2b-224 hash of a verification key
pub type KeyHash = Hash<28>;
/// Blake2b-224 hash of a script, doubling as minting policy id
pub type ScriptHash = Hash<28>;
/// Blake2b-256 hash of a datum's CBOR encoding
pub type DatumHash = Hash<32>;
/// Transaction id
pub type TxHash = Hash<32>;

impl<const N: usize> Hash<N> {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; N] = bytes.try_into().map_err(|_| {
            Error::MalformedDatum(format!("expected {N} byte hash, found {} bytes", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_slice(&hex::decode(s)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> fmt::Display for Hash<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl<const N: usize> fmt::Debug for Hash<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl<const N: usize> ToPlutusData for Hash<N> {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::bytes(self.0)
    }
}

impl<const N: usize> FromPlutusData for Hash<N> {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        Self::from_slice(data.as_bytes()?)
    }
}

fn blake2b<const N: usize>(chunks: &[&[u8]]) -> [u8; N] {
    let mut state = blake2b_simd::Params::new().hash_length(N).to_state();
    for chunk in chunks {
        state.update(chunk);
    }
    let mut out = [0u8; N];
    out.copy_from_slice(state.finalize().as_bytes());
    out
}

/// Hash of a datum given its CBOR encoding.
pub fn datum_hash(cbor: &[u8]) -> DatumHash {
    Hash(blake2b::<32>(&[cbor]))
}

/// Language tag prefixed to Plutus V2 scripts before hashing.
pub const PLUTUS_V2_TAG: u8 = 0x02;

/// Hash of a Plutus V2 script given its single-wrapped CBOR envelope.
pub fn script_hash(script_cbor: &[u8]) -> ScriptHash {
    Hash(blake2b::<28>(&[&[PLUTUS_V2_TAG], script_cbor]))
}
