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

//! Plutus structured data, the datum and redeemer representation every
//! governance record is lowered into before it touches the ledger.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{util::time::Timestamp, Error, Result};

/// CBOR wire codec for [`PlutusData`]
pub mod cbor;

/// Ledger hashes and their derivation
pub mod hash;
pub use hash::{datum_hash, script_hash, DatumHash, Hash, KeyHash, ScriptHash, TxHash};

/// Structured data as understood by on-chain validators.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PlutusData {
    /// Constructor application: index and positional fields
    Constr(u64, Vec<PlutusData>),
    /// Association list, order preserved
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(BigInt),
    Bytes(Vec<u8>),
}

impl PlutusData {
    pub fn integer<T: Into<BigInt>>(value: T) -> Self {
        Self::Integer(value.into())
    }

    pub fn bytes<T: AsRef<[u8]>>(value: T) -> Self {
        Self::Bytes(value.as_ref().to_vec())
    }

    pub fn constr(index: u64, fields: Vec<PlutusData>) -> Self {
        Self::Constr(index, fields)
    }

    /// The unit value `Constr 0 []`, used as void datum and redeemer.
    pub fn unit() -> Self {
        Self::Constr(0, vec![])
    }

    /// Encode into canonical CBOR bytes.
    pub fn to_cbor(&self) -> Vec<u8> {
        cbor::encode(self)
    }

    /// Decode from CBOR bytes, rejecting trailing input.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        cbor::decode(bytes)
    }

    /// Blake2b-256 hash of the canonical encoding.
    pub fn hash(&self) -> DatumHash {
        datum_hash(&self.to_cbor())
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Constr(..) => "constr",
            Self::Map(_) => "map",
            Self::List(_) => "list",
            Self::Integer(_) => "integer",
            Self::Bytes(_) => "bytes",
        }
    }

    pub fn as_integer(&self) -> Result<&BigInt> {
        match self {
            Self::Integer(i) => Ok(i),
            other => Err(unexpected("integer", other)),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        let i = self.as_integer()?;
        i.to_u64().ok_or_else(|| Error::MalformedDatum(format!("integer {i} out of u64 range")))
    }

    pub fn as_i64(&self) -> Result<i64> {
        let i = self.as_integer()?;
        i.to_i64().ok_or_else(|| Error::MalformedDatum(format!("integer {i} out of i64 range")))
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Self::Bytes(b) => Ok(b),
            other => Err(unexpected("bytes", other)),
        }
    }

    pub fn as_list(&self) -> Result<&[PlutusData]> {
        match self {
            Self::List(l) => Ok(l),
            other => Err(unexpected("list", other)),
        }
    }

    pub fn as_map(&self) -> Result<&[(PlutusData, PlutusData)]> {
        match self {
            Self::Map(m) => Ok(m),
            other => Err(unexpected("map", other)),
        }
    }

    pub fn as_constr(&self) -> Result<(u64, &[PlutusData])> {
        match self {
            Self::Constr(i, f) => Ok((*i, f)),
            other => Err(unexpected("constr", other)),
        }
    }

    /// Interpret as a record: a list with exactly `arity` fields.
    pub fn as_record(&self, name: &str, arity: usize) -> Result<&[PlutusData]> {
        let fields = self.as_list()?;
        if fields.len() != arity {
            return Err(Error::MalformedDatum(format!(
                "{name} expects {arity} fields, found {}",
                fields.len()
            )))
        }
        Ok(fields)
    }

    /// Interpret as a constructor with the given field count, returning its index.
    pub fn as_variant(&self, name: &str, arities: &[usize]) -> Result<(u64, &[PlutusData])> {
        let (index, fields) = self.as_constr()?;
        let Some(arity) = usize::try_from(index).ok().and_then(|i| arities.get(i)) else {
            return Err(Error::MalformedDatum(format!("{name} has no constructor {index}")))
        };
        if fields.len() != *arity {
            return Err(Error::MalformedDatum(format!(
                "{name} constructor {index} expects {arity} fields, found {}",
                fields.len()
            )))
        }
        Ok((index, fields))
    }
}

fn unexpected(expected: &str, found: &PlutusData) -> Error {
    Error::MalformedDatum(format!("expected {expected}, found {}", found.kind()))
}

/// Lowering of a typed value into [`PlutusData`].
pub trait ToPlutusData {
    fn to_plutus_data(&self) -> PlutusData;
}

/// Lifting of [`PlutusData`] into a typed value, validating structure.
pub trait FromPlutusData: Sized {
    fn from_plutus_data(data: &PlutusData) -> Result<Self>;
}

/// Encode a record into its on-chain bytes.
pub fn encode<T: ToPlutusData + ?Sized>(value: &T) -> Vec<u8> {
    value.to_plutus_data().to_cbor()
}

/// Decode a record from on-chain bytes.
pub fn decode<T: FromPlutusData>(bytes: &[u8]) -> Result<T> {
    T::from_plutus_data(&PlutusData::from_cbor(bytes)?)
}

impl ToPlutusData for PlutusData {
    fn to_plutus_data(&self) -> PlutusData {
        self.clone()
    }
}

impl FromPlutusData for PlutusData {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        Ok(data.clone())
    }
}

impl ToPlutusData for u64 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::integer(*self)
    }
}

impl FromPlutusData for u64 {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        data.as_u64()
    }
}

impl ToPlutusData for i64 {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::integer(*self)
    }
}

impl FromPlutusData for i64 {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        data.as_i64()
    }
}

impl ToPlutusData for BigInt {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::Integer(self.clone())
    }
}

impl FromPlutusData for BigInt {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        data.as_integer().cloned()
    }
}

impl ToPlutusData for Timestamp {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::integer(self.0)
    }
}

impl FromPlutusData for Timestamp {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        Ok(Self(data.as_i64()?))
    }
}

impl<T: ToPlutusData> ToPlutusData for Vec<T> {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(self.iter().map(ToPlutusData::to_plutus_data).collect())
    }
}

impl<T: FromPlutusData> FromPlutusData for Vec<T> {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        data.as_list()?.iter().map(T::from_plutus_data).collect()
    }
}

/// `Maybe`: `Just x` is constructor 0 with one field, `Nothing` is constructor 1.
impl<T: ToPlutusData> ToPlutusData for Option<T> {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            Some(v) => PlutusData::constr(0, vec![v.to_plutus_data()]),
            None => PlutusData::constr(1, vec![]),
        }
    }
}

impl<T: FromPlutusData> FromPlutusData for Option<T> {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        match data.as_variant("Maybe", &[1, 0])? {
            (0, fields) => Ok(Some(T::from_plutus_data(&fields[0])?)),
            _ => Ok(None),
        }
    }
}

/// Maps encode in ascending key order; duplicate keys are rejected on decode.
impl<K: ToPlutusData, V: ToPlutusData> ToPlutusData for BTreeMap<K, V> {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::Map(self.iter().map(|(k, v)| (k.to_plutus_data(), v.to_plutus_data())).collect())
    }
}

impl<K: FromPlutusData + Ord, V: FromPlutusData> FromPlutusData for BTreeMap<K, V> {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (k, v) in data.as_map()? {
            if map.insert(K::from_plutus_data(k)?, V::from_plutus_data(v)?).is_some() {
                return Err(Error::MalformedDatum("duplicate map key".to_string()))
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maybe_encoding() {
        let just: Option<u64> = Some(7);
        assert_eq!(just.to_plutus_data(), PlutusData::constr(0, vec![PlutusData::integer(7)]));
        assert_eq!(None::<u64>.to_plutus_data(), PlutusData::constr(1, vec![]));

        let bad = PlutusData::constr(1, vec![PlutusData::integer(1)]);
        assert!(matches!(Option::<u64>::from_plutus_data(&bad), Err(Error::MalformedDatum(_))));
        let bad = PlutusData::constr(2, vec![]);
        assert!(matches!(Option::<u64>::from_plutus_data(&bad), Err(Error::MalformedDatum(_))));
    }

    #[test]
    fn record_arity() {
        let rec = PlutusData::List(vec![PlutusData::integer(1), PlutusData::integer(2)]);
        assert!(rec.as_record("pair", 2).is_ok());
        assert!(matches!(rec.as_record("triple", 3), Err(Error::MalformedDatum(_))));
        assert!(PlutusData::integer(1).as_record("pair", 2).is_err());
    }

    #[test]
    fn integer_ranges() {
        assert!(PlutusData::integer(-1).as_u64().is_err());
        assert_eq!(PlutusData::integer(u64::MAX).as_u64().unwrap(), u64::MAX);
        let huge = PlutusData::Integer(BigInt::from(u64::MAX) * 4);
        assert!(huge.as_u64().is_err());
        assert!(huge.as_i64().is_err());
    }

    #[test]
    fn duplicate_map_keys_rejected() {
        let data = PlutusData::Map(vec![
            (PlutusData::integer(1), PlutusData::integer(1)),
            (PlutusData::integer(1), PlutusData::integer(2)),
        ]);
        assert!(BTreeMap::<u64, u64>::from_plutus_data(&data).is_err());
    }
}
