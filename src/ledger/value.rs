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

use std::{collections::BTreeMap, fmt};

use crate::{
    plutus::{FromPlutusData, PlutusData, ScriptHash, ToPlutusData},
    Error, Result,
};

/// Maximum length of a native asset name.
pub const MAX_ASSET_NAME_LEN: usize = 32;

/// Asset class: ada, or a native token under a minting policy.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetId {
    Lovelace,
    Native { policy: ScriptHash, name: Vec<u8> },
}

impl AssetId {
    pub fn native<N: AsRef<[u8]>>(policy: ScriptHash, name: N) -> Result<Self> {
        let name = name.as_ref();
        if name.len() > MAX_ASSET_NAME_LEN {
            return Err(Error::MalformedDatum(format!("asset name of {} bytes", name.len())))
        }
        Ok(Self::Native { policy, name: name.to_vec() })
    }

    /// Policy id bytes, empty for ada.
    pub fn policy_bytes(&self) -> Vec<u8> {
        match self {
            Self::Lovelace => vec![],
            Self::Native { policy, .. } => policy.as_bytes().to_vec(),
        }
    }

    /// Asset name bytes, empty for ada.
    pub fn name_bytes(&self) -> Vec<u8> {
        match self {
            Self::Lovelace => vec![],
            Self::Native { name, .. } => name.clone(),
        }
    }

    pub fn policy(&self) -> Option<ScriptHash> {
        match self {
            Self::Lovelace => None,
            Self::Native { policy, .. } => Some(*policy),
        }
    }

    fn from_parts(policy: &[u8], name: &[u8]) -> Result<Self> {
        if policy.is_empty() {
            if !name.is_empty() {
                return Err(Error::MalformedDatum("ada with a non-empty asset name".to_string()))
            }
            return Ok(Self::Lovelace)
        }
        Self::native(ScriptHash::from_slice(policy)?, name)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Lovelace => write!(f, "lovelace"),
            Self::Native { policy, name } => write!(f, "{policy}.{}", hex::encode(name)),
        }
    }
}

/// A bundle of assets. Zero quantities are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Value(BTreeMap<AssetId, u64>);

impl Value {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lovelace(amount: u64) -> Self {
        Self::new().with(AssetId::Lovelace, amount)
    }

    /// Builder-style insertion, summing with any existing quantity.
    pub fn with(mut self, asset: AssetId, amount: u64) -> Self {
        if amount > 0 {
            let entry = self.0.entry(asset).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
        self
    }

    pub fn get(&self, asset: &AssetId) -> u64 {
        self.0.get(asset).copied().unwrap_or(0)
    }

    pub fn coin(&self) -> u64 {
        self.get(&AssetId::Lovelace)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &u64)> {
        self.0.iter()
    }

    pub fn add_asset(&mut self, asset: &AssetId, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(())
        }
        let entry = self.0.entry(asset.clone()).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(Error::Overflow)?;
        Ok(())
    }

    pub fn sub_asset(&mut self, asset: &AssetId, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(())
        }
        let have = self.get(asset);
        let left =
            have.checked_sub(amount).ok_or_else(|| Error::InsufficientFunds(asset.to_string()))?;
        if left == 0 {
            self.0.remove(asset);
        } else {
            self.0.insert(asset.clone(), left);
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Value) -> Result<Value> {
        let mut out = self.clone();
        for (asset, amount) in other.iter() {
            out.add_asset(asset, *amount)?;
        }
        Ok(out)
    }

    /// Subtract `other`, failing with `InsufficientFunds` on the first
    /// asset that would go negative.
    pub fn checked_sub(&self, other: &Value) -> Result<Value> {
        let mut out = self.clone();
        for (asset, amount) in other.iter() {
            out.sub_asset(asset, *amount)?;
        }
        Ok(out)
    }

    /// Saturating difference: what `self` holds beyond `other`.
    pub fn excess_over(&self, other: &Value) -> Value {
        let mut out = Value::new();
        for (asset, amount) in self.iter() {
            let extra = amount.saturating_sub(other.get(asset));
            if extra > 0 {
                out.0.insert(asset.clone(), extra);
            }
        }
        out
    }

    pub fn sum<'a, I: IntoIterator<Item = &'a Value>>(values: I) -> Result<Value> {
        let mut out = Value::new();
        for v in values {
            out = out.checked_add(v)?;
        }
        Ok(out)
    }
}

impl FromIterator<(AssetId, u64)> for Value {
    fn from_iter<T: IntoIterator<Item = (AssetId, u64)>>(iter: T) -> Self {
        iter.into_iter().fold(Value::new(), |v, (asset, amount)| v.with(asset, amount))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(a, n)| format!("{n} {a}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// On-chain value layout: `Map<policy, Map<name, quantity>>`, ada under
/// the empty policy and name.
impl ToPlutusData for Value {
    fn to_plutus_data(&self) -> PlutusData {
        let mut by_policy: BTreeMap<Vec<u8>, Vec<(PlutusData, PlutusData)>> = BTreeMap::new();
        for (asset, amount) in self.iter() {
            by_policy
                .entry(asset.policy_bytes())
                .or_default()
                .push((PlutusData::Bytes(asset.name_bytes()), PlutusData::integer(*amount)));
        }
        PlutusData::Map(
            by_policy
                .into_iter()
                .map(|(policy, names)| (PlutusData::Bytes(policy), PlutusData::Map(names)))
                .collect(),
        )
    }
}

impl FromPlutusData for Value {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let mut value = Value::new();
        for (policy, names) in data.as_map()? {
            let policy = policy.as_bytes()?;
            for (name, amount) in names.as_map()? {
                let asset = AssetId::from_parts(policy, name.as_bytes()?)?;
                value.add_asset(&asset, amount.as_u64()?)?;
            }
        }
        Ok(value)
    }
}
