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

use std::cmp::Ordering;

use crate::{
    plutus::{FromPlutusData, KeyHash, PlutusData, ScriptHash, ToPlutusData},
    Result,
};

/// Owner, delegate or cosigner identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Credential {
    Key(KeyHash),
    Script(ScriptHash),
}

impl Credential {
    pub fn hash(&self) -> &[u8] {
        match self {
            Self::Key(h) | Self::Script(h) => h.as_bytes(),
        }
    }

    pub fn key_hash(&self) -> Option<KeyHash> {
        match self {
            Self::Key(h) => Some(*h),
            Self::Script(_) => None,
        }
    }

    /// Canonical cosigner order: compares encoded bytes, where a longer
    /// encoding sorts after a shorter one and equal lengths compare bytewise.
    pub fn cosigner_cmp(&self, other: &Self) -> Ordering {
        let a = self.to_plutus_data().to_cbor();
        let b = other.to_plutus_data().to_cbor();
        a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
    }

    /// Insert `self` into a cosigner list kept in canonical order. The
    /// credential lands in front of the first element not below it.
    pub fn insert_sorted(&self, cosigners: &[Credential]) -> Vec<Credential> {
        let pos = cosigners
            .iter()
            .position(|c| self.cosigner_cmp(c) != Ordering::Greater)
            .unwrap_or(cosigners.len());
        let mut out = Vec::with_capacity(cosigners.len() + 1);
        out.extend_from_slice(&cosigners[..pos]);
        out.push(*self);
        out.extend_from_slice(&cosigners[pos..]);
        out
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Key(h) => write!(f, "key:{h}"),
            Self::Script(h) => write!(f, "script:{h}"),
        }
    }
}

impl ToPlutusData for Credential {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            Self::Key(h) => PlutusData::constr(0, vec![h.to_plutus_data()]),
            Self::Script(h) => PlutusData::constr(1, vec![h.to_plutus_data()]),
        }
    }
}

impl FromPlutusData for Credential {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        match data.as_variant("Credential", &[1, 1])? {
            (0, fields) => Ok(Self::Key(KeyHash::from_plutus_data(&fields[0])?)),
            (_, fields) => Ok(Self::Script(ScriptHash::from_plutus_data(&fields[0])?)),
        }
    }
}
