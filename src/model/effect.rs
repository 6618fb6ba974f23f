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

use super::{Credential, GovernorDatum};
use crate::{
    ledger::Value,
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
    Result,
};

/// One payout of a treasury withdrawal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receiver {
    pub credential: Credential,
    pub value: Value,
}

impl ToPlutusData for Receiver {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(0, vec![self.credential.to_plutus_data(), self.value.to_plutus_data()])
    }
}

impl FromPlutusData for Receiver {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let (_, f) = data.as_variant("Receiver", &[2])?;
        Ok(Self { credential: Credential::from_plutus_data(&f[0])?, value: Value::from_plutus_data(&f[1])? })
    }
}

/// Payload of the treasury withdrawal effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreasuryWithdrawalDatum {
    pub receivers: Vec<Receiver>,
    /// Treasury script credentials the payouts may be drawn from
    pub treasuries: Vec<Credential>,
}

impl TreasuryWithdrawalDatum {
    /// Total value paid out to all receivers.
    pub fn total(&self) -> Result<Value> {
        Value::sum(self.receivers.iter().map(|r| &r.value))
    }
}

impl ToPlutusData for TreasuryWithdrawalDatum {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![self.receivers.to_plutus_data(), self.treasuries.to_plutus_data()])
    }
}

impl FromPlutusData for TreasuryWithdrawalDatum {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("TreasuryWithdrawalDatum", 2)?;
        Ok(Self {
            receivers: Vec::<Receiver>::from_plutus_data(&f[0])?,
            treasuries: Vec::<Credential>::from_plutus_data(&f[1])?,
        })
    }
}

/// Payload of the governor mutation effect: the governor being replaced
/// and its replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutateGovernorDatum {
    pub old: GovernorDatum,
    pub new: GovernorDatum,
}

impl ToPlutusData for MutateGovernorDatum {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![self.old.to_plutus_data(), self.new.to_plutus_data()])
    }
}

impl FromPlutusData for MutateGovernorDatum {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("MutateGovernorDatum", 2)?;
        Ok(Self {
            old: GovernorDatum::from_plutus_data(&f[0])?,
            new: GovernorDatum::from_plutus_data(&f[1])?,
        })
    }
}
