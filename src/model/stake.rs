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

use super::{Credential, ResultTag};
use crate::{
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
    util::time::Timestamp,
    Result,
};

/// Why a stake is tied to a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockKind {
    /// The stake created the proposal
    Created,
    /// The stake voted for an outcome; the lock lives at least until `expiry`
    Voted { result: ResultTag, expiry: Timestamp },
    /// The stake cosigned the proposal
    Cosigned,
}

impl ToPlutusData for LockKind {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            Self::Created => PlutusData::constr(0, vec![]),
            Self::Voted { result, expiry } => {
                PlutusData::constr(1, vec![result.to_plutus_data(), expiry.to_plutus_data()])
            }
            Self::Cosigned => PlutusData::constr(2, vec![]),
        }
    }
}

impl FromPlutusData for LockKind {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        match data.as_variant("LockKind", &[0, 2, 0])? {
            (0, _) => Ok(Self::Created),
            (1, f) => Ok(Self::Voted {
                result: ResultTag::from_plutus_data(&f[0])?,
                expiry: Timestamp::from_plutus_data(&f[1])?,
            }),
            _ => Ok(Self::Cosigned),
        }
    }
}

/// A stake's tie to one proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropLock {
    pub proposal_id: u64,
    pub kind: LockKind,
}

impl ToPlutusData for PropLock {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![self.proposal_id.to_plutus_data(), self.kind.to_plutus_data()])
    }
}

impl FromPlutusData for PropLock {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("PropLock", 2)?;
        Ok(Self { proposal_id: f[0].as_u64()?, kind: LockKind::from_plutus_data(&f[1])? })
    }
}

/// Governance tokens deposited by an owner, identified by a stake
/// state-thread token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeDatum {
    pub amount: u64,
    pub owner: Credential,
    pub delegate: Option<Credential>,
    /// Most recent lock first
    pub locks: Vec<PropLock>,
}

impl StakeDatum {
    /// A freshly deposited stake with no delegate and no locks.
    pub fn new(amount: u64, owner: Credential) -> Self {
        Self { amount, owner, delegate: None, locks: vec![] }
    }
}

impl ToPlutusData for StakeDatum {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![
            self.amount.to_plutus_data(),
            self.owner.to_plutus_data(),
            self.delegate.to_plutus_data(),
            self.locks.to_plutus_data(),
        ])
    }
}

impl FromPlutusData for StakeDatum {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("StakeDatum", 4)?;
        Ok(Self {
            amount: f[0].as_u64()?,
            owner: Credential::from_plutus_data(&f[1])?,
            delegate: Option::<Credential>::from_plutus_data(&f[2])?,
            locks: Vec::<PropLock>::from_plutus_data(&f[3])?,
        })
    }
}

/// Stake spend actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeRedeemer {
    DepositWithdraw(i64),
    Destroy,
    PermitVote,
    RetractVotes,
    DelegateTo(Credential),
    ClearDelegate,
}

impl ToPlutusData for StakeRedeemer {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            Self::DepositWithdraw(delta) => PlutusData::constr(0, vec![delta.to_plutus_data()]),
            Self::Destroy => PlutusData::constr(1, vec![]),
            Self::PermitVote => PlutusData::constr(2, vec![]),
            Self::RetractVotes => PlutusData::constr(3, vec![]),
            Self::DelegateTo(c) => PlutusData::constr(4, vec![c.to_plutus_data()]),
            Self::ClearDelegate => PlutusData::constr(5, vec![]),
        }
    }
}

impl FromPlutusData for StakeRedeemer {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        match data.as_variant("StakeRedeemer", &[1, 0, 0, 0, 1, 0])? {
            (0, f) => Ok(Self::DepositWithdraw(f[0].as_i64()?)),
            (1, _) => Ok(Self::Destroy),
            (2, _) => Ok(Self::PermitVote),
            (3, _) => Ok(Self::RetractVotes),
            (4, f) => Ok(Self::DelegateTo(Credential::from_plutus_data(&f[0])?)),
            _ => Ok(Self::ClearDelegate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        plutus::{self, KeyHash, ScriptHash},
        Error,
    };

    fn owner() -> Credential {
        Credential::Key(KeyHash::from_slice(&[0xaa; 28]).unwrap())
    }

    #[test]
    fn stake_roundtrip() {
        let fresh = StakeDatum::new(100, owner());
        let mut busy = fresh.clone();
        busy.delegate = Some(Credential::Script(ScriptHash::from_slice(&[0xbb; 28]).unwrap()));
        busy.locks = vec![
            PropLock { proposal_id: 3, kind: LockKind::Cosigned },
            PropLock {
                proposal_id: 2,
                kind: LockKind::Voted { result: ResultTag(1), expiry: Timestamp(1_000) },
            },
            PropLock { proposal_id: 1, kind: LockKind::Created },
        ];

        for stake in [fresh, busy] {
            let bytes = plutus::encode(&stake);
            assert_eq!(plutus::decode::<StakeDatum>(&bytes).unwrap(), stake);
        }
    }

    #[test]
    fn fresh_stake_layout() {
        // [100, Key owner, Nothing, []]
        let bytes = plutus::encode(&StakeDatum::new(100, owner()));
        let expected = format!("9f1864d8799f581c{}ffd87a8080ff", "aa".repeat(28));
        assert_eq!(hex::encode(bytes), expected);
    }

    #[test]
    fn lock_kind_shapes() {
        let voted = LockKind::Voted { result: ResultTag(2), expiry: Timestamp(5) };
        assert_eq!(hex::encode(plutus::encode(&voted)), "d87a9f0205ff");
        assert_eq!(hex::encode(plutus::encode(&LockKind::Cosigned)), "d87b80");
        // Voted without payload is malformed
        assert!(matches!(
            plutus::decode::<LockKind>(&hex::decode("d87a80").unwrap()),
            Err(Error::MalformedDatum(_))
        ));
    }

    #[test]
    fn stake_redeemers() {
        let r = StakeRedeemer::DepositWithdraw(-50);
        assert_eq!(plutus::decode::<StakeRedeemer>(&plutus::encode(&r)).unwrap(), r);
        let r = StakeRedeemer::DelegateTo(owner());
        assert_eq!(plutus::decode::<StakeRedeemer>(&plutus::encode(&r)).unwrap(), r);
        assert_eq!(hex::encode(plutus::encode(&StakeRedeemer::PermitVote)), "d87b80");
        assert_eq!(hex::encode(plutus::encode(&StakeRedeemer::ClearDelegate)), "d87e80");
    }
}
