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

use super::{Credential, Thresholds, TimingConfig};
use crate::{
    plutus::{DatumHash, FromPlutusData, PlutusData, ScriptHash, ToPlutusData},
    util::time::Timestamp,
    Error, Result,
};

/// Proposal lifecycle status. Only ever increases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Draft = 0,
    Voting = 1,
    Locked = 2,
    Finished = 3,
}

impl Status {
    /// The status reached by a regular advance.
    pub fn succ(&self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Voting),
            Self::Voting => Some(Self::Locked),
            Self::Locked => Some(Self::Finished),
            Self::Finished => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Draft => "Draft",
            Self::Voting => "Voting",
            Self::Locked => "Locked",
            Self::Finished => "Finished",
        };
        write!(f, "{name}")
    }
}

impl ToPlutusData for Status {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::integer(*self as u64)
    }
}

impl FromPlutusData for Status {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        match data.as_u64()? {
            0 => Ok(Self::Draft),
            1 => Ok(Self::Voting),
            2 => Ok(Self::Locked),
            3 => Ok(Self::Finished),
            n => Err(Error::MalformedDatum(format!("unknown proposal status {n}"))),
        }
    }
}

/// Identifier of a proposal outcome. Outcome 0 is the no-op branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResultTag(pub u64);

impl fmt::Display for ResultTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToPlutusData for ResultTag {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::integer(self.0)
    }
}

impl FromPlutusData for ResultTag {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        Ok(Self(data.as_u64()?))
    }
}

/// Commitment for one effect script: hash of the datum its GAT output must
/// carry, and an optional companion script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectTarget {
    pub datum_hash: DatumHash,
    pub script: Option<ScriptHash>,
}

impl ToPlutusData for EffectTarget {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![self.datum_hash.to_plutus_data(), self.script.to_plutus_data()])
    }
}

impl FromPlutusData for EffectTarget {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("EffectTarget", 2)?;
        Ok(Self {
            datum_hash: DatumHash::from_plutus_data(&f[0])?,
            script: Option::<ScriptHash>::from_plutus_data(&f[1])?,
        })
    }
}

/// Outcome menu: outcome tag to effect script hash to commitment. Inner
/// keys iterate in raw byte order.
pub type EffectMap = BTreeMap<ResultTag, BTreeMap<ScriptHash, EffectTarget>>;

/// One governance proposal, identified by the proposal state-thread token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalDatum {
    pub id: u64,
    pub effects: EffectMap,
    pub status: Status,
    /// Ordered by [`Credential::cosigner_cmp`]
    pub cosigners: Vec<Credential>,
    pub thresholds: Thresholds,
    pub votes: BTreeMap<ResultTag, u64>,
    pub timing: TimingConfig,
    pub starting_time: Timestamp,
}

impl ProposalDatum {
    /// End of the draft period.
    pub fn draft_end(&self) -> Result<Timestamp> {
        self.starting_time.add_ms(self.timing.draft)
    }

    /// End of the voting period.
    pub fn voting_end(&self) -> Result<Timestamp> {
        self.starting_time.add_all(&[self.timing.draft, self.timing.voting])
    }

    /// End of the locking period.
    pub fn locking_end(&self) -> Result<Timestamp> {
        self.starting_time.add_all(&[self.timing.draft, self.timing.voting, self.timing.locking])
    }

    /// End of the execution period.
    pub fn executing_end(&self) -> Result<Timestamp> {
        self.starting_time.add_all(&[
            self.timing.draft,
            self.timing.voting,
            self.timing.locking,
            self.timing.executing,
        ])
    }

    pub fn is_cosigner(&self, credential: &Credential) -> bool {
        self.cosigners.contains(credential)
    }
}

impl ToPlutusData for ProposalDatum {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![
            self.id.to_plutus_data(),
            self.effects.to_plutus_data(),
            self.status.to_plutus_data(),
            self.cosigners.to_plutus_data(),
            self.thresholds.to_plutus_data(),
            self.votes.to_plutus_data(),
            self.timing.to_plutus_data(),
            self.starting_time.to_plutus_data(),
        ])
    }
}

impl FromPlutusData for ProposalDatum {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("ProposalDatum", 8)?;
        Ok(Self {
            id: f[0].as_u64()?,
            effects: EffectMap::from_plutus_data(&f[1])?,
            status: Status::from_plutus_data(&f[2])?,
            cosigners: Vec::<Credential>::from_plutus_data(&f[3])?,
            thresholds: Thresholds::from_plutus_data(&f[4])?,
            votes: BTreeMap::<ResultTag, u64>::from_plutus_data(&f[5])?,
            timing: TimingConfig::from_plutus_data(&f[6])?,
            starting_time: Timestamp::from_plutus_data(&f[7])?,
        })
    }
}

/// Proposal spend actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalRedeemer {
    Vote(ResultTag),
    Cosign,
    Unlock,
    AdvanceProposal,
}

impl ToPlutusData for ProposalRedeemer {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            Self::Vote(tag) => PlutusData::constr(0, vec![tag.to_plutus_data()]),
            Self::Cosign => PlutusData::constr(1, vec![]),
            Self::Unlock => PlutusData::constr(2, vec![]),
            Self::AdvanceProposal => PlutusData::constr(3, vec![]),
        }
    }
}

impl FromPlutusData for ProposalRedeemer {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        match data.as_variant("ProposalRedeemer", &[1, 0, 0, 0])? {
            (0, f) => Ok(Self::Vote(ResultTag::from_plutus_data(&f[0])?)),
            (1, _) => Ok(Self::Cosign),
            (2, _) => Ok(Self::Unlock),
            _ => Ok(Self::AdvanceProposal),
        }
    }
}
