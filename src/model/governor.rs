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

use crate::{
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
    Error, Result,
};

/// Lower bound for `voting_time_range_max_width` and
/// `max_proposal_valid_length`: ten minutes.
pub const MIN_TIME_RANGE_WIDTH: u64 = 600_000;

/// Minimum governance token amounts required per action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Thresholds {
    /// Votes an outcome must accumulate to be executed
    pub execute: u64,
    /// Stake needed to create a proposal
    pub create: u64,
    /// Cosigned stake needed to move a draft into voting
    pub to_voting: u64,
    /// Stake needed to cast a vote
    pub vote: u64,
    /// Stake needed to cosign
    pub cosign: u64,
}

impl ToPlutusData for Thresholds {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![
            self.execute.to_plutus_data(),
            self.create.to_plutus_data(),
            self.to_voting.to_plutus_data(),
            self.vote.to_plutus_data(),
            self.cosign.to_plutus_data(),
        ])
    }
}

impl FromPlutusData for Thresholds {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("Thresholds", 5)?;
        Ok(Self {
            execute: f[0].as_u64()?,
            create: f[1].as_u64()?,
            to_voting: f[2].as_u64()?,
            vote: f[3].as_u64()?,
            cosign: f[4].as_u64()?,
        })
    }
}

/// Proposal phase lengths, all in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    pub draft: u64,
    pub voting: u64,
    pub locking: u64,
    pub executing: u64,
    /// Minimum lifetime of a voting lock before it may be removed
    pub min_stake_voting_time: u64,
    /// Maximum width of a transaction validity range while voting
    pub voting_time_range_max_width: u64,
}

impl TimingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.voting_time_range_max_width < MIN_TIME_RANGE_WIDTH {
            return Err(Error::VotingRangeTooNarrow(self.voting_time_range_max_width))
        }
        Ok(())
    }
}

impl ToPlutusData for TimingConfig {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![
            self.draft.to_plutus_data(),
            self.voting.to_plutus_data(),
            self.locking.to_plutus_data(),
            self.executing.to_plutus_data(),
            self.min_stake_voting_time.to_plutus_data(),
            self.voting_time_range_max_width.to_plutus_data(),
        ])
    }
}

impl FromPlutusData for TimingConfig {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("TimingConfig", 6)?;
        let timing = Self {
            draft: f[0].as_u64()?,
            voting: f[1].as_u64()?,
            locking: f[2].as_u64()?,
            executing: f[3].as_u64()?,
            min_stake_voting_time: f[4].as_u64()?,
            voting_time_range_max_width: f[5].as_u64()?,
        };
        timing.validate()?;
        Ok(timing)
    }
}

/// The DAO singleton, identified by the governor state-thread token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GovernorDatum {
    pub thresholds: Thresholds,
    pub next_proposal_id: u64,
    pub timing: TimingConfig,
    pub max_proposal_valid_length: u64,
    pub proposals_per_stake: u64,
}

impl GovernorDatum {
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        if self.max_proposal_valid_length < MIN_TIME_RANGE_WIDTH {
            return Err(Error::ProposalLengthTooShort(self.max_proposal_valid_length))
        }
        Ok(())
    }

    /// Governor after a proposal was created: only the id counter moves.
    pub fn with_next_proposal(&self) -> Result<Self> {
        let next_proposal_id = self.next_proposal_id.checked_add(1).ok_or(Error::Overflow)?;
        Ok(Self { next_proposal_id, ..self.clone() })
    }
}

impl ToPlutusData for GovernorDatum {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::List(vec![
            self.thresholds.to_plutus_data(),
            self.next_proposal_id.to_plutus_data(),
            self.timing.to_plutus_data(),
            self.max_proposal_valid_length.to_plutus_data(),
            self.proposals_per_stake.to_plutus_data(),
        ])
    }
}

impl FromPlutusData for GovernorDatum {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        let f = data.as_record("GovernorDatum", 5)?;
        let governor = Self {
            thresholds: Thresholds::from_plutus_data(&f[0])?,
            next_proposal_id: f[1].as_u64()?,
            timing: TimingConfig::from_plutus_data(&f[2])?,
            max_proposal_valid_length: f[3].as_u64()?,
            proposals_per_stake: f[4].as_u64()?,
        };
        governor.validate()?;
        Ok(governor)
    }
}

/// Governor spend actions, encoded as bare integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GovernorRedeemer {
    CreateProposal = 0,
    MintGats = 1,
    MutateGovernor = 2,
}

impl ToPlutusData for GovernorRedeemer {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::integer(*self as u64)
    }
}

impl FromPlutusData for GovernorRedeemer {
    fn from_plutus_data(data: &PlutusData) -> Result<Self> {
        match data.as_u64()? {
            0 => Ok(Self::CreateProposal),
            1 => Ok(Self::MintGats),
            2 => Ok(Self::MutateGovernor),
            n => Err(Error::MalformedDatum(format!("unknown governor redeemer {n}"))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{error::ErrorClass, plutus};

    pub(crate) fn timing() -> TimingConfig {
        TimingConfig {
            draft: 600_000,
            voting: 700_000,
            locking: 700_000,
            executing: 800_000,
            min_stake_voting_time: 60_000,
            voting_time_range_max_width: 600_000,
        }
    }

    pub(crate) fn governor() -> GovernorDatum {
        GovernorDatum {
            thresholds: Thresholds { execute: 1, create: 1, to_voting: 1, vote: 1, cosign: 1 },
            next_proposal_id: 0,
            timing: timing(),
            max_proposal_valid_length: 600_000,
            proposals_per_stake: 10,
        }
    }

    #[test]
    fn governor_roundtrip() {
        let gov = governor();
        let bytes = plutus::encode(&gov);
        assert_eq!(plutus::decode::<GovernorDatum>(&bytes).unwrap(), gov);

        let next = gov.with_next_proposal().unwrap();
        assert_eq!(next.next_proposal_id, 1);
        assert_eq!(next.thresholds, gov.thresholds);
    }

    #[test]
    fn governor_field_order() {
        let data = governor().to_plutus_data();
        let fields = data.as_list().unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0].as_list().unwrap().len(), 5);
        assert_eq!(fields[1].as_u64().unwrap(), 0);
        assert_eq!(fields[2].as_list().unwrap()[0].as_u64().unwrap(), 600_000);
        assert_eq!(fields[4].as_u64().unwrap(), 10);
    }

    #[test]
    fn configuration_limits() {
        let mut gov = governor();
        gov.timing.voting_time_range_max_width = 599_999;
        let err = plutus::decode::<GovernorDatum>(&plutus::encode(&gov)).unwrap_err();
        assert!(matches!(err, Error::VotingRangeTooNarrow(599_999)));
        assert_eq!(err.class(), ErrorClass::Configuration);

        let mut gov = governor();
        gov.max_proposal_valid_length = 1_000;
        assert!(matches!(gov.validate(), Err(Error::ProposalLengthTooShort(1_000))));
    }

    #[test]
    fn governor_redeemers() {
        assert_eq!(plutus::encode(&GovernorRedeemer::CreateProposal), vec![0x00]);
        assert_eq!(plutus::encode(&GovernorRedeemer::MintGats), vec![0x01]);
        assert_eq!(plutus::encode(&GovernorRedeemer::MutateGovernor), vec![0x02]);
        assert!(plutus::decode::<GovernorRedeemer>(&[0x03]).is_err());
    }

    #[test]
    fn truncated_governor_rejected() {
        let bytes = plutus::encode(&governor());
        for len in [1, bytes.len() / 2, bytes.len() - 1] {
            let err = plutus::decode::<GovernorDatum>(&bytes[..len]).unwrap_err();
            assert_eq!(err.class(), ErrorClass::MalformedDatum);
        }
    }
}
