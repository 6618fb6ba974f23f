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

//! Read-only views over the ledger.

use std::collections::BTreeMap;

use log::debug;

use super::DaoService;
use crate::{
    ledger::{OutRef, Utxo},
    model::{Credential, GovernorDatum, LockKind, ProposalDatum, ResultTag, StakeDatum, Status},
    plutus::{DatumHash, ScriptHash},
    state::proposal::{cosigned_stake, deadline, winning_outcome},
    util::time::Timestamp,
    Error, Result, TransitionError,
};

/// Stakes backing a draft and their summed amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CosignerInfo {
    pub stakes: Vec<OutRef>,
    pub total: u64,
}

/// Human-facing digest of a proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalSummary {
    pub id: u64,
    pub status: Status,
    pub votes: BTreeMap<ResultTag, u64>,
    pub cosigners: Vec<Credential>,
    pub starting_time: Timestamp,
    pub draft_end: Timestamp,
    pub voting_end: Timestamp,
    pub locking_end: Timestamp,
    pub executing_end: Timestamp,
    /// Current leader, if any outcome has votes
    pub leading: Option<ResultTag>,
    /// When the proposal is forced to finish if not advanced, unless finished
    pub deadline: Option<Timestamp>,
}

impl ProposalSummary {
    pub fn new(proposal: &ProposalDatum) -> Result<Self> {
        let deadline = match proposal.status {
            Status::Finished => None,
            _ => Some(deadline(proposal)?),
        };
        Ok(Self {
            id: proposal.id,
            status: proposal.status,
            votes: proposal.votes.clone(),
            cosigners: proposal.cosigners.clone(),
            starting_time: proposal.starting_time,
            draft_end: proposal.draft_end()?,
            voting_end: proposal.voting_end()?,
            locking_end: proposal.locking_end()?,
            executing_end: proposal.executing_end()?,
            leading: winning_outcome(&proposal.votes).ok(),
            deadline,
        })
    }
}

impl DaoService {
    /// The governor output and its datum.
    pub async fn governor(&self) -> Result<(Utxo, GovernorDatum)> {
        let scripts = self.scripts().await?;
        let token = scripts.governor_token();
        let utxo = self
            .ledger
            .fetch_utxo_by_unit(&token)
            .await?
            .ok_or_else(|| Error::MissingUtxo(format!("no output holds {token}")))?;
        let datum = utxo.decode_datum()?;
        Ok((utxo, datum))
    }

    /// Every proposal of the DAO, ordered by id.
    pub async fn proposals(&self) -> Result<Vec<(Utxo, ProposalDatum)>> {
        let scripts = self.scripts().await?;
        let token = scripts.proposal_token();
        let mut proposals = vec![];
        for utxo in self.ledger.fetch_utxos_at(&scripts.proposal_address()).await? {
            if !utxo.holds(&token) {
                continue
            }
            let datum: ProposalDatum = utxo.decode_datum()?;
            proposals.push((utxo, datum));
        }
        proposals.sort_by_key(|(_, p)| p.id);
        debug!(target: "agora::service::query", "Found {} proposals", proposals.len());
        Ok(proposals)
    }

    pub async fn proposal(&self, id: u64) -> Result<(Utxo, ProposalDatum)> {
        self.proposals()
            .await?
            .into_iter()
            .find(|(_, p)| p.id == id)
            .ok_or_else(|| Error::MissingUtxo(format!("proposal {id}")))
    }

    /// Every stake output of the DAO.
    pub async fn stakes(&self) -> Result<Vec<(Utxo, StakeDatum)>> {
        let scripts = self.scripts().await?;
        let token = scripts.stake_token();
        let mut stakes = vec![];
        for utxo in self.ledger.fetch_utxos_at(&scripts.stake_address()).await? {
            if !utxo.holds(&token) {
                continue
            }
            let datum: StakeDatum = utxo.decode_datum()?;
            stakes.push((utxo, datum));
        }
        Ok(stakes)
    }

    pub async fn stakes_of(&self, owner: &Credential) -> Result<Vec<(Utxo, StakeDatum)>> {
        let mut stakes = self.stakes().await?;
        stakes.retain(|(_, s)| &s.owner == owner);
        Ok(stakes)
    }

    /// Outputs for the given references, failing on any already spent.
    pub async fn utxos_by_ref(&self, refs: &[OutRef]) -> Result<Vec<Utxo>> {
        let utxos = self.ledger.fetch_utxos_by_ref(refs).await?;
        for out_ref in refs {
            if !utxos.iter().any(|u| &u.out_ref == out_ref) {
                return Err(Error::MissingUtxo(out_ref.to_string()))
            }
        }
        Ok(utxos)
    }

    /// Stakes of the cosigners of proposal `id` carrying a lock for it.
    pub async fn cosigner_info(&self, id: u64) -> Result<CosignerInfo> {
        let (_, proposal) = self.proposal(id).await?;
        let backing: Vec<_> = self
            .stakes()
            .await?
            .into_iter()
            .filter(|(_, s)| proposal.is_cosigner(&s.owner))
            .filter(|(_, s)| {
                s.lock_for(id).is_some_and(|l| matches!(l.kind, LockKind::Created | LockKind::Cosigned))
            })
            .collect();

        let datums: Vec<_> = backing.iter().map(|(_, s)| s.clone()).collect();
        let total = cosigned_stake(&proposal, &datums)?;
        Ok(CosignerInfo { stakes: backing.into_iter().map(|(u, _)| u.out_ref).collect(), total })
    }

    pub async fn summary(&self, id: u64) -> Result<ProposalSummary> {
        let (_, proposal) = self.proposal(id).await?;
        ProposalSummary::new(&proposal)
    }

    /// Payload hash the winning outcome of finished proposal `id` commits
    /// to for the effect `script`.
    pub async fn commitment(&self, id: u64, script: &ScriptHash) -> Result<DatumHash> {
        let (_, proposal) = self.proposal(id).await?;
        if proposal.status != Status::Finished {
            return Err(TransitionError::WrongStatus { expected: Status::Finished, found: proposal.status }.into())
        }

        let winner = winning_outcome(&proposal.votes)?;
        let target = proposal
            .effects
            .get(&winner)
            .and_then(|targets| targets.get(script))
            .ok_or_else(|| Error::MissingEffectPayload(format!("{script} in proposal {id}")))?;
        debug!(target: "agora::service::query", "Proposal {id} commits {} for {script}", target.datum_hash);
        Ok(target.datum_hash)
    }
}
