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

use std::collections::BTreeMap;

use log::{debug, info};

use super::{ensure_distinct, repay, sign_for, thread_datum, Dao, Wallet};
use crate::{
    effect::{self, Commitments, EffectSpec},
    ledger::{TxOutput, Utxo, Value},
    model::{
        GovernorDatum, GovernorRedeemer, ProposalDatum, ProposalRedeemer, ResultTag, StakeDatum,
        StakeRedeemer, Status,
    },
    plutus::{self, DatumHash},
    script::ScriptKind,
    state::proposal as transition,
    tx::{
        builder::{unit_redeemer, use_scripts},
        TxBuilder, TxShape,
    },
    util::time::Timestamp,
    Error, Result,
};

fn proposal_datum(dao: &Dao, utxo: &Utxo) -> Result<ProposalDatum> {
    thread_datum(utxo, &dao.scripts.proposal_token())
}

fn stake_datums(dao: &Dao, utxos: &[Utxo]) -> Result<Vec<StakeDatum>> {
    ensure_distinct(utxos)?;
    let token = dao.scripts.stake_token();
    utxos.iter().map(|u| thread_datum(u, &token)).collect()
}

/// Spend every stake with `redeemer` and pay it back with its new datum.
fn respend_stakes(
    mut tx: TxBuilder,
    utxos: Vec<Utxo>,
    datums: &[StakeDatum],
    redeemer: &StakeRedeemer,
) -> Result<TxBuilder> {
    for (utxo, datum) in utxos.into_iter().zip(datums) {
        tx = sign_for(tx, &datum.owner).pay_to(repay(&utxo, datum)).collect_from(utxo, redeemer)?;
    }
    Ok(tx)
}

/// Create a proposal backed by a stake. The proposal takes the governor's
/// next id and commits to the effects of every outcome.
pub struct DaoProposeCall {
    pub governor: Utxo,
    pub stake: Utxo,
    pub effects: EffectSpec,
    pub now: Timestamp,
}

impl DaoProposeCall {
    /// Returns the transaction and the effect commitments whose payloads
    /// must be archived for the proposal to execute later.
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<(TxShape, Commitments)> {
        debug!(target: "agora::client::proposal", "DaoProposeCall::build()");
        let scripts = dao.scripts;

        let governor: GovernorDatum = thread_datum(&self.governor, &scripts.governor_token())?;
        let stake: StakeDatum = thread_datum(&self.stake, &scripts.stake_token())?;
        let commitments = effect::commit(&self.effects)?;

        let validity = dao.config.validity(self.now)?;
        let created = transition::create(&governor, &stake, commitments.effects.clone(), validity)?;

        let token = scripts.proposal_token();
        let assets = Value::lovelace(dao.config.min_ada).with(token.clone(), 1);
        let output = TxOutput::new(scripts.proposal_address(), assets)
            .with_datum(plutus::encode(&created.proposal));

        let tx = dao
            .builder(&[
                ScriptKind::GovernorValidator,
                ScriptKind::StakeValidator,
                ScriptKind::ProposalPolicy,
            ])
            .pay_to(repay(&self.governor, &created.governor))
            .pay_to(repay(&self.stake, &created.stake))
            .pay_to(output)
            .collect_from(self.governor, &GovernorRedeemer::CreateProposal)?
            .collect_from(self.stake, &StakeRedeemer::PermitVote)?
            .mint(token, 1, &unit_redeemer())?
            .valid_range(validity);
        let shape = sign_for(tx, &stake.owner).complete(wallet.change_address, &wallet.utxos)?;

        info!(
            target: "agora::client::proposal",
            "Proposal {} created with {} outcomes", created.proposal.id, created.proposal.effects.len(),
        );
        Ok((shape, commitments))
    }
}

/// Add the owner of a stake as cosigner of a draft proposal.
pub struct DaoCosignCall {
    pub proposal: Utxo,
    pub stake: Utxo,
    pub now: Timestamp,
}

impl DaoCosignCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::proposal", "DaoCosignCall::build()");
        let proposal = proposal_datum(dao, &self.proposal)?;
        let stakes = stake_datums(dao, std::slice::from_ref(&self.stake))?;

        let max = dao.scripts.params.max_cosigners;
        let (proposal, stake) = transition::cosign(&proposal, &stakes[0], self.now, max)?;

        let tx = dao
            .builder(&[ScriptKind::StakeValidator, ScriptKind::ProposalValidator])
            .pay_to(repay(&self.proposal, &proposal))
            .collect_from(self.proposal, &ProposalRedeemer::Cosign)?
            .valid_range(dao.config.validity(self.now)?);
        let tx = respend_stakes(tx, vec![self.stake], &[stake], &StakeRedeemer::PermitVote)?;

        info!(
            target: "agora::client::proposal",
            "Proposal {} cosigned, {} cosigners", proposal.id, proposal.cosigners.len(),
        );
        tx.complete(wallet.change_address, &wallet.utxos)
    }
}

/// Vote for `result` with the full weight of `stakes`.
pub struct DaoVoteCall {
    pub proposal: Utxo,
    pub stakes: Vec<Utxo>,
    pub result: ResultTag,
    pub now: Timestamp,
}

impl DaoVoteCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::proposal", "DaoVoteCall::build()");
        let proposal = proposal_datum(dao, &self.proposal)?;
        let stakes = stake_datums(dao, &self.stakes)?;

        // Voted locks expire with the validity range
        let validity = dao.config.validity(self.now)?;
        let (proposal, stakes) =
            transition::vote(&proposal, &stakes, self.result, self.now, validity)?;

        let tx = dao
            .builder(&[ScriptKind::StakeValidator, ScriptKind::ProposalValidator])
            .pay_to(repay(&self.proposal, &proposal))
            .collect_from(self.proposal, &ProposalRedeemer::Vote(self.result))?
            .valid_range(validity);
        let tx = respend_stakes(tx, self.stakes, &stakes, &StakeRedeemer::PermitVote)?;

        info!(
            target: "agora::client::proposal",
            "Voted {} on proposal {} with {} stakes", self.result, proposal.id, stakes.len(),
        );
        tx.complete(wallet.change_address, &wallet.utxos)
    }
}

/// Take back the votes of `stakes` while the proposal is still open.
pub struct DaoRetractCall {
    pub proposal: Utxo,
    pub stakes: Vec<Utxo>,
    pub now: Timestamp,
}

impl DaoRetractCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::proposal", "DaoRetractCall::build()");
        let proposal = proposal_datum(dao, &self.proposal)?;
        let stakes = stake_datums(dao, &self.stakes)?;
        let (proposal, stakes) = transition::retract(&proposal, &stakes)?;

        let tx = dao
            .builder(&[ScriptKind::StakeValidator, ScriptKind::ProposalValidator])
            .pay_to(repay(&self.proposal, &proposal))
            .collect_from(self.proposal, &ProposalRedeemer::Unlock)?
            .valid_range(dao.config.validity(self.now)?);
        let tx = respend_stakes(tx, self.stakes, &stakes, &StakeRedeemer::RetractVotes)?;

        info!(target: "agora::client::proposal", "Retracted {} votes from proposal {}", stakes.len(), proposal.id);
        tx.complete(wallet.change_address, &wallet.utxos)
    }
}

/// Release the locks `stakes` hold on a locked or finished proposal. The
/// proposal itself is paid back unchanged.
pub struct DaoUnlockCall {
    pub proposal: Utxo,
    pub stakes: Vec<Utxo>,
    pub now: Timestamp,
}

impl DaoUnlockCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::proposal", "DaoUnlockCall::build()");
        let proposal = proposal_datum(dao, &self.proposal)?;
        let stakes = stake_datums(dao, &self.stakes)?;
        let stakes = transition::unlock(&proposal, &stakes, self.now)?;

        let tx = dao
            .builder(&[ScriptKind::StakeValidator, ScriptKind::ProposalValidator])
            .pay_to(repay(&self.proposal, &proposal))
            .collect_from(self.proposal, &ProposalRedeemer::Unlock)?
            .valid_range(dao.config.validity(self.now)?);
        let tx = respend_stakes(tx, self.stakes, &stakes, &StakeRedeemer::RetractVotes)?;

        info!(target: "agora::client::proposal", "Unlocked {} stakes from proposal {}", stakes.len(), proposal.id);
        tx.complete(wallet.change_address, &wallet.utxos)
    }
}

/// Move a proposal to its next status. Leaving `Draft` reads the
/// cosigners' stakes; finishing a passed proposal spends the governor to
/// mint one authority token per effect of the winning outcome.
pub struct DaoAdvanceCall {
    pub proposal: Utxo,
    /// Stakes of the cosigners, needed when leaving `Draft`
    pub witnesses: Vec<Utxo>,
    /// The governor, needed when the winning outcome executes
    pub governor: Option<Utxo>,
    /// Effect payloads by committed hash
    pub payloads: BTreeMap<DatumHash, Vec<u8>>,
    pub now: Timestamp,
}

impl DaoAdvanceCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::proposal", "DaoAdvanceCall::build()");
        let scripts = dao.scripts;
        let proposal = proposal_datum(dao, &self.proposal)?;

        // A stake seen twice still only counts once toward the threshold
        let mut witness_utxos = self.witnesses;
        witness_utxos.sort_by_key(|u| u.out_ref);
        witness_utxos.dedup_by_key(|u| u.out_ref);
        let witnesses = stake_datums(dao, &witness_utxos)?;
        let advanced = transition::advance(&proposal, self.now, &witnesses)?;

        let mut tx = dao
            .builder(&[ScriptKind::ProposalValidator])
            .pay_to(repay(&self.proposal, &advanced.proposal))
            .collect_from(self.proposal, &ProposalRedeemer::AdvanceProposal)?
            .valid_range(dao.config.advance_validity(self.now)?);

        if proposal.status == Status::Draft {
            tx = witness_utxos.into_iter().fold(tx, TxBuilder::read_from);
        }

        if advanced.execute.is_some() {
            let gat = scripts.gat();
            let (_, outputs) = effect::finalize(&proposal, &gat, dao.config.min_ada, &self.payloads)?;

            if !outputs.is_empty() {
                let governor = self.governor.ok_or_else(|| {
                    Error::MissingUtxo("governor is needed to mint authority tokens".to_string())
                })?;
                let datum: GovernorDatum = thread_datum(&governor, &scripts.governor_token())?;
                let count = outputs.len() as i64;

                let kinds = [ScriptKind::GovernorValidator, ScriptKind::AuthorityPolicy];
                tx = use_scripts(tx, scripts, dao.refs, &kinds)
                    .pay_to(repay(&governor, &datum))
                    .collect_from(governor, &GovernorRedeemer::MintGats)?
                    .mint(gat, count, &unit_redeemer())?;
                tx = outputs.into_iter().fold(tx, TxBuilder::pay_to);
            }
        }

        info!(
            target: "agora::client::proposal",
            "Proposal {} advances {} -> {}{}",
            proposal.id, proposal.status, advanced.proposal.status,
            if advanced.forced { " (deadline passed)" } else { "" },
        );
        tx.complete(wallet.change_address, &wallet.utxos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::tests::{out_ref, owner, scripts, utxo, wallet},
        config::BuilderConfig,
        error::TransitionError,
        model::{
            governor::tests::governor, proposal::tests::proposal, Credential, LockKind, PropLock,
            Receiver, Thresholds, TreasuryWithdrawalDatum,
        },
        plutus::KeyHash,
        script::{DaoScripts, ScriptRefs},
    };

    const S: i64 = 1_700_000_000_000;

    fn key(b: u8) -> Credential {
        Credential::Key(KeyHash::from_slice(&[b; 28]).unwrap())
    }

    fn governor_utxo(scripts: &DaoScripts, datum: &GovernorDatum) -> Utxo {
        let assets = Value::lovelace(2_000_000).with(scripts.governor_token(), 1);
        utxo(out_ref(0x10, 0), scripts.governor_address(), assets, datum)
    }

    fn proposal_utxo(scripts: &DaoScripts, datum: &ProposalDatum) -> Utxo {
        let assets = Value::lovelace(2_000_000).with(scripts.proposal_token(), 1);
        utxo(out_ref(0x20, 0), scripts.proposal_address(), assets, datum)
    }

    fn stake_utxo(scripts: &DaoScripts, index: u32, datum: &StakeDatum) -> Utxo {
        let assets = Value::lovelace(2_000_000)
            .with(scripts.stake_token(), 1)
            .with(scripts.gov_token().clone(), datum.amount);
        utxo(out_ref(0x30, index), scripts.stake_address(), assets, datum)
    }

    fn output_datum<T: plutus::FromPlutusData>(shape: &TxShape, address: &crate::ledger::Address) -> T {
        let output = shape.outputs_at(address).next().unwrap();
        plutus::decode(output.datum.as_ref().unwrap()).unwrap()
    }

    fn stake_datums_out(shape: &TxShape, scripts: &DaoScripts) -> Vec<StakeDatum> {
        shape
            .outputs_at(&scripts.stake_address())
            .map(|o| plutus::decode(o.datum.as_ref().unwrap()).unwrap())
            .collect()
    }

    fn withdrawal(scripts: &DaoScripts) -> TreasuryWithdrawalDatum {
        TreasuryWithdrawalDatum {
            receivers: vec![Receiver { credential: key(9), value: Value::lovelace(5_000_000) }],
            treasuries: vec![Credential::Script(scripts.treasury_validator.hash)],
        }
    }

    #[test]
    fn propose() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let stake = StakeDatum::new(100, owner());
        let effects = EffectSpec::new().effect(
            ResultTag(1),
            scripts.treasury_spend.hash,
            &withdrawal(&scripts),
        );
        let call = DaoProposeCall {
            governor: governor_utxo(&scripts, &governor()),
            stake: stake_utxo(&scripts, 0, &stake),
            effects,
            now: Timestamp(S),
        };
        let (shape, commitments) = call.make(&dao, &wallet(&scripts)).unwrap();

        let created: ProposalDatum = output_datum(&shape, &scripts.proposal_address());
        assert_eq!(created.id, 0);
        assert_eq!(created.status, Status::Draft);
        assert_eq!(created.cosigners, vec![owner()]);
        assert_eq!(created.starting_time, Timestamp(S + 150_000));
        assert_eq!(created.effects, commitments.effects);
        assert_eq!(commitments.payloads.len(), 1);

        let gov: GovernorDatum = output_datum(&shape, &scripts.governor_address());
        assert_eq!(gov.next_proposal_id, 1);
        let stakes = stake_datums_out(&shape, &scripts);
        assert_eq!(stakes[0].locks, vec![PropLock { proposal_id: 0, kind: LockKind::Created }]);

        assert_eq!(shape.minted(&scripts.proposal_token()), 1);
        assert!(shape.required_signers.contains(&owner().key_hash().unwrap()));
        shape.check_conservation().unwrap();
    }

    #[test]
    fn propose_needs_thread_tokens() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let stake = StakeDatum::new(100, owner());
        let mut forged = stake_utxo(&scripts, 0, &stake);
        forged.assets = Value::lovelace(2_000_000).with(scripts.gov_token().clone(), 100);
        let call = DaoProposeCall {
            governor: governor_utxo(&scripts, &governor()),
            stake: forged,
            effects: EffectSpec::new(),
            now: Timestamp(S),
        };
        assert!(matches!(call.make(&dao, &wallet(&scripts)), Err(Error::MissingUtxo(_))));
    }

    #[test]
    fn cosign_and_vote() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let draft = proposal(vec![key(1)]);
        let call = DaoCosignCall {
            proposal: proposal_utxo(&scripts, &draft),
            stake: stake_utxo(&scripts, 0, &StakeDatum::new(50, owner())),
            now: Timestamp(S + 1_000),
        };
        let shape = call.make(&dao, &wallet(&scripts)).unwrap();
        let cosigned: ProposalDatum = output_datum(&shape, &scripts.proposal_address());
        assert_eq!(cosigned.cosigners.len(), 2);
        assert!(cosigned.is_cosigner(&owner()));
        assert_eq!(stake_datums_out(&shape, &scripts)[0].locks[0].kind, LockKind::Cosigned);
        shape.check_conservation().unwrap();

        let voting = ProposalDatum { status: Status::Voting, ..draft };
        let now = Timestamp(S + 700_000);
        let call = DaoVoteCall {
            proposal: proposal_utxo(&scripts, &voting),
            stakes: vec![
                stake_utxo(&scripts, 0, &StakeDatum::new(60, owner())),
                stake_utxo(&scripts, 1, &StakeDatum::new(40, key(2))),
            ],
            result: ResultTag(1),
            now,
        };
        let shape = call.make(&dao, &wallet(&scripts)).unwrap();
        let voted: ProposalDatum = output_datum(&shape, &scripts.proposal_address());
        assert_eq!(voted.votes[&ResultTag(1)], 100);

        let stakes = stake_datums_out(&shape, &scripts);
        assert_eq!(stakes.len(), 2);
        let expiry = Timestamp(now.0 + 400_000);
        for stake in &stakes {
            assert_eq!(stake.locks[0].kind, LockKind::Voted { result: ResultTag(1), expiry });
        }
        assert_eq!(shape.required_signers.len(), 2);
        assert_eq!(shape.validity.unwrap().end, expiry);
        shape.check_conservation().unwrap();
    }

    #[test]
    fn vote_outside_window() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let voting = ProposalDatum { status: Status::Voting, ..proposal(vec![key(1)]) };
        let call = DaoVoteCall {
            proposal: proposal_utxo(&scripts, &voting),
            stakes: vec![stake_utxo(&scripts, 0, &StakeDatum::new(60, owner()))],
            result: ResultTag(1),
            now: Timestamp(S + 10),
        };
        let err = call.make(&dao, &wallet(&scripts)).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(TransitionError::TooEarly(_))));
    }

    #[test]
    fn retract_then_unlock() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let mut voting = ProposalDatum { status: Status::Voting, ..proposal(vec![key(1)]) };
        voting.votes.insert(ResultTag(1), 60);
        let lock = PropLock {
            proposal_id: voting.id,
            kind: LockKind::Voted { result: ResultTag(1), expiry: Timestamp(S + 900_000) },
        };
        let stake = StakeDatum::new(60, owner()).add_lock(lock).unwrap();

        let call = DaoRetractCall {
            proposal: proposal_utxo(&scripts, &voting),
            stakes: vec![stake_utxo(&scripts, 0, &stake)],
            now: Timestamp(S + 800_000),
        };
        let shape = call.make(&dao, &wallet(&scripts)).unwrap();
        let retracted: ProposalDatum = output_datum(&shape, &scripts.proposal_address());
        assert_eq!(retracted.votes[&ResultTag(1)], 0);
        assert!(stake_datums_out(&shape, &scripts)[0].locks.is_empty());

        let finished = ProposalDatum { status: Status::Finished, ..voting };
        let call = DaoUnlockCall {
            proposal: proposal_utxo(&scripts, &finished),
            stakes: vec![stake_utxo(&scripts, 0, &stake)],
            now: Timestamp(S + 3_000_000),
        };
        let shape = call.make(&dao, &wallet(&scripts)).unwrap();
        let same: ProposalDatum = output_datum(&shape, &scripts.proposal_address());
        assert_eq!(same, finished);
        assert!(stake_datums_out(&shape, &scripts)[0].locks.is_empty());
        shape.check_conservation().unwrap();
    }

    #[test]
    fn advance_draft_reads_witnesses() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let draft = proposal(vec![owner()]);
        let lock = PropLock { proposal_id: draft.id, kind: LockKind::Created };
        let witness = stake_utxo(&scripts, 0, &StakeDatum::new(10, owner()).add_lock(lock).unwrap());

        let call = DaoAdvanceCall {
            proposal: proposal_utxo(&scripts, &draft),
            witnesses: vec![witness.clone()],
            governor: None,
            payloads: BTreeMap::new(),
            now: Timestamp(S + 1_000),
        };
        let shape = call.make(&dao, &wallet(&scripts)).unwrap();
        let advanced: ProposalDatum = output_datum(&shape, &scripts.proposal_address());
        assert_eq!(advanced.status, Status::Voting);
        assert_eq!(shape.reference_inputs, vec![witness]);
        assert!(!shape.consumes(&out_ref(0x30, 0)));
        let validity = shape.validity.unwrap();
        assert_eq!(validity.width(), 80_000);
    }

    #[test]
    fn repeated_stake_counts_once() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let voting = ProposalDatum { status: Status::Voting, ..proposal(vec![key(1)]) };
        let stake = stake_utxo(&scripts, 0, &StakeDatum::new(60, owner()));
        let call = DaoVoteCall {
            proposal: proposal_utxo(&scripts, &voting),
            stakes: vec![stake.clone(), stake],
            result: ResultTag(1),
            now: Timestamp(S + 700_000),
        };
        assert!(matches!(call.make(&dao, &wallet(&scripts)), Err(Error::DuplicateInput(_))));

        // The same witness twice does not double its weight
        let draft = ProposalDatum {
            thresholds: Thresholds { to_voting: 20, ..proposal(vec![]).thresholds },
            ..proposal(vec![owner()])
        };
        let lock = PropLock { proposal_id: draft.id, kind: LockKind::Created };
        let witness = stake_utxo(&scripts, 0, &StakeDatum::new(10, owner()).add_lock(lock).unwrap());
        let call = DaoAdvanceCall {
            proposal: proposal_utxo(&scripts, &draft),
            witnesses: vec![witness.clone(), witness],
            governor: None,
            payloads: BTreeMap::new(),
            now: Timestamp(S + 1_000),
        };
        let err = call.make(&dao, &wallet(&scripts)).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(TransitionError::ThresholdNotMet { required: 20, found: 10 })));
    }

    #[test]
    fn advance_executes_winner() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let spec = EffectSpec::new().effect(ResultTag(1), scripts.treasury_spend.hash, &withdrawal(&scripts));
        let commitments = effect::commit(&spec).unwrap();
        let locked = ProposalDatum {
            status: Status::Locked,
            effects: commitments.effects.clone(),
            votes: BTreeMap::from([(ResultTag(0), 3), (ResultTag(1), 10)]),
            ..proposal(vec![owner()])
        };
        let now = Timestamp(S + 2_000_001);

        let missing = DaoAdvanceCall {
            proposal: proposal_utxo(&scripts, &locked),
            witnesses: vec![],
            governor: None,
            payloads: commitments.payloads.clone(),
            now,
        };
        assert!(matches!(missing.make(&dao, &wallet(&scripts)), Err(Error::MissingUtxo(_))));

        let call = DaoAdvanceCall {
            proposal: proposal_utxo(&scripts, &locked),
            witnesses: vec![],
            governor: Some(governor_utxo(&scripts, &governor())),
            payloads: commitments.payloads,
            now,
        };
        let shape = call.make(&dao, &wallet(&scripts)).unwrap();

        let finished: ProposalDatum = output_datum(&shape, &scripts.proposal_address());
        assert_eq!(finished.status, Status::Finished);
        assert_eq!(shape.minted(&scripts.gat()), 1);
        let grant = shape.outputs_at(&scripts.treasury_spend.address()).next().unwrap();
        assert_eq!(grant.assets.get(&scripts.gat()), 1);
        let gov: GovernorDatum = output_datum(&shape, &scripts.governor_address());
        assert_eq!(gov, governor());
        assert!(shape.consumes(&out_ref(0x10, 0)));
        shape.check_conservation().unwrap();
    }

    #[test]
    fn advance_past_deadline_finishes() {
        let scripts = scripts();
        let (refs, config) = (ScriptRefs::new(), BuilderConfig::default());
        let dao = Dao::new(&scripts, &refs, &config);

        let draft = proposal(vec![owner()]);
        let call = DaoAdvanceCall {
            proposal: proposal_utxo(&scripts, &draft),
            witnesses: vec![],
            governor: None,
            payloads: BTreeMap::new(),
            now: Timestamp(S + 600_001),
        };
        let shape = call.make(&dao, &wallet(&scripts)).unwrap();
        let advanced: ProposalDatum = output_datum(&shape, &scripts.proposal_address());
        assert_eq!(advanced.status, Status::Finished);
        assert_eq!(shape.minted(&scripts.gat()), 0);
    }
}
