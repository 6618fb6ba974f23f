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

//! Proposal lifecycle.
//!
//! ```text
//! Draft --advance--> Voting --advance--> Locked --advance--> Finished
//!   |                  |                   |
//!   +------------------+-------------------+--- deadline passed --> Finished
//! ```
//!
//! The deadline of each status is the end of the window in which the next
//! advance must happen: the draft period for `Draft`, the locking period
//! for `Voting`, and the execution period for `Locked`. Missing it forces
//! the proposal to `Finished` without executing anything.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::{
    error::TransitionError,
    model::{
        EffectMap, GovernorDatum, LockKind, PropLock, ProposalDatum, ResultTag,
        StakeDatum, Status,
    },
    util::time::{Timestamp, ValidityRange},
    Error, Result,
};

fn reject(err: TransitionError) -> Error {
    warn!(target: "agora::state::proposal", "Rejected transition: {err}");
    Error::InvalidTransition(err)
}

fn expect_status(proposal: &ProposalDatum, expected: Status) -> Result<()> {
    if proposal.status != expected {
        return Err(reject(TransitionError::WrongStatus { expected, found: proposal.status }))
    }
    Ok(())
}

/// Require `start <= now <= end`.
fn within(now: Timestamp, start: Timestamp, end: Timestamp) -> Result<()> {
    if now < start {
        return Err(reject(TransitionError::TooEarly(start.0)))
    }
    if now > end {
        return Err(reject(TransitionError::WindowClosed))
    }
    Ok(())
}

/// Deadline after which an advance forces `Finished`.
pub fn deadline(proposal: &ProposalDatum) -> Result<Timestamp> {
    match proposal.status {
        Status::Draft => proposal.draft_end(),
        Status::Voting => proposal.locking_end(),
        Status::Locked => proposal.executing_end(),
        Status::Finished => Err(reject(TransitionError::ProposalFinished)),
    }
}

/// Status an advance at `now` leads to, and whether the deadline was missed.
pub fn next_status(proposal: &ProposalDatum, now: Timestamp) -> Result<(Status, bool)> {
    let deadline = deadline(proposal)?;
    if now > deadline {
        return Ok((Status::Finished, true))
    }
    match proposal.status.succ() {
        Some(next) => Ok((next, false)),
        None => Err(reject(TransitionError::ProposalFinished)),
    }
}

/// The outcome with the most votes. Tags are visited in ascending order
/// and only a strictly greater tally replaces the leader, so the lowest tag
/// wins a tie and an all-zero tally has no winner.
pub fn winning_outcome(votes: &BTreeMap<ResultTag, u64>) -> Result<ResultTag> {
    let mut winner = None;
    let mut highest = 0;
    for (tag, count) in votes {
        if *count > highest {
            highest = *count;
            winner = Some(*tag);
        }
    }
    winner.ok_or_else(|| reject(TransitionError::NoWinningOutcome))
}

/// Total stake backing a draft: stakes of cosigners that carry a creation
/// or cosign lock for it.
pub fn cosigned_stake(proposal: &ProposalDatum, stakes: &[StakeDatum]) -> Result<u64> {
    let mut total = 0u64;
    for stake in stakes {
        if !proposal.is_cosigner(&stake.owner) {
            continue
        }
        let Some(lock) = stake.lock_for(proposal.id) else { continue };
        if matches!(lock.kind, LockKind::Created | LockKind::Cosigned) {
            total = total.checked_add(stake.amount).ok_or(Error::Overflow)?;
        }
    }
    Ok(total)
}

/// Result of an advance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Advanced {
    pub proposal: ProposalDatum,
    /// Outcome whose effects receive authority tokens in this transition
    pub execute: Option<ResultTag>,
    /// The deadline passed and the proposal was forced to `Finished`
    pub forced: bool,
}

/// Advance the proposal at `now`. `witnesses` are the cosigners' stakes,
/// only consulted when leaving `Draft`.
pub fn advance(proposal: &ProposalDatum, now: Timestamp, witnesses: &[StakeDatum]) -> Result<Advanced> {
    let (next, forced) = next_status(proposal, now)?;
    let finish = |execute| Advanced {
        proposal: ProposalDatum { status: Status::Finished, ..proposal.clone() },
        execute,
        forced,
    };

    if forced {
        debug!(target: "agora::state::proposal", "Proposal {} missed its deadline", proposal.id);
        return Ok(finish(None))
    }

    let execute = match proposal.status {
        Status::Draft => {
            let found = cosigned_stake(proposal, witnesses)?;
            let required = proposal.thresholds.to_voting;
            if found < required {
                return Err(reject(TransitionError::ThresholdNotMet { required, found }))
            }
            None
        }

        Status::Voting => {
            let voting_end = proposal.voting_end()?;
            if now <= voting_end {
                return Err(reject(TransitionError::TooEarly(voting_end.0)))
            }
            let passed = winning_outcome(&proposal.votes)
                .ok()
                .filter(|tag| proposal.votes[tag] >= proposal.thresholds.execute);
            if passed.is_none() {
                debug!(target: "agora::state::proposal", "Proposal {} failed its vote", proposal.id);
                return Ok(finish(None))
            }
            None
        }

        Status::Locked => {
            let locking_end = proposal.locking_end()?;
            if now <= locking_end {
                return Err(reject(TransitionError::TooEarly(locking_end.0)))
            }
            Some(winning_outcome(&proposal.votes)?)
        }

        Status::Finished => return Err(reject(TransitionError::ProposalFinished)),
    };

    Ok(Advanced { proposal: ProposalDatum { status: next, ..proposal.clone() }, execute, forced })
}

/// Add the owner of `stake` as a cosigner.
pub fn cosign(
    proposal: &ProposalDatum,
    stake: &StakeDatum,
    now: Timestamp,
    max_cosigners: u64,
) -> Result<(ProposalDatum, StakeDatum)> {
    expect_status(proposal, Status::Draft)?;
    within(now, proposal.starting_time, proposal.draft_end()?)?;

    if proposal.is_cosigner(&stake.owner) {
        return Err(reject(TransitionError::AlreadyCosigned))
    }
    if proposal.cosigners.len() as u64 >= max_cosigners {
        return Err(reject(TransitionError::TooManyCosigners(max_cosigners)))
    }
    if stake.amount < proposal.thresholds.cosign {
        let required = proposal.thresholds.cosign;
        return Err(reject(TransitionError::ThresholdNotMet { required, found: stake.amount }))
    }
    if stake.lock_for(proposal.id).is_some() {
        return Err(reject(TransitionError::AlreadyLocked(proposal.id)))
    }

    let stake = stake.add_lock(PropLock { proposal_id: proposal.id, kind: LockKind::Cosigned })?;
    let cosigners = stake.owner.insert_sorted(&proposal.cosigners);
    Ok((ProposalDatum { cosigners, ..proposal.clone() }, stake))
}

/// Cast the full amount of every stake in `stakes` for `result`. The
/// `Voted` locks expire at the end of the transaction validity range.
pub fn vote(
    proposal: &ProposalDatum,
    stakes: &[StakeDatum],
    result: ResultTag,
    now: Timestamp,
    validity: ValidityRange,
) -> Result<(ProposalDatum, Vec<StakeDatum>)> {
    expect_status(proposal, Status::Voting)?;
    within(now, proposal.draft_end()?, proposal.voting_end()?)?;

    let max_width = proposal.timing.voting_time_range_max_width;
    if validity.width() > max_width as i64 {
        return Err(reject(TransitionError::ValidityTooWide {
            width: validity.width(),
            max: max_width as i64,
        }))
    }
    if !proposal.votes.contains_key(&result) {
        return Err(reject(TransitionError::UnknownOutcome(result.0)))
    }
    if stakes.is_empty() {
        return Err(Error::MissingUtxo("no stake to vote with".to_string()))
    }

    let mut total = 0u64;
    let mut locked = Vec::with_capacity(stakes.len());
    for stake in stakes {
        if stake.lock_for(proposal.id).is_some() {
            return Err(reject(TransitionError::AlreadyLocked(proposal.id)))
        }
        total = total.checked_add(stake.amount).ok_or(Error::Overflow)?;
        let kind = LockKind::Voted { result, expiry: validity.end };
        locked.push(stake.add_lock(PropLock { proposal_id: proposal.id, kind })?);
    }

    if total < proposal.thresholds.vote {
        let required = proposal.thresholds.vote;
        return Err(reject(TransitionError::ThresholdNotMet { required, found: total }))
    }

    let mut votes = proposal.votes.clone();
    let tally = votes.entry(result).or_default();
    *tally = tally.checked_add(total).ok_or(Error::Overflow)?;

    Ok((ProposalDatum { votes, ..proposal.clone() }, locked))
}

/// Withdraw the votes of `stakes` before the proposal locks.
pub fn retract(
    proposal: &ProposalDatum,
    stakes: &[StakeDatum],
) -> Result<(ProposalDatum, Vec<StakeDatum>)> {
    if !matches!(proposal.status, Status::Draft | Status::Voting) {
        return Err(reject(TransitionError::WrongStatus {
            expected: Status::Voting,
            found: proposal.status,
        }))
    }

    let mut votes = proposal.votes.clone();
    let mut released = Vec::with_capacity(stakes.len());
    for stake in stakes {
        let Some(PropLock { kind: LockKind::Voted { result, .. }, .. }) =
            stake.lock_for(proposal.id)
        else {
            return Err(reject(TransitionError::NotVoted(proposal.id)))
        };

        let tally = votes.get_mut(result).ok_or(Error::VoteUnderflow(result.0))?;
        *tally = tally.checked_sub(stake.amount).ok_or(Error::VoteUnderflow(result.0))?;
        released.push(stake.remove_locks(proposal.id)?);
    }

    Ok((ProposalDatum { votes, ..proposal.clone() }, released))
}

/// Release the locks `stakes` hold on a proposal that no longer needs them.
/// A finished proposal releases every lock; a locked one only releases
/// `Voted` locks past their expiry.
pub fn unlock(proposal: &ProposalDatum, stakes: &[StakeDatum], now: Timestamp) -> Result<Vec<StakeDatum>> {
    let mut released = Vec::with_capacity(stakes.len());
    for stake in stakes {
        let lock = stake.lock_for(proposal.id).ok_or(Error::LockNotFound(proposal.id))?;

        match (proposal.status, lock.kind) {
            (Status::Finished, _) => {}
            (Status::Locked, LockKind::Voted { expiry, .. }) => {
                if now <= expiry {
                    return Err(reject(TransitionError::TooEarly(expiry.0)))
                }
            }
            (Status::Locked, _) => {
                return Err(reject(TransitionError::WrongStatus {
                    expected: Status::Finished,
                    found: proposal.status,
                }))
            }
            (status, _) => {
                return Err(reject(TransitionError::WrongStatus {
                    expected: Status::Locked,
                    found: status,
                }))
            }
        }

        released.push(stake.remove_locks(proposal.id)?);
    }
    Ok(released)
}

/// Records produced by creating a proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Created {
    pub proposal: ProposalDatum,
    pub stake: StakeDatum,
    pub governor: GovernorDatum,
}

/// Create a proposal backed by `stake`. The new proposal takes the next id
/// from the governor and starts at the middle of the validity range.
pub fn create(
    governor: &GovernorDatum,
    stake: &StakeDatum,
    effects: EffectMap,
    validity: ValidityRange,
) -> Result<Created> {
    let thresholds = governor.thresholds;
    if stake.amount < thresholds.create {
        return Err(reject(TransitionError::ThresholdNotMet {
            required: thresholds.create,
            found: stake.amount,
        }))
    }
    if stake.created_count() >= governor.proposals_per_stake {
        return Err(Error::ProposalLimitReached(governor.proposals_per_stake))
    }
    if !effects.contains_key(&ResultTag(0)) {
        return Err(reject(TransitionError::UnknownOutcome(0)))
    }
    let max = governor.max_proposal_valid_length as i64;
    if validity.width() > max {
        return Err(reject(TransitionError::ValidityTooWide { width: validity.width(), max }))
    }

    let id = governor.next_proposal_id;
    let proposal = ProposalDatum {
        id,
        votes: effects.keys().map(|tag| (*tag, 0)).collect(),
        effects,
        status: Status::Draft,
        cosigners: vec![stake.owner],
        thresholds,
        timing: governor.timing,
        starting_time: validity.midpoint(),
    };
    let stake = stake.add_lock(PropLock { proposal_id: id, kind: LockKind::Created })?;
    let governor = governor.with_next_proposal()?;

    debug!(target: "agora::state::proposal", "Created proposal {id} starting at {}", proposal.starting_time);
    Ok(Created { proposal, stake, governor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorClass,
        model::{governor::tests::governor, proposal::tests::proposal, Credential, Thresholds},
        plutus::KeyHash,
    };

    const S: i64 = 1_700_000_000_000;

    fn key(b: u8) -> Credential {
        Credential::Key(KeyHash::from_slice(&[b; 28]).unwrap())
    }

    fn at(offset: i64) -> Timestamp {
        Timestamp(S + offset)
    }

    fn stake(owner: u8, amount: u64) -> StakeDatum {
        StakeDatum::new(amount, key(owner))
    }

    fn voting() -> ProposalDatum {
        ProposalDatum { status: Status::Voting, ..proposal(vec![key(1)]) }
    }

    fn range(offset: i64) -> ValidityRange {
        ValidityRange::around(at(offset), 100_000, 400_000).unwrap()
    }

    fn transition(res: Result<impl std::fmt::Debug>) -> TransitionError {
        match res {
            Err(Error::InvalidTransition(e)) => e,
            other => panic!("expected a rejected transition, got {other:?}"),
        }
    }

    #[test]
    fn forced_finish() {
        let p = ProposalDatum { starting_time: Timestamp(0), ..voting() };
        let now = Timestamp(600_000 + 700_000 + 700_000 + 1);
        let out = advance(&p, now, &[]).unwrap();
        assert_eq!(out.proposal.status, Status::Finished);
        assert!(out.forced);
        assert_eq!(out.execute, None);

        // With a clear winner the outcome is the same
        let mut p = p;
        p.votes.insert(ResultTag(1), 1_000);
        assert_eq!(advance(&p, now, &[]).unwrap().proposal.status, Status::Finished);
    }

    #[test]
    fn status_is_monotonic() {
        let mut p = voting();
        p.votes.insert(ResultTag(1), 10);
        let witness = stake(1, 100).add_lock(PropLock { proposal_id: 4, kind: LockKind::Created }).unwrap();

        for status in [Status::Draft, Status::Voting, Status::Locked, Status::Finished] {
            for offset in [0, 599_999, 1_300_001, 2_000_001, 2_800_001] {
                let p = ProposalDatum { status, ..p.clone() };
                match advance(&p, at(offset), &[witness.clone()]) {
                    Ok(out) => assert!(out.proposal.status > status),
                    Err(e) => {
                        assert_eq!(e.class(), ErrorClass::InvalidTransition);
                        if status == Status::Finished {
                            assert_eq!(transition(Err::<(), _>(e)), TransitionError::ProposalFinished);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn winner_tie_break() {
        let votes = BTreeMap::from([(ResultTag(0), 100), (ResultTag(1), 250), (ResultTag(2), 250)]);
        assert_eq!(winning_outcome(&votes).unwrap(), ResultTag(1));

        let votes = BTreeMap::from([(ResultTag(0), 7), (ResultTag(3), 2)]);
        assert_eq!(winning_outcome(&votes).unwrap(), ResultTag(0));

        let zero = BTreeMap::from([(ResultTag(0), 0), (ResultTag(1), 0)]);
        assert_eq!(transition(winning_outcome(&zero)), TransitionError::NoWinningOutcome);
        assert_eq!(transition(winning_outcome(&BTreeMap::new())), TransitionError::NoWinningOutcome);
    }

    #[test]
    fn cosign_scenario() {
        let gov = governor();
        let creator = stake(3, 100);
        let created = create(&gov, &creator, proposal(vec![]).effects, range(0)).unwrap();

        let cosigner = stake(1, 100);
        let now = created.proposal.starting_time;
        let (p, s) = cosign(&created.proposal, &cosigner, now, 5).unwrap();

        assert_eq!(s.locks, vec![PropLock { proposal_id: 0, kind: LockKind::Cosigned }]);
        assert_eq!(s.amount, 100);
        assert_eq!(p.cosigners, vec![key(1), key(3)]);
        assert_eq!(p.cosigners, key(1).insert_sorted(&created.proposal.cosigners));
        assert_eq!(p.votes, created.proposal.votes);
    }

    #[test]
    fn cosign_rejections() {
        let p = proposal(vec![key(1)]);
        let now = at(10);

        assert_eq!(transition(cosign(&p, &stake(1, 100), now, 5)), TransitionError::AlreadyCosigned);
        assert_eq!(transition(cosign(&p, &stake(2, 100), now, 1)), TransitionError::TooManyCosigners(1));
        assert_eq!(
            transition(cosign(&p, &stake(2, 0), now, 5)),
            TransitionError::ThresholdNotMet { required: 1, found: 0 }
        );
        assert_eq!(transition(cosign(&p, &stake(2, 100), at(600_001), 5)), TransitionError::WindowClosed);
        assert_eq!(transition(cosign(&p, &stake(2, 100), at(-1), 5)), TransitionError::TooEarly(S));

        let locked = stake(2, 100).add_lock(PropLock { proposal_id: 4, kind: LockKind::Created }).unwrap();
        assert_eq!(transition(cosign(&p, &locked, now, 5)), TransitionError::AlreadyLocked(4));

        assert!(matches!(
            transition(cosign(&voting(), &stake(2, 100), now, 5)),
            TransitionError::WrongStatus { expected: Status::Draft, found: Status::Voting }
        ));
    }

    #[test]
    fn draft_needs_cosigned_stake() {
        let mut p = proposal(vec![key(1), key(2)]);
        p.thresholds.to_voting = 150;
        let lock = |kind| PropLock { proposal_id: 4, kind };
        let a = stake(1, 100).add_lock(lock(LockKind::Created)).unwrap();
        let b = stake(2, 60).add_lock(lock(LockKind::Cosigned)).unwrap();
        // Not a cosigner
        let c = stake(9, 1_000).add_lock(lock(LockKind::Cosigned)).unwrap();

        assert_eq!(
            transition(advance(&p, at(1), &[a.clone(), c.clone()])),
            TransitionError::ThresholdNotMet { required: 150, found: 100 }
        );
        let out = advance(&p, at(1), &[a, b, c]).unwrap();
        assert_eq!(out.proposal.status, Status::Voting);
        assert!(!out.forced);
    }

    #[test]
    fn voting_flow() {
        let p = voting();
        let validity = range(700_000);
        let stakes = [stake(1, 100), stake(2, 50)];

        let (p2, locked) = vote(&p, &stakes, ResultTag(1), at(700_000), validity).unwrap();
        assert_eq!(p2.votes[&ResultTag(1)], 150);
        assert_eq!(p2.votes[&ResultTag(0)], 0);
        for s in &locked {
            assert_eq!(
                s.locks,
                vec![PropLock { proposal_id: 4, kind: LockKind::Voted { result: ResultTag(1), expiry: validity.end } }]
            );
        }

        // Second vote with the same stake
        assert_eq!(
            transition(vote(&p2, &locked[..1], ResultTag(0), at(700_000), validity)),
            TransitionError::AlreadyLocked(4)
        );
        assert_eq!(
            transition(vote(&p, &stakes, ResultTag(9), at(700_000), validity)),
            TransitionError::UnknownOutcome(9)
        );
        assert_eq!(
            transition(vote(&p, &stakes, ResultTag(1), at(1_300_001), validity)),
            TransitionError::WindowClosed
        );
        assert_eq!(
            transition(vote(&p, &stakes, ResultTag(1), at(599_999), validity)),
            TransitionError::TooEarly(S + 600_000)
        );
        let wide = ValidityRange { start: at(0), end: at(600_001) };
        assert!(matches!(
            transition(vote(&p, &stakes, ResultTag(1), at(700_000), wide)),
            TransitionError::ValidityTooWide { .. }
        ));
        assert!(matches!(vote(&p, &[], ResultTag(1), at(700_000), validity), Err(Error::MissingUtxo(_))));
    }

    #[test]
    fn voting_to_locked_and_execution() {
        let mut p = voting();
        p.votes.insert(ResultTag(1), 10);

        assert_eq!(transition(advance(&p, at(1_300_000), &[])), TransitionError::TooEarly(S + 1_300_000));

        let locked = advance(&p, at(1_300_001), &[]).unwrap();
        assert_eq!(locked.proposal.status, Status::Locked);
        assert_eq!(locked.execute, None);

        let p = locked.proposal;
        assert_eq!(transition(advance(&p, at(2_000_000), &[])), TransitionError::TooEarly(S + 2_000_000));
        let done = advance(&p, at(2_000_001), &[]).unwrap();
        assert_eq!(done.proposal.status, Status::Finished);
        assert_eq!(done.execute, Some(ResultTag(1)));

        // Missing the execution window executes nothing
        let late = advance(&p, at(2_800_001), &[]).unwrap();
        assert!(late.forced);
        assert_eq!(late.execute, None);
    }

    #[test]
    fn failed_vote_finishes() {
        let p = voting();
        let out = advance(&p, at(1_300_001), &[]).unwrap();
        assert_eq!(out.proposal.status, Status::Finished);
        assert!(!out.forced);

        let mut p = voting();
        p.thresholds.execute = 100;
        p.votes.insert(ResultTag(1), 99);
        assert_eq!(advance(&p, at(1_300_001), &[]).unwrap().proposal.status, Status::Finished);
    }

    #[test]
    fn retract_votes() {
        let p = voting();
        let validity = range(700_000);
        let (p2, locked) = vote(&p, &[stake(1, 100)], ResultTag(1), at(700_000), validity).unwrap();

        let (p3, released) = retract(&p2, &locked).unwrap();
        assert_eq!(p3.votes, p.votes);
        assert!(!released[0].is_locked());

        assert_eq!(transition(retract(&p2, &[stake(1, 100)])), TransitionError::NotVoted(4));

        let cosigned = stake(1, 100).add_lock(PropLock { proposal_id: 4, kind: LockKind::Cosigned }).unwrap();
        assert_eq!(transition(retract(&p2, &[cosigned])), TransitionError::NotVoted(4));

        // A tally that cannot absorb the withdrawal
        let mut tampered = p2.clone();
        tampered.votes.insert(ResultTag(1), 10);
        assert!(matches!(retract(&tampered, &locked), Err(Error::VoteUnderflow(1))));

        let locked_status = ProposalDatum { status: Status::Locked, ..p2 };
        assert!(matches!(
            transition(retract(&locked_status, &locked)),
            TransitionError::WrongStatus { found: Status::Locked, .. }
        ));
    }

    #[test]
    fn unlock_rules() {
        let lock = |kind| PropLock { proposal_id: 4, kind };
        let expiry = at(1_000_000);
        let voted = stake(1, 100).add_lock(lock(LockKind::Voted { result: ResultTag(1), expiry })).unwrap();
        let cosigned = stake(2, 100).add_lock(lock(LockKind::Cosigned)).unwrap();

        let finished = ProposalDatum { status: Status::Finished, ..voting() };
        let released = unlock(&finished, &[voted.clone(), cosigned.clone()], at(0)).unwrap();
        assert!(released.iter().all(|s| !s.is_locked()));

        let locked = ProposalDatum { status: Status::Locked, ..voting() };
        assert_eq!(transition(unlock(&locked, &[voted.clone()], expiry)), TransitionError::TooEarly(expiry.0));
        assert!(unlock(&locked, &[voted.clone()], at(1_000_001)).is_ok());
        assert!(matches!(
            transition(unlock(&locked, &[cosigned], at(1_000_001))),
            TransitionError::WrongStatus { expected: Status::Finished, .. }
        ));

        assert!(matches!(
            transition(unlock(&voting(), &[voted], at(1_000_001))),
            TransitionError::WrongStatus { expected: Status::Locked, .. }
        ));
        assert!(matches!(unlock(&finished, &[stake(3, 1)], at(0)), Err(Error::LockNotFound(4))));
    }

    #[test]
    fn create_rules() {
        let gov = GovernorDatum { next_proposal_id: 7, ..governor() };
        let effects = proposal(vec![]).effects;
        let creator = stake(1, 100);
        let validity = range(0);

        let out = create(&gov, &creator, effects.clone(), validity).unwrap();
        assert_eq!(out.proposal.id, 7);
        assert_eq!(out.proposal.status, Status::Draft);
        assert_eq!(out.proposal.cosigners, vec![key(1)]);
        assert_eq!(out.proposal.starting_time, at(150_000));
        assert_eq!(out.proposal.votes, BTreeMap::from([(ResultTag(0), 0), (ResultTag(1), 0)]));
        assert_eq!(out.stake.locks, vec![PropLock { proposal_id: 7, kind: LockKind::Created }]);
        assert_eq!(out.governor, GovernorDatum { next_proposal_id: 8, ..gov.clone() });

        let mut no_noop = effects.clone();
        no_noop.remove(&ResultTag(0));
        assert_eq!(transition(create(&gov, &creator, no_noop, validity)), TransitionError::UnknownOutcome(0));

        let poor = GovernorDatum { thresholds: Thresholds { create: 101, ..gov.thresholds }, ..gov.clone() };
        assert!(matches!(
            transition(create(&poor, &creator, effects.clone(), validity)),
            TransitionError::ThresholdNotMet { required: 101, found: 100 }
        ));

        let strict = GovernorDatum { proposals_per_stake: 1, ..gov.clone() };
        let busy = out.stake.clone();
        assert!(matches!(create(&strict, &busy, effects.clone(), validity), Err(Error::ProposalLimitReached(1))));

        let wide = ValidityRange { start: at(0), end: at(600_001) };
        assert!(matches!(
            transition(create(&gov, &creator, effects, wide)),
            TransitionError::ValidityTooWide { width: 600_001, max: 600_000 }
        ));
    }
}
