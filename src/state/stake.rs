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
    model::{Credential, LockKind, PropLock, StakeDatum},
    Error, Result,
};

impl StakeDatum {
    /// Lock held for `proposal_id`, if any.
    pub fn lock_for(&self, proposal_id: u64) -> Option<&PropLock> {
        self.locks.iter().find(|l| l.proposal_id == proposal_id)
    }

    /// Number of proposals this stake created that still lock it.
    pub fn created_count(&self) -> u64 {
        self.locks.iter().filter(|l| l.kind == LockKind::Created).count() as u64
    }

    pub fn is_locked(&self) -> bool {
        !self.locks.is_empty()
    }

    /// Adjust the deposited amount. Locked stakes are immovable.
    pub fn deposit_withdraw(&self, delta: i64) -> Result<Self> {
        if self.is_locked() {
            return Err(Error::StakeLocked)
        }

        let amount = i128::from(self.amount) + i128::from(delta);
        if amount < 0 {
            return Err(Error::NegativeBalance { amount: self.amount, delta })
        }
        let amount = u64::try_from(amount).map_err(|_| Error::Overflow)?;
        Ok(Self { amount, ..self.clone() })
    }

    /// Set or clear the delegate. Allowed while locked.
    pub fn set_delegate(&self, delegate: Option<Credential>) -> Self {
        Self { delegate, ..self.clone() }
    }

    /// Prepend a lock, rejecting a second lock for the same proposal.
    pub fn add_lock(&self, lock: PropLock) -> Result<Self> {
        if self.lock_for(lock.proposal_id).is_some() {
            return Err(Error::DuplicateLock(lock.proposal_id))
        }

        let mut locks = Vec::with_capacity(self.locks.len() + 1);
        locks.push(lock);
        locks.extend_from_slice(&self.locks);
        Ok(Self { locks, ..self.clone() })
    }

    /// Drop every lock held for `proposal_id`.
    pub fn remove_locks(&self, proposal_id: u64) -> Result<Self> {
        if self.lock_for(proposal_id).is_none() {
            return Err(Error::LockNotFound(proposal_id))
        }

        let locks = self.locks.iter().filter(|l| l.proposal_id != proposal_id).copied().collect();
        Ok(Self { locks, ..self.clone() })
    }

    /// Destroying a stake requires every lock to be gone.
    pub fn ensure_unlocked(&self) -> Result<()> {
        if self.is_locked() {
            return Err(Error::StakeLocked)
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorClass,
        model::ResultTag,
        plutus::{KeyHash, ScriptHash},
        util::time::Timestamp,
    };

    fn stake(amount: u64) -> StakeDatum {
        StakeDatum::new(amount, Credential::Key(KeyHash::from_slice(&[1u8; 28]).unwrap()))
    }

    fn lock(id: u64, kind: LockKind) -> PropLock {
        PropLock { proposal_id: id, kind }
    }

    #[test]
    fn deposit_and_withdraw() {
        let s = stake(100);
        assert_eq!(s.deposit_withdraw(50).unwrap().amount, 150);
        assert_eq!(s.deposit_withdraw(-100).unwrap().amount, 0);

        let err = s.deposit_withdraw(-101).unwrap_err();
        assert!(matches!(err, Error::NegativeBalance { amount: 100, delta: -101 }));
        assert_eq!(err.class(), ErrorClass::InvariantViolation);

        assert!(matches!(stake(u64::MAX).deposit_withdraw(1), Err(Error::Overflow)));
        // Input untouched
        assert_eq!(s.amount, 100);
    }

    #[test]
    fn locked_stake_is_immovable() {
        let s = stake(100).add_lock(lock(3, LockKind::Cosigned)).unwrap();
        assert!(matches!(s.deposit_withdraw(1), Err(Error::StakeLocked)));
        assert!(s.ensure_unlocked().is_err());

        // Delegation still works
        let delegate = Credential::Script(ScriptHash::from_slice(&[2u8; 28]).unwrap());
        let d = s.set_delegate(Some(delegate));
        assert_eq!(d.delegate, Some(delegate));
        assert_eq!(d.locks, s.locks);
        assert_eq!(d.set_delegate(None).delegate, None);
    }

    #[test]
    fn no_double_lock() {
        let s = stake(100).add_lock(lock(1, LockKind::Created)).unwrap();
        let voted = LockKind::Voted { result: ResultTag(1), expiry: Timestamp(5) };
        assert!(matches!(s.add_lock(lock(1, voted)), Err(Error::DuplicateLock(1))));

        let s = s.add_lock(lock(2, voted)).unwrap();
        // Most recent first
        assert_eq!(s.locks[0].proposal_id, 2);
        assert_eq!(s.lock_for(1).unwrap().kind, LockKind::Created);
        assert_eq!(s.created_count(), 1);
    }

    #[test]
    fn remove_locks() {
        let s = stake(100)
            .add_lock(lock(1, LockKind::Created))
            .and_then(|s| s.add_lock(lock(2, LockKind::Cosigned)))
            .unwrap();

        let s = s.remove_locks(1).unwrap();
        assert!(s.lock_for(1).is_none());
        assert_eq!(s.locks.len(), 1);
        assert!(matches!(s.remove_locks(1), Err(Error::LockNotFound(1))));

        let s = s.remove_locks(2).unwrap();
        assert!(!s.is_locked());
        assert!(s.ensure_unlocked().is_ok());
    }
}
