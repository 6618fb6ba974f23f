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

use log::{debug, info};

use super::{ensure_distinct, repay, sign_for, thread_datum, Dao, Wallet};
use crate::{
    ledger::{TxOutput, Utxo, Value},
    model::{Credential, StakeDatum, StakeRedeemer},
    plutus,
    script::ScriptKind,
    tx::{builder::unit_redeemer, TxShape},
    Error, Result,
};

/// Lock `amount` governance tokens in a new stake owned by `owner`.
pub struct DaoStakeCreateCall {
    pub owner: Credential,
    pub amount: u64,
}

impl DaoStakeCreateCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::stake", "DaoStakeCreateCall::build()");
        let scripts = dao.scripts;
        let token = scripts.stake_token();

        let datum = StakeDatum::new(self.amount, self.owner);
        let assets = Value::lovelace(dao.config.min_ada)
            .with(token.clone(), 1)
            .with(scripts.gov_token().clone(), self.amount);
        let output = TxOutput::new(scripts.stake_address(), assets).with_datum(plutus::encode(&datum));

        let tx = dao.builder(&[ScriptKind::StakePolicy]).mint(token, 1, &unit_redeemer())?.pay_to(output);
        let shape = sign_for(tx, &self.owner).complete(wallet.change_address, &wallet.utxos)?;

        info!(target: "agora::client::stake", "Staked {} for {}", self.amount, self.owner);
        Ok(shape)
    }
}

/// Move the staked amount to `amount`, depositing or withdrawing the
/// difference.
pub struct DaoStakeUpdateCall {
    pub stake: Utxo,
    pub amount: u64,
}

impl DaoStakeUpdateCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::stake", "DaoStakeUpdateCall::build()");
        let scripts = dao.scripts;
        let stake: StakeDatum = thread_datum(&self.stake, &scripts.stake_token())?;

        let delta = i64::try_from(i128::from(self.amount) - i128::from(stake.amount))
            .map_err(|_| Error::Overflow)?;
        let updated = stake.deposit_withdraw(delta)?;

        let gt = scripts.gov_token();
        let mut assets = self.stake.assets.clone();
        if delta >= 0 {
            assets.add_asset(gt, delta.unsigned_abs())?;
        } else {
            assets.sub_asset(gt, delta.unsigned_abs())?;
        }
        let output = TxOutput::new(self.stake.address, assets).with_datum(plutus::encode(&updated));

        let tx = dao
            .builder(&[ScriptKind::StakeValidator])
            .collect_from(self.stake, &StakeRedeemer::DepositWithdraw(delta))?
            .pay_to(output);
        let shape = sign_for(tx, &stake.owner).complete(wallet.change_address, &wallet.utxos)?;

        info!(target: "agora::client::stake", "Stake of {} moved {} -> {}", stake.owner, stake.amount, self.amount);
        Ok(shape)
    }
}

/// Set or clear the delegate of a stake.
pub struct DaoStakeDelegateCall {
    pub stake: Utxo,
    pub delegate: Option<Credential>,
}

impl DaoStakeDelegateCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::stake", "DaoStakeDelegateCall::build()");
        let stake: StakeDatum = thread_datum(&self.stake, &dao.scripts.stake_token())?;
        let updated = stake.set_delegate(self.delegate);

        let redeemer = match self.delegate {
            Some(delegate) => StakeRedeemer::DelegateTo(delegate),
            None => StakeRedeemer::ClearDelegate,
        };
        let tx = dao
            .builder(&[ScriptKind::StakeValidator])
            .pay_to(repay(&self.stake, &updated))
            .collect_from(self.stake, &redeemer)?;
        sign_for(tx, &stake.owner).complete(wallet.change_address, &wallet.utxos)
    }
}

/// Destroy unlocked stakes, burning their tokens and returning the
/// governance tokens to the wallet.
pub struct DaoStakeDestroyCall {
    pub stakes: Vec<Utxo>,
}

impl DaoStakeDestroyCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::stake", "DaoStakeDestroyCall::build()");
        if self.stakes.is_empty() {
            return Err(Error::MissingUtxo("no stake to destroy".to_string()))
        }
        ensure_distinct(&self.stakes)?;

        let token = dao.scripts.stake_token();
        let count = self.stakes.len() as i64;
        let mut tx = dao.builder(&[ScriptKind::StakeValidator, ScriptKind::StakePolicy]);
        for utxo in self.stakes {
            let stake: StakeDatum = thread_datum(&utxo, &token)?;
            stake.ensure_unlocked()?;
            tx = sign_for(tx, &stake.owner).collect_from(utxo, &StakeRedeemer::Destroy)?;
        }
        let tx = tx.mint(token, -count, &unit_redeemer())?;

        info!(target: "agora::client::stake", "Destroying {count} stakes");
        tx.complete(wallet.change_address, &wallet.utxos)
    }
}
