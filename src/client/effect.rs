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

use super::{ensure_distinct, repay, thread_datum, Dao, Wallet};
use crate::{
    effect::verify_payload,
    ledger::{Address, TxOutput, Utxo, Value},
    model::{GovernorDatum, GovernorRedeemer, MutateGovernorDatum, TreasuryWithdrawalDatum},
    plutus::{self, DatumHash, FromPlutusData, PlutusData},
    script::ScriptKind,
    tx::{builder::unit_redeemer, TxShape},
    util::time::Timestamp,
    Error, Result,
};

/// Decode the payload carried by an effect output holding a GAT after
/// checking it against the proposal's commitment.
fn effect_payload<T: FromPlutusData>(dao: &Dao, utxo: &Utxo, commitment: &DatumHash) -> Result<T> {
    let datum = utxo.datum.as_deref().ok_or_else(|| Error::MissingDatum(utxo.out_ref.to_string()))?;
    verify_payload(commitment, datum)?;
    thread_datum(utxo, &dao.scripts.gat())
}

/// Pay out a treasury withdrawal authorized by a GAT. Receivers are paid
/// from `treasuries`; what is left goes back to the treasury.
pub struct DaoTreasuryWithdrawCall {
    /// Output at the treasury spend effect holding the GAT and payload
    pub effect: Utxo,
    pub treasuries: Vec<Utxo>,
    /// Payload hash committed by the proposal
    pub commitment: DatumHash,
    pub now: Timestamp,
}

impl DaoTreasuryWithdrawCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::effect", "DaoTreasuryWithdrawCall::build()");
        let scripts = dao.scripts;
        let payload: TreasuryWithdrawalDatum =
            effect_payload(dao, &self.effect, &self.commitment)?;

        let Some(first) = self.treasuries.first() else {
            return Err(Error::MissingUtxo("no treasury output to draw from".to_string()))
        };
        let treasury = first.address;
        for utxo in &self.treasuries {
            if !payload.treasuries.contains(&utxo.address.payment) {
                return Err(Error::MissingUtxo(format!("{} is not a listed treasury", utxo.out_ref)))
            }
        }

        ensure_distinct(&self.treasuries)?;
        let available = Value::sum(self.treasuries.iter().map(|u| &u.assets))?;
        let remainder = available.checked_sub(&payload.total()?)?;

        let mut tx = dao
            .builder(&[
                ScriptKind::TreasuryValidator,
                ScriptKind::TreasurySpendEffect,
                ScriptKind::AuthorityPolicy,
            ])
            .collect_from(self.effect, &unit_redeemer())?
            .mint(scripts.gat(), -1, &unit_redeemer())?
            .valid_range(dao.config.validity(self.now)?);
        for utxo in self.treasuries {
            tx = tx.collect_from(utxo, &unit_redeemer())?;
        }
        for receiver in &payload.receivers {
            tx = tx.pay_to(TxOutput::new(Address::from(receiver.credential), receiver.value.clone()));
        }
        if !remainder.is_empty() {
            let void = plutus::encode(&PlutusData::unit());
            tx = tx.pay_to(TxOutput::new(treasury, remainder).with_datum(void));
        }

        info!(target: "agora::client::effect", "Treasury pays {} receivers", payload.receivers.len());
        tx.complete(wallet.change_address, &wallet.utxos)
    }
}

/// Replace the governor settings with those of an authorized mutation.
/// The proposal counter carries over from the live governor.
pub struct DaoMutateGovernorCall {
    /// Output at the governor mutation effect holding the GAT and payload
    pub effect: Utxo,
    pub governor: Utxo,
    /// Payload hash committed by the proposal
    pub commitment: DatumHash,
    pub now: Timestamp,
}

impl DaoMutateGovernorCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::effect", "DaoMutateGovernorCall::build()");
        let scripts = dao.scripts;
        let payload: MutateGovernorDatum = effect_payload(dao, &self.effect, &self.commitment)?;
        let current: GovernorDatum = thread_datum(&self.governor, &scripts.governor_token())?;

        // Proposals created since the mutation was proposed only move the counter
        let next_proposal_id = current.next_proposal_id;
        if (GovernorDatum { next_proposal_id, ..payload.old.clone() }) != current {
            return Err(Error::MalformedDatum("governor changed since the mutation was proposed".to_string()))
        }
        let new = GovernorDatum { next_proposal_id, ..payload.new };
        new.validate()?;

        let tx = dao
            .builder(&[
                ScriptKind::GovernorValidator,
                ScriptKind::GovernorMutationEffect,
                ScriptKind::AuthorityPolicy,
            ])
            .pay_to(repay(&self.governor, &new))
            .collect_from(self.governor, &GovernorRedeemer::MutateGovernor)?
            .collect_from(self.effect, &unit_redeemer())?
            .mint(scripts.gat(), -1, &unit_redeemer())?
            .valid_range(dao.config.validity(self.now)?);

        info!(target: "agora::client::effect", "Governor mutated, next proposal {next_proposal_id}");
        tx.complete(wallet.change_address, &wallet.utxos)
    }
}
