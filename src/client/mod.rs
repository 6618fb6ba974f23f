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

//! Transaction builders for every DAO action.
//!
//! Each action is a `*Call` struct holding the ledger snapshot it works
//! on. `make()` runs the transition in [`crate::state`] and lays the result
//! out as an unsigned [`TxShape`]. Nothing here talks to the ledger; the
//! caller fetches the snapshot and signs and submits the shape.

use std::collections::BTreeSet;

use crate::{
    config::BuilderConfig,
    ledger::{Address, AssetId, TxOutput, Utxo},
    model::Credential,
    plutus::{self, FromPlutusData, ToPlutusData},
    script::{DaoScripts, ScriptRefs},
    tx::{builder::use_scripts, TxBuilder},
    Error, Result,
};

/// Provides `DaoCreateGovernorCall` which deploys a new DAO instance.
pub mod governor;
pub use governor::DaoCreateGovernorCall;

/// Provides the calls that drive a proposal through its lifecycle.
///
/// * `DaoProposeCall` creates a proposal backed by a stake.
/// * `DaoCosignCall` adds a stake owner as cosigner of a draft.
/// * `DaoVoteCall` casts the full weight of one or more stakes.
/// * `DaoRetractCall` withdraws votes before the proposal locks.
/// * `DaoUnlockCall` releases stake locks once they are no longer needed.
/// * `DaoAdvanceCall` moves the proposal to its next status.
pub mod proposal;
pub use proposal::{
    DaoAdvanceCall, DaoCosignCall, DaoProposeCall, DaoRetractCall, DaoUnlockCall, DaoVoteCall,
};

/// Provides the stake management calls.
pub mod stake;
pub use stake::{
    DaoStakeCreateCall, DaoStakeDelegateCall, DaoStakeDestroyCall, DaoStakeUpdateCall,
};

/// Provides the calls executing authorized effects.
pub mod effect;
pub use effect::{DaoMutateGovernorCall, DaoTreasuryWithdrawCall};

/// Everything a call needs to know about the DAO it targets.
#[derive(Clone, Debug)]
pub struct Dao<'a> {
    pub scripts: &'a DaoScripts,
    pub refs: &'a ScriptRefs,
    pub config: &'a BuilderConfig,
}

impl<'a> Dao<'a> {
    pub fn new(scripts: &'a DaoScripts, refs: &'a ScriptRefs, config: &'a BuilderConfig) -> Self {
        Self { scripts, refs, config }
    }

    /// Start a builder providing the scripts of `kinds`.
    pub(crate) fn builder(&self, kinds: &[crate::script::ScriptKind]) -> TxBuilder {
        use_scripts(TxBuilder::new(), self.scripts, self.refs, kinds)
    }
}

/// The wallet paying fees and deposits and receiving change.
#[derive(Clone, Debug)]
pub struct Wallet {
    pub change_address: Address,
    pub utxos: Vec<Utxo>,
}

impl Wallet {
    pub fn new(change_address: Address, utxos: Vec<Utxo>) -> Self {
        Self { change_address, utxos }
    }
}

/// Decode the inline datum of `utxo` after checking it carries `token`.
pub(crate) fn thread_datum<T: FromPlutusData>(utxo: &Utxo, token: &AssetId) -> Result<T> {
    if !utxo.holds(token) {
        return Err(Error::MissingUtxo(format!("{} does not hold {token}", utxo.out_ref)))
    }
    utxo.decode_datum()
}

/// Fail if any output appears twice in `utxos`.
pub(crate) fn ensure_distinct(utxos: &[Utxo]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for utxo in utxos {
        if !seen.insert(utxo.out_ref) {
            return Err(Error::DuplicateInput(utxo.out_ref.to_string()))
        }
    }
    Ok(())
}

/// The same output carrying an updated datum.
pub(crate) fn repay<D: ToPlutusData>(utxo: &Utxo, datum: &D) -> TxOutput {
    TxOutput::new(utxo.address, utxo.assets.clone()).with_datum(plutus::encode(datum))
}

/// Add `owner` as a required signer when it is a key.
pub(crate) fn sign_for(builder: TxBuilder, owner: &Credential) -> TxBuilder {
    match owner.key_hash() {
        Some(key) => builder.add_signer(key),
        None => builder,
    }
}
