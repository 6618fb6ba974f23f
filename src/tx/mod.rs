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

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    ledger::{Address, AssetId, OutRef, TxOutput, Utxo, Value},
    plutus::{KeyHash, ScriptHash},
    script::PlutusScript,
    util::time::ValidityRange,
    Error, Result,
};

/// Immutable transaction builder
pub mod builder;
pub use builder::TxBuilder;

/// A consumed output and the redeemer unlocking it. Wallet inputs carry
/// no redeemer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub utxo: Utxo,
    pub redeemer: Option<Vec<u8>>,
}

/// An unsigned transaction: everything an external signer needs to balance
/// fees, sign and submit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxShape {
    pub inputs: Vec<TxInput>,
    /// Outputs read but not consumed
    pub reference_inputs: Vec<Utxo>,
    pub outputs: Vec<TxOutput>,
    /// Minted (positive) and burned (negative) quantities
    pub mint: BTreeMap<AssetId, i64>,
    /// Redeemer per minting policy
    pub mint_redeemers: BTreeMap<ScriptHash, Vec<u8>>,
    pub validity: Option<ValidityRange>,
    pub required_signers: BTreeSet<KeyHash>,
    /// Scripts attached as witnesses
    pub scripts: Vec<PlutusScript>,
}

/// Signed per-asset running balance.
#[derive(Default)]
pub(crate) struct Balance(BTreeMap<AssetId, i128>);

impl Balance {
    pub(crate) fn add(&mut self, value: &Value) {
        for (asset, amount) in value.iter() {
            *self.0.entry(asset.clone()).or_default() += i128::from(*amount);
        }
    }

    pub(crate) fn sub(&mut self, value: &Value) {
        for (asset, amount) in value.iter() {
            *self.0.entry(asset.clone()).or_default() -= i128::from(*amount);
        }
    }

    pub(crate) fn add_mint(&mut self, mint: &BTreeMap<AssetId, i64>) {
        for (asset, amount) in mint {
            *self.0.entry(asset.clone()).or_default() += i128::from(*amount);
        }
    }

    /// First asset with a negative balance.
    pub(crate) fn deficit(&self) -> Option<&AssetId> {
        self.0.iter().find(|(_, n)| **n < 0).map(|(a, _)| a)
    }

    /// First asset with a non-zero balance.
    pub(crate) fn unbalanced(&self) -> Option<&AssetId> {
        self.0.iter().find(|(_, n)| **n != 0).map(|(a, _)| a)
    }

    pub(crate) fn is_short_of(&self, asset: &AssetId) -> bool {
        self.0.get(asset).is_some_and(|n| *n < 0)
    }

    /// The positive part of the balance.
    pub(crate) fn surplus(&self) -> Result<Value> {
        let mut out = Value::new();
        for (asset, amount) in &self.0 {
            if *amount > 0 {
                out.add_asset(asset, u64::try_from(*amount).map_err(|_| Error::Overflow)?)?;
            }
        }
        Ok(out)
    }
}

impl TxShape {
    pub fn input_value(&self) -> Result<Value> {
        Value::sum(self.inputs.iter().map(|i| &i.utxo.assets))
    }

    pub fn output_value(&self) -> Result<Value> {
        Value::sum(self.outputs.iter().map(|o| &o.assets))
    }

    /// Inputs plus minted must equal outputs plus burned, for every asset.
    /// An output listed twice is rejected, as the ledger would only spend
    /// it once.
    pub fn check_conservation(&self) -> Result<()> {
        let mut spent = BTreeSet::new();
        for input in &self.inputs {
            if !spent.insert(input.utxo.out_ref) {
                return Err(Error::DuplicateInput(input.utxo.out_ref.to_string()))
            }
        }

        let mut balance = Balance::default();
        for input in &self.inputs {
            balance.add(&input.utxo.assets);
        }
        balance.add_mint(&self.mint);
        for output in &self.outputs {
            balance.sub(&output.assets);
        }

        if let Some(asset) = balance.unbalanced() {
            return Err(Error::ValueNotConserved(asset.to_string()))
        }
        Ok(())
    }

    pub fn consumes(&self, out_ref: &OutRef) -> bool {
        self.inputs.iter().any(|i| &i.utxo.out_ref == out_ref)
    }

    pub fn redeemer_for(&self, out_ref: &OutRef) -> Option<&[u8]> {
        self.inputs.iter().find(|i| &i.utxo.out_ref == out_ref)?.redeemer.as_deref()
    }

    pub fn outputs_at<'a>(&'a self, address: &Address) -> impl Iterator<Item = &'a TxOutput> + 'a {
        let address = *address;
        self.outputs.iter().filter(move |o| o.address == address)
    }

    /// Net quantity of `asset` minted (negative when burned).
    pub fn minted(&self, asset: &AssetId) -> i64 {
        self.mint.get(asset).copied().unwrap_or(0)
    }
}
