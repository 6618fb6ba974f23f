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

use log::debug;

use super::{Balance, TxInput, TxShape};
use crate::{
    ledger::{Address, AssetId, TxOutput, Utxo},
    plutus::{KeyHash, PlutusData, ToPlutusData},
    script::{DaoScripts, PlutusScript, ScriptKind, ScriptRefs},
    util::time::ValidityRange,
    Error, Result,
};

/// Accumulates a [`TxShape`]. Every step consumes the builder and returns
/// the extended one, so a partially built transaction is never shared.
#[derive(Clone, Debug, Default)]
pub struct TxBuilder {
    shape: TxShape,
}

impl TxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend a script output with `redeemer`.
    pub fn collect_from<R: ToPlutusData>(self, utxo: Utxo, redeemer: &R) -> Result<Self> {
        let redeemer = Some(redeemer.to_plutus_data().to_cbor());
        self.collect(TxInput { utxo, redeemer })
    }

    /// Spend a wallet output.
    pub fn collect_wallet(self, utxo: Utxo) -> Result<Self> {
        self.collect(TxInput { utxo, redeemer: None })
    }

    fn collect(mut self, input: TxInput) -> Result<Self> {
        if self.shape.consumes(&input.utxo.out_ref) {
            return Err(Error::DuplicateInput(input.utxo.out_ref.to_string()))
        }
        self.shape.inputs.push(input);
        Ok(self)
    }

    pub fn read_from(mut self, utxo: Utxo) -> Self {
        if !self.shape.reference_inputs.iter().any(|u| u.out_ref == utxo.out_ref) {
            self.shape.reference_inputs.push(utxo);
        }
        self
    }

    pub fn pay_to(mut self, output: TxOutput) -> Self {
        self.shape.outputs.push(output);
        self
    }

    /// Mint (`amount > 0`) or burn (`amount < 0`) a native asset. Quantities
    /// of the same asset accumulate.
    pub fn mint<R: ToPlutusData>(mut self, asset: AssetId, amount: i64, redeemer: &R) -> Result<Self> {
        let Some(policy) = asset.policy() else {
            return Err(Error::ValueNotConserved("ada cannot be minted".to_string()))
        };

        let entry = self.shape.mint.entry(asset.clone()).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(Error::Overflow)?;
        if *entry == 0 {
            self.shape.mint.remove(&asset);
        }
        self.shape.mint_redeemers.insert(policy, redeemer.to_plutus_data().to_cbor());
        Ok(self)
    }

    pub fn valid_range(mut self, range: ValidityRange) -> Self {
        self.shape.validity = Some(range);
        self
    }

    pub fn add_signer(mut self, key: KeyHash) -> Self {
        self.shape.required_signers.insert(key);
        self
    }

    pub fn attach_script(mut self, script: &PlutusScript) -> Self {
        if !self.shape.scripts.iter().any(|s| s.hash == script.hash) {
            self.shape.scripts.push(script.clone());
        }
        self
    }

    /// Provide `script` from its reference output if one is known, else
    /// attach it.
    pub fn use_script(self, script: &PlutusScript, refs: &ScriptRefs) -> Self {
        match refs.get(script.kind) {
            Some(utxo) => self.read_from(utxo.clone()),
            None => self.attach_script(script),
        }
    }

    pub fn shape(&self) -> &TxShape {
        &self.shape
    }

    /// Balance the transaction. Outputs of `funding` are added in ascending
    /// lovelace order until no asset is short, then the exact surplus goes
    /// to one change output at `change_address`.
    pub fn complete(mut self, change_address: Address, funding: &[Utxo]) -> Result<TxShape> {
        let mut balance = Balance::default();
        for input in &self.shape.inputs {
            balance.add(&input.utxo.assets);
        }
        balance.add_mint(&self.shape.mint);
        for output in &self.shape.outputs {
            balance.sub(&output.assets);
        }

        let mut candidates: Vec<&Utxo> =
            funding.iter().filter(|u| !self.shape.consumes(&u.out_ref)).collect();
        candidates.sort_by_key(|u| (u.assets.coin(), u.out_ref));

        for utxo in candidates {
            if balance.deficit().is_none() {
                break
            }
            if !utxo.assets.iter().any(|(asset, _)| balance.is_short_of(asset)) {
                continue
            }
            balance.add(&utxo.assets);
            self.shape.inputs.push(TxInput { utxo: utxo.clone(), redeemer: None });
        }

        if let Some(asset) = balance.deficit() {
            return Err(Error::InsufficientFunds(asset.to_string()))
        }

        let change = balance.surplus()?;
        if !change.is_empty() {
            debug!(target: "agora::tx::builder", "Change to {change_address}: {change}");
            self.shape.outputs.push(TxOutput::new(change_address, change));
        }

        self.shape.check_conservation()?;
        Ok(self.shape)
    }
}

/// Redeemer for spends and mints that take no argument.
pub fn unit_redeemer() -> PlutusData {
    PlutusData::unit()
}

/// Attach the scripts of `kinds` from `scripts`, preferring reference outputs.
pub fn use_scripts(
    builder: TxBuilder,
    scripts: &DaoScripts,
    refs: &ScriptRefs,
    kinds: &[ScriptKind],
) -> TxBuilder {
    kinds.iter().filter_map(|k| scripts.get(*k)).fold(builder, |b, s| b.use_script(s, refs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::{OutRef, Value},
        plutus::{ScriptHash, TxHash},
    };

    fn token(b: u8) -> AssetId {
        AssetId::native(ScriptHash::from_slice(&[b; 28]).unwrap(), b"").unwrap()
    }

    fn wallet() -> Address {
        Address::key(KeyHash::from_slice(&[0xaa; 28]).unwrap())
    }

    fn utxo(n: u8, assets: Value) -> Utxo {
        Utxo {
            out_ref: OutRef { tx_hash: TxHash::from_slice(&[n; 32]).unwrap(), index: 0 },
            address: wallet(),
            assets,
            datum: None,
            script_ref: None,
        }
    }

    #[test]
    fn exact_change() {
        let script = Address::script(ScriptHash::from_slice(&[1; 28]).unwrap());
        let funding = [
            utxo(1, Value::lovelace(10_000_000)),
            utxo(2, Value::lovelace(3_000_000)),
            utxo(3, Value::lovelace(1_000_000).with(token(9), 50)),
        ];

        let shape = TxBuilder::new()
            .mint(token(7), 1, &unit_redeemer())
            .unwrap()
            .pay_to(TxOutput::new(script, Value::lovelace(2_000_000).with(token(7), 1).with(token(9), 20)))
            .complete(wallet(), &funding)
            .unwrap();

        // Smallest first: utxo 3 covers the token and 1 ada, utxo 2 the rest
        let picked: Vec<u8> = shape.inputs.iter().map(|i| i.utxo.out_ref.tx_hash.0[0]).collect();
        assert_eq!(picked, vec![3, 2]);

        let change = shape.outputs.last().unwrap();
        assert_eq!(change.address, wallet());
        assert_eq!(change.assets, Value::lovelace(2_000_000).with(token(9), 30));
        assert!(shape.check_conservation().is_ok());
    }

    #[test]
    fn insufficient_funds() {
        let script = Address::script(ScriptHash::from_slice(&[1; 28]).unwrap());
        let err = TxBuilder::new()
            .pay_to(TxOutput::new(script, Value::lovelace(5).with(token(9), 1)))
            .complete(wallet(), &[utxo(1, Value::lovelace(100))])
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));
    }

    #[test]
    fn burns_balance_inputs() {
        let stake = utxo(4, Value::lovelace(2_000_000).with(token(7), 1));
        let shape = TxBuilder::new()
            .collect_from(stake, &unit_redeemer())
            .unwrap()
            .mint(token(7), -1, &unit_redeemer())
            .unwrap()
            .complete(wallet(), &[])
            .unwrap();

        assert_eq!(shape.minted(&token(7)), -1);
        assert_eq!(shape.outputs.len(), 1);
        assert_eq!(shape.outputs[0].assets, Value::lovelace(2_000_000));
    }

    #[test]
    fn mint_accumulates_and_cancels() {
        let b = TxBuilder::new().mint(token(7), 2, &unit_redeemer()).unwrap();
        let b = b.mint(token(7), -2, &unit_redeemer()).unwrap();
        assert!(b.shape().mint.is_empty());
        assert!(TxBuilder::new().mint(AssetId::Lovelace, 1, &unit_redeemer()).is_err());
    }

    #[test]
    fn builders_do_not_share_state() {
        let base = TxBuilder::new().collect_wallet(utxo(1, Value::lovelace(10))).unwrap();
        let a = base.clone().pay_to(TxOutput::new(wallet(), Value::lovelace(10)));
        assert_eq!(base.shape().outputs.len(), 0);
        assert_eq!(a.shape().outputs.len(), 1);
    }

    #[test]
    fn output_spent_once() {
        let stake = utxo(4, Value::lovelace(2_000_000).with(token(7), 1));
        let b = TxBuilder::new().collect_from(stake.clone(), &unit_redeemer()).unwrap();
        assert!(matches!(b.clone().collect_from(stake.clone(), &unit_redeemer()), Err(Error::DuplicateInput(_))));
        assert!(matches!(b.collect_wallet(stake.clone()), Err(Error::DuplicateInput(_))));

        // A shape assembled by hand is caught by the conservation check
        let mut shape = TxShape::default();
        for _ in 0..2 {
            shape.inputs.push(TxInput { utxo: stake.clone(), redeemer: None });
        }
        shape.outputs.push(TxOutput::new(wallet(), Value::lovelace(4_000_000).with(token(7), 2)));
        assert!(matches!(shape.check_conservation(), Err(Error::DuplicateInput(_))));
    }

    #[test]
    fn outputs_at_takes_temporary_address() {
        let shape = TxBuilder::new()
            .pay_to(TxOutput::new(wallet(), Value::lovelace(10)))
            .pay_to(TxOutput::new(Address::script(ScriptHash::from_slice(&[1; 28]).unwrap()), Value::lovelace(5)))
            .shape()
            .clone();
        assert_eq!(shape.outputs_at(&wallet()).count(), 1);
    }

    #[test]
    fn conservation_detects_imbalance() {
        let mut shape = TxShape::default();
        shape.inputs.push(TxInput { utxo: utxo(1, Value::lovelace(10)), redeemer: None });
        shape.outputs.push(TxOutput::new(wallet(), Value::lovelace(9)));
        assert!(matches!(shape.check_conservation(), Err(Error::ValueNotConserved(_))));
    }
}
