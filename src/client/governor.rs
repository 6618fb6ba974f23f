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

use super::{Dao, Wallet};
use crate::{
    ledger::{Address, TxOutput, Utxo, Value},
    model::GovernorDatum,
    plutus,
    script::ScriptKind,
    tx::{builder::unit_redeemer, TxShape},
    util::time::Timestamp,
    Error, Result,
};

/// Deploy a DAO: spend the seed output, mint the governor token and lock
/// it at the governor validator with the initial datum.
pub struct DaoCreateGovernorCall {
    /// The output the governor policy is parameterized by
    pub seed: Utxo,
    pub governor: GovernorDatum,
    /// When set, reference copies of the proposal and stake validators are
    /// deployed to this address.
    pub reference_address: Option<Address>,
    pub now: Timestamp,
}

impl DaoCreateGovernorCall {
    pub fn make(self, dao: &Dao, wallet: &Wallet) -> Result<TxShape> {
        debug!(target: "agora::client::governor", "build()");
        let scripts = dao.scripts;

        if self.seed.out_ref != scripts.params.seed_ref {
            return Err(Error::ConfigError(format!(
                "seed {} does not match the DAO seed {}",
                self.seed.out_ref, scripts.params.seed_ref
            )))
        }
        self.governor.validate()?;

        let token = scripts.governor_token();
        let assets = Value::lovelace(dao.config.min_ada).with(token.clone(), 1);
        let output = TxOutput::new(scripts.governor_address(), assets)
            .with_datum(plutus::encode(&self.governor));

        let mut tx = dao
            .builder(&[ScriptKind::GovernorPolicy])
            .collect_wallet(self.seed)?
            .mint(token, 1, &unit_redeemer())?
            .pay_to(output)
            .valid_range(dao.config.validity(self.now)?);

        if let Some(address) = self.reference_address {
            for script in [&scripts.proposal_validator, &scripts.stake_validator] {
                debug!(target: "agora::client::governor", "Deploying reference {}", script.kind);
                tx = tx.pay_to(
                    TxOutput::new(address, Value::lovelace(dao.config.reference_ada))
                        .with_script_ref(script.hash),
                );
            }
        }

        let shape = tx.complete(wallet.change_address, &wallet.utxos)?;
        info!(
            target: "agora::client::governor",
            "Governor at {} with token {}", scripts.governor_address(), scripts.governor_token(),
        );
        Ok(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::tests::{out_ref, owner, scripts, wallet},
        config::BuilderConfig,
        model::governor::tests::governor,
        script::ScriptRefs,
    };

    fn seed(scripts: &crate::script::DaoScripts) -> Utxo {
        Utxo {
            out_ref: scripts.params.seed_ref,
            address: Address::from(owner()),
            assets: Value::lovelace(5_000_000),
            datum: None,
            script_ref: None,
        }
    }

    #[test]
    fn creates_governor() {
        let scripts = scripts();
        let refs = ScriptRefs::new();
        let config = BuilderConfig::default();
        let dao = Dao::new(&scripts, &refs, &config);

        let call = DaoCreateGovernorCall {
            seed: seed(&scripts),
            governor: governor(),
            reference_address: Some(Address::from(owner())),
            now: Timestamp(1_700_000_000_000),
        };
        let shape = call.make(&dao, &wallet(&scripts)).unwrap();

        assert!(shape.consumes(&scripts.params.seed_ref));
        assert_eq!(shape.minted(&scripts.governor_token()), 1);
        let outputs: Vec<_> = shape.outputs_at(&scripts.governor_address()).collect();
        assert_eq!(outputs.len(), 1);
        let datum: GovernorDatum = plutus::decode(outputs[0].datum.as_ref().unwrap()).unwrap();
        assert_eq!(datum, governor());

        let refs: Vec<_> = shape.outputs.iter().filter_map(|o| o.script_ref).collect();
        assert_eq!(refs, vec![scripts.proposal_validator.hash, scripts.stake_validator.hash]);
        assert!(shape.scripts.iter().any(|s| s.kind == ScriptKind::GovernorPolicy));
        shape.check_conservation().unwrap();
    }

    #[test]
    fn rejects_foreign_seed() {
        let scripts = scripts();
        let refs = ScriptRefs::new();
        let config = BuilderConfig::default();
        let dao = Dao::new(&scripts, &refs, &config);

        let mut other = seed(&scripts);
        other.out_ref = out_ref(0x55, 0);
        let call = DaoCreateGovernorCall {
            seed: other,
            governor: governor(),
            reference_address: None,
            now: Timestamp(0),
        };
        assert!(matches!(call.make(&dao, &wallet(&scripts)), Err(Error::ConfigError(_))));

        let mut bad = governor();
        bad.max_proposal_valid_length = 1;
        let call = DaoCreateGovernorCall {
            seed: seed(&scripts),
            governor: bad,
            reference_address: None,
            now: Timestamp(1_700_000_000_000),
        };
        assert!(matches!(call.make(&dao, &wallet(&scripts)), Err(Error::ProposalLengthTooShort(1))));
    }
}
