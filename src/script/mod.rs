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

//! Script identities of a DAO instance.
//!
//! Every validator and minting policy of a DAO is a compiled template with
//! instance parameters applied. The parameters are the seed output, the
//! governance token class, the cosigner cap and the identities of scripts
//! earlier in the dependency chain, so the whole set is a pure function of
//! [`ScriptParams`].

use std::{collections::BTreeMap, fmt, str::FromStr};

use log::{debug, info};

use crate::{
    ledger::{Address, AssetId, OutRef, Utxo},
    plutus::{cbor, script_hash, PlutusData, ScriptHash},
    Error, Result,
};

/// Bit-level flat program handling
pub mod flat;

/// Memoization of derived script sets
pub mod cache;
pub use cache::ScriptCache;

/// Every parameterizable script of a DAO.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptKind {
    GovernorPolicy,
    GovernorValidator,
    StakePolicy,
    StakeValidator,
    ProposalPolicy,
    ProposalValidator,
    AuthorityPolicy,
    TreasuryValidator,
    GovernorMutationEffect,
    TreasurySpendEffect,
    NoOpEffect,
}

impl ScriptKind {
    /// Derivation order. Each kind only depends on kinds before it.
    pub const ORDER: [ScriptKind; 11] = [
        Self::GovernorPolicy,
        Self::AuthorityPolicy,
        Self::StakePolicy,
        Self::ProposalPolicy,
        Self::StakeValidator,
        Self::ProposalValidator,
        Self::GovernorValidator,
        Self::TreasuryValidator,
        Self::GovernorMutationEffect,
        Self::TreasurySpendEffect,
        Self::NoOpEffect,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::GovernorPolicy => "governor_policy",
            Self::GovernorValidator => "governor_validator",
            Self::StakePolicy => "stake_policy",
            Self::StakeValidator => "stake_validator",
            Self::ProposalPolicy => "proposal_policy",
            Self::ProposalValidator => "proposal_validator",
            Self::AuthorityPolicy => "authority_policy",
            Self::TreasuryValidator => "treasury_validator",
            Self::GovernorMutationEffect => "governor_mutation_effect",
            Self::TreasurySpendEffect => "treasury_spend_effect",
            Self::NoOpEffect => "noop_effect",
        }
    }

    /// Kinds whose identities are applied as parameters to this one.
    pub fn dependencies(&self) -> &'static [ScriptKind] {
        match self {
            Self::GovernorPolicy | Self::StakePolicy => &[],
            Self::AuthorityPolicy | Self::ProposalPolicy => &[Self::GovernorPolicy],
            Self::StakeValidator => &[Self::StakePolicy, Self::ProposalPolicy],
            Self::ProposalValidator => {
                &[Self::StakePolicy, Self::StakeValidator, Self::GovernorPolicy, Self::ProposalPolicy]
            }
            Self::GovernorValidator => &[
                Self::ProposalValidator,
                Self::StakePolicy,
                Self::StakeValidator,
                Self::GovernorPolicy,
                Self::ProposalPolicy,
                Self::AuthorityPolicy,
            ],
            Self::TreasuryValidator | Self::TreasurySpendEffect | Self::NoOpEffect => {
                &[Self::AuthorityPolicy]
            }
            Self::GovernorMutationEffect => {
                &[Self::GovernorValidator, Self::GovernorPolicy, Self::AuthorityPolicy]
            }
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScriptKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ORDER
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::ConfigError(format!("unknown script kind {s}")))
    }
}

/// Identity of a DAO instance. Immutable once the DAO exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptParams {
    /// Output consumed when minting the governor state thread token
    pub seed_ref: OutRef,
    /// Governance token class
    pub gov_token: AssetId,
    pub max_cosigners: u64,
}

impl ScriptParams {
    /// `[policy, name]` of the governance token.
    fn gov_token_class(&self) -> PlutusData {
        asset_class(self.gov_token.policy_bytes(), self.gov_token.name_bytes())
    }
}

fn asset_class(policy: Vec<u8>, name: Vec<u8>) -> PlutusData {
    PlutusData::List(vec![PlutusData::Bytes(policy), PlutusData::Bytes(name)])
}

/// Compiled, unparameterized templates keyed by kind.
#[derive(Clone, Debug, Default)]
pub struct ScriptTemplates(BTreeMap<ScriptKind, Vec<u8>>);

impl ScriptTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ScriptKind, template: Vec<u8>) {
        self.0.insert(kind, template);
    }

    pub fn get(&self, kind: ScriptKind) -> Result<&[u8]> {
        self.0.get(&kind).map(Vec::as_slice).ok_or_else(|| Error::MissingTemplate(kind.to_string()))
    }

    pub fn contains(&self, kind: ScriptKind) -> bool {
        self.0.contains_key(&kind)
    }

    /// Build from hex strings keyed by kind name.
    pub fn from_hex_map(map: &BTreeMap<String, String>) -> Result<Self> {
        let mut templates = Self::new();
        for (name, template) in map {
            let kind = ScriptKind::from_str(name)?;
            let bytes = hex::decode(template.trim())
                .map_err(|e| Error::InvalidTemplate(format!("{kind}: {e}")))?;
            templates.insert(kind, bytes);
        }
        Ok(templates)
    }
}

/// A concrete Plutus V2 script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlutusScript {
    pub kind: ScriptKind,
    pub hash: ScriptHash,
    /// Flat program wrapped once in a CBOR byte string
    pub cbor: Vec<u8>,
}

impl PlutusScript {
    pub fn from_program(kind: ScriptKind, program: &[u8]) -> Self {
        let cbor = cbor::wrap_bytes(program);
        let hash = script_hash(&cbor);
        Self { kind, hash, cbor }
    }

    pub fn address(&self) -> Address {
        Address::script(self.hash)
    }
}

/// Identities resolved so far during derivation.
pub type ScriptIds = BTreeMap<ScriptKind, ScriptHash>;

fn resolve(refs: &ScriptIds, needed_by: ScriptKind, kind: ScriptKind) -> Result<ScriptHash> {
    match refs.get(&kind) {
        Some(hash) => Ok(*hash),
        None => Err(Error::ConfigError(format!("{needed_by} requires {kind} to be derived first"))),
    }
}

/// Parameter list applied to the template of `kind`, in application order.
pub fn param_list(kind: ScriptKind, params: &ScriptParams, refs: &ScriptIds) -> Result<Vec<PlutusData>> {
    use ScriptKind::*;
    let id = |k: ScriptKind| resolve(refs, kind, k).map(|h| PlutusData::bytes(h.as_bytes()));
    let token_of = |k: ScriptKind| resolve(refs, kind, k).map(|h| asset_class(h.as_bytes().to_vec(), vec![]));

    let list = match kind {
        GovernorPolicy => {
            let tx_id = PlutusData::constr(0, vec![PlutusData::bytes(params.seed_ref.tx_hash.as_bytes())]);
            let out_ref =
                PlutusData::constr(0, vec![tx_id, PlutusData::integer(params.seed_ref.index)]);
            vec![out_ref]
        }
        StakePolicy => vec![params.gov_token_class()],
        ProposalPolicy | AuthorityPolicy => vec![token_of(GovernorPolicy)?],
        StakeValidator => vec![id(StakePolicy)?, token_of(ProposalPolicy)?, params.gov_token_class()],
        ProposalValidator => vec![
            PlutusData::List(vec![id(StakePolicy)?, id(StakeValidator)?]),
            id(GovernorPolicy)?,
            id(ProposalPolicy)?,
            PlutusData::integer(params.max_cosigners),
        ],
        GovernorValidator => vec![
            id(ProposalValidator)?,
            PlutusData::List(vec![id(StakePolicy)?, id(StakeValidator)?]),
            id(GovernorPolicy)?,
            id(ProposalPolicy)?,
            id(AuthorityPolicy)?,
        ],
        TreasuryValidator | TreasurySpendEffect | NoOpEffect => vec![id(AuthorityPolicy)?],
        GovernorMutationEffect => {
            vec![id(GovernorValidator)?, id(GovernorPolicy)?, id(AuthorityPolicy)?]
        }
    };
    Ok(list)
}

/// Applies instance parameters to templates.
pub struct ScriptParameterizer {
    templates: ScriptTemplates,
}

impl ScriptParameterizer {
    pub fn new(templates: ScriptTemplates) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &ScriptTemplates {
        &self.templates
    }

    /// Derive the script of `kind`. `refs` must hold every dependency.
    pub fn derive(&self, kind: ScriptKind, params: &ScriptParams, refs: &ScriptIds) -> Result<PlutusScript> {
        let template = self.templates.get(kind)?;
        let program = flat::unwrap_program(template);
        let applied = flat::apply_params(&program, &param_list(kind, params, refs)?)
            .map_err(|e| Error::InvalidTemplate(format!("{kind}: {e}")))?;
        let script = PlutusScript::from_program(kind, &applied);
        debug!(target: "agora::script", "Derived {kind}: {}", script.hash);
        Ok(script)
    }

    /// Derive the complete script set in dependency order.
    pub fn derive_all(&self, params: &ScriptParams) -> Result<DaoScripts> {
        let mut refs = ScriptIds::new();
        let mut scripts = BTreeMap::new();
        for kind in ScriptKind::ORDER {
            if kind == ScriptKind::NoOpEffect && !self.templates.contains(kind) {
                continue
            }
            let script = self.derive(kind, params, &refs)?;
            refs.insert(kind, script.hash);
            scripts.insert(kind, script);
        }

        let set = DaoScripts::from_map(params.clone(), scripts)?;
        info!(
            target: "agora::script",
            "Derived DAO scripts: governor={} proposal={} stake={}",
            set.governor_policy.hash, set.proposal_policy.hash, set.stake_policy.hash,
        );
        Ok(set)
    }
}

/// The derived script set of one DAO instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaoScripts {
    pub params: ScriptParams,
    pub governor_policy: PlutusScript,
    pub governor_validator: PlutusScript,
    pub stake_policy: PlutusScript,
    pub stake_validator: PlutusScript,
    pub proposal_policy: PlutusScript,
    pub proposal_validator: PlutusScript,
    pub authority_policy: PlutusScript,
    pub treasury_validator: PlutusScript,
    pub governor_mutation: PlutusScript,
    pub treasury_spend: PlutusScript,
    pub noop: Option<PlutusScript>,
}

impl DaoScripts {
    fn from_map(params: ScriptParams, mut map: BTreeMap<ScriptKind, PlutusScript>) -> Result<Self> {
        let mut take = |kind: ScriptKind| map.remove(&kind).ok_or_else(|| Error::MissingTemplate(format!("{kind}")));
        Ok(Self {
            governor_policy: take(ScriptKind::GovernorPolicy)?,
            governor_validator: take(ScriptKind::GovernorValidator)?,
            stake_policy: take(ScriptKind::StakePolicy)?,
            stake_validator: take(ScriptKind::StakeValidator)?,
            proposal_policy: take(ScriptKind::ProposalPolicy)?,
            proposal_validator: take(ScriptKind::ProposalValidator)?,
            authority_policy: take(ScriptKind::AuthorityPolicy)?,
            treasury_validator: take(ScriptKind::TreasuryValidator)?,
            governor_mutation: take(ScriptKind::GovernorMutationEffect)?,
            treasury_spend: take(ScriptKind::TreasurySpendEffect)?,
            noop: take(ScriptKind::NoOpEffect).ok(),
            params,
        })
    }

    pub fn get(&self, kind: ScriptKind) -> Option<&PlutusScript> {
        let script = match kind {
            ScriptKind::GovernorPolicy => &self.governor_policy,
            ScriptKind::GovernorValidator => &self.governor_validator,
            ScriptKind::StakePolicy => &self.stake_policy,
            ScriptKind::StakeValidator => &self.stake_validator,
            ScriptKind::ProposalPolicy => &self.proposal_policy,
            ScriptKind::ProposalValidator => &self.proposal_validator,
            ScriptKind::AuthorityPolicy => &self.authority_policy,
            ScriptKind::TreasuryValidator => &self.treasury_validator,
            ScriptKind::GovernorMutationEffect => &self.governor_mutation,
            ScriptKind::TreasurySpendEffect => &self.treasury_spend,
            ScriptKind::NoOpEffect => return self.noop.as_ref(),
        };
        Some(script)
    }

    /// Script whose hash is `hash`, if it belongs to this DAO.
    pub fn by_hash(&self, hash: &ScriptHash) -> Option<&PlutusScript> {
        self.iter().find(|s| &s.hash == hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlutusScript> {
        ScriptKind::ORDER.into_iter().filter_map(move |k| self.get(k))
    }

    /// Governor state thread token.
    pub fn governor_token(&self) -> AssetId {
        AssetId::Native { policy: self.governor_policy.hash, name: vec![] }
    }

    /// Proposal state thread token.
    pub fn proposal_token(&self) -> AssetId {
        AssetId::Native { policy: self.proposal_policy.hash, name: vec![] }
    }

    /// Stake state thread token, named after the stake validator.
    pub fn stake_token(&self) -> AssetId {
        AssetId::Native {
            policy: self.stake_policy.hash,
            name: self.stake_validator.hash.as_bytes().to_vec(),
        }
    }

    /// Governance authority token.
    pub fn gat(&self) -> AssetId {
        AssetId::Native { policy: self.authority_policy.hash, name: vec![] }
    }

    pub fn gov_token(&self) -> &AssetId {
        &self.params.gov_token
    }

    pub fn governor_address(&self) -> Address {
        self.governor_validator.address()
    }

    pub fn proposal_address(&self) -> Address {
        self.proposal_validator.address()
    }

    pub fn stake_address(&self) -> Address {
        self.stake_validator.address()
    }

    pub fn treasury_address(&self) -> Address {
        self.treasury_validator.address()
    }
}

/// Outputs holding deployed reference scripts, keyed by kind. Transactions
/// read a script from its reference output when one is known and attach
/// the script itself otherwise.
#[derive(Clone, Debug, Default)]
pub struct ScriptRefs(BTreeMap<ScriptKind, Utxo>);

impl ScriptRefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ScriptKind, utxo: Utxo) {
        self.0.insert(kind, utxo);
    }

    pub fn get(&self, kind: ScriptKind) -> Option<&Utxo> {
        self.0.get(&kind)
    }

    /// Pick out the outputs of `utxos` that carry one of the scripts in `scripts`.
    pub fn discover(scripts: &DaoScripts, utxos: &[Utxo]) -> Self {
        let mut refs = Self::new();
        for utxo in utxos {
            let Some(hash) = utxo.script_ref else { continue };
            if let Some(script) = scripts.by_hash(&hash) {
                refs.insert(script.kind, utxo.clone());
            }
        }
        refs
    }
}
