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

//! Effects of proposal outcomes.
//!
//! A proposal only carries hashes of its effect payloads. The payloads are
//! archived off-chain when the proposal is created and presented again,
//! checked against their hash, when the winning outcome receives its
//! governance authority tokens (GATs). Each GAT output sits at an effect
//! script and is burned when that effect executes.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::{
    error::TransitionError,
    ledger::{Address, Archive, AssetId, TxOutput, Value},
    model::{EffectMap, EffectTarget, ProposalDatum, ResultTag},
    plutus::{datum_hash, DatumHash, PlutusData, ScriptHash, ToPlutusData},
    state::proposal::winning_outcome,
    Error, Result,
};

/// One effect of an outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectPayload {
    /// Effect script receiving the GAT
    pub script: ScriptHash,
    /// Datum the GAT output carries
    pub datum: PlutusData,
    /// Companion script the effect relies on, if any
    pub companion: Option<ScriptHash>,
}

/// Caller-supplied menu of outcomes and their effects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EffectSpec(BTreeMap<ResultTag, Vec<EffectPayload>>);

impl EffectSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an outcome without effects.
    pub fn outcome(mut self, tag: ResultTag) -> Self {
        self.0.entry(tag).or_default();
        self
    }

    pub fn effect<D: ToPlutusData>(mut self, tag: ResultTag, script: ScriptHash, datum: &D) -> Self {
        let payload = EffectPayload { script, datum: datum.to_plutus_data(), companion: None };
        self.0.entry(tag).or_default().push(payload);
        self
    }

    pub fn with_payload(mut self, tag: ResultTag, payload: EffectPayload) -> Self {
        self.0.entry(tag).or_default().push(payload);
        self
    }
}

/// Hash commitments of an [`EffectSpec`] plus the payload bytes by hash.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Commitments {
    pub effects: EffectMap,
    pub payloads: BTreeMap<DatumHash, Vec<u8>>,
}

/// Turn an effect menu into on-chain commitments. Outcome 0, the no-op
/// branch, is added without effects when the menu omits it.
pub fn commit(spec: &EffectSpec) -> Result<Commitments> {
    let mut out = Commitments::default();
    out.effects.insert(ResultTag(0), BTreeMap::new());

    for (tag, payloads) in &spec.0 {
        let targets = out.effects.entry(*tag).or_default();
        for payload in payloads {
            let cbor = payload.datum.to_cbor();
            let hash = datum_hash(&cbor);
            let target = EffectTarget { datum_hash: hash, script: payload.companion };
            if targets.insert(payload.script, target).is_some() {
                return Err(Error::MalformedDatum(format!(
                    "outcome {tag} lists effect script {} twice",
                    payload.script
                )))
            }
            out.payloads.insert(hash, cbor);
        }
    }

    debug!(
        target: "agora::effect",
        "Committed {} outcomes with {} payloads", out.effects.len(), out.payloads.len(),
    );
    Ok(out)
}

/// Check `datum` against a committed hash.
pub fn verify_payload(expected: &DatumHash, datum: &[u8]) -> Result<()> {
    if datum_hash(datum) != *expected {
        return Err(Error::EffectPayloadMismatch(expected.to_string()))
    }
    Ok(())
}

/// Store every payload, returning the archive content id per hash.
pub async fn archive_payloads(
    archive: &dyn Archive,
    payloads: &BTreeMap<DatumHash, Vec<u8>>,
) -> Result<BTreeMap<DatumHash, String>> {
    let mut ids = BTreeMap::new();
    for (hash, datum) in payloads {
        let id = archive.store(datum).await?;
        debug!(target: "agora::effect", "Archived payload {hash} as {id}");
        ids.insert(*hash, id);
    }
    Ok(ids)
}

/// Fetch a payload back from the archive, checking it against its hash.
pub async fn fetch_payload(archive: &dyn Archive, content_id: &str, expected: &DatumHash) -> Result<Vec<u8>> {
    let datum = archive.fetch(content_id).await?;
    verify_payload(expected, &datum)?;
    Ok(datum)
}

/// Outputs granting one GAT to each effect script of `outcome`. Each
/// output carries the committed payload inline.
pub fn gat_outputs(
    proposal: &ProposalDatum,
    outcome: ResultTag,
    gat: &AssetId,
    min_ada: u64,
    payloads: &BTreeMap<DatumHash, Vec<u8>>,
) -> Result<Vec<TxOutput>> {
    let targets = proposal
        .effects
        .get(&outcome)
        .ok_or(Error::InvalidTransition(TransitionError::UnknownOutcome(outcome.0)))?;

    let mut outputs = Vec::with_capacity(targets.len());
    for (script, target) in targets {
        let datum = payloads
            .get(&target.datum_hash)
            .ok_or_else(|| Error::MissingEffectPayload(target.datum_hash.to_string()))?;
        verify_payload(&target.datum_hash, datum)?;

        let assets = Value::lovelace(min_ada).with(gat.clone(), 1);
        outputs.push(TxOutput::new(Address::script(*script), assets).with_datum(datum.clone()));
    }
    Ok(outputs)
}

/// Winner of a finishing proposal and the GAT outputs it earns.
pub fn finalize(
    proposal: &ProposalDatum,
    gat: &AssetId,
    min_ada: u64,
    payloads: &BTreeMap<DatumHash, Vec<u8>>,
) -> Result<(ResultTag, Vec<TxOutput>)> {
    let winner = winning_outcome(&proposal.votes)?;
    let outputs = gat_outputs(proposal, winner, gat, min_ada, payloads)?;
    info!(
        target: "agora::effect",
        "Proposal {} executes outcome {winner} with {} GATs", proposal.id, outputs.len(),
    );
    Ok((winner, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{governor::tests::governor, proposal::tests::proposal, MutateGovernorDatum},
        plutus,
    };
    use async_trait::async_trait;
    use smol::lock::Mutex;

    fn script(b: u8) -> ScriptHash {
        ScriptHash::from_slice(&[b; 28]).unwrap()
    }

    fn gat() -> AssetId {
        AssetId::native(script(0x77), b"").unwrap()
    }

    fn mutation() -> MutateGovernorDatum {
        let old = governor();
        let new = crate::model::GovernorDatum { proposals_per_stake: 3, ..old.clone() };
        MutateGovernorDatum { old, new }
    }

    #[derive(Default)]
    struct MemArchive(Mutex<BTreeMap<String, Vec<u8>>>);

    #[async_trait]
    impl Archive for MemArchive {
        async fn store(&self, content: &[u8]) -> Result<String> {
            let id = blake3::hash(content).to_hex().to_string();
            self.0.lock().await.insert(id.clone(), content.to_vec());
            Ok(id)
        }

        async fn fetch(&self, content_id: &str) -> Result<Vec<u8>> {
            let store = self.0.lock().await;
            store.get(content_id).cloned().ok_or_else(|| Error::ArchiveError(content_id.to_string()))
        }
    }

    #[test]
    fn commitments_hash_payloads() {
        let spec = EffectSpec::new().effect(ResultTag(1), script(2), &mutation());
        let c = commit(&spec).unwrap();

        assert_eq!(c.effects.len(), 2);
        assert!(c.effects[&ResultTag(0)].is_empty());
        let target = c.effects[&ResultTag(1)][&script(2)];
        assert_eq!(target.datum_hash, datum_hash(&plutus::encode(&mutation())));
        assert_eq!(c.payloads[&target.datum_hash], plutus::encode(&mutation()));

        let dup = spec.effect(ResultTag(1), script(2), &PlutusData::unit());
        assert!(matches!(commit(&dup), Err(Error::MalformedDatum(_))));
    }

    #[test]
    fn archive_roundtrip_is_verified() {
        smol::block_on(async {
            let archive = MemArchive::default();
            let c = commit(&EffectSpec::new().effect(ResultTag(1), script(2), &mutation())).unwrap();
            let ids = archive_payloads(&archive, &c.payloads).await.unwrap();

            let (hash, id) = ids.iter().next().unwrap();
            assert_eq!(fetch_payload(&archive, id, hash).await.unwrap(), c.payloads[hash]);

            // Tampered content
            archive.0.lock().await.insert(id.clone(), vec![0x80]);
            assert!(matches!(fetch_payload(&archive, id, hash).await, Err(Error::EffectPayloadMismatch(_))));
        });
    }

    #[test]
    fn gat_outputs_for_winner() {
        let mut p = proposal(vec![]);
        let spec = EffectSpec::new()
            .effect(ResultTag(1), script(0xee), &mutation())
            .effect(ResultTag(1), script(0x01), &PlutusData::unit());
        let c = commit(&spec).unwrap();
        p.effects = c.effects.clone();
        p.votes.insert(ResultTag(1), 5);

        let (winner, outputs) = finalize(&p, &gat(), 2_000_000, &c.payloads).unwrap();
        assert_eq!(winner, ResultTag(1));
        assert_eq!(outputs.len(), 2);
        // Inner keys iterate in byte order
        assert_eq!(outputs[0].address, Address::script(script(0x01)));
        assert_eq!(outputs[1].address, Address::script(script(0xee)));
        for o in &outputs {
            assert_eq!(o.assets, Value::lovelace(2_000_000).with(gat(), 1));
        }
        assert_eq!(outputs[1].datum.as_deref(), Some(plutus::encode(&mutation()).as_slice()));

        // The no-op outcome mints nothing
        assert!(gat_outputs(&p, ResultTag(0), &gat(), 2_000_000, &c.payloads).unwrap().is_empty());

        assert!(matches!(
            gat_outputs(&p, ResultTag(1), &gat(), 2_000_000, &BTreeMap::new()),
            Err(Error::MissingEffectPayload(_))
        ));
    }
}
