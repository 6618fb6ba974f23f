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

//! Async façade over the ledger collaborator.
//!
//! Every action fetches a fresh snapshot of the outputs it touches while
//! holding the locks of those resources, builds the transaction with the
//! matching [`crate::client`] call and hands the unsigned shape back.
//! Signing stays outside; [`DaoService::submit`] records the signed
//! transaction with the persistence collaborator.

use std::{collections::BTreeMap, sync::Arc};

use log::{debug, info};
use smol::lock::RwLock;

use crate::{
    client::{
        Dao, DaoAdvanceCall, DaoCosignCall, DaoCreateGovernorCall, DaoMutateGovernorCall,
        DaoProposeCall, DaoRetractCall, DaoStakeCreateCall, DaoStakeDelegateCall,
        DaoStakeDestroyCall, DaoStakeUpdateCall, DaoTreasuryWithdrawCall, DaoUnlockCall,
        DaoVoteCall, Wallet,
    },
    config::BuilderConfig,
    effect::{self, EffectSpec},
    ledger::{Address, Archive, Confirmation, Ledger, OutRef, Persistence, RecordKey, Utxo},
    model::{Credential, GovernorDatum, ResultTag, Status},
    plutus::{DatumHash, TxHash},
    script::{cache::ScriptCache, DaoScripts, ScriptParams, ScriptRefs},
    tx::TxShape,
    Error, Result,
};

/// Per-resource build serialization
pub mod locks;
pub use locks::{Resource, ResourceGuard, ResourceLocks};

/// Read-only queries
pub mod query;
pub use query::{CosignerInfo, ProposalSummary};

/// Atomic pointer to a DAO service.
pub type DaoServicePtr = Arc<DaoService>;

/// A proposal built by [`DaoService::propose`].
#[derive(Clone, Debug)]
pub struct Proposed {
    pub tx: TxShape,
    pub proposal_id: u64,
    /// Archive content id of every effect payload, by committed hash
    pub payloads: BTreeMap<DatumHash, String>,
}

/// Control plane of one DAO instance.
pub struct DaoService {
    /// Identifier used for off-chain bookkeeping
    pub dao_id: String,
    params: ScriptParams,
    config: BuilderConfig,
    cache: Arc<ScriptCache>,
    refs: RwLock<ScriptRefs>,
    ledger: Arc<dyn Ledger>,
    archive: Arc<dyn Archive>,
    persistence: Arc<dyn Persistence>,
    locks: ResourceLocks,
}

impl DaoService {
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        dao_id: &str,
        params: ScriptParams,
        config: BuilderConfig,
        cache: Arc<ScriptCache>,
        ledger: Arc<dyn Ledger>,
        archive: Arc<dyn Archive>,
        persistence: Arc<dyn Persistence>,
    ) -> Result<DaoServicePtr> {
        info!(target: "agora::service", "Initializing DAO service {dao_id}");
        // Fail early on missing or broken templates
        let scripts = cache.get(&params).await?;
        info!(target: "agora::service", "Governor validator at {}", scripts.governor_address());

        Ok(Arc::new(Self {
            dao_id: dao_id.to_string(),
            params,
            config,
            cache,
            refs: RwLock::new(ScriptRefs::new()),
            ledger,
            archive,
            persistence,
            locks: ResourceLocks::new(),
        }))
    }

    pub async fn scripts(&self) -> Result<Arc<DaoScripts>> {
        self.cache.get(&self.params).await
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Look for deployed reference scripts at `address`.
    pub async fn discover_refs(&self, address: &Address) -> Result<()> {
        let scripts = self.scripts().await?;
        let utxos = self.ledger.fetch_utxos_at(address).await?;
        let refs = ScriptRefs::discover(&scripts, &utxos);
        *self.refs.write().await = refs;
        Ok(())
    }

    /// Build with the current scripts and reference outputs.
    async fn build<T>(&self, f: impl FnOnce(&Dao) -> Result<T>) -> Result<T> {
        let scripts = self.scripts().await?;
        let refs = self.refs.read().await;
        let dao = Dao::new(&scripts, &refs, &self.config);
        f(&dao)
    }

    fn resources(outputs: &[OutRef]) -> Vec<Resource> {
        outputs.iter().copied().map(Resource::Output).collect()
    }

    /// Fetch one output, failing if it is spent.
    async fn utxo(&self, out_ref: OutRef) -> Result<Utxo> {
        let mut utxos = self.utxos_by_ref(&[out_ref]).await?;
        utxos.pop().ok_or_else(|| Error::MissingUtxo(out_ref.to_string()))
    }

    // ==================
    // Governor
    // ==================

    pub async fn create_governor(
        &self,
        governor: GovernorDatum,
        reference_address: Option<Address>,
        wallet: &Wallet,
    ) -> Result<TxShape> {
        let _guard = self.locks.acquire(vec![Resource::Governor]).await;
        let seed = self.utxo(self.params.seed_ref).await?;
        let now = self.ledger.current_time().await?;

        let call = DaoCreateGovernorCall { seed, governor, reference_address, now };
        self.build(|dao| call.make(dao, wallet)).await
    }

    // ==================
    // Proposals
    // ==================

    /// Create a proposal backed by `stake` and archive its effect payloads.
    pub async fn propose(&self, stake: OutRef, effects: EffectSpec, wallet: &Wallet) -> Result<Proposed> {
        let _guard = self.locks.acquire(vec![Resource::Governor, Resource::Output(stake)]).await;
        let (governor, datum) = self.governor().await?;
        let stake = self.utxo(stake).await?;
        let now = self.ledger.current_time().await?;

        let call = DaoProposeCall { governor, stake, effects, now };
        let (tx, commitments) = self.build(|dao| call.make(dao, wallet)).await?;
        let payloads = effect::archive_payloads(self.archive.as_ref(), &commitments.payloads).await?;

        info!(target: "agora::service", "Built proposal {} for {}", datum.next_proposal_id, self.dao_id);
        Ok(Proposed { tx, proposal_id: datum.next_proposal_id, payloads })
    }

    pub async fn cosign(&self, id: u64, stake: OutRef, wallet: &Wallet) -> Result<TxShape> {
        let _guard = self.locks.acquire(vec![Resource::Proposal(id), Resource::Output(stake)]).await;
        let (proposal, _) = self.proposal(id).await?;
        let stake = self.utxo(stake).await?;
        let now = self.ledger.current_time().await?;

        let call = DaoCosignCall { proposal, stake, now };
        self.build(|dao| call.make(dao, wallet)).await
    }

    pub async fn vote(&self, id: u64, stakes: &[OutRef], result: ResultTag, wallet: &Wallet) -> Result<TxShape> {
        let mut resources = Self::resources(stakes);
        resources.push(Resource::Proposal(id));
        let _guard = self.locks.acquire(resources).await;

        let (proposal, _) = self.proposal(id).await?;
        let stakes = self.utxos_by_ref(stakes).await?;
        let now = self.ledger.current_time().await?;

        let call = DaoVoteCall { proposal, stakes, result, now };
        self.build(|dao| call.make(dao, wallet)).await
    }

    pub async fn retract(&self, id: u64, stakes: &[OutRef], wallet: &Wallet) -> Result<TxShape> {
        let mut resources = Self::resources(stakes);
        resources.push(Resource::Proposal(id));
        let _guard = self.locks.acquire(resources).await;

        let (proposal, _) = self.proposal(id).await?;
        let stakes = self.utxos_by_ref(stakes).await?;
        let now = self.ledger.current_time().await?;

        let call = DaoRetractCall { proposal, stakes, now };
        self.build(|dao| call.make(dao, wallet)).await
    }

    pub async fn unlock(&self, id: u64, stakes: &[OutRef], wallet: &Wallet) -> Result<TxShape> {
        let mut resources = Self::resources(stakes);
        resources.push(Resource::Proposal(id));
        let _guard = self.locks.acquire(resources).await;

        let (proposal, _) = self.proposal(id).await?;
        let stakes = self.utxos_by_ref(stakes).await?;
        let now = self.ledger.current_time().await?;

        let call = DaoUnlockCall { proposal, stakes, now };
        self.build(|dao| call.make(dao, wallet)).await
    }

    /// Advance proposal `id`. Cosigner stakes are looked up when leaving
    /// `Draft`; the governor and the archived payloads are fetched when the
    /// proposal may execute.
    pub async fn advance(
        &self,
        id: u64,
        payload_ids: &BTreeMap<DatumHash, String>,
        wallet: &Wallet,
    ) -> Result<TxShape> {
        let _guard = self.locks.acquire(vec![Resource::Governor, Resource::Proposal(id)]).await;
        let (proposal, datum) = self.proposal(id).await?;
        let now = self.ledger.current_time().await?;

        let witnesses = match datum.status {
            Status::Draft => {
                let info = self.cosigner_info(id).await?;
                self.utxos_by_ref(&info.stakes).await?
            }
            _ => vec![],
        };

        let (governor, payloads) = match datum.status {
            Status::Locked => {
                let (governor, _) = self.governor().await?;
                let mut payloads = BTreeMap::new();
                for targets in datum.effects.values() {
                    for target in targets.values() {
                        let Some(content_id) = payload_ids.get(&target.datum_hash) else { continue };
                        let payload =
                            effect::fetch_payload(self.archive.as_ref(), content_id, &target.datum_hash)
                                .await?;
                        payloads.insert(target.datum_hash, payload);
                    }
                }
                (Some(governor), payloads)
            }
            _ => (None, BTreeMap::new()),
        };
        debug!(
            target: "agora::service",
            "Advancing proposal {id} with {} witnesses and {} payloads", witnesses.len(), payloads.len(),
        );

        let call = DaoAdvanceCall { proposal, witnesses, governor, payloads, now };
        self.build(|dao| call.make(dao, wallet)).await
    }

    // ==================
    // Stakes
    // ==================

    pub async fn create_stake(&self, owner: Credential, amount: u64, wallet: &Wallet) -> Result<TxShape> {
        let call = DaoStakeCreateCall { owner, amount };
        self.build(|dao| call.make(dao, wallet)).await
    }

    pub async fn update_stake(&self, stake: OutRef, amount: u64, wallet: &Wallet) -> Result<TxShape> {
        let _guard = self.locks.acquire(vec![Resource::Output(stake)]).await;
        let stake = self.utxo(stake).await?;
        let call = DaoStakeUpdateCall { stake, amount };
        self.build(|dao| call.make(dao, wallet)).await
    }

    pub async fn delegate_stake(
        &self,
        stake: OutRef,
        delegate: Option<Credential>,
        wallet: &Wallet,
    ) -> Result<TxShape> {
        let _guard = self.locks.acquire(vec![Resource::Output(stake)]).await;
        let stake = self.utxo(stake).await?;
        let call = DaoStakeDelegateCall { stake, delegate };
        self.build(|dao| call.make(dao, wallet)).await
    }

    pub async fn destroy_stakes(&self, stakes: &[OutRef], wallet: &Wallet) -> Result<TxShape> {
        let _guard = self.locks.acquire(Self::resources(stakes)).await;
        let stakes = self.utxos_by_ref(stakes).await?;
        let call = DaoStakeDestroyCall { stakes };
        self.build(|dao| call.make(dao, wallet)).await
    }

    // ==================
    // Effects
    // ==================

    /// Pay out the treasury withdrawal proposal `id` authorized. The
    /// payload held by `effect` must match the proposal's commitment.
    pub async fn withdraw_treasury(
        &self,
        id: u64,
        effect: OutRef,
        treasuries: &[OutRef],
        wallet: &Wallet,
    ) -> Result<TxShape> {
        let mut resources = Self::resources(treasuries);
        resources.push(Resource::Output(effect));
        let _guard = self.locks.acquire(resources).await;

        let scripts = self.scripts().await?;
        let commitment = self.commitment(id, &scripts.treasury_spend.hash).await?;
        let effect = self.utxo(effect).await?;
        let treasuries = self.utxos_by_ref(treasuries).await?;
        let now = self.ledger.current_time().await?;

        let call = DaoTreasuryWithdrawCall { effect, treasuries, commitment, now };
        self.build(|dao| call.make(dao, wallet)).await
    }

    /// Apply the governor mutation proposal `id` authorized.
    pub async fn mutate_governor(&self, id: u64, effect: OutRef, wallet: &Wallet) -> Result<TxShape> {
        let _guard = self.locks.acquire(vec![Resource::Governor, Resource::Output(effect)]).await;
        let scripts = self.scripts().await?;
        let commitment = self.commitment(id, &scripts.governor_mutation.hash).await?;
        let (governor, _) = self.governor().await?;
        let effect = self.utxo(effect).await?;
        let now = self.ledger.current_time().await?;

        let call = DaoMutateGovernorCall { effect, governor, commitment, now };
        self.build(|dao| call.make(dao, wallet)).await
    }

    // ==================
    // Bookkeeping
    // ==================

    /// Submit a signed transaction and record it as pending under
    /// `proposal_id`, or under the DAO itself.
    pub async fn submit(&self, signed_tx: &[u8], proposal_id: Option<u64>) -> Result<TxHash> {
        let tx_hash = self.ledger.submit(signed_tx).await?;
        let key = RecordKey { dao_id: self.dao_id.clone(), proposal_id };
        self.persistence.record_pending(&key, &tx_hash).await?;
        info!(target: "agora::service", "Submitted {tx_hash} for {}", self.dao_id);
        Ok(tx_hash)
    }

    /// Mark `tx_hash` confirmed once it is buried deep enough. Returns
    /// whether it is confirmed.
    pub async fn check_confirmation(&self, tx_hash: &TxHash) -> Result<bool> {
        let depth = self.ledger.confirmations(tx_hash).await?;
        if depth < self.config.confirmations {
            debug!(target: "agora::service", "{tx_hash} at depth {depth}");
            return Ok(false)
        }
        self.persistence.mark_confirmed(tx_hash).await?;
        info!(target: "agora::service", "{tx_hash} confirmed");
        Ok(true)
    }

    pub async fn confirmation(&self, proposal_id: Option<u64>) -> Result<Option<Confirmation>> {
        let key = RecordKey { dao_id: self.dao_id.clone(), proposal_id };
        self.persistence.lookup(&key).await
    }
}
