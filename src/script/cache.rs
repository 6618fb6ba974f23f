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

use std::{collections::HashMap, sync::Arc};

use darkfi_serial::{serialize, SerialDecodable, SerialEncodable};
use log::debug;
use smol::lock::RwLock;

use super::{DaoScripts, ScriptParameterizer, ScriptParams};
use crate::Result;

/// Serialized form of [`ScriptParams`] hashed into the cache key.
#[derive(SerialEncodable, SerialDecodable)]
struct ParamsKey {
    seed_tx: Vec<u8>,
    seed_index: u32,
    gt_policy: Vec<u8>,
    gt_name: Vec<u8>,
    max_cosigners: u64,
}

impl From<&ScriptParams> for ParamsKey {
    fn from(params: &ScriptParams) -> Self {
        Self {
            seed_tx: params.seed_ref.tx_hash.as_bytes().to_vec(),
            seed_index: params.seed_ref.index,
            gt_policy: params.gov_token.policy_bytes(),
            gt_name: params.gov_token.name_bytes(),
            max_cosigners: params.max_cosigners,
        }
    }
}

/// Parameter hash identifying a DAO instance in the cache.
pub fn params_hash(params: &ScriptParams) -> blake3::Hash {
    blake3::hash(&serialize(&ParamsKey::from(params)))
}

/// Derived script sets keyed by parameter hash. Shared by reference
/// between concurrent callers; entries are never evicted.
pub struct ScriptCache {
    parameterizer: ScriptParameterizer,
    entries: RwLock<HashMap<blake3::Hash, Arc<DaoScripts>>>,
}

impl ScriptCache {
    pub fn new(parameterizer: ScriptParameterizer) -> Self {
        Self { parameterizer, entries: RwLock::new(HashMap::new()) }
    }

    /// Fetch the script set for `params`, deriving it on first use.
    pub async fn get(&self, params: &ScriptParams) -> Result<Arc<DaoScripts>> {
        let key = params_hash(params);
        if let Some(scripts) = self.entries.read().await.get(&key) {
            return Ok(scripts.clone())
        }

        // Derivation runs outside the lock. A racing caller may derive the
        // same set; the first insert wins.
        debug!(target: "agora::script::cache", "Cache miss for {key}");
        let derived = Arc::new(self.parameterizer.derive_all(params)?);
        let mut entries = self.entries.write().await;
        Ok(entries.entry(key).or_insert(derived).clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::tests::{params, templates};

    #[test]
    fn memoized_per_params() {
        smol::block_on(async {
            let cache = ScriptCache::new(ScriptParameterizer::new(templates()));
            let a = cache.get(&params()).await.unwrap();
            let b = cache.get(&params()).await.unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(cache.len().await, 1);

            let mut other = params();
            other.max_cosigners += 1;
            let c = cache.get(&other).await.unwrap();
            assert_ne!(a.proposal_validator.hash, c.proposal_validator.hash);
            assert_eq!(a.governor_policy.hash, c.governor_policy.hash);
            assert_eq!(cache.len().await, 2);
        });
    }

    #[test]
    fn params_hash_distinguishes_fields() {
        let base = params_hash(&params());
        let mut p = params();
        p.seed_ref.index += 1;
        assert_ne!(params_hash(&p), base);
        assert_eq!(params_hash(&params()), base);
    }
}
