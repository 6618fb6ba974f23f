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

use std::{
    collections::BTreeMap,
    fs::{self, create_dir_all},
    marker::PhantomData,
    path::Path,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    ledger::{AssetId, OutRef},
    plutus::{ScriptHash, TxHash},
    script::{ScriptParams, ScriptTemplates},
    util::time::{Timestamp, ValidityRange},
    Error, Result,
};

/// TOML configuration loader.
pub struct Config<T> {
    config: PhantomData<T>,
}

impl<T: Default + Serialize + DeserializeOwned> Config<T> {
    pub fn load(path: &Path) -> Result<T> {
        let toml = fs::read_to_string(path)?;
        let config: T = toml::from_str(&toml)?;
        Ok(config)
    }

    /// Load `path`, writing the default configuration there first if it
    /// does not exist.
    pub fn load_default(path: &Path) -> Result<T> {
        if !path.exists() {
            if let Some(outdir) = path.parent() {
                create_dir_all(outdir)?;
            }
            fs::write(path, toml::to_string(&T::default())?)?;
        }
        Self::load(path)
    }
}

/// Tunables of the transaction builders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Validity range start, before the current ledger time
    pub validity_before_ms: u64,
    /// Validity range end, after the current ledger time
    pub validity_after_ms: u64,
    /// Narrower range used when advancing proposals
    pub advance_before_ms: u64,
    pub advance_after_ms: u64,
    /// Lovelace attached to every script output the builders create
    pub min_ada: u64,
    /// Lovelace attached to reference script outputs
    pub reference_ada: u64,
    /// Blocks after which a submitted transaction counts as confirmed
    pub confirmations: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            validity_before_ms: 100_000,
            validity_after_ms: 400_000,
            advance_before_ms: 20_000,
            advance_after_ms: 60_000,
            min_ada: 2_000_000,
            reference_ada: 1_000_000,
            confirmations: 6,
        }
    }
}

impl BuilderConfig {
    pub fn validity(&self, now: Timestamp) -> Result<ValidityRange> {
        ValidityRange::around(now, self.validity_before_ms, self.validity_after_ms)
    }

    pub fn advance_validity(&self, now: Timestamp) -> Result<ValidityRange> {
        ValidityRange::around(now, self.advance_before_ms, self.advance_after_ms)
    }
}

/// Everything needed to derive a DAO's scripts, in hex.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    pub seed_tx: String,
    pub seed_index: u32,
    pub gt_policy: String,
    pub gt_name: String,
    pub max_cosigners: u64,
    /// Compiled templates keyed by script kind name
    pub templates: BTreeMap<String, String>,
    pub builder: BuilderConfig,
}

impl DaoConfig {
    pub fn script_params(&self) -> Result<ScriptParams> {
        let gt_policy = ScriptHash::from_hex(&self.gt_policy)
            .map_err(|e| Error::ConfigError(format!("gt_policy: {e}")))?;
        let gt_name = hex::decode(&self.gt_name)?;
        Ok(ScriptParams {
            seed_ref: OutRef { tx_hash: TxHash::from_hex(&self.seed_tx)?, index: self.seed_index },
            gov_token: AssetId::native(gt_policy, gt_name)?,
            max_cosigners: self.max_cosigners,
        })
    }

    pub fn script_templates(&self) -> Result<ScriptTemplates> {
        ScriptTemplates::from_hex_map(&self.templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg: BuilderConfig = toml::from_str("min_ada = 1500000").unwrap();
        assert_eq!(cfg.min_ada, 1_500_000);
        assert_eq!(cfg.validity_after_ms, 400_000);
        assert_eq!(cfg.confirmations, 6);

        let range = cfg.validity(Timestamp(1_000_000)).unwrap();
        assert_eq!(range.width(), 500_000);
        let range = cfg.advance_validity(Timestamp(1_000_000)).unwrap();
        assert_eq!((range.start, range.end), (Timestamp(980_000), Timestamp(1_060_000)));
    }

    #[test]
    fn dao_config() {
        let toml = format!(
            r#"
            seed_tx = "{}"
            seed_index = 3
            gt_policy = "{}"
            gt_name = "4754"
            max_cosigners = 5

            [templates]
            stake_policy = "4401000061"

            [builder]
            confirmations = 2
            "#,
            "ab".repeat(32),
            "cd".repeat(28),
        );
        let cfg: DaoConfig = toml::from_str(&toml).unwrap();
        let params = cfg.script_params().unwrap();
        assert_eq!(params.seed_ref.index, 3);
        assert_eq!(params.gov_token.name_bytes(), b"GT");
        assert_eq!(cfg.builder.confirmations, 2);
        assert_eq!(cfg.builder.min_ada, 2_000_000);

        let templates = cfg.script_templates().unwrap();
        assert!(templates.contains(crate::script::ScriptKind::StakePolicy));

        let bad = DaoConfig { seed_tx: "00".to_string(), ..cfg };
        assert!(bad.script_params().is_err());
    }

    #[test]
    fn load_default_writes_file() {
        let dir = std::env::temp_dir().join(format!("agora-config-{}", std::process::id()));
        let path = dir.join("builder.toml");
        let cfg = Config::<BuilderConfig>::load_default(&path).unwrap();
        assert_eq!(cfg, BuilderConfig::default());
        assert!(path.exists());
        let _ = fs::remove_dir_all(dir);
    }
}
