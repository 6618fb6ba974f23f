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

use std::{fs, path::PathBuf};

use log::{debug, info};
use serde::Deserialize;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use structopt::StructOpt;
use structopt_toml::StructOptToml;

use agora::{
    config::{Config, DaoConfig},
    model::{GovernorDatum, MutateGovernorDatum, ProposalDatum, StakeDatum, TreasuryWithdrawalDatum},
    plutus::{self, datum_hash, PlutusData},
    script::ScriptParameterizer,
    Error, Result,
};

const CONFIG_FILE_CONTENTS: &str = include_str!("../agora.toml");

#[derive(Clone, Debug, Deserialize, StructOpt, StructOptToml)]
#[serde(default)]
#[structopt(name = "agora-cli", about = "Agora DAO script derivation and datum inspection")]
struct Args {
    #[structopt(short, parse(from_occurrences))]
    /// Increase verbosity (-vvv supported)
    verbose: u8,

    #[structopt(short, long)]
    /// Configuration file holding these arguments
    config: Option<String>,

    #[structopt(long, default_value = "agora.toml")]
    /// DAO configuration: seed, governance token and script templates
    dao: String,

    #[structopt(subcommand)]
    command: Option<Subcmd>,
}

#[derive(Clone, Debug, Deserialize, StructOpt)]
enum Subcmd {
    /// Print every script identity and token of the configured DAO
    Derive,

    /// Decode a hex datum of the given kind
    /// (governor, proposal, stake, withdrawal, mutation, data)
    Decode { kind: String, datum: String },

    /// Print the hash of a hex datum
    DatumHash { datum: String },
}

fn log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn derive(path: &str) -> Result<()> {
    let path = PathBuf::from(path);
    if !path.exists() {
        fs::write(&path, CONFIG_FILE_CONTENTS)?;
        info!(target: "agora-cli", "DAO config created in {path:?}, review it and try again");
        return Ok(())
    }

    let config = Config::<DaoConfig>::load(&path)?;
    let params = config.script_params()?;
    let parameterizer = ScriptParameterizer::new(config.script_templates()?);
    let scripts = parameterizer.derive_all(&params)?;

    for script in scripts.iter() {
        println!("{:<26} {}", script.kind.name(), script.hash);
    }
    println!();
    println!("{:<26} {}", "governor address", scripts.governor_address());
    println!("{:<26} {}", "governor token", scripts.governor_token());
    println!("{:<26} {}", "proposal token", scripts.proposal_token());
    println!("{:<26} {}", "stake token", scripts.stake_token());
    println!("{:<26} {}", "authority token", scripts.gat());
    Ok(())
}

fn decode(kind: &str, datum: &str) -> Result<()> {
    let bytes = hex::decode(datum)?;
    let out = match kind {
        "governor" => format!("{:#?}", plutus::decode::<GovernorDatum>(&bytes)?),
        "proposal" => format!("{:#?}", plutus::decode::<ProposalDatum>(&bytes)?),
        "stake" => format!("{:#?}", plutus::decode::<StakeDatum>(&bytes)?),
        "withdrawal" => format!("{:#?}", plutus::decode::<TreasuryWithdrawalDatum>(&bytes)?),
        "mutation" => format!("{:#?}", plutus::decode::<MutateGovernorDatum>(&bytes)?),
        "data" => format!("{:#?}", PlutusData::from_cbor(&bytes)?),
        _ => return Err(Error::ConfigError(format!("unknown datum kind {kind}"))),
    };
    println!("{out}");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::from_args_with_toml("").map_err(|e| Error::ConfigError(e.to_string()))?;
    let args = match &args.config {
        Some(path) => Args::from_args_with_toml(&fs::read_to_string(path)?)
            .map_err(|e| Error::ConfigError(e.to_string()))?,
        None => args,
    };

    let mut cfg = ConfigBuilder::new();
    cfg.set_target_level(LevelFilter::Error);
    TermLogger::init(log_level(args.verbose), cfg.build(), TerminalMode::Mixed, ColorChoice::Auto)
        .map_err(|e| Error::ConfigError(e.to_string()))?;
    debug!(target: "agora-cli", "Executing with args: {args:?}");

    match args.command {
        Some(Subcmd::Derive) => derive(&args.dao),
        Some(Subcmd::Decode { kind, datum }) => decode(&kind, &datum),
        Some(Subcmd::DatumHash { datum }) => {
            let bytes = hex::decode(datum)?;
            // Reject garbage rather than hash it
            PlutusData::from_cbor(&bytes)?;
            println!("{}", datum_hash(&bytes));
            Ok(())
        }
        None => {
            Args::clap().print_help().map_err(|e| Error::ConfigError(e.to_string()))?;
            println!();
            Ok(())
        }
    }
}
