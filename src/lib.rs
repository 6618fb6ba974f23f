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

pub use num_bigint;

/// Error handling
pub mod error;
pub use error::{Error, ErrorClass, Result, TransitionError};

/// Plutus data, its CBOR encoding and ledger hashes
pub mod plutus;

/// Typed governance records and redeemers
pub mod model;

/// Script templates, parameter application and derived identities
pub mod script;

/// Proposal state machine and stake ledger rules
pub mod state;

/// Ledger types and external collaborators
pub mod ledger;

/// Unsigned transaction shapes and their builder
pub mod tx;

/// Effect commitments and authority token routing
pub mod effect;

/// Transaction builders for every DAO action
pub mod client;

/// Async façade serializing builds per resource
pub mod service;

/// Configuration loading
pub mod config;

/// Utility functions
pub mod util;
