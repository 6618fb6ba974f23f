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

//! Typed governance records. Each record lowers into [`PlutusData`] with a
//! fixed field order; the codec in [`crate::plutus`] is the only boundary
//! between these types and ledger bytes.
//!
//! [`PlutusData`]: crate::plutus::PlutusData

pub mod credential;
pub use credential::Credential;

pub mod governor;
pub use governor::{
    GovernorDatum, GovernorRedeemer, Thresholds, TimingConfig, MIN_TIME_RANGE_WIDTH,
};

pub mod proposal;
pub use proposal::{EffectMap, EffectTarget, ProposalDatum, ProposalRedeemer, ResultTag, Status};

pub mod stake;
pub use stake::{LockKind, PropLock, StakeDatum, StakeRedeemer};

pub mod effect;
pub use effect::{MutateGovernorDatum, Receiver, TreasuryWithdrawalDatum};
