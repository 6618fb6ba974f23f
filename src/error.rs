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

// Hello developer. Please add your error to the according subsection
// that is commented, or make a new subsection. Keep it clean.

use crate::model::Status;

/// Main result type used throughout the codebase.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every [`Error`], used by callers to decide
/// whether to rebuild from a fresh snapshot, fix input, or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    MalformedDatum,
    InvalidTransition,
    InvariantViolation,
    UnresolvedReference,
    Configuration,
    Collaborator,
}

/// Reasons a proposal or stake state transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Wrong proposal status: expected {expected}, found {found}")]
    WrongStatus { expected: Status, found: Status },

    #[error("Proposal time window is closed")]
    WindowClosed,

    #[error("Proposal time window opens at {0}")]
    TooEarly(i64),

    #[error("Stake is already locked for proposal {0}")]
    AlreadyLocked(u64),

    #[error("Proposal has no winning outcome")]
    NoWinningOutcome,

    #[error("Threshold not met: required {required}, found {found}")]
    ThresholdNotMet { required: u64, found: u64 },

    #[error("Proposal is finished")]
    ProposalFinished,

    #[error("Credential already cosigned the proposal")]
    AlreadyCosigned,

    #[error("Proposal reached the cosigner limit of {0}")]
    TooManyCosigners(u64),

    #[error("Proposal has no outcome {0}")]
    UnknownOutcome(u64),

    #[error("Stake has no vote on proposal {0}")]
    NotVoted(u64),

    #[error("Validity range of {width}ms exceeds {max}ms")]
    ValidityTooWide { width: i64, max: i64 },
}

/// General library errors used throughout the codebase.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // ===============
    // Decoding errors
    // ===============
    #[error("Malformed datum: {0}")]
    MalformedDatum(String),

    #[error("Hex decode failed: {0}")]
    HexDecode(String),

    // =================
    // Transition errors
    // =================
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    // ================
    // Invariant errors
    // ================
    #[error("Stake already holds a lock for proposal {0}")]
    DuplicateLock(u64),

    #[error("Stake holds no lock for proposal {0}")]
    LockNotFound(u64),

    #[error("Balance of {amount} cannot absorb a change of {delta}")]
    NegativeBalance { amount: u64, delta: i64 },

    #[error("Stake is locked by outstanding proposals")]
    StakeLocked,

    #[error("Stake reached the limit of {0} created proposals")]
    ProposalLimitReached(u64),

    #[error("Vote tally of outcome {0} would become negative")]
    VoteUnderflow(u64),

    #[error("Value not conserved for asset {0}")]
    ValueNotConserved(String),

    #[error("Insufficient funds for asset {0}")]
    InsufficientFunds(String),

    #[error("Output {0} is spent more than once")]
    DuplicateInput(String),

    #[error("Arithmetic overflow")]
    Overflow,

    // =====================
    // Unresolved references
    // =====================
    #[error("UTxO not found: {0}")]
    MissingUtxo(String),

    #[error("UTxO carries no datum: {0}")]
    MissingDatum(String),

    #[error("Effect payload not found for datum hash {0}")]
    MissingEffectPayload(String),

    #[error("Effect payload does not match datum hash {0}")]
    EffectPayloadMismatch(String),

    // ====================
    // Configuration errors
    // ====================
    #[error("Voting time range max width {0}ms is below the 10 minute minimum")]
    VotingRangeTooNarrow(u64),

    #[error("Max proposal valid length {0}ms is below the 10 minute minimum")]
    ProposalLengthTooShort(u64),

    #[error("Invalid script template: {0}")]
    InvalidTemplate(String),

    #[error("Missing script template for {0}")]
    MissingTemplate(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =======================
    // Collaborator errors
    // =======================
    #[error("Ledger error: {0}")]
    LedgerError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("IO error: {0:?}")]
    Io(std::io::ErrorKind),

    #[error("TOML parse error: {0}")]
    TomlError(String),
}

impl Error {
    /// Returns the taxonomy class this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedDatum(_) | Self::HexDecode(_) => ErrorClass::MalformedDatum,

            Self::InvalidTransition(_) => ErrorClass::InvalidTransition,

            Self::DuplicateLock(_) |
            Self::LockNotFound(_) |
            Self::NegativeBalance { .. } |
            Self::StakeLocked |
            Self::ProposalLimitReached(_) |
            Self::VoteUnderflow(_) |
            Self::ValueNotConserved(_) |
            Self::InsufficientFunds(_) |
            Self::DuplicateInput(_) |
            Self::Overflow => ErrorClass::InvariantViolation,

            Self::MissingUtxo(_) |
            Self::MissingDatum(_) |
            Self::MissingEffectPayload(_) |
            Self::EffectPayloadMismatch(_) => ErrorClass::UnresolvedReference,

            Self::VotingRangeTooNarrow(_) |
            Self::ProposalLengthTooShort(_) |
            Self::InvalidTemplate(_) |
            Self::MissingTemplate(_) |
            Self::ConfigError(_) => ErrorClass::Configuration,

            Self::LedgerError(_) |
            Self::ArchiveError(_) |
            Self::PersistenceError(_) |
            Self::Io(_) |
            Self::TomlError(_) => ErrorClass::Collaborator,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.kind())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlError(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::TomlError(err.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Self::HexDecode(err.to_string())
    }
}
