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

use darkfi_serial::{SerialDecodable, SerialEncodable};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// POSIX time in milliseconds, the resolution ledger validity ranges use.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Serialize,
    Deserialize,
    SerialEncodable,
    SerialDecodable,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Hash,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Returns this timestamp shifted forward by `ms` milliseconds.
    pub fn add_ms(&self, ms: u64) -> Result<Self> {
        let ms = i64::try_from(ms).map_err(|_| Error::Overflow)?;
        self.0.checked_add(ms).map(Self).ok_or(Error::Overflow)
    }

    /// Returns this timestamp shifted backward by `ms` milliseconds.
    pub fn sub_ms(&self, ms: u64) -> Result<Self> {
        let ms = i64::try_from(ms).map_err(|_| Error::Overflow)?;
        self.0.checked_sub(ms).map(Self).ok_or(Error::Overflow)
    }

    /// Sum of a list of durations added to this timestamp.
    pub fn add_all(&self, durations: &[u64]) -> Result<Self> {
        let mut t = *self;
        for d in durations {
            t = t.add_ms(*d)?;
        }
        Ok(t)
    }

    /// Midpoint between two timestamps, rounded toward negative infinity.
    pub fn midpoint(a: Self, b: Self) -> Self {
        Self(a.0.div_euclid(2) + b.0.div_euclid(2) + (a.0.rem_euclid(2) + b.0.rem_euclid(2)) / 2)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Transaction validity interval, both ends inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValidityRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ValidityRange {
    /// `[now - before, now + after]`
    pub fn around(now: Timestamp, before_ms: u64, after_ms: u64) -> Result<Self> {
        Ok(Self { start: now.sub_ms(before_ms)?, end: now.add_ms(after_ms)? })
    }

    pub fn width(&self) -> i64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn midpoint(&self) -> Timestamp {
        Timestamp::midpoint(self.start, self.end)
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t <= self.end
    }
}

impl std::fmt::Display for ValidityRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
