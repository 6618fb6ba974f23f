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

use std::{collections::HashMap, fmt, sync::Arc};

use log::debug;
use smol::lock::{Mutex, MutexGuardArc};

use crate::ledger::OutRef;

/// A singleton output that concurrent builds must not race on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Governor,
    Proposal(u64),
    /// Any other output, by reference
    Output(OutRef),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Governor => f.write_str("governor"),
            Self::Proposal(id) => write!(f, "proposal#{id}"),
            Self::Output(out_ref) => write!(f, "{out_ref}"),
        }
    }
}

type LockMap = HashMap<Resource, Arc<Mutex<()>>>;

/// Drop the locks nobody holds or waits for. The map keeps the only
/// reference to an idle lock.
fn prune(locks: &mut LockMap) {
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}

/// Async mutex per resource. Guards over several resources are always
/// taken in ascending resource order so two builds never deadlock.
#[derive(Default)]
pub struct ResourceLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Guards held for the duration of one build.
pub struct ResourceGuard {
    guards: Vec<MutexGuardArc<()>>,
    locks: Arc<Mutex<LockMap>>,
    pub resources: Vec<Resource>,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.guards.clear();
        // Under contention the next acquire prunes instead
        if let Some(mut locks) = self.locks.try_lock() {
            prune(&mut locks);
        }
    }
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, resource: Resource) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        prune(&mut locks);
        locks.entry(resource).or_default().clone()
    }

    /// Acquire every resource in `resources`, waiting for concurrent holders.
    pub async fn acquire(&self, mut resources: Vec<Resource>) -> ResourceGuard {
        resources.sort();
        resources.dedup();

        let mut guards = Vec::with_capacity(resources.len());
        for resource in &resources {
            let lock = self.lock_for(*resource).await;
            guards.push(lock.lock_arc().await);
        }
        debug!(target: "agora::service::locks", "Acquired {resources:?}");
        ResourceGuard { guards, locks: self.locks.clone(), resources }
    }

    /// Number of resources currently held or awaited.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
