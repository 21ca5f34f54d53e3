// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Group registry
//!
//! Maps each group key to its [`WindowedSeries`]. The map itself is a
//! sharded `DashMap`, so lookups for different groups never contend; each
//! series sits behind its own mutex, which is the per-group critical section
//! the engine holds for a whole batch.
//!
//! ```text
//! SeriesRegistry
//! └── DashMap<K, Arc<Mutex<WindowedSeries>>>
//!     ├── "A" ─► [(t0, Summary), (t1, Summary), ...]
//!     └── "B" ─► [(t0, Summary)]
//! ```

use crate::error::{CoreError, CoreResult};
use crate::series::WindowedSeries;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;

/// Current registry snapshot layout
pub const SNAPSHOT_VERSION: u32 = 1;

/// Shared handle to one group's series
pub type SeriesHandle = Arc<Mutex<WindowedSeries>>;

/// Durable image of a whole registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot<K> {
    pub version: u32,
    pub groups: Vec<(K, WindowedSeries)>,
}

impl<K> RegistrySnapshot<K> {
    pub fn new(groups: Vec<(K, WindowedSeries)>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            groups,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<K> Default for RegistrySnapshot<K> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Concurrent group key → series map
#[derive(Debug)]
pub struct SeriesRegistry<K: Eq + Hash> {
    series: DashMap<K, SeriesHandle>,
}

impl<K: Eq + Hash> Default for SeriesRegistry<K> {
    fn default() -> Self {
        Self {
            series: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash> SeriesRegistry<K> {
    pub fn get(&self, group: &K) -> Option<SeriesHandle> {
        self.series.get(group).map(|entry| Arc::clone(entry.value()))
    }

    /// Install a series for `group`, replacing any existing one
    pub fn insert_series(&self, group: K, series: WindowedSeries) {
        self.series.insert(group, Arc::new(Mutex::new(series)));
    }

    pub fn contains(&self, group: &K) -> bool {
        self.series.contains_key(group)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl<K> SeriesRegistry<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Series for `group`, created empty on first sight.
    ///
    /// The returned handle is detached from the map's shard lock.
    pub fn get_or_create(&self, group: &K) -> SeriesHandle {
        if let Some(existing) = self.series.get(group) {
            return Arc::clone(existing.value());
        }
        let entry = self.series.entry(group.clone()).or_default();
        Arc::clone(entry.value())
    }

    /// Known group keys, in no particular order
    pub fn groups(&self) -> Vec<K> {
        self.series.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Copy out every series.
    ///
    /// Each group is locked briefly in turn, so the image is consistent per
    /// group but not across groups.
    pub fn snapshot(&self) -> RegistrySnapshot<K> {
        let handles: Vec<(K, SeriesHandle)> = self
            .series
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let groups = handles
            .into_iter()
            .map(|(key, handle)| {
                let series = handle.lock().clone();
                (key, series)
            })
            .collect();

        RegistrySnapshot::new(groups)
    }

    /// Replace the registry contents with a snapshot
    pub fn restore(&self, snapshot: RegistrySnapshot<K>) -> CoreResult<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CoreError::SnapshotVersion {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }

        self.series.clear();
        for (group, series) in snapshot.groups {
            self.insert_series(group, series);
        }
        Ok(())
    }
}
