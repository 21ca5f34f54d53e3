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

//! Band engine
//!
//! Processes one batch of observations for one group at a time:
//!
//! ```text
//! lock(group)
//!   prune entries older than the band interval
//!   prior   = fold(remaining entries)
//!   running = Summary::seeded(prior.last_value)
//!   for value in batch:
//!       emit enrich(value, prior ⊕ running)
//!       running.register(value)
//!   append (now, running)
//! unlock(group)
//! report rejected inputs
//! ```
//!
//! Batches for different groups run in parallel; batches for the same group
//! serialize on that group's mutex.

use crate::band::{enrich, EnrichedResult};
use crate::config::BandConfig;
use crate::error::{CoreError, CoreResult, ValueError};
use crate::registry::{RegistrySnapshot, SeriesRegistry};
use crate::sink::{ErrorSink, RejectedValue, TracingErrorSink};
use crate::summary::Summary;
use crate::value::BandValue;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Default band interval: one day
pub const DEFAULT_RETENTION_SECS: f64 = 86_400.0;

/// Current wall-clock time as unix seconds
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Windowed moving-range engine over a registry of groups
pub struct BandEngine<K: Eq + Hash = String> {
    registry: SeriesRegistry<K>,
    retention_secs: f64,
    error_sink: Arc<dyn ErrorSink>,
}

impl<K> std::fmt::Debug for BandEngine<K>
where
    K: Eq + Hash + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandEngine")
            .field("groups", &self.registry.len())
            .field("retention_secs", &self.retention_secs)
            .finish()
    }
}

impl<K> BandEngine<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Engine with the given band interval and a tracing error sink
    pub fn new(retention_secs: f64) -> CoreResult<Self> {
        Self::builder().retention_secs(retention_secs).build()
    }

    pub fn from_config(config: &BandConfig) -> CoreResult<Self> {
        config.validate()?;
        Self::new(config.band_interval.total_seconds())
    }

    pub fn builder() -> BandEngineBuilder<K> {
        BandEngineBuilder::new()
    }

    pub fn retention_secs(&self) -> f64 {
        self.retention_secs
    }

    pub fn registry(&self) -> &SeriesRegistry<K> {
        &self.registry
    }

    /// Enrich a batch of raw values for `group` at time `now`.
    ///
    /// Returns one result per convertible value, in input order. Inputs that
    /// do not convert are skipped and reported to the error sink.
    pub fn process<V, I>(&self, group: &K, now: f64, values: I) -> Vec<EnrichedResult>
    where
        V: BandValue,
        I: IntoIterator<Item = V>,
    {
        self.process_records(group, now, values, |raw| raw.to_band_value())
            .into_iter()
            .map(|(_, band)| band)
            .collect()
    }

    /// [`process`](Self::process) at the current wall-clock time
    pub fn record<V, I>(&self, group: &K, values: I) -> Vec<EnrichedResult>
    where
        V: BandValue,
        I: IntoIterator<Item = V>,
    {
        self.process(group, unix_now(), values)
    }

    /// Enrich whole records, pulling each value out with `extract`.
    ///
    /// Extraction runs under the group lock. Records whose extraction fails
    /// are dropped from the output and reported; the rest come back paired
    /// with their band data.
    pub fn process_records<R, I, F>(
        &self,
        group: &K,
        now: f64,
        records: I,
        mut extract: F,
    ) -> Vec<(R, EnrichedResult)>
    where
        R: Debug,
        I: IntoIterator<Item = R>,
        F: FnMut(&R) -> Result<f64, ValueError>,
    {
        let handle = self.registry.get_or_create(group);
        let mut enriched = Vec::new();
        let mut rejected = Vec::new();

        {
            let mut series = handle.lock();

            let pruned = series.prune(now, self.retention_secs);
            if pruned > 0 {
                tracing::debug!(
                    group = ?group,
                    pruned,
                    remaining = series.len(),
                    "Trimmed old band entries"
                );
            }

            let prior = series.combined();
            tracing::debug!(group = ?group, prior = ?prior, "Previous band state");

            let mut running = Summary::seeded(prior.last_value());

            for record in records {
                match extract(&record) {
                    Ok(value) => {
                        let band = enrich(value, &prior.merge(&running));
                        running.register(value);
                        enriched.push((record, band));
                    }
                    Err(error) => rejected.push(RejectedValue {
                        group: format!("{:?}", group),
                        raw: format!("{:?}", record),
                        error,
                    }),
                }
            }

            if !running.is_empty() {
                series.append(now, running);
            }
        }

        for rejection in &rejected {
            self.error_sink.report(rejection);
        }

        enriched
    }

    /// Windowed state for `group` as of `now` (prunes first)
    pub fn combined(&self, group: &K, now: f64) -> Summary {
        match self.registry.get(group) {
            Some(handle) => {
                let mut series = handle.lock();
                series.prune(now, self.retention_secs);
                series.combined()
            }
            None => Summary::new(),
        }
    }

    /// Fold of everything currently stored for `group`, without pruning
    pub fn summary(&self, group: &K) -> Option<Summary> {
        self.registry
            .get(group)
            .map(|handle| handle.lock().combined())
    }

    /// Prune every group as of `now`; returns the number of entries removed
    pub fn prune_all(&self, now: f64) -> usize {
        self.registry
            .groups()
            .iter()
            .filter_map(|group| self.registry.get(group))
            .map(|handle| handle.lock().prune(now, self.retention_secs))
            .sum()
    }

    pub fn snapshot(&self) -> RegistrySnapshot<K> {
        self.registry.snapshot()
    }

    pub fn restore(&self, snapshot: RegistrySnapshot<K>) -> CoreResult<()> {
        let groups = snapshot.groups.len();
        self.registry.restore(snapshot)?;
        tracing::info!(groups, "Restored band state");
        Ok(())
    }
}

/// Builder for [`BandEngine`]
pub struct BandEngineBuilder<K: Eq + Hash> {
    retention_secs: f64,
    error_sink: Option<Arc<dyn ErrorSink>>,
    snapshot: Option<RegistrySnapshot<K>>,
}

impl<K> BandEngineBuilder<K>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            retention_secs: DEFAULT_RETENTION_SECS,
            error_sink: None,
            snapshot: None,
        }
    }

    pub fn retention_secs(mut self, secs: f64) -> Self {
        self.retention_secs = secs;
        self
    }

    pub fn error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Start from previously persisted state
    pub fn snapshot(mut self, snapshot: RegistrySnapshot<K>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn build(self) -> CoreResult<BandEngine<K>> {
        if !self.retention_secs.is_finite() || self.retention_secs <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "retention must be a positive number of seconds, got {}",
                self.retention_secs
            )));
        }

        let engine = BandEngine {
            registry: SeriesRegistry::new(),
            retention_secs: self.retention_secs,
            error_sink: self
                .error_sink
                .unwrap_or_else(|| Arc::new(TracingErrorSink)),
        };

        if let Some(snapshot) = self.snapshot {
            engine.restore(snapshot)?;
        }

        Ok(engine)
    }
}

impl<K> Default for BandEngineBuilder<K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
