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

//! Time-windowed sequence of archived batch summaries for one group

use crate::error::CoreError;
use crate::summary::Summary;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Ordered `(timestamp, Summary)` entries, one per processed batch
///
/// Timestamps are unix seconds. Entries are appended with the current time,
/// so the front of the deque is always the oldest batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, Summary)>", into = "Vec<(f64, Summary)>")]
pub struct WindowedSeries {
    entries: VecDeque<(f64, Summary)>,
}

impl WindowedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry with `timestamp <= now - retention_secs`.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self, now: f64, retention_secs: f64) -> usize {
        let cutoff = now - retention_secs;
        let before = self.entries.len();
        self.entries.retain(|(timestamp, _)| *timestamp > cutoff);
        before - self.entries.len()
    }

    /// Fold all retained summaries oldest first
    pub fn combined(&self) -> Summary {
        self.entries
            .iter()
            .fold(Summary::new(), |acc, (_, summary)| acc.merge(summary))
    }

    /// Archive a finished batch summary
    pub fn append(&mut self, timestamp: f64, summary: Summary) {
        self.entries.push_back((timestamp, summary));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &(f64, Summary)> {
        self.entries.iter()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.entries.back().map(|(timestamp, _)| *timestamp)
    }
}

impl From<WindowedSeries> for Vec<(f64, Summary)> {
    fn from(series: WindowedSeries) -> Self {
        series.entries.into()
    }
}

impl TryFrom<Vec<(f64, Summary)>> for WindowedSeries {
    type Error = CoreError;

    fn try_from(entries: Vec<(f64, Summary)>) -> Result<Self, Self::Error> {
        // Summaries validate themselves during deserialization
        if let Some((timestamp, _)) = entries.iter().find(|(t, _)| !t.is_finite()) {
            return Err(CoreError::CorruptSeries(format!(
                "non-finite timestamp {}",
                timestamp
            )));
        }
        Ok(Self {
            entries: entries.into(),
        })
    }
}

impl FromIterator<(f64, Summary)> for WindowedSeries {
    fn from_iter<T: IntoIterator<Item = (f64, Summary)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
