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

//! Out-of-band reporting for skipped inputs

use crate::error::ValueError;
use parking_lot::Mutex;

/// An input the engine dropped from a batch
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedValue {
    /// Group the input was submitted for
    pub group: String,
    /// Debug rendering of the raw input
    pub raw: String,
    pub error: ValueError,
}

/// Receives every rejected input.
///
/// Called after the group's lock has been released.
pub trait ErrorSink: Send + Sync {
    fn report(&self, rejected: &RejectedValue);
}

/// Logs rejections as warnings
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, rejected: &RejectedValue) {
        tracing::warn!(
            group = %rejected.group,
            raw = %rejected.raw,
            error = %rejected.error,
            "Unable to determine value for input"
        );
    }
}

/// Keeps rejections in memory for later inspection
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    rejected: Mutex<Vec<RejectedValue>>,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rejected.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rejected.lock().is_empty()
    }

    /// Take everything collected so far
    pub fn drain(&self) -> Vec<RejectedValue> {
        std::mem::take(&mut *self.rejected.lock())
    }
}

impl ErrorSink for MemoryErrorSink {
    fn report(&self, rejected: &RejectedValue) {
        self.rejected.lock().push(rejected.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_and_drains() {
        let sink = MemoryErrorSink::new();
        assert!(sink.is_empty());

        sink.report(&RejectedValue {
            group: "A".to_string(),
            raw: "\"abc\"".to_string(),
            error: ValueError::NotNumeric("abc".to_string()),
        });
        assert_eq!(sink.len(), 1);

        let drained = sink.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].group, "A");
        assert!(sink.is_empty());
    }
}
