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

//! Controlbands Core
//!
//! Western-Electric style moving-range control bands over a stream of
//! numeric observations, partitioned by group and limited to a trailing
//! time window.
//!
//! - **Summary**: mergeable count/sum aggregate of values and moving ranges
//! - **WindowedSeries**: per-group `(timestamp, Summary)` entries with pruning
//! - **BandEngine**: per-batch enrichment under a per-group lock
//!
//! # Example
//!
//! ```rust
//! use controlbands_core::BandEngine;
//!
//! let engine: BandEngine<String> = BandEngine::new(86_400.0)?;
//! let group = "line-1".to_string();
//!
//! engine.process(&group, 1_700_000_000.0, [49.6, 47.6, 49.9]);
//! let bands = engine.process(&group, 1_700_000_060.0, [58.0]);
//!
//! assert_eq!(bands.len(), 1);
//! assert!(bands[0].deviations > 3.0);
//! # Ok::<(), controlbands_core::CoreError>(())
//! ```

pub mod band;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod series;
pub mod sink;
pub mod summary;
pub mod value;

pub use band::{enrich, EnrichedResult};
pub use config::{BandConfig, BandInterval};
pub use engine::{unix_now, BandEngine, BandEngineBuilder, DEFAULT_RETENTION_SECS};
pub use error::{CoreError, CoreResult, ValueError};
pub use registry::{RegistrySnapshot, SeriesHandle, SeriesRegistry, SNAPSHOT_VERSION};
pub use series::WindowedSeries;
pub use sink::{ErrorSink, MemoryErrorSink, RejectedValue, TracingErrorSink};
pub use summary::{Summary, D2};
pub use value::BandValue;
