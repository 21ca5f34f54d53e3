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

//! Control band error types

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while building or restoring band state
#[derive(Debug, Error)]
pub enum CoreError {
    /// A summary failed its invariants (usually on restore)
    #[error("Corrupt summary: {0}")]
    CorruptSummary(String),

    /// A windowed series entry is malformed
    #[error("Corrupt series: {0}")]
    CorruptSeries(String),

    /// Registry snapshot was written by an incompatible version
    #[error("Unsupported snapshot version: expected {expected}, found {found}")]
    SnapshotVersion { expected: u32, found: u32 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Why a raw input could not be used as an observation.
///
/// These never abort a batch; the offending input is skipped and reported.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// The value was absent from the record
    #[error("value is missing")]
    Missing,

    /// The input is not interpretable as a number
    #[error("not a number: {0}")]
    NotNumeric(String),

    /// The input parsed, but to NaN or an infinity
    #[error("value is not finite: {0}")]
    NotFinite(f64),

    /// The host failed to extract a value from the record
    #[error("extraction failed: {0}")]
    Extraction(String),
}
