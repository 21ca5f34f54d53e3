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

//! Per-observation band data

use crate::summary::Summary;
use serde::{Deserialize, Serialize};

/// Band data attached to one observation
///
/// Serialized with the `deviation` field name downstream consumers read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub value: f64,
    /// Window mean before this observation
    pub mean: f64,
    /// Dispersion estimate before this observation
    #[serde(rename = "deviation")]
    pub dispersion: f64,
    /// Signed number of dispersion units from the mean
    pub deviations: f64,
}

/// Place `value` relative to everything known in `context`
pub fn enrich(value: f64, context: &Summary) -> EnrichedResult {
    let mean = context.mean();
    let dispersion = context.dispersion();
    let deviations = if dispersion != 0.0 {
        (value - mean) / dispersion
    } else {
        0.0
    };

    EnrichedResult {
        value,
        mean,
        dispersion,
        deviations,
    }
}
