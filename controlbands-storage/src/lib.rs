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

//! Controlbands Storage Layer
//!
//! Persists the group registry of a [`BandEngine`](controlbands_core::BandEngine)
//! so windowed state survives restarts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use controlbands_core::BandEngine;
//! use controlbands_storage::SnapshotStore;
//!
//! let engine: BandEngine<String> = BandEngine::new(86_400.0)?;
//! let store = SnapshotStore::new("state/bands.bin");
//! store.load_into(&engine)?;
//! // ... process batches ...
//! store.save_engine(&engine)?;
//! ```

pub mod snapshot;

pub use snapshot::{SnapshotEncoding, SnapshotStore, StoreError, StoreResult};
