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

//! Registry snapshot files
//!
//! File layout (little endian):
//!
//! ```text
//! ┌───────┬─────────┬──────────┬─────────────┬─────────┬───────┐
//! │ BAND  │ version │ encoding │ payload len │ payload │ crc32 │
//! │ 4B    │ u32     │ u8       │ u64         │ N bytes │ u32   │
//! └───────┴─────────┴──────────┴─────────────┴─────────┴───────┘
//! ```
//!
//! Saves go to a sibling `.tmp` file that is synced and renamed over the
//! target, so a crash mid-write leaves the previous snapshot intact.
//! A damaged snapshot is a hard error; nothing is partially restored.

use controlbands_core::{BandEngine, CoreError, RegistrySnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SNAPSHOT_MAGIC: &[u8; 4] = b"BAND";
const SNAPSHOT_FILE_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 1 + 8;
const CRC_LEN: usize = 4;

/// Payload encoding of a snapshot file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotEncoding {
    #[default]
    Bincode,
    Json,
}

impl SnapshotEncoding {
    fn tag(self) -> u8 {
        match self {
            SnapshotEncoding::Bincode => 1,
            SnapshotEncoding::Json => 2,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(SnapshotEncoding::Bincode),
            2 => Some(SnapshotEncoding::Json),
            _ => None,
        }
    }
}

/// Errors for snapshot persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid snapshot header")]
    InvalidHeader,

    #[error("Unsupported snapshot file version: {0}")]
    UnsupportedVersion(u32),

    #[error("Unknown snapshot encoding tag: {0}")]
    UnknownEncoding(u8),

    #[error("Snapshot truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("Snapshot checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Single-file snapshot store for a band registry
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    encoding: SnapshotEncoding,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            encoding: SnapshotEncoding::default(),
        }
    }

    /// Encoding used for future saves; loads accept either
    pub fn with_encoding(mut self, encoding: SnapshotEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write a snapshot, replacing any previous one
    pub fn save<K: Serialize>(&self, snapshot: &RegistrySnapshot<K>) -> StoreResult<()> {
        let payload = match self.encoding {
            SnapshotEncoding::Bincode => bincode::serialize(snapshot)?,
            SnapshotEncoding::Json => serde_json::to_vec(snapshot)?,
        };
        let crc = crc32fast::hash(&payload);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_path();
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);

            writer.write_all(SNAPSHOT_MAGIC)?;
            writer.write_all(&SNAPSHOT_FILE_VERSION.to_le_bytes())?;
            writer.write_all(&[self.encoding.tag()])?;
            writer.write_all(&(payload.len() as u64).to_le_bytes())?;
            writer.write_all(&payload)?;
            writer.write_all(&crc.to_le_bytes())?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(
            path = ?self.path,
            groups = snapshot.groups.len(),
            bytes = payload.len(),
            "Saved band snapshot"
        );
        Ok(())
    }

    /// Read the snapshot, or `None` if none has been written yet
    pub fn load<K: DeserializeOwned>(&self) -> StoreResult<Option<RegistrySnapshot<K>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&self.path)?;
        let snapshot = decode(&bytes)?;

        tracing::debug!(
            path = ?self.path,
            groups = snapshot.groups.len(),
            "Loaded band snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Persist the engine's current registry
    pub fn save_engine<K>(&self, engine: &BandEngine<K>) -> StoreResult<()>
    where
        K: Serialize + Eq + Hash + Clone + Debug,
    {
        self.save(&engine.snapshot())
    }

    /// Restore a saved registry into `engine`; returns whether one existed
    pub fn load_into<K>(&self, engine: &BandEngine<K>) -> StoreResult<bool>
    where
        K: DeserializeOwned + Eq + Hash + Clone + Debug,
    {
        match self.load()? {
            Some(snapshot) => {
                engine.restore(snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn decode<K: DeserializeOwned>(bytes: &[u8]) -> StoreResult<RegistrySnapshot<K>> {
    if bytes.len() < HEADER_LEN {
        return Err(StoreError::Truncated {
            expected: HEADER_LEN,
            found: bytes.len(),
        });
    }

    let (header, rest) = bytes.split_at(HEADER_LEN);
    if &header[0..4] != SNAPSHOT_MAGIC {
        return Err(StoreError::InvalidHeader);
    }

    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != SNAPSHOT_FILE_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }

    let encoding =
        SnapshotEncoding::from_tag(header[8]).ok_or(StoreError::UnknownEncoding(header[8]))?;

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&header[9..17]);
    let payload_len = usize::try_from(u64::from_le_bytes(len_bytes))
        .map_err(|_| StoreError::InvalidHeader)?;

    let expected = payload_len
        .checked_add(CRC_LEN)
        .ok_or(StoreError::InvalidHeader)?;
    if rest.len() != expected {
        return Err(StoreError::Truncated {
            expected: HEADER_LEN + expected,
            found: bytes.len(),
        });
    }

    let (payload, crc_bytes) = rest.split_at(payload_len);
    let stored = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(StoreError::ChecksumMismatch { stored, computed });
    }

    let snapshot: RegistrySnapshot<K> = match encoding {
        SnapshotEncoding::Bincode => bincode::deserialize(payload)?,
        SnapshotEncoding::Json => serde_json::from_slice(payload)?,
    };

    if snapshot.version != controlbands_core::SNAPSHOT_VERSION {
        return Err(CoreError::SnapshotVersion {
            expected: controlbands_core::SNAPSHOT_VERSION,
            found: snapshot.version,
        }
        .into());
    }

    Ok(snapshot)
}
