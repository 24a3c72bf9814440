//! # Blob Store — day-partitioned durable storage
//!
//! Evidence records and periodic reports persist through this abstraction.
//! The store is create-only: a blob is written once under
//! `<base>/<category>/<YYYY-MM-DD>/<id>` and never mutated. The production
//! deployment points this at the platform's secure storage; the bundled
//! filesystem implementation writes plain files with restrictive layout.
//!
//! Storage failures must never change a request verdict — callers log and
//! continue, so every write returns a `PalisadeResult` instead of panicking.

use crate::error::{PalisadeError, PalisadeResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Durable key→bytes storage, partitioned by category and UTC date.
pub trait BlobStore: Send + Sync {
    /// Write a blob. Fails if the key already exists (create-only).
    fn put(&self, category: &str, date: &str, id: &str, bytes: &[u8]) -> PalisadeResult<()>;
    /// Read a blob back.
    fn get(&self, category: &str, date: &str, id: &str) -> PalisadeResult<Vec<u8>>;
    /// List blob ids under one day partition.
    fn list(&self, category: &str, date: &str) -> PalisadeResult<Vec<String>>;
}

/// Today's partition key, UTC.
pub fn utc_date(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1970-01-01".to_string())
}

// ── Filesystem implementation ────────────────────────────────────────────────

pub struct FsBlobStore {
    base_dir: PathBuf,
    total_writes: AtomicU64,
    total_failures: AtomicU64,
}

impl FsBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            total_writes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
        }
    }

    /// Ensure the base directory exists.
    pub fn init(&self) -> PalisadeResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        info!(dir = %self.base_dir.display(), "Blob store initialized");
        Ok(())
    }

    fn path_for(&self, category: &str, date: &str, id: &str) -> PathBuf {
        self.base_dir.join(category).join(date).join(id)
    }

    pub fn total_writes(&self) -> u64 {
        self.total_writes.load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, category: &str, date: &str, id: &str, bytes: &[u8]) -> PalisadeResult<()> {
        let path = self.path_for(category, date, id);
        if path.exists() {
            return Err(PalisadeError::BlobExists(id.to_string()));
        }
        let result = (|| -> PalisadeResult<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, bytes)?;
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.total_writes.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                warn!(blob = %id, error = %e, "Blob write failed");
                Err(e)
            }
        }
    }

    fn get(&self, category: &str, date: &str, id: &str) -> PalisadeResult<Vec<u8>> {
        Ok(std::fs::read(self.path_for(category, date, id))?)
    }

    fn list(&self, category: &str, date: &str) -> PalisadeResult<Vec<String>> {
        let dir = self.base_dir.join(category).join(date);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

// ── In-memory implementation (tests, ephemeral deployments) ──────────────────

#[derive(Default)]
pub struct MemBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(category: &str, date: &str, id: &str) -> String {
        format!("{}/{}/{}", category, date, id)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for MemBlobStore {
    fn put(&self, category: &str, date: &str, id: &str, bytes: &[u8]) -> PalisadeResult<()> {
        let key = Self::key(category, date, id);
        let mut blobs = self.blobs.write();
        if blobs.contains_key(&key) {
            return Err(PalisadeError::BlobExists(id.to_string()));
        }
        blobs.insert(key, bytes.to_vec());
        Ok(())
    }

    fn get(&self, category: &str, date: &str, id: &str) -> PalisadeResult<Vec<u8>> {
        self.blobs
            .read()
            .get(&Self::key(category, date, id))
            .cloned()
            .ok_or_else(|| PalisadeError::Storage(format!("blob not found: {}", id)))
    }

    fn list(&self, category: &str, date: &str) -> PalisadeResult<Vec<String>> {
        let prefix = format!("{}/{}/", category, date);
        let mut ids: Vec<String> = self
            .blobs
            .read()
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .map(|k| k[prefix.len()..].to_string())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
