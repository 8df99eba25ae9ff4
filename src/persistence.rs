//! Persistence Layer
//!
//! One gzip-compressed JSON record per persistent namespace. Records carry a
//! format version so an incompatible file is discarded instead of misread.
//! Everything here is best-effort: callers log failures and carry on.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

/// Version written into every record
pub const FORMAT_VERSION: u32 = 1;

/// File extension of namespace records
pub const RECORD_EXTENSION: &str = "cache.gz";

/// On-disk record of one namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub format_version: u32,
    pub namespace: String,
    pub saved_at: DateTime<Utc>,
    pub entries: Vec<CacheEntry>,
}

impl PersistedRecord {
    pub fn new(namespace: impl Into<String>, entries: Vec<CacheEntry>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            namespace: namespace.into(),
            saved_at: Utc::now(),
            entries,
        }
    }
}

// == Persistence Layer ==
/// Reads and writes namespace records under one directory.
#[derive(Debug, Clone)]
pub struct PersistenceLayer {
    dir: PathBuf,
}

impl PersistenceLayer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of a namespace's record. `:` is percent-encoded so the name is
    /// safe on every filesystem and cannot collide with another namespace.
    pub fn record_path(&self, namespace: &str) -> PathBuf {
        let safe: String = namespace
            .chars()
            .map(|c| match c {
                ':' => "%3A".to_string(),
                c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => c.to_string(),
                c => format!("%{:02X}", c as u32),
            })
            .collect();
        self.dir.join(format!("{}.{}", safe, RECORD_EXTENSION))
    }

    // == Save ==
    /// Writes a namespace record to a uniquely named temporary file in the
    /// same directory, then renames it into place. Concurrent writers never
    /// share a temporary file and a crash mid-write never leaves a truncated
    /// record; an abandoned temporary file is deleted when dropped.
    pub fn save(&self, namespace: &str, entries: Vec<CacheEntry>) -> Result<()> {
        let path = self.record_path(namespace);
        let record = PersistedRecord::new(namespace, entries);

        let write = || -> std::io::Result<()> {
            fs::create_dir_all(&self.dir)?;
            let tmp = NamedTempFile::new_in(&self.dir)?;
            let mut encoder = GzEncoder::new(BufWriter::new(tmp), Compression::default());
            serde_json::to_writer(&mut encoder, &record)?;
            let mut writer = encoder.finish()?;
            writer.flush()?;
            let tmp = writer.into_inner().map_err(|e| e.into_error())?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        };

        write().map_err(|e| {
            CacheError::Persistence(format!("cannot write {}: {}", path.display(), e))
        })?;

        debug!(
            "Persisted {} entries for '{}' to {}",
            record.entries.len(),
            namespace,
            path.display()
        );
        Ok(())
    }

    // == Load ==
    /// Reads a namespace record. Returns `Ok(None)` when none exists and an
    /// error for a corrupt record or an unsupported format version.
    pub fn load(&self, namespace: &str) -> Result<Option<Vec<CacheEntry>>> {
        let path = self.record_path(namespace);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Persistence(format!(
                    "cannot open {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let corrupt =
            |e: &dyn std::fmt::Display| CacheError::Persistence(format!("{}: {}", path.display(), e));

        let raw: Value = serde_json::from_reader(GzDecoder::new(BufReader::new(file)))
            .map_err(|e| corrupt(&e))?;

        let version = raw.get("format_version").and_then(Value::as_u64);
        if version != Some(u64::from(FORMAT_VERSION)) {
            return Err(corrupt(&format!(
                "unsupported format version {:?}",
                version
            )));
        }

        let record: PersistedRecord = serde_json::from_value(raw).map_err(|e| corrupt(&e))?;
        let entries = record
            .entries
            .into_iter()
            .filter(|entry| entry.namespace == namespace)
            .collect();
        Ok(Some(entries))
    }
}
