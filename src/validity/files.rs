//! File-backed strategies: modification markers and content digests.

use std::fs;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::{CacheEntry, DependencyMarker, Validation};
use crate::config::StrategyKind;
use crate::error::{CacheError, Result};

use super::ValidityStrategy;

/// Current modification marker of a file: `"<mtime-nanos>:<length>"`.
pub fn modification_marker(path: &str) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| CacheError::validity(path, e))?;
    let modified = metadata
        .modified()
        .map_err(|e| CacheError::validity(path, e))?;
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    Ok(format!("{}:{}", nanos, metadata.len()))
}

/// Lowercase hex SHA-256 of a file's content.
pub fn content_digest(path: &str) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| CacheError::validity(path, e))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn capture_markers(
    dependencies: &[String],
    read: fn(&str) -> Result<String>,
) -> Result<Vec<DependencyMarker>> {
    dependencies
        .iter()
        .map(|resource| Ok(DependencyMarker::new(resource.clone(), read(resource)?)))
        .collect()
}

fn markers_unchanged(markers: &[DependencyMarker], read: fn(&str) -> Result<String>) -> bool {
    markers.iter().all(|m| match read(&m.resource) {
        Ok(current) => current == m.marker,
        Err(e) => {
            debug!("Treating entry as stale: {}", e);
            false
        }
    })
}

// == File Dependency ==
/// Fresh while every dependency exists with its captured modification marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDependencyStrategy;

impl ValidityStrategy for FileDependencyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FileDependency
    }

    fn capture(&self, dependencies: &[String]) -> Result<Validation> {
        Ok(Validation::Modified {
            markers: capture_markers(dependencies, modification_marker)?,
        })
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match &entry.validation {
            Validation::Modified { markers } => markers_unchanged(markers, modification_marker),
            _ => false,
        }
    }
}

// == Content Hash ==
/// Fresh while every dependency keeps its captured content digest. Catches
/// edits that leave the modification time untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHashStrategy;

impl ValidityStrategy for ContentHashStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContentHash
    }

    fn capture(&self, dependencies: &[String]) -> Result<Validation> {
        Ok(Validation::ContentDigest {
            markers: capture_markers(dependencies, content_digest)?,
        })
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match &entry.validation {
            Validation::ContentDigest { markers } => markers_unchanged(markers, content_digest),
            _ => false,
        }
    }
}
