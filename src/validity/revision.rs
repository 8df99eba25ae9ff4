//! Repository revision strategy: an entry is fresh while HEAD has not moved.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::cache::{CacheEntry, Validation};
use crate::config::StrategyKind;
use crate::error::{CacheError, Result};

use super::ValidityStrategy;

/// Source of the current version-control revision.
pub trait RevisionSource: Send + Sync + fmt::Debug {
    fn current_revision(&self) -> Result<String>;
}

/// Reads `git rev-parse HEAD` in a working tree.
#[derive(Debug, Clone)]
pub struct GitRevisionSource {
    repository: PathBuf,
}

impl GitRevisionSource {
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
        }
    }
}

impl RevisionSource for GitRevisionSource {
    fn current_revision(&self) -> Result<String> {
        let resource = self.repository.display().to_string();
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&self.repository)
            .output()
            .map_err(|e| CacheError::validity(&resource, e))?;

        if !output.status.success() {
            return Err(CacheError::validity(
                resource,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if revision.is_empty() {
            return Err(CacheError::validity(resource, "empty revision"));
        }
        Ok(revision)
    }
}

// == Repository Revision ==
/// Fresh while the revision captured at write time is still current.
#[derive(Debug)]
pub struct RepositoryRevisionStrategy {
    source: Box<dyn RevisionSource>,
}

impl RepositoryRevisionStrategy {
    pub fn new(source: impl RevisionSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl ValidityStrategy for RepositoryRevisionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RepositoryRevision
    }

    fn capture(&self, _dependencies: &[String]) -> Result<Validation> {
        Ok(Validation::Revision {
            revision: self.source.current_revision()?,
        })
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let Validation::Revision { revision } = &entry.validation else {
            return false;
        };
        match self.source.current_revision() {
            Ok(current) => current == *revision,
            Err(e) => {
                debug!("Treating entry as stale: {}", e);
                false
            }
        }
    }
}
