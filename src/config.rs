//! Configuration Module
//!
//! Per-namespace cache profiles plus the process-wide budget, loaded once at
//! startup from environment variables and an optional JSON table.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

// == Defaults ==
/// Default time-to-live for namespaces without an explicit profile
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Default entry cap per namespace
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Default byte budget per namespace (10 MiB)
pub const DEFAULT_NAMESPACE_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default aggregate byte budget (100 MiB)
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 100 * 1024 * 1024;

/// Default sweeper interval in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

// == Strategy Kind ==
/// Validity strategy tag attached to a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    /// Expiry only
    TimeBased,
    /// Byte-identical inputs only
    ExactMatch,
    /// Inputs normalized for embedded timestamps and identifiers
    SemanticMatch,
    /// Inputs plus a digest of the caller context
    ContextAware,
    /// Dependency files must keep their modification marker
    FileDependency,
    /// Dependency files must keep their content digest
    ContentHash,
    /// Repository HEAD must not move
    RepositoryRevision,
    /// Nothing is ever stored
    NeverCache,
}

impl StrategyKind {
    /// Returns the tag as written in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::TimeBased => "TIME_BASED",
            StrategyKind::ExactMatch => "EXACT_MATCH",
            StrategyKind::SemanticMatch => "SEMANTIC_MATCH",
            StrategyKind::ContextAware => "CONTEXT_AWARE",
            StrategyKind::FileDependency => "FILE_DEPENDENCY",
            StrategyKind::ContentHash => "CONTENT_HASH",
            StrategyKind::RepositoryRevision => "REPOSITORY_REVISION",
            StrategyKind::NeverCache => "NEVER_CACHE",
        }
    }
}

// == Namespace Config ==
/// Settings for one namespace. Immutable once the cache is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Validity strategy used for keys and freshness
    pub strategy: StrategyKind,
    /// Maximum entry age in seconds
    pub ttl_seconds: u64,
    /// Maximum number of entries held for this namespace
    pub max_entries: usize,
    /// Maximum aggregate size of this namespace's entries
    pub max_bytes: u64,
    /// Cost of one work unit, used only for savings reporting
    pub cost_per_unit: Option<f64>,
    /// Whether entries are written to the persistence directory
    pub persistent: bool,
    /// Working tree consulted by the repository revision strategy
    pub repository: Option<PathBuf>,
}

impl NamespaceConfig {
    /// Creates a profile with the given strategy and defaults elsewhere.
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_cost_per_unit(mut self, cost_per_unit: f64) -> Self {
        self.cost_per_unit = Some(cost_per_unit);
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn with_repository(mut self, repository: impl Into<PathBuf>) -> Self {
        self.repository = Some(repository.into());
        self
    }
}

impl Default for NamespaceConfig {
    /// The fallback profile: time-based, one hour, moderate capacity.
    fn default() -> Self {
        Self {
            strategy: StrategyKind::TimeBased,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_NAMESPACE_MAX_BYTES,
            cost_per_unit: None,
            persistent: false,
            repository: None,
        }
    }
}

// == Cache Config ==
/// Process-wide cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Aggregate byte budget across every namespace
    pub max_total_bytes: u64,
    /// Sweeper interval in seconds
    pub sweep_interval_secs: u64,
    /// Directory for persisted namespace records
    pub persistence_dir: Option<PathBuf>,
    /// Profile used for namespaces missing from `namespaces`
    pub default_namespace: NamespaceConfig,
    /// Configured namespaces
    pub namespaces: HashMap<String, NamespaceConfig>,
}

impl CacheConfig {
    /// Creates a new CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `CALL_CACHE_CONFIG` - JSON file holding a full config table (optional)
    /// - `CALL_CACHE_MAX_BYTES` - Aggregate byte budget (default: 100 MiB)
    /// - `CALL_CACHE_SWEEP_INTERVAL` - Sweeper interval in seconds (default: 300)
    /// - `CALL_CACHE_PERSISTENCE_DIR` - Persistence directory (default: none)
    ///
    /// Individual variables override values from the file. An unreadable file
    /// is logged and ignored.
    pub fn from_env() -> Self {
        let mut config = match env::var("CALL_CACHE_CONFIG") {
            Ok(path) => Self::from_file(&path).unwrap_or_else(|e| {
                warn!("Ignoring cache config file {}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        if let Some(max_bytes) = env::var("CALL_CACHE_MAX_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_total_bytes = max_bytes;
        }
        if let Some(interval) = env::var("CALL_CACHE_SWEEP_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.sweep_interval_secs = interval;
        }
        if let Ok(dir) = env::var("CALL_CACHE_PERSISTENCE_DIR") {
            if !dir.is_empty() {
                config.persistence_dir = Some(PathBuf::from(dir));
            }
        }

        config
    }

    /// Loads a config table from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            CacheError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses a config table from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CacheError::Configuration(e.to_string()))
    }

    /// Adds or replaces a namespace profile.
    pub fn with_namespace(mut self, name: impl Into<String>, config: NamespaceConfig) -> Self {
        self.namespaces.insert(name.into(), config);
        self
    }

    pub fn with_max_total_bytes(mut self, max_total_bytes: u64) -> Self {
        self.max_total_bytes = max_total_bytes;
        self
    }

    pub fn with_persistence_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persistence_dir = Some(dir.into());
        self
    }

    pub fn with_sweep_interval(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    /// Resolves a namespace profile, falling back to the default profile.
    pub fn namespace(&self, name: &str) -> &NamespaceConfig {
        match self.namespaces.get(name) {
            Some(config) => config,
            None => {
                debug!("Namespace '{}' not configured, using default profile", name);
                &self.default_namespace
            }
        }
    }

    /// Names of namespaces flagged persistent.
    pub fn persistent_namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .namespaces
            .iter()
            .filter(|(_, config)| config.persistent)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            persistence_dir: None,
            default_namespace: NamespaceConfig::default(),
            namespaces: HashMap::new(),
        }
    }
}
