//! Request types for the cache API
//!
//! Raw call inputs, write options and namespace validation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Maximum accepted namespace identifier length
pub const MAX_NAMESPACE_LENGTH: usize = 128;

/// Raw inputs of a cacheable call.
///
/// # Fields
/// - `args`: ordered primitive arguments (prompt text, tool name, paths...)
/// - `context`: optional free-form context; sorted by key so its digest is
///   independent of insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallInputs {
    /// Ordered call arguments
    pub args: Vec<Value>,
    /// Optional caller context
    #[serde(default)]
    pub context: Option<BTreeMap<String, Value>>,
}

impl CallInputs {
    /// Creates inputs from any list of JSON-convertible arguments.
    pub fn new<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            context: None,
        }
    }

    /// Adds one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Options attached to a write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutOptions {
    /// Resources the result depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Work units the computation cost (tokens, for instance)
    #[serde(default)]
    pub work_units: Option<u64>,
    /// Arbitrary metadata stored with the entry
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares dependency resources.
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_work_units(mut self, work_units: u64) -> Self {
        self.work_units = Some(work_units);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Validates a namespace identifier.
///
/// Accepts 1 to [`MAX_NAMESPACE_LENGTH`] bytes of ASCII alphanumerics and
/// `.`, `_`, `:` or `-`.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(CacheError::InvalidNamespace(
            "namespace cannot be empty".to_string(),
        ));
    }
    if namespace.len() > MAX_NAMESPACE_LENGTH {
        return Err(CacheError::InvalidNamespace(format!(
            "namespace exceeds maximum length of {} bytes",
            MAX_NAMESPACE_LENGTH
        )));
    }
    if let Some(bad) = namespace
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')))
    {
        return Err(CacheError::InvalidNamespace(format!(
            "namespace '{}' contains invalid character {:?}",
            namespace, bad
        )));
    }
    Ok(())
}
