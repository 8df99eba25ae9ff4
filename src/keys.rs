//! Key Deriver
//!
//! Turns a namespace plus raw call inputs into a fixed-length cache key. The
//! namespace's validity strategy chooses how inputs are canonicalized first
//! (see [`ValidityStrategy::key_material`](crate::validity::ValidityStrategy::key_material)).

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::CallInputs;

/// Placeholder substituted for ISO-8601-like timestamps
pub const TIMESTAMP_PLACEHOLDER: &str = "<TIMESTAMP>";

/// Placeholder substituted for volatile identifiers
pub const ID_PLACEHOLDER: &str = "<ID>";

/// Separates the namespace from the key material inside the digest input
const FIELD_SEPARATOR: char = '\u{1f}';

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?\b",
    )
    .expect("timestamp pattern is valid")
});

static PREFIXED_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Z0-9_]*-\d+-\d+\b").expect("prefixed id pattern is valid"));

// Runs last, so it also absorbs a placeholder left by an earlier pass
static TAGGED_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(id|uuid):\s*(?:<[A-Z]+>|[A-Za-z0-9_-]+)").expect("tagged id pattern is valid")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

// == Derive Key ==
/// Digests `namespace` and already-canonicalized `material` into a
/// 64-character lowercase hex key.
pub fn derive_key(namespace: &str, material: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}

// == Exact Material ==
/// Arguments serialized verbatim.
pub fn exact_material(inputs: &CallInputs) -> String {
    serde_json::to_string(&inputs.args).unwrap_or_default()
}

// == Semantic Material ==
/// Arguments with volatile substrings replaced by placeholders.
pub fn semantic_material(inputs: &CallInputs) -> String {
    let args: Vec<Value> = inputs
        .args
        .iter()
        .map(|arg| match arg {
            Value::String(text) => Value::String(canonicalize_text(text)),
            other => other.clone(),
        })
        .collect();
    serde_json::to_string(&args).unwrap_or_default()
}

// == Context Material ==
/// Verbatim arguments plus a digest of the sorted context map. A missing
/// context and an empty one are equivalent.
pub fn context_material(inputs: &CallInputs) -> String {
    let context = match &inputs.context {
        Some(context) => serde_json::to_string(context).unwrap_or_default(),
        None => "{}".to_string(),
    };
    let digest = hex::encode(Sha256::digest(context.as_bytes()));
    format!("{}{}{}", exact_material(inputs), FIELD_SEPARATOR, digest)
}

// == Canonicalize ==
/// Replaces timestamps, `PREFIX-<digits>-<digits>` identifiers and
/// `ID:`/`uuid:` tags with placeholders and collapses whitespace. Text that
/// matches none of the patterns passes through unchanged apart from
/// whitespace.
pub fn canonicalize_text(text: &str) -> String {
    let text = TIMESTAMP.replace_all(text, TIMESTAMP_PLACEHOLDER);
    let text = PREFIXED_ID.replace_all(&text, ID_PLACEHOLDER);
    let text = TAGGED_ID.replace_all(&text, format!("${{1}}:{}", ID_PLACEHOLDER).as_str());
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
