//! Request and response types for the cache API
//!
//! This module defines what callers hand to the cache (call inputs, write
//! options) and what they get back (write outcomes, reports).

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_namespace, CallInputs, PutOptions, MAX_NAMESPACE_LENGTH};
pub use responses::{NamespaceReport, PutOutcome, StatsReport, SweepReport};
