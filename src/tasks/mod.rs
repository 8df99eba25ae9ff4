//! Background Tasks Module
//!
//! # Tasks
//! - Sweeper: removes expired and stale entries and flushes persistent
//!   namespaces at the configured interval

mod sweeper;

pub use sweeper::{spawn_sweeper, SweeperHandle};
