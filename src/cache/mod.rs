//! Cache module for storing API responses to disk
//!
//! This module provides a key/value cache manager that persists monthly reports
//! to the filesystem as JSON. Entries are overwritten on re-fetch and never
//! expire or get evicted.

mod manager;

pub use manager::{CacheError, CacheManager};
