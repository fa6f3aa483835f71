//! Per-instance on-disk cache of raw forum documents.

mod instance_cache;

pub use instance_cache::{CacheEntry, CacheError, CacheResource, InstanceCache};
