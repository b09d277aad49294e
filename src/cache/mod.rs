//! Cache module - partitioned LRU storage for image payloads.
//!
//! ## Architecture
//!
//! The cache follows a registry pattern:
//! - `CacheRegistry` - central registry holding all named partitions
//! - `Partition` - one independently-capacitated LRU cache box
//! - `EntryKey` - structured composite key (logical key + optional size)
//!
//! All mutation and eviction logic lives in [`Partition`]; the registry only
//! routes calls by name and tracks the summed declared capacity for the
//! advisory warning.

mod key;
mod partition;
mod registry;

pub use partition::{Partition, Weigher};
pub use registry::CacheRegistry;
