//! Pixbox - partitioned in-memory LRU cache for image payloads.
//!
//! Payloads are stored by logical key in named partitions ("cache boxes"),
//! each with its own byte capacity and least-recently-used eviction order.
//! A size-aware partition keeps multiple rendered sizes of the same logical
//! image side by side, and renaming a key migrates every size variant at
//! once. Everything is in-memory and synchronous; nothing is persisted.
//!
//! ## Architecture
//!
//! - `advisory` - process-wide toggle for over-budget warnings
//! - `cache` - partitions and the registry that routes to them
//! - `config` - registry and partition configuration
//! - `error` - caller-facing error taxonomy
//!
//! ## Usage
//!
//! ```rust
//! use pixbox::{CacheRegistry, PartitionConfig};
//!
//! // The host supplies the byte-size function for its payload type.
//! let registry = CacheRegistry::new(|image: &Vec<u8>| image.len() as u64);
//!
//! registry.create_partition("thumbnails", PartitionConfig::thumbnails())?;
//!
//! // Two rendered sizes of one logical image coexist in a size-aware
//! // partition.
//! registry.store("thumbnails", "cat.png", vec![0u8; 900], Some(100.0), Some(100.0))?;
//! registry.store("thumbnails", "cat.png", vec![0u8; 300], Some(50.0), Some(50.0))?;
//!
//! let small = registry.fetch("thumbnails", "cat.png", Some(50.0), Some(50.0))?;
//! assert!(small.is_some());
//! # Ok::<(), pixbox::CacheError>(())
//! ```

mod advisory;
mod cache;
pub mod config;
mod error;

pub use advisory::{logging_enabled, set_logging_enabled};
pub use cache::{CacheRegistry, Partition, Weigher};
pub use config::{PartitionConfig, RegistryConfig};
pub use error::CacheError;
