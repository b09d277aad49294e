//! Configuration for the cache registry and its partitions.
//!
//! Both config types are plain serde-derivable structs so hosts can keep
//! their partition layout in whatever config file format they already load.

use serde::{Deserialize, Serialize};

/// Configuration for a single cache partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Capacity in host units (see [`RegistryConfig::unit_bytes`]).
    pub capacity_units: u64,

    /// Whether a logical key may hold multiple width/height variants.
    ///
    /// Leave this off for partitions that never store resized variants;
    /// lookups without dimensions then stay O(1) instead of scanning.
    pub size_aware: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            capacity_units: 8 * 1024, // 8 MiB with the default KiB unit
            size_aware: false,
        }
    }
}

impl PartitionConfig {
    /// Create a config with the given capacity in units.
    pub fn with_capacity(capacity_units: u64) -> Self {
        Self {
            capacity_units,
            ..Default::default()
        }
    }

    /// Set the capacity in units (builder pattern).
    #[must_use]
    pub fn capacity_units(mut self, capacity_units: u64) -> Self {
        self.capacity_units = capacity_units;
        self
    }

    /// Allow multiple width/height variants per logical key.
    #[must_use]
    pub fn size_aware(mut self, size_aware: bool) -> Self {
        self.size_aware = size_aware;
        self
    }

    /// Create config for thumbnail strips.
    /// Size-aware with a small budget: many rendered sizes of few images.
    pub fn thumbnails() -> Self {
        Self {
            capacity_units: 2 * 1024,
            size_aware: true,
        }
    }

    /// Create config for full-resolution images.
    /// One payload per key and a bigger budget.
    pub fn full_resolution() -> Self {
        Self {
            capacity_units: 32 * 1024,
            size_aware: false,
        }
    }
}

/// Configuration for the registry itself, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Byte size of one capacity unit.
    ///
    /// Partitions declare their capacity in units; the default unit is one
    /// KiB.
    pub unit_bytes: u64,

    /// Recommended ceiling for the summed capacity declared across all
    /// partitions. Exceeding it triggers an advisory warning, nothing more.
    pub recommended_budget_bytes: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            unit_bytes: 1024,
            recommended_budget_bytes: 64 * 1024 * 1024, // 64 MiB
        }
    }
}

impl RegistryConfig {
    /// Set the byte size of one capacity unit (builder pattern).
    #[must_use]
    pub fn unit_bytes(mut self, unit_bytes: u64) -> Self {
        self.unit_bytes = unit_bytes;
        self
    }

    /// Set the recommended capacity budget in bytes.
    #[must_use]
    pub fn recommended_budget_bytes(mut self, recommended_budget_bytes: u64) -> Self {
        self.recommended_budget_bytes = recommended_budget_bytes;
        self
    }

    /// Derive the recommended budget as one eighth of the memory available
    /// to the process, a common sizing rule for in-memory image caches.
    #[must_use]
    pub fn budget_from_total_memory(mut self, total_bytes: u64) -> Self {
        self.recommended_budget_bytes = total_bytes / 8;
        self
    }
}
