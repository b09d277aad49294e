//! Cache registry - routing for named partitions.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use crate::advisory;
use crate::config::{PartitionConfig, RegistryConfig};
use crate::error::CacheError;

use super::partition::{Partition, Weigher};

/// Central registry for named cache partitions.
///
/// The registry routes store/fetch/rename calls to the partition named in
/// the call; all caching state lives in the partitions themselves. It is an
/// explicitly constructed context object: create one at startup and hold it
/// for the process lifetime. Partitions are created once and never removed.
///
/// Partition handles are shared `Arc`s, so the registry's own locking is out
/// of the picture as soon as a handle is resolved, and work in one partition
/// never blocks another.
///
/// ## Example
///
/// ```rust
/// use pixbox::{CacheRegistry, PartitionConfig};
///
/// let registry = CacheRegistry::new(|image: &Vec<u8>| image.len() as u64);
/// registry.create_partition("avatars", PartitionConfig::default().size_aware(true))?;
///
/// registry.store("avatars", "user-7", vec![0u8; 4096], Some(64.0), Some(64.0))?;
/// let avatar = registry.fetch("avatars", "user-7", Some(64.0), Some(64.0))?;
/// assert!(avatar.is_some());
/// # Ok::<(), pixbox::CacheError>(())
/// ```
pub struct CacheRegistry<P>
where
    P: Send + Sync + 'static,
{
    partitions: DashMap<String, Arc<Partition<P>>>,
    weigher: Weigher<P>,
    unit_bytes: u64,
    recommended_budget_bytes: u64,
    declared_bytes: AtomicU64,
}

impl<P> CacheRegistry<P>
where
    P: Send + Sync + 'static,
{
    /// Create a registry with the default config and the host's byte-size
    /// function for payloads.
    pub fn new<F>(weigher: F) -> Self
    where
        F: Fn(&P) -> u64 + Send + Sync + 'static,
    {
        Self::with_config(RegistryConfig::default(), weigher)
    }

    /// Create a registry with an explicit config.
    pub fn with_config<F>(config: RegistryConfig, weigher: F) -> Self
    where
        F: Fn(&P) -> u64 + Send + Sync + 'static,
    {
        info!(
            "cache registry initialized (unit = {} bytes, recommended budget = {} bytes)",
            config.unit_bytes, config.recommended_budget_bytes
        );
        Self {
            partitions: DashMap::new(),
            weigher: Arc::new(weigher),
            unit_bytes: config.unit_bytes,
            recommended_budget_bytes: config.recommended_budget_bytes,
            declared_bytes: AtomicU64::new(0),
        }
    }

    /// Create and register a new partition.
    ///
    /// Returns the partition handle; callers that only route through the
    /// registry can drop it. Pushing the summed declared capacity past the
    /// recommended budget logs an advisory warning and proceeds.
    ///
    /// # Errors
    ///
    /// [`CacheError::DuplicateName`] if the name is already registered.
    pub fn create_partition(
        &self,
        name: &str,
        config: PartitionConfig,
    ) -> Result<Arc<Partition<P>>, CacheError> {
        let capacity_bytes = config.capacity_units.saturating_mul(self.unit_bytes);
        let partition = match self.partitions.entry(name.to_string()) {
            Entry::Occupied(_) => return Err(CacheError::DuplicateName(name.to_string())),
            Entry::Vacant(slot) => {
                let partition = Arc::new(Partition::new(
                    name,
                    capacity_bytes,
                    config.size_aware,
                    Arc::clone(&self.weigher),
                ));
                slot.insert(Arc::clone(&partition));
                partition
            }
        };
        debug!(
            "created cache partition '{}' ({} bytes, size_aware = {})",
            name, capacity_bytes, config.size_aware
        );

        let declared =
            self.declared_bytes.fetch_add(capacity_bytes, Ordering::Relaxed) + capacity_bytes;
        if declared > self.recommended_budget_bytes {
            advisory::warn_over_budget(name, declared, self.recommended_budget_bytes);
        }

        Ok(partition)
    }

    /// Look up a partition handle by name.
    pub fn partition(&self, name: &str) -> Option<Arc<Partition<P>>> {
        self.partitions.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn partition_or_err(&self, name: &str) -> Result<Arc<Partition<P>>, CacheError> {
        self.partition(name)
            .ok_or_else(|| CacheError::PartitionNotFound(name.to_string()))
    }

    /// Store a payload in the named partition. See [`Partition::store`].
    ///
    /// # Errors
    ///
    /// [`CacheError::PartitionNotFound`] if no partition has this name,
    /// otherwise whatever [`Partition::store`] returns.
    pub fn store(
        &self,
        partition: &str,
        key: &str,
        payload: P,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<(), CacheError> {
        self.partition_or_err(partition)?.store(key, payload, width, height)
    }

    /// Fetch a payload from the named partition. See [`Partition::fetch`].
    ///
    /// # Errors
    ///
    /// [`CacheError::PartitionNotFound`] if no partition has this name,
    /// otherwise whatever [`Partition::fetch`] returns.
    pub fn fetch(
        &self,
        partition: &str,
        key: &str,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<Option<Arc<P>>, CacheError> {
        self.partition_or_err(partition)?.fetch(key, width, height)
    }

    /// Rename every variant of `old_key` to `new_key` in the named
    /// partition. See [`Partition::rename`].
    ///
    /// # Errors
    ///
    /// [`CacheError::PartitionNotFound`] if no partition has this name; the
    /// rename itself always succeeds.
    pub fn rename(&self, partition: &str, old_key: &str, new_key: &str) -> Result<(), CacheError> {
        self.partition_or_err(partition)?.rename(old_key, new_key);
        Ok(())
    }

    /// Check if a partition with the given name exists.
    pub fn contains_partition(&self, name: &str) -> bool {
        self.partitions.contains_key(name)
    }

    /// Number of registered partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Check if no partitions are registered.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Names of all registered partitions, in no particular order.
    pub fn partition_names(&self) -> Vec<String> {
        self.partitions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Summed capacity declared across all partitions, in bytes.
    ///
    /// Advisory bookkeeping only; nothing is enforced against it.
    pub fn declared_bytes(&self) -> u64 {
        self.declared_bytes.load(Ordering::Relaxed)
    }
}

impl<P> fmt::Debug for CacheRegistry<P>
where
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("partition_count", &self.partitions.len())
            .field("declared_bytes", &self.declared_bytes())
            .finish()
    }
}
