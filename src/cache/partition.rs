//! A single cache partition: one capacity budget, one LRU order.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::CacheError;

use super::key::{Dimensions, EntryKey};

/// Byte-size function for stored payloads, supplied by the host.
///
/// Must be deterministic and non-negative for valid payloads. It is called
/// once per newly stored composite key, under the partition lock, so keep it
/// cheap (reading a length or precomputed stride, not hashing the pixels).
pub type Weigher<P> = Arc<dyn Fn(&P) -> u64 + Send + Sync>;

struct StoredEntry<P> {
    payload: Arc<P>,
    /// Bytes charged for this composite key when it was first inserted.
    /// Replacing the payload does not re-charge; eviction debits exactly
    /// this amount.
    charged_bytes: u64,
}

struct PartitionState<P> {
    /// Iteration order is the recency order: index 0 is the least recently
    /// used entry, the last index the most recently used.
    entries: IndexMap<EntryKey, StoredEntry<P>>,
    current_bytes: u64,
}

/// One named cache box.
///
/// A partition is:
/// - Size-bounded: stores are trimmed back to the byte capacity fixed at creation
/// - LRU-ordered: every hit promotes the entry, eviction removes the coldest one
/// - Thread-safe: all state transitions run under one internal lock
///
/// Payloads are handed out as [`Arc`] handles, so a fetch never copies image
/// bytes and a handle stays valid after the entry is evicted.
pub struct Partition<P>
where
    P: Send + Sync + 'static,
{
    name: Arc<str>,
    capacity_bytes: u64,
    size_aware: bool,
    weigher: Weigher<P>,
    state: Mutex<PartitionState<P>>,
}

impl<P> Partition<P>
where
    P: Send + Sync + 'static,
{
    pub(crate) fn new(
        name: &str,
        capacity_bytes: u64,
        size_aware: bool,
        weigher: Weigher<P>,
    ) -> Self {
        Self {
            name: name.into(),
            capacity_bytes,
            size_aware,
            weigher,
            state: Mutex::new(PartitionState {
                entries: IndexMap::new(),
                current_bytes: 0,
            }),
        }
    }

    /// The name this partition was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity in bytes, fixed at creation.
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Whether logical keys may hold multiple width/height variants.
    pub fn is_size_aware(&self) -> bool {
        self.size_aware
    }

    /// Bytes currently charged to stored entries.
    pub fn current_size_bytes(&self) -> u64 {
        self.state.lock().current_bytes
    }

    /// Number of stored entries. Each size variant counts separately.
    pub fn entry_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if the partition holds no entries.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Store a payload under `key`, optionally qualified by the requested
    /// rendering size, and trim the partition back to its capacity.
    ///
    /// Replacing an existing variant swaps the payload but keeps the size
    /// charged when the key first appeared; either way the entry ends up in
    /// the most-recently-used position. A payload bigger than the whole
    /// partition is admitted and then immediately trimmed away.
    ///
    /// # Errors
    ///
    /// - [`CacheError::ConfigurationMismatch`] if this partition is not
    ///   size-aware and a width or height was supplied.
    /// - [`CacheError::InvalidDimension`] if a supplied dimension is
    ///   negative or NaN.
    /// - [`CacheError::InvalidRequest`] if only one of width/height was
    ///   supplied.
    ///
    /// # Panics
    ///
    /// Panics if the size accounting turns out inconsistent while trimming.
    /// That is a defect in the weigher or in this crate, not a request
    /// error.
    pub fn store(
        &self,
        key: &str,
        payload: P,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<(), CacheError> {
        if !self.size_aware && (width.is_some() || height.is_some()) {
            return Err(CacheError::ConfigurationMismatch(self.name.to_string()));
        }

        let dims = Dimensions::resolve(width, height)?;
        let entry_key = EntryKey::new(key, dims);
        let payload = Arc::new(payload);

        let mut state = self.state.lock();
        match state.entries.shift_remove(&entry_key) {
            Some(existing) => {
                // Same composite key: swap the payload, keep the charge.
                let charged_bytes = existing.charged_bytes;
                state.entries.insert(
                    entry_key,
                    StoredEntry {
                        payload,
                        charged_bytes,
                    },
                );
            }
            None => {
                let charged_bytes = (self.weigher)(payload.as_ref());
                state.current_bytes = state.current_bytes.saturating_add(charged_bytes);
                state.entries.insert(
                    entry_key,
                    StoredEntry {
                        payload,
                        charged_bytes,
                    },
                );
            }
        }
        self.trim_to_capacity(&mut state);
        Ok(())
    }

    /// Fetch a payload by key, promoting the hit to most-recently-used.
    ///
    /// With both dimensions given, the exact variant is looked up. With both
    /// absent, a size-aware partition scans for the first variant of the
    /// logical key (O(n) in partition size, the accepted cost of an
    /// ambiguous lookup) while a non-size-aware partition resolves the key
    /// directly. On a non-size-aware partition, supplied dimensions are
    /// validated and then ignored.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidDimension`] if a supplied dimension is
    ///   negative or NaN.
    /// - [`CacheError::InvalidRequest`] if only one of width/height was
    ///   supplied.
    pub fn fetch(
        &self,
        key: &str,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<Option<Arc<P>>, CacheError> {
        let dims = Dimensions::resolve(width, height)?;

        let mut state = self.state.lock();
        let index = if !self.size_aware {
            state.entries.get_index_of(&EntryKey::new(key, None))
        } else if dims.is_some() {
            state.entries.get_index_of(&EntryKey::new(key, dims))
        } else {
            state.entries.keys().position(|k| k.logical() == key)
        };

        let Some(index) = index else {
            return Ok(None);
        };

        let last = state.entries.len() - 1;
        state.entries.move_index(index, last);
        Ok(state
            .entries
            .get_index(last)
            .map(|(_, entry)| Arc::clone(&entry.payload)))
    }

    /// Re-key every variant stored under `old_key` to `new_key`, keeping
    /// size qualifiers and payloads.
    ///
    /// A variant already present under the new key is replaced and its
    /// charge released. Renaming a key with no entries is a no-op, as is
    /// renaming a key to itself.
    pub fn rename(&self, old_key: &str, new_key: &str) {
        if old_key == new_key {
            return;
        }

        let mut state = self.state.lock();
        if !self.size_aware {
            if let Some(entry) = state.entries.shift_remove(&EntryKey::new(old_key, None)) {
                self.replace_key(&mut state, EntryKey::new(new_key, None), entry);
            }
            return;
        }

        let variants: Vec<EntryKey> = state
            .entries
            .keys()
            .filter(|k| k.logical() == old_key)
            .cloned()
            .collect();
        for variant in variants {
            if let Some(entry) = state.entries.shift_remove(&variant) {
                self.replace_key(&mut state, variant.with_logical(new_key), entry);
            }
        }
    }

    /// Insert `entry` at `key`, releasing whatever the key held before.
    fn replace_key(&self, state: &mut PartitionState<P>, key: EntryKey, entry: StoredEntry<P>) {
        if let Some(clobbered) = state.entries.shift_remove(&key) {
            self.debit(state, clobbered.charged_bytes);
        }
        state.entries.insert(key, entry);
    }

    /// Evict least-recently-used entries until the charged size fits the
    /// capacity again.
    fn trim_to_capacity(&self, state: &mut PartitionState<P>) {
        while state.current_bytes > self.capacity_bytes {
            let Some((evicted_key, evicted)) = state.entries.shift_remove_index(0) else {
                panic!(
                    "cache partition '{}': {} bytes accounted with no entries left, size accounting is inconsistent",
                    self.name, state.current_bytes
                );
            };
            self.debit(state, evicted.charged_bytes);
            trace!(
                "partition '{}' evicted '{}' ({} bytes), {} bytes remain",
                self.name,
                evicted_key.logical(),
                evicted.charged_bytes,
                state.current_bytes
            );
        }
    }

    fn debit(&self, state: &mut PartitionState<P>, bytes: u64) {
        state.current_bytes = state.current_bytes.checked_sub(bytes).unwrap_or_else(|| {
            panic!(
                "cache partition '{}': releasing {} bytes with only {} accounted, size accounting is inconsistent",
                self.name, bytes, state.current_bytes
            )
        });
    }
}

impl<P> fmt::Debug for Partition<P>
where
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Partition")
            .field("name", &self.name)
            .field("size_aware", &self.size_aware)
            .field("capacity_bytes", &self.capacity_bytes)
            .field("current_bytes", &state.current_bytes)
            .field("entry_count", &state.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Partition over byte buffers, weighed by their length.
    fn bytes_partition(capacity_bytes: u64, size_aware: bool) -> Partition<Vec<u8>> {
        Partition::new(
            "photos",
            capacity_bytes,
            size_aware,
            Arc::new(|p: &Vec<u8>| p.len() as u64),
        )
    }

    /// Partition where every payload costs the same fixed amount.
    fn fixed_cost_partition(capacity: u64, per_item: u64) -> Partition<&'static str> {
        Partition::new("p", capacity, true, Arc::new(move |_: &&'static str| per_item))
    }

    #[test]
    fn test_store_then_fetch_returns_payload() {
        let partition = bytes_partition(1024, true);
        partition
            .store("img", vec![1, 2, 3], Some(10.0), Some(10.0))
            .unwrap();

        let hit = partition.fetch("img", Some(10.0), Some(10.0)).unwrap();
        assert_eq!(*hit.unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_fetch_hands_out_the_same_handle() {
        let partition = bytes_partition(1024, false);
        partition.store("img", vec![7; 16], None, None).unwrap();

        let first = partition.fetch("img", None, None).unwrap().unwrap();
        let second = partition.fetch("img", None, None).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_eviction_removes_least_recently_used_first() {
        // Capacity 10, every item costs 6: the second store must push out
        // the first.
        let partition = fixed_cost_partition(10, 6);

        partition.store("img", "A", Some(100.0), Some(100.0)).unwrap();
        assert_eq!(partition.current_size_bytes(), 6);

        partition.store("img", "B", Some(50.0), Some(50.0)).unwrap();
        assert_eq!(partition.current_size_bytes(), 6);
        assert_eq!(partition.entry_count(), 1);

        assert!(partition.fetch("img", Some(100.0), Some(100.0)).unwrap().is_none());
        let survivor = partition.fetch("img", None, None).unwrap();
        assert_eq!(*survivor.unwrap(), "B");
    }

    #[test]
    fn test_fetch_promotes_the_entry() {
        let partition = bytes_partition(10, false);
        partition.store("a", vec![0; 4], None, None).unwrap();
        partition.store("b", vec![0; 4], None, None).unwrap();

        // Touch "a" so "b" becomes the coldest entry.
        partition.fetch("a", None, None).unwrap().unwrap();
        partition.store("c", vec![0; 4], None, None).unwrap();

        assert!(partition.fetch("b", None, None).unwrap().is_none());
        assert!(partition.fetch("a", None, None).unwrap().is_some());
        assert!(partition.fetch("c", None, None).unwrap().is_some());
    }

    #[test]
    fn test_store_promotes_an_existing_entry() {
        let partition = bytes_partition(10, false);
        partition.store("a", vec![1; 4], None, None).unwrap();
        partition.store("b", vec![2; 4], None, None).unwrap();

        // Re-storing "a" refreshes its recency, so "b" is evicted next.
        partition.store("a", vec![9; 4], None, None).unwrap();
        partition.store("c", vec![3; 4], None, None).unwrap();

        assert!(partition.fetch("b", None, None).unwrap().is_none());
        assert_eq!(*partition.fetch("a", None, None).unwrap().unwrap(), vec![9; 4]);
    }

    #[test]
    fn test_restore_same_key_never_increases_size() {
        let partition = bytes_partition(100, false);
        partition.store("k", vec![0; 10], None, None).unwrap();
        assert_eq!(partition.current_size_bytes(), 10);

        partition.store("k", vec![0; 50], None, None).unwrap();
        assert_eq!(partition.current_size_bytes(), 10);
        assert_eq!(partition.entry_count(), 1);

        let payload = partition.fetch("k", None, None).unwrap().unwrap();
        assert_eq!(payload.len(), 50);
    }

    #[test]
    fn test_dimensions_on_non_size_aware_store_fail() {
        let partition = bytes_partition(100, false);

        let err = partition
            .store("k", vec![1], Some(10.0), Some(10.0))
            .unwrap_err();
        assert!(matches!(err, CacheError::ConfigurationMismatch(_)));

        // A single supplied dimension is still a configuration mismatch here.
        let err = partition.store("k", vec![1], Some(10.0), None).unwrap_err();
        assert!(matches!(err, CacheError::ConfigurationMismatch(_)));
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let partition = bytes_partition(100, true);

        let err = partition
            .store("k", vec![1], Some(-1.0), Some(10.0))
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidDimension { .. }));

        let err = partition.fetch("k", Some(10.0), Some(-2.0)).unwrap_err();
        assert!(matches!(err, CacheError::InvalidDimension { .. }));
    }

    #[test]
    fn test_single_sided_dimensions_rejected() {
        let partition = bytes_partition(100, true);

        let err = partition.store("k", vec![1], Some(10.0), None).unwrap_err();
        assert!(matches!(err, CacheError::InvalidRequest { .. }));

        let err = partition.fetch("k", None, Some(10.0)).unwrap_err();
        assert!(matches!(err, CacheError::InvalidRequest { .. }));
    }

    #[test]
    fn test_fetch_without_dims_scans_size_aware() {
        let partition = bytes_partition(1024, true);
        partition.store("img", vec![1], None, None).unwrap();
        partition.store("img", vec![2], Some(100.0), Some(100.0)).unwrap();
        partition.store("other", vec![3], Some(5.0), Some(5.0)).unwrap();

        // First structural match in recency order: the dimensionless entry
        // was stored first and is still the coldest "img" variant.
        let hit = partition.fetch("img", None, None).unwrap().unwrap();
        assert_eq!(*hit, vec![1]);
    }

    #[test]
    fn test_fetch_with_dims_ignored_on_non_size_aware() {
        let partition = bytes_partition(100, false);
        partition.store("k", vec![5; 3], None, None).unwrap();

        let hit = partition.fetch("k", Some(3.0), Some(4.0)).unwrap();
        assert_eq!(*hit.unwrap(), vec![5; 3]);
    }

    #[test]
    fn test_rename_moves_every_variant() {
        let partition = bytes_partition(1024, true);
        partition.store("img", vec![1], None, None).unwrap();
        partition.store("img", vec![2], Some(100.0), Some(100.0)).unwrap();
        partition.store("img", vec![3], Some(50.0), Some(50.0)).unwrap();
        partition.store("other", vec![4], Some(10.0), Some(10.0)).unwrap();
        let size_before = partition.current_size_bytes();

        partition.rename("img", "pic");

        assert_eq!(*partition.fetch("pic", Some(100.0), Some(100.0)).unwrap().unwrap(), vec![2]);
        assert_eq!(*partition.fetch("pic", Some(50.0), Some(50.0)).unwrap().unwrap(), vec![3]);
        assert!(partition.fetch("pic", None, None).unwrap().is_some());

        assert!(partition.fetch("img", Some(100.0), Some(100.0)).unwrap().is_none());
        assert!(partition.fetch("img", None, None).unwrap().is_none());

        // Unrelated keys and the accounted size are untouched.
        assert!(partition.fetch("other", Some(10.0), Some(10.0)).unwrap().is_some());
        assert_eq!(partition.current_size_bytes(), size_before);
    }

    #[test]
    fn test_rename_missing_key_is_a_noop() {
        let partition = bytes_partition(100, true);
        partition.rename("ghost", "still-a-ghost");
        assert_eq!(partition.entry_count(), 0);

        partition.store("k", vec![1], None, None).unwrap();
        partition.rename("k", "k");
        assert_eq!(partition.entry_count(), 1);
        assert!(partition.fetch("k", None, None).unwrap().is_some());
    }

    #[test]
    fn test_rename_onto_existing_key_releases_its_charge() {
        let partition = bytes_partition(1000, false);
        partition.store("a", vec![0; 10], None, None).unwrap();
        partition.store("b", vec![0; 20], None, None).unwrap();
        assert_eq!(partition.current_size_bytes(), 30);

        partition.rename("a", "b");

        assert_eq!(partition.entry_count(), 1);
        assert_eq!(partition.current_size_bytes(), 10);
        assert_eq!(*partition.fetch("b", None, None).unwrap().unwrap(), vec![0; 10]);
        assert!(partition.fetch("a", None, None).unwrap().is_none());
    }

    #[test]
    fn test_oversized_entry_is_trimmed_away_immediately() {
        let partition = bytes_partition(10, false);
        partition.store("big", vec![0; 50], None, None).unwrap();

        assert_eq!(partition.entry_count(), 0);
        assert_eq!(partition.current_size_bytes(), 0);
        assert!(partition.fetch("big", None, None).unwrap().is_none());
    }

    #[test]
    fn test_size_stays_within_capacity_across_evictions() {
        let partition = fixed_cost_partition(10, 6);
        partition.store("a", "A", None, None).unwrap();
        partition.store("b", "B", None, None).unwrap();
        partition.store("c", "C", None, None).unwrap();

        assert_eq!(partition.current_size_bytes(), 6);
        assert_eq!(partition.entry_count(), 1);
        assert_eq!(*partition.fetch("c", None, None).unwrap().unwrap(), "C");
    }

    #[test]
    fn test_concurrent_stores_respect_capacity() {
        let partition = bytes_partition(64, false);

        std::thread::scope(|scope| {
            for t in 0..4 {
                let partition = &partition;
                scope.spawn(move || {
                    for i in 0..50 {
                        let key = format!("{}-{}", t, i);
                        partition.store(&key, vec![0; 8], None, None).unwrap();
                        partition.fetch(&key, None, None).unwrap();
                    }
                });
            }
        });

        assert!(partition.current_size_bytes() <= 64);
        assert_eq!(
            partition.current_size_bytes(),
            partition.entry_count() as u64 * 8
        );
    }
}
