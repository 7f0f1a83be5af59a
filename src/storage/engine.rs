//! Thread-Safe Storage Engine with Read-Count Expiry
//!
//! This module implements the core storage engine for TallyKV.
//! Every key maps to an opaque value and, optionally, to a read counter that
//! limits how many more times the value may be read.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over independent shards to reduce contention.
//! 2. **Two Maps per Shard**: Values and counters live side by side under the same
//!    lock, so a single guard covers every map a key touches.
//! 3. **Read-then-Write**: Unlimited reads only need the shared lock; reads that
//!    decrement a counter retake the shard exclusively and re-check.
//!
//! ## Value / Counter Lifecycle
//!
//! ```text
//!   insert_value ──> [value, no counter] ──insert_counter──> [value, counter n]
//!        ▲                   │                                   │     │
//!        │             delete_value                     get_value│     │delete_counter
//!        │                   ▼                                   ▼     ▼
//!        └──────────────  (absent)  <──── n reaches 0 ───── [value, n-1] ...
//! ```
//!
//! A key with a counter attached is *locked*: its value can be neither replaced
//! nor deleted until the counter runs out or is removed.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// Marker returned by [`ReadLimit`] for values without a read counter.
pub const UNLIMITED_MARKER: &str = "Infinity";

/// Errors returned when an operation would break the value/counter invariants.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The key has a read counter attached
    #[error("key is locked by an active read counter")]
    Locked,

    /// A counter was requested for a key that has no value
    #[error("key has no value to attach a counter to")]
    MissingValue,
}

/// How many more reads a stored value allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLimit {
    /// No counter attached
    Unlimited,
    /// A counter is attached with this many reads left
    Remaining(u64),
}

impl fmt::Display for ReadLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadLimit::Unlimited => f.write_str(UNLIMITED_MARKER),
            ReadLimit::Remaining(n) => write!(f, "{}", n),
        }
    }
}

/// The maps owned by a single shard.
#[derive(Debug, Default)]
struct ShardMaps {
    values: HashMap<Bytes, Bytes>,
    counters: HashMap<Bytes, u64>,
}

/// A single shard containing a portion of the keys.
#[derive(Debug, Default)]
struct Shard {
    maps: RwLock<ShardMaps>,
}

impl Shard {
    fn read(&self) -> RwLockReadGuard<'_, ShardMaps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShardMaps> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The main storage engine for TallyKV.
///
/// Wrap it in an `Arc` and hand a clone to every connection. All operations
/// are atomic with respect to each other for the same key.
///
/// # Example
///
/// ```
/// use tallykv::storage::{ReadLimit, StorageEngine};
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// let key = Bytes::from("greeting");
///
/// engine.insert_value(key.clone(), Bytes::from("hello")).unwrap();
/// engine.insert_counter(&key, 1).unwrap();
/// assert_eq!(engine.get_counter(&key), Some(ReadLimit::Remaining(1)));
///
/// // The last allowed read still returns the value, then the key is gone.
/// assert_eq!(engine.get_value(&key), Some(Bytes::from("hello")));
/// assert_eq!(engine.get_value(&key), None);
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,

    /// Statistics: live values
    value_count: AtomicU64,

    /// Statistics: live counters
    counter_count: AtomicU64,

    /// Statistics: value and counter reads
    get_count: AtomicU64,

    /// Statistics: value and counter inserts
    insert_count: AtomicU64,

    /// Statistics: value and counter deletes
    del_count: AtomicU64,

    /// Statistics: entries removed because their counter ran out
    exhausted_count: AtomicU64,
}

impl fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("value_count", &self.value_count.load(Ordering::Relaxed))
            .field("counter_count", &self.counter_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty storage engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            value_count: AtomicU64::new(0),
            counter_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            insert_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            exhausted_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    // ========================================================================
    // VALUE OPERATIONS
    // ========================================================================

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] without touching the store if a read
    /// counter is attached to the key.
    pub fn insert_value(&self, key: Bytes, value: Bytes) -> Result<(), StorageError> {
        self.insert_count.fetch_add(1, Ordering::Relaxed);

        let mut maps = self.get_shard(&key).write();
        if maps.counters.contains_key(&key) {
            return Err(StorageError::Locked);
        }

        if maps.values.insert(key, value).is_none() {
            self.value_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Reads the value for `key`.
    ///
    /// If a counter is attached it is decremented. When it reaches zero the
    /// value and the counter are both removed before this call returns, and the
    /// value that was just read is still handed back.
    pub fn get_value(&self, key: &Bytes) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);

        // Fast path: unlimited or missing values only need a shared lock
        {
            let maps = shard.read();
            match maps.values.get(key) {
                None => return None,
                Some(value) if !maps.counters.contains_key(key) => return Some(value.clone()),
                Some(_) => {}
            }
        }

        // A counter is attached, redo the lookup under the exclusive lock
        let mut maps = shard.write();
        let value = maps.values.get(key)?.clone();

        let remaining = match maps.counters.get_mut(key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            // Race: the counter was deleted between the two locks
            None => return Some(value),
        };

        if remaining == 0 {
            maps.counters.remove(key);
            maps.values.remove(key);
            self.counter_count.fetch_sub(1, Ordering::Relaxed);
            self.value_count.fetch_sub(1, Ordering::Relaxed);
            self.exhausted_count.fetch_add(1, Ordering::Relaxed);
        }

        Some(value)
    }

    /// Removes and returns the value for `key`.
    ///
    /// Returns `Ok(None)` if there is no value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if a read counter is attached.
    pub fn delete_value(&self, key: &Bytes) -> Result<Option<Bytes>, StorageError> {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut maps = self.get_shard(key).write();
        if !maps.values.contains_key(key) {
            return Ok(None);
        }
        if maps.counters.contains_key(key) {
            return Err(StorageError::Locked);
        }

        let removed = maps.values.remove(key);
        if removed.is_some() {
            self.value_count.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    // ========================================================================
    // COUNTER OPERATIONS
    // ========================================================================

    /// Adds `delta` reads to the counter for `key`, creating it if needed.
    ///
    /// Returns the new remaining count. The count saturates at `u64::MAX`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingValue`] without creating anything if the
    /// key has no value.
    pub fn insert_counter(&self, key: &Bytes, delta: u64) -> Result<u64, StorageError> {
        self.insert_count.fetch_add(1, Ordering::Relaxed);

        let mut maps = self.get_shard(key).write();
        if !maps.values.contains_key(key) {
            return Err(StorageError::MissingValue);
        }

        let count = match maps.counters.get_mut(key) {
            Some(count) => {
                *count = count.saturating_add(delta);
                *count
            }
            None => {
                maps.counters.insert(key.clone(), delta);
                self.counter_count.fetch_add(1, Ordering::Relaxed);
                delta
            }
        };
        Ok(count)
    }

    /// Returns how many reads the value for `key` still allows.
    ///
    /// `None` means there is no value at all.
    pub fn get_counter(&self, key: &Bytes) -> Option<ReadLimit> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let maps = self.get_shard(key).read();
        if !maps.values.contains_key(key) {
            return None;
        }
        Some(match maps.counters.get(key) {
            Some(&n) => ReadLimit::Remaining(n),
            None => ReadLimit::Unlimited,
        })
    }

    /// Removes the counter for `key` and returns its remaining count.
    ///
    /// The value itself is left in place and becomes read-unlimited.
    pub fn delete_counter(&self, key: &Bytes) -> Option<u64> {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut maps = self.get_shard(key).write();
        let removed = maps.counters.remove(key);
        if removed.is_some() {
            self.counter_count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    /// Returns the approximate number of stored values.
    pub fn len(&self) -> u64 {
        self.value_count.load(Ordering::Relaxed)
    }

    /// Returns true if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns database statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            values: self.value_count.load(Ordering::Relaxed),
            counters: self.counter_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            insert_ops: self.insert_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            exhausted: self.exhausted_count.load(Ordering::Relaxed),
        }
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Live values
    pub values: u64,
    /// Live read counters
    pub counters: u64,
    /// Value and counter reads
    pub get_ops: u64,
    /// Value and counter inserts, including refused ones
    pub insert_ops: u64,
    /// Value and counter deletes, including refused ones
    pub del_ops: u64,
    /// Entries removed because their counter reached zero
    pub exhausted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_missing_key_reports_absence() {
        let engine = StorageEngine::new();
        let k = key("never");

        assert_eq!(engine.get_value(&k), None);
        assert_eq!(engine.delete_value(&k), Ok(None));
        assert_eq!(engine.get_counter(&k), None);
        assert_eq!(engine.delete_counter(&k), None);
    }

    #[test]
    fn test_insert_and_get_unlimited() {
        let engine = StorageEngine::new();
        let k = key("k");

        engine.insert_value(k.clone(), key("v")).unwrap();
        for _ in 0..5 {
            assert_eq!(engine.get_value(&k), Some(key("v")));
        }
        assert_eq!(engine.get_counter(&k), Some(ReadLimit::Unlimited));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_overwrite_when_unlocked() {
        let engine = StorageEngine::new();
        let k = key("k");

        engine.insert_value(k.clone(), key("one")).unwrap();
        engine.insert_value(k.clone(), key("two")).unwrap();
        assert_eq!(engine.get_value(&k), Some(key("two")));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_counter_expires_value() {
        let engine = StorageEngine::new();
        let k = key("test");

        engine.insert_value(k.clone(), key("HelloWorld")).unwrap();
        assert_eq!(engine.insert_counter(&k, 2), Ok(2));

        assert_eq!(engine.get_value(&k), Some(key("HelloWorld")));
        assert_eq!(engine.get_counter(&k), Some(ReadLimit::Remaining(1)));

        assert_eq!(engine.get_value(&k), Some(key("HelloWorld")));
        assert_eq!(engine.get_counter(&k), None);

        assert_eq!(engine.get_value(&k), None);
        assert!(engine.is_empty());
        assert_eq!(engine.stats().exhausted, 1);
        assert_eq!(engine.stats().counters, 0);
    }

    #[test]
    fn test_zero_counter_allows_one_final_read() {
        let engine = StorageEngine::new();
        let k = key("k");

        engine.insert_value(k.clone(), key("v")).unwrap();
        assert_eq!(engine.insert_counter(&k, 0), Ok(0));
        assert_eq!(engine.insert_value(k.clone(), key("w")), Err(StorageError::Locked));

        assert_eq!(engine.get_value(&k), Some(key("v")));
        assert_eq!(engine.get_value(&k), None);
    }

    #[test]
    fn test_counter_requires_value() {
        let engine = StorageEngine::new();
        let k = key("k2");

        assert_eq!(engine.insert_counter(&k, 3), Err(StorageError::MissingValue));
        assert_eq!(engine.get_counter(&k), None);
        assert_eq!(engine.delete_counter(&k), None);
        assert_eq!(engine.stats().counters, 0);
    }

    #[test]
    fn test_counter_locks_value() {
        let engine = StorageEngine::new();
        let k = key("k3");

        engine.insert_value(k.clone(), key("Secret")).unwrap();
        engine.insert_counter(&k, 1).unwrap();

        assert_eq!(engine.delete_value(&k), Err(StorageError::Locked));
        assert_eq!(
            engine.insert_value(k.clone(), key("NewSecret")),
            Err(StorageError::Locked)
        );

        assert_eq!(engine.delete_counter(&k), Some(1));
        assert_eq!(engine.get_counter(&k), Some(ReadLimit::Unlimited));

        assert_eq!(engine.delete_value(&k), Ok(Some(key("Secret"))));
        assert_eq!(engine.get_value(&k), None);
    }

    #[test]
    fn test_counter_deltas_accumulate() {
        let engine = StorageEngine::new();
        let k = key("k");

        engine.insert_value(k.clone(), key("v")).unwrap();
        assert_eq!(engine.insert_counter(&k, 2), Ok(2));
        assert_eq!(engine.insert_counter(&k, 3), Ok(5));
        assert_eq!(engine.get_counter(&k), Some(ReadLimit::Remaining(5)));
        assert_eq!(engine.stats().counters, 1);
    }

    #[test]
    fn test_counter_saturates() {
        let engine = StorageEngine::new();
        let k = key("k");

        engine.insert_value(k.clone(), key("v")).unwrap();
        engine.insert_counter(&k, u64::MAX).unwrap();
        assert_eq!(engine.insert_counter(&k, 10), Ok(u64::MAX));
    }

    #[test]
    fn test_read_limit_display() {
        assert_eq!(ReadLimit::Unlimited.to_string(), "Infinity");
        assert_eq!(ReadLimit::Remaining(42).to_string(), "42");
    }

    #[test]
    fn test_concurrent_reads_consume_counter_exactly() {
        use std::sync::Arc;
        use std::thread;

        let engine = Arc::new(StorageEngine::new());
        let k = key("shared");
        engine.insert_value(k.clone(), key("v")).unwrap();
        engine.insert_counter(&k, 100).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let k = k.clone();
                thread::spawn(move || (0..50).filter(|_| engine.get_value(&k).is_some()).count())
            })
            .collect();

        let hits: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(hits, 100);
        assert_eq!(engine.get_value(&k), None);
        assert_eq!(engine.stats().exhausted, 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let engine = Arc::new(StorageEngine::new());
        let mut handles = vec![];

        for i in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let k = Bytes::from(format!("key-{}-{}", i, j));
                    engine.insert_value(k.clone(), Bytes::from("value")).unwrap();
                    engine.get_value(&k);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 1000);
    }
}
