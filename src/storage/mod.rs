//! Storage Engine Module
//!
//! This module provides the core storage functionality for TallyKV:
//! a thread-safe, sharded key-value store where each value can carry a
//! read counter that removes it after a fixed number of reads.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  │ values  │ │ values  │ │ values  │ │         │           │
//! │  │ counters│ │ counters│ │ counters│ │         │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use tallykv::storage::{ReadLimit, StorageEngine, StorageError};
//! use bytes::Bytes;
//!
//! let engine = StorageEngine::new();
//! let key = Bytes::from("name");
//!
//! engine.insert_value(key.clone(), Bytes::from("Tally")).unwrap();
//! assert_eq!(engine.get_counter(&key), Some(ReadLimit::Unlimited));
//!
//! engine.insert_counter(&key, 3).unwrap();
//! assert_eq!(engine.delete_value(&key), Err(StorageError::Locked));
//! ```

pub mod engine;

// Re-export commonly used types
pub use engine::{ReadLimit, StorageEngine, StorageError, StorageStats, UNLIMITED_MARKER};
