// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sharded key-lock manager.
//!
//! Serializes contact/conversation resolution per identifier. A fixed shard
//! count bounds memory at the cost of occasional false contention: two keys
//! hashing to the same shard block each other, keys on different shards never
//! do. Guards are owned and may be held across network calls; those calls are
//! bounded by request timeouts.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Default shard count.
pub const SHARD_COUNT: usize = 64;

pub struct KeyLocks {
    shards: Vec<Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::with_shards(SHARD_COUNT)
    }

    pub fn with_shards(count: usize) -> Self {
        let count = count.max(1);
        Self {
            shards: (0..count).map(|_| Arc::new(Mutex::new(()))).collect(),
        }
    }

    /// Acquire the shard lock for `key`, waiting if another holder has it.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let idx = self.shard_index(key);
        Arc::clone(&self.shards[idx]).lock_owned().await
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new()
    }
}
