// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded background task pool.
//!
//! Fire-and-forget work (avatar refreshes, webhook-triggered side effects)
//! goes through explicit submissions here rather than detached spawns, so
//! shutdown can drain in-flight work and the concurrency cap holds.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::warn;

pub struct TaskPool {
    semaphore: Arc<Semaphore>,
    join_set: Mutex<JoinSet<()>>,
}

impl TaskPool {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            join_set: Mutex::new(JoinSet::new()),
        }
    }

    /// Submit a background task. Waits for a slot when the pool is at its
    /// concurrency cap.
    pub async fn submit<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("task pool semaphore closed, dropping submission");
                return;
            }
        };

        let mut join_set = self.join_set.lock().await;
        // Reap already-finished tasks so the set doesn't grow unbounded.
        while join_set.try_join_next().is_some() {}
        join_set.spawn(async move {
            let _permit = permit;
            future.await;
        });
    }

    /// Number of tasks not yet reaped (at most a little above in-flight).
    pub async fn len(&self) -> usize {
        self.join_set.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Wait for every submitted task to finish.
    pub async fn drain(&self) {
        let mut join_set = self.join_set.lock().await;
        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result
                && e.is_panic()
            {
                warn!(error = %e, "background task panicked");
            }
        }
    }
}
