//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use super::policy::{BackpressurePolicy, QueueMetrics};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Notify;

/// Returned by [`BoundedQueue::push`] when the queue is full and its policy
/// is [`BackpressurePolicy::Reject`]. Carries the refused entry.
#[derive(Error)]
#[error("queue is full")]
pub struct QueueFull<T>(pub T);

impl<T> fmt::Debug for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueFull(..)")
    }
}

/// A FIFO queue with a fixed capacity and an explicit [`BackpressurePolicy`].
///
/// Producers and consumers may live on different tasks; all operations take
/// `&self`.
pub struct BoundedQueue<T> {
    capacity: usize,
    policy: BackpressurePolicy,
    state: Mutex<QueueState<T>>,
    not_empty: Notify,
    not_full: Notify,
}

struct QueueState<T> {
    items: VecDeque<T>,
    pushed: u64,
    popped: u64,
    dropped: u64,
    rejected: u64,
    wait_time_ms: u64,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize, policy: BackpressurePolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            policy,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                pushed: 0,
                popped: 0,
                dropped: 0,
                rejected: 0,
                wait_time_ms: 0,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Get the capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the policy applied when full.
    pub fn policy(&self) -> BackpressurePolicy {
        self.policy
    }

    /// Get the current queue depth.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Append `item`, applying the policy if the queue is full.
    ///
    /// Returns the evicted entry under [`BackpressurePolicy::DropOldest`],
    /// `None` otherwise. Under [`BackpressurePolicy::Block`] this waits for a
    /// consumer to free a slot.
    ///
    /// # Errors
    ///
    /// [`QueueFull`] with the refused item under [`BackpressurePolicy::Reject`].
    pub async fn push(&self, item: T) -> Result<Option<T>, QueueFull<T>> {
        let mut waiting_since: Option<Instant> = None;

        loop {
            let notified = self.not_full.notified();
            {
                let mut state = self.state.lock();
                if let Some(start) = waiting_since.take() {
                    state.wait_time_ms += start.elapsed().as_millis() as u64;
                }

                if state.items.len() < self.capacity {
                    state.items.push_back(item);
                    state.pushed += 1;
                    drop(state);
                    self.not_empty.notify_one();
                    return Ok(None);
                }

                match self.policy {
                    BackpressurePolicy::DropOldest => {
                        let evicted = state.items.pop_front();
                        state.items.push_back(item);
                        state.pushed += 1;
                        state.dropped += 1;
                        drop(state);
                        self.not_empty.notify_one();
                        return Ok(evicted);
                    }
                    BackpressurePolicy::Reject => {
                        state.rejected += 1;
                        return Err(QueueFull(item));
                    }
                    BackpressurePolicy::Block => {
                        waiting_since = Some(Instant::now());
                    }
                }
            }
            notified.await;
        }
    }

    /// Remove the oldest entry, waiting until one is available.
    ///
    /// Cancel safe: dropping the future never loses an entry.
    pub async fn pop(&self) -> T {
        loop {
            let notified = self.not_empty.notified();
            if let Some(item) = self.try_pop() {
                return item;
            }
            notified.await;
        }
    }

    /// Remove the oldest entry if there is one.
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.items.pop_front()?;
        state.popped += 1;
        drop(state);
        self.not_full.notify_one();
        Some(item)
    }

    /// Remove and return every queued entry.
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        let items: Vec<T> = state.items.drain(..).collect();
        state.popped += items.len() as u64;
        drop(state);
        self.not_full.notify_waiters();
        items
    }

    /// Snapshot the queue counters.
    pub fn metrics(&self) -> QueueMetrics {
        let state = self.state.lock();
        QueueMetrics {
            depth: state.items.len(),
            capacity: self.capacity,
            pushed: state.pushed,
            popped: state.popped,
            dropped: state.dropped,
            rejected: state.rejected,
            wait_time_ms: state.wait_time_ms,
        }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("depth", &self.len())
            .finish()
    }
}
