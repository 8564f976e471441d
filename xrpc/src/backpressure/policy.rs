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

use serde::{Deserialize, Serialize};

/// What a [`BoundedQueue`](super::BoundedQueue) does with a push while full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Wait until a consumer frees a slot.
    #[default]
    Block,

    /// Evict the oldest queued entry and hand it back to the producer.
    DropOldest,

    /// Refuse the new entry and hand it back to the producer.
    Reject,
}

/// Point-in-time counters for a bounded queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Entries currently queued
    pub depth: usize,

    /// Maximum number of entries
    pub capacity: usize,

    /// Total entries accepted
    pub pushed: u64,

    /// Total entries handed to consumers
    pub popped: u64,

    /// Total entries evicted under [`BackpressurePolicy::DropOldest`]
    pub dropped: u64,

    /// Total entries refused under [`BackpressurePolicy::Reject`]
    pub rejected: u64,

    /// Total time producers spent waiting for capacity (milliseconds)
    pub wait_time_ms: u64,
}

impl QueueMetrics {
    /// Calculate the current utilization as a percentage (0-100).
    pub fn utilization_percent(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            (self.depth as f64 / self.capacity as f64) * 100.0
        }
    }

    /// Check if the queue is at capacity.
    pub fn is_full(&self) -> bool {
        self.depth >= self.capacity
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization() {
        let metrics = QueueMetrics {
            depth: 5,
            capacity: 20,
            ..Default::default()
        };
        assert_eq!(metrics.utilization_percent(), 25.0);
        assert!(!metrics.is_full());
        assert!(!metrics.is_empty());

        let zero = QueueMetrics::default();
        assert_eq!(zero.utilization_percent(), 0.0);
        assert!(zero.is_full());
        assert!(zero.is_empty());
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: BackpressurePolicy = serde_json::from_str("\"drop_oldest\"").unwrap();
        assert_eq!(policy, BackpressurePolicy::DropOldest);
        assert_eq!(BackpressurePolicy::default(), BackpressurePolicy::Block);
    }
}
