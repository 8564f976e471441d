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

//! Bounded queues with an explicit policy for what happens when they fill up.
//!
//! Poll-mode servers park outbound calls for a client in a [`BoundedQueue`]
//! until the client polls for them. When a client stops polling the queue
//! fills, and the configured [`BackpressurePolicy`] decides between making
//! the producer wait, evicting the oldest entry, or refusing the new one.
//!
//! # Examples
//!
//! ```rust
//! use xrpc::backpressure::{BackpressurePolicy, BoundedQueue};
//!
//! # async fn example() {
//! let queue = BoundedQueue::new(2, BackpressurePolicy::DropOldest);
//!
//! queue.push("a").await.unwrap();
//! queue.push("b").await.unwrap();
//!
//! // Full: the oldest entry is handed back to the producer.
//! let evicted = queue.push("c").await.unwrap();
//! assert_eq!(evicted, Some("a"));
//!
//! assert_eq!(queue.pop().await, "b");
//! let metrics = queue.metrics();
//! println!("Queue depth: {}/{}", metrics.depth, metrics.capacity);
//! # }
//! ```

mod bounded_queue;
mod policy;

pub use bounded_queue::{BoundedQueue, QueueFull};
pub use policy::{BackpressurePolicy, QueueMetrics};
