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

//! Correlation id generation.

use rand::Rng;

/// Draws correlation ids for outgoing calls.
///
/// Ids are random positive 63-bit integers. Collisions with another
/// outstanding call are practically impossible, and
/// [`PendingReplies::register`](crate::exchanger::PendingReplies::register)
/// rejects them anyway so the caller can draw again.
///
/// # Example
///
/// ```rust
/// use xrpc::exchanger::CorrelationIdGenerator;
///
/// let generator = CorrelationIdGenerator::new();
/// let id = generator.next();
/// assert!(id > 0);
/// ```
#[derive(Debug, Default)]
pub struct CorrelationIdGenerator;

impl CorrelationIdGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Draws the next id, in `1..=i64::MAX`.
    #[must_use]
    pub fn next(&self) -> i64 {
        rand::thread_rng().gen_range(1..=i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_positive() {
        let generator = CorrelationIdGenerator::new();
        for _ in 0..1000 {
            assert!(generator.next() > 0);
        }
    }

    #[test]
    fn test_ids_are_unique_in_practice() {
        let generator = CorrelationIdGenerator::new();
        let ids: HashSet<i64> = (0..10_000).map(|_| generator.next()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_negated_id_is_representable() {
        let generator = CorrelationIdGenerator::new();
        let id = generator.next();
        assert_eq!((-id).abs(), id);
    }
}
