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

//! Tracking of outstanding calls awaiting their replies.

use crate::exchanger::ExchangeError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::oneshot;

/// Outcome delivered to a waiting caller.
pub(crate) type ReplyResult = Result<Vec<u8>, ExchangeError>;

/// Maps correlation ids of outstanding calls to their private reply channels.
///
/// Entries are inserted by the calling task and removed by whichever comes
/// first: the read loop delivering the reply, the caller timing out, or the
/// exchanger shutting down.
///
/// # Example
///
/// ```rust
/// use xrpc::exchanger::PendingReplies;
///
/// # async fn example() {
/// let pending = PendingReplies::new();
/// let rx = pending.register(42).expect("id is free");
///
/// assert!(pending.complete(42, b"reply".to_vec()));
/// assert_eq!(rx.await.unwrap().unwrap(), b"reply");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PendingReplies {
    replies: Mutex<HashMap<i64, oneshot::Sender<ReplyResult>>>,
}

impl PendingReplies {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `correlation_id`.
    ///
    /// Returns `None` if the id is already outstanding; the caller must pick
    /// another id.
    pub fn register(&self, correlation_id: i64) -> Option<oneshot::Receiver<ReplyResult>> {
        match self.replies.lock().entry(correlation_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(tx);
                Some(rx)
            }
        }
    }

    /// Delivers a reply payload.
    ///
    /// Returns `false` if no caller is waiting for this id (already timed out,
    /// duplicate reply, or never issued).
    pub fn complete(&self, correlation_id: i64, payload: Vec<u8>) -> bool {
        match self.replies.lock().remove(&correlation_id) {
            Some(tx) => tx.send(Ok(payload)).is_ok(),
            None => false,
        }
    }

    /// Removes the waiter for `correlation_id` without delivering anything.
    pub fn cancel(&self, correlation_id: i64) -> bool {
        self.replies.lock().remove(&correlation_id).is_some()
    }

    /// Releases every waiter with an error built by `error`.
    ///
    /// Returns how many waiters were released.
    pub fn fail_all(&self, error: impl Fn() -> ExchangeError) -> usize {
        let drained: Vec<_> = self.replies.lock().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(error()));
        }
        count
    }

    /// Number of outstanding calls.
    pub fn len(&self) -> usize {
        self.replies.lock().len()
    }

    /// Returns `true` if no call is outstanding.
    pub fn is_empty(&self) -> bool {
        self.replies.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_complete() {
        let pending = PendingReplies::new();
        let rx = pending.register(1).unwrap();
        assert_eq!(pending.len(), 1);

        assert!(pending.complete(1, vec![7]));
        assert_eq!(rx.await.unwrap().unwrap(), vec![7]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_register_rejects_outstanding_id() {
        let pending = PendingReplies::new();
        let _rx = pending.register(5).unwrap();
        assert!(pending.register(5).is_none());
        assert!(pending.register(6).is_some());
    }

    #[test]
    fn test_complete_unknown_id() {
        let pending = PendingReplies::new();
        assert!(!pending.complete(99, vec![]));
    }

    #[tokio::test]
    async fn test_cancel_drops_waiter() {
        let pending = PendingReplies::new();
        let rx = pending.register(3).unwrap();
        assert!(pending.cancel(3));
        assert!(!pending.cancel(3));
        assert!(rx.await.is_err());
        assert!(!pending.complete(3, vec![]));
    }

    #[tokio::test]
    async fn test_fail_all_releases_everyone() {
        let pending = PendingReplies::new();
        let receivers: Vec<_> = (1..=3).map(|id| pending.register(id).unwrap()).collect();

        assert_eq!(pending.fail_all(|| ExchangeError::Closed), 3);
        for rx in receivers {
            assert!(matches!(rx.await.unwrap(), Err(ExchangeError::Closed)));
        }
        assert!(pending.is_empty());
    }
}
