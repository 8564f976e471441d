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

//! Peer bookkeeping for a node.
//!
//! Two kinds of peers are tracked under their peer id:
//!
//! - **inbound** peers dialled this node; their exchanger lives exactly as
//!   long as their connection and is dropped from the table on disconnect
//! - **upstream** peers were dialled by this node; the entry outlives its
//!   connection so the next call can re-dial it

use crate::exchanger::Exchanger;
use crate::reconnection::{ReconnectionStrategy, connect_with_retry};
use crate::transport::{Connection, Connector, TransportError, TransportId};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// An outbound peer: how to reach it, and the connection currently open to it.
pub(crate) struct Upstream {
    connector: Arc<dyn Connector>,
    current: tokio::sync::Mutex<Option<Exchanger>>,
}

impl Upstream {
    pub(crate) fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            current: tokio::sync::Mutex::new(None),
        }
    }

    pub(crate) fn target(&self) -> &str {
        self.connector.target()
    }

    /// Returns the open exchanger, dialling a new connection if there is none
    /// or the previous one failed.
    ///
    /// Concurrent callers wait for a single dial.
    pub(crate) async fn exchanger(
        &self,
        strategy: &dyn ReconnectionStrategy,
        attach: impl FnOnce(Box<dyn Connection>) -> Exchanger,
    ) -> Result<Exchanger, TransportError> {
        let mut current = self.current.lock().await;
        if let Some(exchanger) = current.as_ref().filter(|e| !e.is_closed()) {
            return Ok(exchanger.clone());
        }
        if current.take().is_some() {
            debug!(target_addr = self.target(), "re-dialling upstream peer");
        }

        let connection = connect_with_retry(self.connector.as_ref(), strategy).await?;
        let exchanger = attach(connection);
        *current = Some(exchanger.clone());
        Ok(exchanger)
    }

    /// The open exchanger, without dialling.
    pub(crate) fn current(&self) -> Option<Exchanger> {
        self.current
            .try_lock()
            .ok()
            .and_then(|current| current.clone())
            .filter(|e| !e.is_closed())
    }

    pub(crate) async fn close(&self) {
        if let Some(exchanger) = self.current.lock().await.take() {
            exchanger.close().await;
        }
    }
}

/// Inbound and upstream peers keyed by peer id.
#[derive(Default)]
pub(crate) struct PeerTable {
    inbound: RwLock<HashMap<String, Exchanger>>,
    upstreams: RwLock<HashMap<String, Arc<Upstream>>>,
}

impl PeerTable {
    /// Registers an inbound peer, returning the exchanger it replaced.
    pub(crate) fn insert_inbound(&self, peer_id: &str, exchanger: Exchanger) -> Option<Exchanger> {
        self.inbound.write().insert(peer_id.to_string(), exchanger)
    }

    /// Removes an inbound peer, but only if its entry still belongs to the
    /// connection `transport`. A peer that reconnected keeps its new entry.
    pub(crate) fn remove_inbound_if(&self, peer_id: &str, transport: TransportId) -> bool {
        let mut inbound = self.inbound.write();
        match inbound.get(peer_id) {
            Some(exchanger) if exchanger.metadata().id == transport => {
                inbound.remove(peer_id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn inbound(&self, peer_id: &str) -> Option<Exchanger> {
        self.inbound
            .read()
            .get(peer_id)
            .filter(|e| !e.is_closed())
            .cloned()
    }

    pub(crate) fn insert_upstream(&self, peer_id: &str, upstream: Arc<Upstream>) -> Option<Arc<Upstream>> {
        self.upstreams.write().insert(peer_id.to_string(), upstream)
    }

    pub(crate) fn upstream(&self, peer_id: &str) -> Option<Arc<Upstream>> {
        self.upstreams.read().get(peer_id).cloned()
    }

    /// Removes both kinds of entry for `peer_id`.
    pub(crate) fn remove(&self, peer_id: &str) -> (Option<Exchanger>, Option<Arc<Upstream>>) {
        let inbound = self.inbound.write().remove(peer_id);
        let upstream = self.upstreams.write().remove(peer_id);
        (inbound, upstream)
    }

    /// Empties the table.
    pub(crate) fn drain(&self) -> (Vec<Exchanger>, Vec<Arc<Upstream>>) {
        let inbound = self.inbound.write().drain().map(|(_, e)| e).collect();
        let upstreams = self.upstreams.write().drain().map(|(_, u)| u).collect();
        (inbound, upstreams)
    }

    /// Sorted ids of every known peer.
    pub(crate) fn ids(&self) -> Vec<String> {
        let mut ids: BTreeSet<String> = self.inbound.read().keys().cloned().collect();
        ids.extend(self.upstreams.read().keys().cloned());
        ids.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanger::ExchangerConfig;
    use crate::transport::MemoryConnection;

    fn exchanger() -> (Exchanger, Exchanger) {
        let (a, b) = MemoryConnection::pair_default();
        (
            Exchanger::new(Box::new(a), ExchangerConfig::default()),
            Exchanger::new(Box::new(b), ExchangerConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_stale_removal_keeps_new_entry() {
        let table = PeerTable::default();
        let (old, _old_peer) = exchanger();
        let (new, _new_peer) = exchanger();
        let old_id = old.metadata().id;

        table.insert_inbound("p", old);
        assert!(table.insert_inbound("p", new.clone()).is_some());

        assert!(!table.remove_inbound_if("p", old_id));
        assert!(table.inbound("p").is_some());
        assert!(table.remove_inbound_if("p", new.metadata().id));
        assert!(table.inbound("p").is_none());
    }

    #[tokio::test]
    async fn test_closed_inbound_is_hidden() {
        let table = PeerTable::default();
        let (local, _remote) = exchanger();
        table.insert_inbound("p", local.clone());
        local.close().await;
        assert!(table.inbound("p").is_none());
        assert_eq!(table.ids(), vec!["p".to_string()]);
    }
}
