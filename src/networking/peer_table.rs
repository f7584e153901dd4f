// Copyright (c) 2026 Blocker
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Established peers plus in-flight dial reservations.
//!
//! An address is dialed only after [`PeerTable::try_reserve`] claims it, so two tasks never
//! connect to the same peer at once. A reservation ends with [`PeerTable::register`] or
//! [`PeerTable::release`].

use crate::networking::{message::Version, transport::PeerClient};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// One established peer.
#[derive(Clone)]
pub struct PeerEntry {
    /// Last version the peer reported.
    pub version: Version,
    /// Outbound client.
    pub client: Arc<dyn PeerClient>,
}

#[derive(Default)]
struct Inner {
    peers: HashMap<String, PeerEntry>,
    pending: HashSet<String>,
}

/// Peer address -> last known version and client.
pub struct PeerTable {
    self_addr: String,
    inner: RwLock<Inner>,
}

impl PeerTable {
    /// Empty table for a node listening on `self_addr`.
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self {
            self_addr: self_addr.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Not self and not an established peer.
    pub fn can_connect(&self, addr: &str) -> bool {
        addr != self.self_addr && !self.read().peers.contains_key(addr)
    }

    /// Atomically claim `addr` for dialing. Fails for self, established peers and pending dials.
    pub fn try_reserve(&self, addr: &str) -> bool {
        if addr == self.self_addr {
            return false;
        }
        let mut g = self.write();
        if g.peers.contains_key(addr) || g.pending.contains(addr) {
            return false;
        }
        g.pending.insert(addr.to_string())
    }

    /// Drop a reservation after a failed dial.
    pub fn release(&self, addr: &str) {
        self.write().pending.remove(addr);
    }

    /// Record an established peer, ending any reservation. Returns `true` when it is new.
    ///
    /// A known peer only has its version refreshed.
    pub fn register(&self, addr: &str, version: Version, client: Arc<dyn PeerClient>) -> bool {
        if addr == self.self_addr {
            return false;
        }
        let mut g = self.write();
        g.pending.remove(addr);
        if let Some(entry) = g.peers.get_mut(addr) {
            entry.version = version;
            return false;
        }
        g.peers
            .insert(addr.to_string(), PeerEntry { version, client });
        true
    }

    /// Evict a peer. Returns `true` when it was present.
    pub fn remove(&self, addr: &str) -> bool {
        self.write().peers.remove(addr).is_some()
    }

    /// Whether `addr` is an established peer.
    pub fn contains(&self, addr: &str) -> bool {
        self.read().peers.contains_key(addr)
    }

    /// Established peer addresses, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut out: Vec<String> = self.read().peers.keys().cloned().collect();
        out.sort();
        out
    }

    /// Snapshot of clients, skipping `except`.
    pub fn clients(&self, except: Option<&str>) -> Vec<Arc<dyn PeerClient>> {
        self.read()
            .peers
            .iter()
            .filter(|(addr, _)| Some(addr.as_str()) != except)
            .map(|(_, e)| Arc::clone(&e.client))
            .collect()
    }

    /// Client for an established peer.
    pub fn client(&self, addr: &str) -> Option<Arc<dyn PeerClient>> {
        self.read().peers.get(addr).map(|e| Arc::clone(&e.client))
    }

    /// Last version reported by `addr`.
    pub fn version(&self, addr: &str) -> Option<Version> {
        self.read().peers.get(addr).map(|e| e.version.clone())
    }

    /// Number of established peers.
    pub fn len(&self) -> usize {
        self.read().peers.len()
    }

    /// True when no peer is established.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::{
        message::{Envelope, Response},
        transport::RpcError,
    };
    use async_trait::async_trait;

    struct NullClient(String);

    #[async_trait]
    impl PeerClient for NullClient {
        fn addr(&self) -> &str {
            &self.0
        }

        async fn call(&self, _envelope: Envelope) -> Result<Response, RpcError> {
            Err(RpcError::Unreachable(self.0.clone()))
        }
    }

    fn version(addr: &str) -> Version {
        Version {
            protocol_version: "blocker-1".into(),
            height: 0,
            listen_addr: addr.into(),
            peers: vec![],
        }
    }

    fn client(addr: &str) -> Arc<dyn PeerClient> {
        Arc::new(NullClient(addr.into()))
    }

    #[test]
    fn reserve_is_exclusive_until_released() {
        let t = PeerTable::new("a");
        assert!(!t.try_reserve("a"));
        assert!(t.try_reserve("b"));
        assert!(!t.try_reserve("b"));
        t.release("b");
        assert!(t.try_reserve("b"));
    }

    #[test]
    fn register_ends_reservation_and_dedups() {
        let t = PeerTable::new("a");
        assert!(t.try_reserve("b"));
        assert!(t.register("b", version("b"), client("b")));
        assert!(!t.try_reserve("b"));
        assert!(!t.can_connect("b"));

        let mut v = version("b");
        v.height = 9;
        assert!(!t.register("b", v, client("b")));
        assert_eq!(t.len(), 1);
        assert_eq!(t.version("b").map(|v| v.height), Some(9));
    }

    #[test]
    fn self_is_never_registered() {
        let t = PeerTable::new("a");
        assert!(!t.can_connect("a"));
        assert!(!t.register("a", version("a"), client("a")));
        assert!(t.is_empty());
    }

    #[test]
    fn remove_and_clients_snapshot() {
        let t = PeerTable::new("a");
        t.register("b", version("b"), client("b"));
        t.register("c", version("c"), client("c"));
        assert_eq!(t.addresses(), vec!["b".to_string(), "c".to_string()]);

        let others: Vec<String> = t
            .clients(Some("b"))
            .iter()
            .map(|c| c.addr().to_string())
            .collect();
        assert_eq!(others, vec!["c".to_string()]);

        assert!(t.remove("b"));
        assert!(!t.remove("b"));
        assert!(t.can_connect("b"));
        assert_eq!(t.len(), 1);
    }
}
