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

//! Peer protocol node: handshake and discovery, transaction and block gossip, chain sync and
//! the validator loop.
//!
//! Gossip fan-out never fails the caller. Relayed transactions and blocks are fanned out on a
//! background task, so an inbound request is acknowledged without waiting on other peers. A peer
//! whose call fails at the transport level (I/O, timeout, bad frame) is evicted; a peer that
//! answers with a refusal is kept.

use crate::{
    core::{
        chain::{Chain, ChainError, BLOCK_VERSION},
        ledger::{
            block::{hash_block, hash_header, sign_block},
            transaction::{hash_transaction, verify_transaction, TxError},
        },
        mempool::Mempool,
        security::keys::PrivateKey,
        types::{Block, Header, Transaction, H256},
    },
    monitoring::metrics::Metrics,
    networking::{
        message::{Envelope, ErrorKind, Message, Request, Response, Version},
        peer_table::PeerTable,
        transport::{Dialer, PeerClient, RequestHandler, RpcError},
    },
};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::{
    fmt::Display,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default protocol identifier.
pub const PROTOCOL_VERSION: &str = "blocker-1";

/// Node errors.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Ledger refused the object.
    #[error("chain: {0}")]
    Chain(#[from] ChainError),
    /// Transaction signature check failed.
    #[error("transaction: {0}")]
    Tx(#[from] TxError),
    /// Peer call failed.
    #[error("rpc: {0}")]
    Rpc(#[from] RpcError),
    /// Peer speaks another protocol.
    #[error("protocol mismatch: ours {ours}, theirs {theirs}")]
    ProtocolMismatch {
        /// Local protocol identifier.
        ours: String,
        /// Remote protocol identifier.
        theirs: String,
    },
    /// Operation needs a validator key.
    #[error("node has no validator key")]
    NotValidator,
}

fn error_response(e: &NodeError) -> Response {
    let kind = match e {
        NodeError::Chain(ChainError::NotFound(_)) => ErrorKind::NotFound,
        NodeError::Chain(_) | NodeError::Tx(_) | NodeError::ProtocolMismatch { .. } => {
            ErrorKind::Rejected
        }
        NodeError::Rpc(_) | NodeError::NotValidator => ErrorKind::Internal,
    };
    Response::Error {
        kind,
        message: e.to_string(),
    }
}

/// Node tunables.
#[derive(Clone, Debug)]
pub struct NodeOptions {
    /// Address peers reach this node on.
    pub listen_addr: String,
    /// Protocol identifier; handshakes with a different one are refused.
    pub protocol_version: String,
    /// Bound on every outbound peer call.
    pub peer_timeout: Duration,
    /// Validator proposal period.
    pub block_time: Duration,
    /// Propose blocks even when nothing is pending.
    pub allow_empty_blocks: bool,
}

impl NodeOptions {
    /// Defaults for a node listening on `listen_addr`.
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            peer_timeout: Duration::from_millis(2000),
            block_time: Duration::from_millis(5000),
            allow_empty_blocks: false,
        }
    }
}

/// Snapshot served by the status endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct NodeStatus {
    /// Listen address.
    pub listen_addr: String,
    /// Chain height.
    pub height: u64,
    /// Tip header hash (hex).
    pub tip: String,
    /// Established peers.
    pub peers: Vec<String>,
    /// Pending transactions.
    pub mempool: usize,
    /// Whether this node proposes blocks.
    pub validator: bool,
}

/// Spawn `fut`, logging its error with the task name instead of dropping it.
pub fn spawn_supervised<F, E>(task: &'static str, node: String, fut: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            warn!(node = %node, task, err = %e, "background task failed");
        }
    })
}

struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A peer-to-peer node.
pub struct Node {
    me: Weak<Node>,
    opts: NodeOptions,
    chain: Arc<Chain>,
    mempool: Mempool,
    peers: PeerTable,
    dialer: Arc<dyn Dialer>,
    validator: Option<Arc<PrivateKey>>,
    metrics: Arc<Metrics>,
    syncing: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl Node {
    /// Build a node. A `validator` key enables [`Node::propose_block`] and the validator loop.
    pub fn new(
        opts: NodeOptions,
        chain: Arc<Chain>,
        dialer: Arc<dyn Dialer>,
        validator: Option<Arc<PrivateKey>>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        let peers = PeerTable::new(opts.listen_addr.clone());
        if let Ok(h) = chain.height() {
            metrics.block_height.set(h as i64);
        }
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            opts,
            chain,
            mempool: Mempool::new(),
            peers,
            dialer,
            validator,
            metrics,
            syncing: AtomicBool::new(false),
            shutdown,
        })
    }

    /// Listen address.
    pub fn addr(&self) -> &str {
        &self.opts.listen_addr
    }

    /// Local chain.
    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    /// Pending transactions.
    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Established peers.
    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Metrics.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Whether this node holds a validator key.
    pub fn is_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// This node's handshake payload.
    pub fn version(&self) -> Result<Version, NodeError> {
        Ok(Version {
            protocol_version: self.opts.protocol_version.clone(),
            height: self.chain.height()?,
            listen_addr: self.opts.listen_addr.clone(),
            peers: self.peers.addresses(),
        })
    }

    /// Status snapshot.
    pub fn status(&self) -> Result<NodeStatus, NodeError> {
        let tip = self.chain.tip()?;
        Ok(NodeStatus {
            listen_addr: self.opts.listen_addr.clone(),
            height: tip.height,
            tip: hash_header(&tip).to_hex(),
            peers: self.peers.addresses(),
            mempool: self.mempool.len(),
            validator: self.is_validator(),
        })
    }

    /// Receiver that flips to `true` on [`Node::shutdown`].
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signal every background loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        info!(node = %self.addr(), "shutdown requested");
    }

    fn check_protocol(&self, theirs: &str) -> Result<(), NodeError> {
        if theirs != self.opts.protocol_version {
            return Err(NodeError::ProtocolMismatch {
                ours: self.opts.protocol_version.clone(),
                theirs: theirs.to_string(),
            });
        }
        Ok(())
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, RpcError>>,
    {
        tokio::time::timeout(self.opts.peer_timeout, fut)
            .await
            .map_err(|_| RpcError::Timeout)?
    }

    fn on_peer_registered(&self, addr: &str, height: u64) {
        self.metrics.peers.set(self.peers.len() as i64);
        info!(node = %self.addr(), peer = %addr, height, "peer registered");
    }

    /// Evict `addr`.
    pub fn remove_peer(&self, addr: &str) {
        if self.peers.remove(addr) {
            self.metrics.peer_evictions_total.inc();
            self.metrics.peers.set(self.peers.len() as i64);
            warn!(node = %self.addr(), peer = %addr, "peer evicted");
        }
    }

    async fn on_handshake(&self, remote: Version) -> Result<Version, NodeError> {
        self.check_protocol(&remote.protocol_version)?;
        let addr = remote.listen_addr.clone();

        if self.peers.try_reserve(&addr) {
            match self.dialer.dial(&addr).await {
                Ok(client) => {
                    if self.peers.register(&addr, remote.clone(), client) {
                        self.on_peer_registered(&addr, remote.height);
                    }
                }
                Err(e) => {
                    self.peers.release(&addr);
                    warn!(node = %self.addr(), peer = %addr, err = %e, "dial back failed");
                }
            }
        } else if let Some(client) = self.peers.client(&addr) {
            // Established: refresh the version. A pending dial registers on its own.
            self.peers.register(&addr, remote.clone(), client);
        }

        self.discover(&remote.peers);
        if remote.height > self.chain.height()? {
            self.spawn_sync(addr);
        }
        self.version()
    }

    /// Handshake every listed address that is neither self nor connected, in the background.
    fn discover(&self, addrs: &[String]) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        for addr in addrs.iter().filter(|a| self.peers.can_connect(a)) {
            let node = Arc::clone(&me);
            let addr = addr.clone();
            spawn_supervised("connect", self.addr().to_string(), async move {
                node.connect(&addr).await.map(|_| ())
            });
        }
    }

    /// Dial and handshake `addr`. Returns `false` when it is self, connected or already being dialed.
    pub async fn connect(&self, addr: &str) -> Result<bool, NodeError> {
        if !self.peers.try_reserve(addr) {
            return Ok(false);
        }
        match self.dial_and_handshake(addr).await {
            Ok((client, remote)) => {
                let height = remote.height;
                let peers = remote.peers.clone();
                if self.peers.register(addr, remote, client) {
                    self.on_peer_registered(addr, height);
                }
                self.discover(&peers);
                if height > self.chain.height()? {
                    self.spawn_sync(addr.to_string());
                }
                Ok(true)
            }
            Err(e) => {
                self.peers.release(addr);
                Err(e)
            }
        }
    }

    async fn dial_and_handshake(
        &self,
        addr: &str,
    ) -> Result<(Arc<dyn PeerClient>, Version), NodeError> {
        let client = self.dialer.dial(addr).await?;
        let ours = self.version()?;
        let remote = self
            .with_timeout(client.handshake(self.addr(), ours))
            .await?;
        self.check_protocol(&remote.protocol_version)?;
        Ok((client, remote))
    }

    /// Connect to every bootstrap address concurrently. Returns how many connected.
    pub async fn bootstrap(&self, addrs: &[String]) -> usize {
        let results = join_all(
            addrs
                .iter()
                .map(|a| async move { (a, self.connect(a).await) }),
        )
        .await;
        let mut connected = 0;
        for (addr, res) in results {
            match res {
                Ok(true) => connected += 1,
                Ok(false) => {}
                Err(e) => warn!(node = %self.addr(), peer = %addr, err = %e, "bootstrap failed"),
            }
        }
        connected
    }

    /// Admit a transaction and gossip it to every peer except `from`.
    ///
    /// Returns `false` when it was already pending or committed.
    pub async fn handle_transaction(
        &self,
        from: Option<&str>,
        tx: Transaction,
    ) -> Result<bool, NodeError> {
        let hash = hash_transaction(&tx);
        if self.mempool.has_hash(&hash) || self.chain.has_transaction(&hash)? {
            return Ok(false);
        }
        verify_transaction(&tx)?;
        if !self.mempool.add(tx.clone()) {
            return Ok(false);
        }
        self.metrics.transactions_total.inc();
        self.metrics.mempool_size.set(self.mempool.len() as i64);
        info!(node = %self.addr(), tx = %hash, "transaction admitted");

        self.spawn_broadcast(Message::Transaction(tx), from);
        Ok(true)
    }

    /// Accept a block from `from` and gossip it onward.
    ///
    /// Known blocks are ignored. A block beyond tip + 1 starts a sync from the sender.
    pub async fn handle_block(&self, from: Option<&str>, block: Block) -> Result<bool, NodeError> {
        let hash = hash_block(&block);
        if self.chain.contains_block(&hash)? {
            return Ok(false);
        }
        let local = self.chain.height()?;
        if block.header.height > local + 1 {
            debug!(
                node = %self.addr(),
                block = %hash,
                height = block.header.height,
                local,
                "block ahead of tip"
            );
            if let Some(peer) = from {
                self.spawn_sync(peer.to_string());
            }
            return Ok(false);
        }

        if let Err(e) = self.chain.add_block(&block) {
            if self.chain.contains_block(&hash)? {
                return Ok(false);
            }
            self.metrics.blocks_rejected_total.inc();
            warn!(node = %self.addr(), block = %hash, err = %e, "block rejected");
            return Err(e.into());
        }
        self.after_commit(&block);
        info!(
            node = %self.addr(),
            block = %hash,
            height = block.header.height,
            txs = block.transactions.len(),
            "block accepted"
        );

        self.spawn_broadcast(Message::Block(block), from);
        Ok(true)
    }

    fn after_commit(&self, block: &Block) {
        self.mempool.remove_included(block);
        self.metrics.mempool_size.set(self.mempool.len() as i64);
        self.metrics.block_height.set(block.header.height as i64);
    }

    fn spawn_sync(&self, peer: String) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        spawn_supervised("sync", self.addr().to_string(), async move {
            me.sync_from(&peer).await.map(|_| ())
        });
    }

    /// Fetch and add blocks from `peer` until it has no block at our next height.
    ///
    /// Only one sync runs at a time; a concurrent call returns `Ok(0)` immediately.
    pub async fn sync_from(&self, peer: &str) -> Result<u64, NodeError> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(0);
        }
        let _guard = SyncGuard(&self.syncing);

        let client = match self.peers.client(peer) {
            Some(c) => c,
            None => self.dialer.dial(peer).await?,
        };
        let mut added = 0u64;
        loop {
            let next = self.chain.height()? + 1;
            let block = match self
                .with_timeout(client.get_block(self.addr(), next))
                .await
            {
                Ok(b) => b,
                Err(RpcError::NotFound(_)) => break,
                Err(e) => return Err(e.into()),
            };
            if let Err(e) = self.chain.add_block(&block) {
                if self.chain.contains_block(&hash_block(&block))? {
                    continue;
                }
                self.metrics.blocks_rejected_total.inc();
                return Err(e.into());
            }
            self.after_commit(&block);
            added += 1;
        }
        if added > 0 {
            let height = self.chain.height()?;
            info!(node = %self.addr(), peer = %peer, added, height, "synced");
        }
        Ok(added)
    }

    /// [`Node::broadcast`] on a background task.
    fn spawn_broadcast(&self, msg: Message, except: Option<&str>) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let except = except.map(str::to_string);
        spawn_supervised("gossip", self.addr().to_string(), async move {
            me.broadcast(msg, except.as_deref()).await;
            Ok::<(), NodeError>(())
        });
    }

    /// Send `msg` to every peer except `except`, concurrently, each call bounded by the peer
    /// timeout. Transport failures evict the peer; nothing is returned to the caller.
    pub async fn broadcast(&self, msg: Message, except: Option<&str>) {
        let clients = self.peers.clients(except);
        if clients.is_empty() {
            return;
        }
        let calls = clients.into_iter().map(|client| {
            let msg = msg.clone();
            async move {
                let send = async {
                    match msg {
                        Message::Transaction(tx) => {
                            client.handle_transaction(self.addr(), tx).await
                        }
                        Message::Block(b) => client.handle_block(self.addr(), b).await,
                    }
                };
                let res = self.with_timeout(send).await;
                (client, res)
            }
        });
        for (client, res) in join_all(calls).await {
            match res {
                Ok(()) => {}
                Err(e) if e.is_transport_failure() => {
                    warn!(node = %self.addr(), peer = %client.addr(), err = %e, "broadcast failed");
                    self.remove_peer(client.addr());
                }
                Err(e) => debug!(
                    node = %self.addr(),
                    peer = %client.addr(),
                    err = %e,
                    "peer refused broadcast"
                ),
            }
        }
    }

    /// Drain the mempool, build a block on the tip, sign it, add it and gossip it.
    ///
    /// Returns `None` when there was nothing to propose.
    pub async fn propose_block(&self) -> Result<Option<Block>, NodeError> {
        let Some(key) = self.validator.as_ref() else {
            return Err(NodeError::NotValidator);
        };

        let pending = self.mempool.clear();
        let drained = pending.len();
        let txs = self.chain.select_valid(pending);
        if drained != txs.len() {
            debug!(
                node = %self.addr(),
                dropped = drained - txs.len(),
                "invalid pending transactions dropped"
            );
        }
        if txs.is_empty() && !self.opts.allow_empty_blocks {
            self.metrics.mempool_size.set(self.mempool.len() as i64);
            return Ok(None);
        }

        let tip = self.chain.tip()?;
        let header = Header {
            version: BLOCK_VERSION,
            height: tip.height + 1,
            previous_hash: hash_header(&tip),
            merkle_root: H256::ZERO,
            timestamp: now_ms(),
        };
        let mut block = Block::new(header, txs);
        sign_block(key, &mut block);

        if let Err(e) = self.chain.add_block(&block) {
            self.metrics.blocks_rejected_total.inc();
            warn!(node = %self.addr(), err = %e, "proposed block discarded");
            return Err(e.into());
        }
        self.after_commit(&block);
        self.metrics.blocks_proposed_total.inc();
        info!(
            node = %self.addr(),
            block = %hash_block(&block),
            height = block.header.height,
            txs = block.transactions.len(),
            "block proposed"
        );

        self.broadcast(Message::Block(block.clone()), None).await;
        Ok(Some(block))
    }

    /// Run [`Node::propose_block`] every block time until shutdown. `None` without a validator key.
    pub fn spawn_validator(&self) -> Option<JoinHandle<()>> {
        self.validator.as_ref()?;
        let me = self.me.upgrade()?;
        let mut shutdown = self.shutdown.subscribe();
        let period = self.opts.block_time;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            info!(node = %me.addr(), period_ms = period.as_millis() as u64, "validator started");
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match me.propose_block().await {
                            Ok(_) => {}
                            Err(e) => warn!(node = %me.addr(), err = %e, "proposal failed"),
                        }
                    }
                }
            }
            info!(node = %me.addr(), "validator stopped");
        }))
    }
}

fn sender(from: &str) -> Option<&str> {
    if from.is_empty() {
        None
    } else {
        Some(from)
    }
}

#[async_trait]
impl RequestHandler for Node {
    async fn handle(&self, envelope: Envelope) -> Response {
        let from = envelope.from;
        let result = match envelope.request {
            Request::Handshake(v) => self.on_handshake(v).await.map(Response::Version),
            Request::HandleTransaction(tx) => self
                .handle_transaction(sender(&from), tx)
                .await
                .map(|_| Response::Ack),
            Request::HandleBlock(b) => self
                .handle_block(sender(&from), b)
                .await
                .map(|_| Response::Ack),
            Request::GetBlock(h) => self
                .chain
                .get_block_by_height(h)
                .map(Response::Block)
                .map_err(NodeError::from),
        };
        result.unwrap_or_else(|e| {
            debug!(node = %self.addr(), peer = %from, err = %e, "request refused");
            error_response(&e)
        })
    }
}
