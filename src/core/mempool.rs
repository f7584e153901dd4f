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

//! Pending transaction pool keyed by transaction hash.

use crate::core::{
    ledger::transaction::hash_transaction,
    types::{Block, Transaction, H256},
};
use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

#[derive(Default)]
struct Pool {
    next_seq: u64,
    txs: HashMap<H256, (u64, Transaction)>,
}

/// Unconfirmed transactions. At most one entry per hash.
#[derive(Default)]
pub struct Mempool {
    inner: RwLock<Pool>,
}

impl Mempool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single insert or remove, so the map stays consistent after a panic.
    fn read(&self) -> RwLockReadGuard<'_, Pool> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Pool> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Whether `tx` is pending.
    pub fn has(&self, tx: &Transaction) -> bool {
        self.has_hash(&hash_transaction(tx))
    }

    /// Whether a transaction with this hash is pending.
    pub fn has_hash(&self, hash: &H256) -> bool {
        self.read().txs.contains_key(hash)
    }

    /// Insert `tx`. Returns `false` when it was already pending.
    pub fn add(&self, tx: Transaction) -> bool {
        let hash = hash_transaction(&tx);
        let mut g = self.write();
        if g.txs.contains_key(&hash) {
            return false;
        }
        let seq = g.next_seq;
        g.next_seq = seq.wrapping_add(1);
        g.txs.insert(hash, (seq, tx));
        true
    }

    /// Atomically remove and return everything, in arrival order.
    pub fn clear(&self) -> Vec<Transaction> {
        let drained = std::mem::take(&mut self.write().txs);
        let mut entries: Vec<(u64, Transaction)> = drained.into_values().collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, tx)| tx).collect()
    }

    /// Drop the transactions committed by `block`. Returns how many were pending.
    pub fn remove_included(&self, block: &Block) -> usize {
        let hashes: Vec<H256> = block.transactions.iter().map(hash_transaction).collect();
        let mut g = self.write();
        hashes
            .iter()
            .filter(|h| g.txs.remove(*h).is_some())
            .count()
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.read().txs.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
