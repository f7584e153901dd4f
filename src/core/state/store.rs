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

//! Store collaborators used by the chain, plus in-memory implementations.
//!
//! Each in-memory store guards its own map with its own `RwLock`. The chain writes only through
//! [`ChainStore::commit_block`], which applies a whole block or nothing.

use crate::core::{
    ledger::block::hash_block,
    types::{Block, Header, Transaction, Utxo, UtxoKey, H256},
};
use std::{collections::HashMap, sync::RwLock};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record under the key.
    #[error("not found: {0}")]
    NotFound(String),
    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
    /// Backend I/O failure.
    #[error("db: {0}")]
    Db(String),
    /// Stored bytes failed to encode or decode.
    #[error("codec")]
    Codec,
}

/// Accepted blocks keyed by header hash.
pub trait BlockStore: Send + Sync {
    /// Insert or overwrite.
    fn put_block(&self, block: &Block) -> Result<(), StoreError>;
    /// Fetch by header hash.
    fn get_block(&self, hash: &H256) -> Result<Block, StoreError>;
    /// All stored headers ordered by height (used to restore the header list on restart).
    fn load_headers(&self) -> Result<Vec<Header>, StoreError>;
}

/// Committed transactions keyed by transaction hash.
pub trait TransactionStore: Send + Sync {
    /// Insert or overwrite.
    fn put_transaction(&self, hash: &H256, tx: &Transaction) -> Result<(), StoreError>;
    /// Fetch by hash.
    fn get_transaction(&self, hash: &H256) -> Result<Transaction, StoreError>;
}

/// Output records keyed by `(tx hash, index)`.
pub trait UtxoStore: Send + Sync {
    /// Insert or overwrite.
    fn put_utxo(&self, utxo: &Utxo) -> Result<(), StoreError>;
    /// Fetch by key.
    fn get_utxo(&self, key: &UtxoKey) -> Result<Utxo, StoreError>;
}

/// The three collaborators behind one atomic block commit.
pub trait ChainStore: BlockStore + TransactionStore + UtxoStore {
    /// Persist `block`, its transactions and every touched UTXO as one unit.
    ///
    /// On error nothing is written.
    fn commit_block(
        &self,
        block: &Block,
        txs: &[(H256, Transaction)],
        utxos: &[Utxo],
    ) -> Result<(), StoreError>;
}

/// In-memory [`BlockStore`].
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<H256, Block>>,
}

impl MemoryBlockStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        let mut g = self.blocks.write().map_err(|_| StoreError::Poisoned)?;
        g.insert(hash_block(block), block.clone());
        Ok(())
    }

    fn get_block(&self, hash: &H256) -> Result<Block, StoreError> {
        let g = self.blocks.read().map_err(|_| StoreError::Poisoned)?;
        g.get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hash.to_hex()))
    }

    fn load_headers(&self) -> Result<Vec<Header>, StoreError> {
        let g = self.blocks.read().map_err(|_| StoreError::Poisoned)?;
        let mut headers: Vec<Header> = g.values().map(|b| b.header.clone()).collect();
        headers.sort_by_key(|h| h.height);
        Ok(headers)
    }
}

/// In-memory [`TransactionStore`].
#[derive(Default)]
pub struct MemoryTransactionStore {
    txs: RwLock<HashMap<H256, Transaction>>,
}

impl MemoryTransactionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn put_transaction(&self, hash: &H256, tx: &Transaction) -> Result<(), StoreError> {
        let mut g = self.txs.write().map_err(|_| StoreError::Poisoned)?;
        g.insert(*hash, tx.clone());
        Ok(())
    }

    fn get_transaction(&self, hash: &H256) -> Result<Transaction, StoreError> {
        let g = self.txs.read().map_err(|_| StoreError::Poisoned)?;
        g.get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hash.to_hex()))
    }
}

/// In-memory [`UtxoStore`].
#[derive(Default)]
pub struct MemoryUtxoStore {
    utxos: RwLock<HashMap<UtxoKey, Utxo>>,
}

impl MemoryUtxoStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UtxoStore for MemoryUtxoStore {
    fn put_utxo(&self, utxo: &Utxo) -> Result<(), StoreError> {
        let mut g = self.utxos.write().map_err(|_| StoreError::Poisoned)?;
        g.insert(utxo.key(), utxo.clone());
        Ok(())
    }

    fn get_utxo(&self, key: &UtxoKey) -> Result<Utxo, StoreError> {
        let g = self.utxos.read().map_err(|_| StoreError::Poisoned)?;
        g.get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

/// In-memory [`ChainStore`] made of the three in-memory stores.
#[derive(Default)]
pub struct MemoryStore {
    blocks: MemoryBlockStore,
    txs: MemoryTransactionStore,
    utxos: MemoryUtxoStore,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        self.blocks.put_block(block)
    }

    fn get_block(&self, hash: &H256) -> Result<Block, StoreError> {
        self.blocks.get_block(hash)
    }

    fn load_headers(&self) -> Result<Vec<Header>, StoreError> {
        self.blocks.load_headers()
    }
}

impl TransactionStore for MemoryStore {
    fn put_transaction(&self, hash: &H256, tx: &Transaction) -> Result<(), StoreError> {
        self.txs.put_transaction(hash, tx)
    }

    fn get_transaction(&self, hash: &H256) -> Result<Transaction, StoreError> {
        self.txs.get_transaction(hash)
    }
}

impl UtxoStore for MemoryStore {
    fn put_utxo(&self, utxo: &Utxo) -> Result<(), StoreError> {
        self.utxos.put_utxo(utxo)
    }

    fn get_utxo(&self, key: &UtxoKey) -> Result<Utxo, StoreError> {
        self.utxos.get_utxo(key)
    }
}

impl ChainStore for MemoryStore {
    fn commit_block(
        &self,
        block: &Block,
        txs: &[(H256, Transaction)],
        utxos: &[Utxo],
    ) -> Result<(), StoreError> {
        // All guards first, in a fixed order; nothing below can fail.
        let mut tx_map = self.txs.txs.write().map_err(|_| StoreError::Poisoned)?;
        let mut utxo_map = self.utxos.utxos.write().map_err(|_| StoreError::Poisoned)?;
        let mut block_map = self.blocks.blocks.write().map_err(|_| StoreError::Poisoned)?;
        for (hash, tx) in txs.iter() {
            tx_map.insert(*hash, tx.clone());
        }
        for u in utxos.iter() {
            utxo_map.insert(u.key(), u.clone());
        }
        block_map.insert(hash_block(block), block.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::security::keys::PrivateKey;

    fn utxo(index: u32) -> Utxo {
        Utxo {
            tx_hash: H256::sha256(b"tx"),
            index,
            amount: 5,
            owner: PrivateKey::from_seed(&[1; 32]).unwrap().public().address(),
            spent: false,
        }
    }

    #[test]
    fn commit_block_writes_every_record() {
        let store = MemoryStore::new();
        let header = Header {
            version: 1,
            height: 0,
            previous_hash: H256::ZERO,
            merkle_root: H256::ZERO,
            timestamp: 0,
        };
        let block = Block::new(header.clone(), vec![]);
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![],
        };
        let tx_hash = H256::sha256(b"tx");
        store
            .commit_block(&block, &[(tx_hash, tx.clone())], &[utxo(0), utxo(1)])
            .unwrap();

        assert_eq!(store.get_block(&hash_block(&block)).unwrap(), block);
        assert_eq!(store.get_transaction(&tx_hash).unwrap(), tx);
        assert_eq!(store.get_utxo(&utxo(1).key()).unwrap(), utxo(1));
        assert_eq!(store.load_headers().unwrap(), vec![header]);
    }

    #[test]
    fn missing_utxo_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_utxo(&utxo(3).key()),
            Err(StoreError::NotFound(k)) if k.ends_with("_3")
        ));
    }
}
