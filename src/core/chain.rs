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

//! Append-only chain: header list, acceptance pipeline and genesis.
//!
//! `add_block` runs, stopping at the first failure:
//! 1. block signature and Merkle root
//! 2. continuity (`previous_hash` is the tip hash, `height` is tip + 1)
//! 3. every transaction, in order, against a staged view of the UTXO set
//! 4. commit: transactions, UTXOs and the block in one [`ChainStore::commit_block`], then the header
//!
//! Steps 1-4 run under one commit lock, so a single block is validated and committed at a time.
//! A failed store commit leaves both the store and the header list untouched.

use crate::core::{
    ledger::{
        block::{hash_block, hash_header, sign_block, verify_block, BlockError},
        transaction::{hash_transaction, verify_transaction, TxError},
    },
    security::keys::{CryptoError, PrivateKey, PublicKey},
    state::store::{ChainStore, MemoryStore, StoreError},
    types::{Block, Header, Transaction, TxOutput, Utxo, UtxoKey, H256},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, RwLock},
};
use thiserror::Error;
use tracing::{debug, info};

/// Hex seed of the key that signs genesis and owns the initial supply.
pub const GENESIS_SEED_HEX: &str =
    "183d81f40dd7d9233696dfa5e6eb8a287b1370f236efe844b3ed6c8d4896f6ce";
/// Amount minted by the genesis transaction.
pub const GENESIS_SUPPLY: u64 = 1000;
/// Header and transaction version produced by this node.
pub const BLOCK_VERSION: u32 = 1;

/// Chain errors.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Block failed signature or root verification.
    #[error("block: {0}")]
    Block(#[from] BlockError),
    /// Transaction failed signature verification.
    #[error("transaction: {0}")]
    Tx(#[from] TxError),
    /// Store failure.
    #[error("store: {0}")]
    Store(#[from] StoreError),
    /// Key construction failed.
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),
    /// `previous_hash` is not the tip hash.
    #[error("broken chain: expected previous hash {expected}, got {got}")]
    BrokenChain {
        /// Tip hash.
        expected: H256,
        /// Candidate's previous hash.
        got: H256,
    },
    /// Height is not tip + 1.
    #[error("unexpected height: expected {expected}, got {got}")]
    UnexpectedHeight {
        /// Tip height + 1.
        expected: u64,
        /// Candidate height.
        got: u64,
    },
    /// Input references a missing or spent output, or an output key already exists.
    #[error("double spend: {key}")]
    DoubleSpend {
        /// Offending UTXO key.
        key: UtxoKey,
    },
    /// Input and output sums differ.
    #[error("insufficient balance: inputs {inputs} outputs {outputs}")]
    UnbalancedTransaction {
        /// Sum of consumed outputs.
        inputs: u64,
        /// Sum of created outputs.
        outputs: u64,
    },
    /// Input public key does not own the referenced output.
    #[error("unauthorized spend: {key}")]
    UnauthorizedSpend {
        /// Offending UTXO key.
        key: UtxoKey,
    },
    /// A sum overflowed u64.
    #[error("amount overflow")]
    AmountOverflow,
    /// Lookup miss.
    #[error("not found: {0}")]
    NotFound(String),
    /// Stored height-0 block is not this network's genesis.
    #[error("genesis mismatch: expected {expected}, found {found}")]
    GenesisMismatch {
        /// Locally computed genesis hash.
        expected: H256,
        /// Hash of the stored height-0 header.
        found: H256,
    },
    /// Internal lock poisoned.
    #[error("chain lock poisoned")]
    Poisoned,
}

fn not_found(e: StoreError) -> ChainError {
    match e {
        StoreError::NotFound(k) => ChainError::NotFound(k),
        other => ChainError::Store(other),
    }
}

/// Append-only list of accepted headers; index equals height.
#[derive(Debug, Default)]
pub struct HeaderList {
    headers: Vec<Header>,
    index: HashMap<H256, u64>,
}

impl HeaderList {
    /// Append a header.
    pub fn push(&mut self, header: Header) {
        self.index.insert(hash_header(&header), header.height);
        self.headers.push(header);
    }

    /// Header at height `h`.
    pub fn get(&self, h: u64) -> Option<&Header> {
        usize::try_from(h).ok().and_then(|i| self.headers.get(i))
    }

    /// Last header.
    pub fn last(&self) -> Option<&Header> {
        self.headers.last()
    }

    /// Whether a header with this hash is present.
    pub fn contains(&self, hash: &H256) -> bool {
        self.index.contains_key(hash)
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// True when no header was appended yet.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Index of the last header (0 when only genesis is present).
    pub fn height(&self) -> u64 {
        self.headers.len().saturating_sub(1) as u64
    }
}

/// Deterministic key that signs genesis.
pub fn genesis_key() -> Result<PrivateKey, CryptoError> {
    PrivateKey::from_hex_seed(GENESIS_SEED_HEX)
}

/// The genesis block: one input-less transaction paying [`GENESIS_SUPPLY`] to the genesis address.
pub fn genesis_block() -> Result<Block, ChainError> {
    let key = genesis_key()?;
    let tx = Transaction {
        version: BLOCK_VERSION,
        inputs: vec![],
        outputs: vec![TxOutput {
            amount: GENESIS_SUPPLY,
            to_address: key.public().address(),
        }],
    };
    let header = Header {
        version: BLOCK_VERSION,
        height: 0,
        previous_hash: H256::ZERO,
        merkle_root: H256::ZERO,
        timestamp: 0,
    };
    let mut block = Block::new(header, vec![tx]);
    sign_block(&key, &mut block);
    Ok(block)
}

/// Pending UTXO changes layered over the store.
///
/// Transactions are applied one by one; a failed transaction leaves the overlay untouched.
struct Staging<'a> {
    store: &'a dyn ChainStore,
    touched: HashMap<UtxoKey, Utxo>,
    order: Vec<UtxoKey>,
    txs: Vec<(H256, Transaction)>,
}

impl<'a> Staging<'a> {
    fn new(store: &'a dyn ChainStore) -> Self {
        Self {
            store,
            touched: HashMap::new(),
            order: Vec::new(),
            txs: Vec::new(),
        }
    }

    fn lookup(&self, key: &UtxoKey) -> Result<Option<Utxo>, ChainError> {
        if let Some(u) = self.touched.get(key) {
            return Ok(Some(u.clone()));
        }
        match self.store.get_utxo(key) {
            Ok(u) => Ok(Some(u)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, utxo: Utxo) {
        let key = utxo.key();
        if self.touched.insert(key, utxo).is_none() {
            self.order.push(key);
        }
    }

    fn fresh_outputs(&self, hash: &H256, tx: &Transaction) -> Result<Vec<Utxo>, ChainError> {
        let mut out = Vec::with_capacity(tx.outputs.len());
        for (i, o) in tx.outputs.iter().enumerate() {
            let key = UtxoKey::new(*hash, i as u32);
            if self.lookup(&key)?.is_some() {
                return Err(ChainError::DoubleSpend { key });
            }
            out.push(Utxo {
                tx_hash: *hash,
                index: i as u32,
                amount: o.amount,
                owner: o.to_address,
                spent: false,
            });
        }
        Ok(out)
    }

    /// Mint outputs without spending anything (genesis only).
    fn credit(&mut self, tx: &Transaction) -> Result<(), ChainError> {
        let hash = hash_transaction(tx);
        for utxo in self.fresh_outputs(&hash, tx)? {
            self.write(utxo);
        }
        self.txs.push((hash, tx.clone()));
        Ok(())
    }

    /// Validate `tx` against the overlay and apply it.
    fn stage(&mut self, tx: &Transaction) -> Result<H256, ChainError> {
        verify_transaction(tx)?;
        let hash = hash_transaction(tx);
        let created = self.fresh_outputs(&hash, tx)?;

        let mut consumed = Vec::with_capacity(tx.inputs.len());
        let mut seen = HashSet::new();
        let mut total_in: u64 = 0;
        for input in tx.inputs.iter() {
            let key = UtxoKey::new(input.prev_tx_hash, input.prev_out_index);
            let utxo = match self.lookup(&key)? {
                Some(u) if !u.spent && seen.insert(key) => u,
                _ => return Err(ChainError::DoubleSpend { key }),
            };
            let spender = PublicKey::from_bytes(&input.public_key)?;
            if spender.address() != utxo.owner {
                return Err(ChainError::UnauthorizedSpend { key });
            }
            total_in = total_in
                .checked_add(utxo.amount)
                .ok_or(ChainError::AmountOverflow)?;
            consumed.push(utxo);
        }

        let mut total_out: u64 = 0;
        for o in tx.outputs.iter() {
            total_out = total_out
                .checked_add(o.amount)
                .ok_or(ChainError::AmountOverflow)?;
        }
        if total_in != total_out {
            return Err(ChainError::UnbalancedTransaction {
                inputs: total_in,
                outputs: total_out,
            });
        }

        for mut utxo in consumed {
            utxo.spent = true;
            self.write(utxo);
        }
        for utxo in created {
            self.write(utxo);
        }
        self.txs.push((hash, tx.clone()));
        Ok(hash)
    }
}

/// The local ledger.
pub struct Chain {
    store: Arc<dyn ChainStore>,
    headers: RwLock<HeaderList>,
    commit: Mutex<()>,
}

impl Chain {
    /// Open a chain over `store`.
    ///
    /// An empty store gets genesis committed. Otherwise the header list is restored and the stored
    /// height-0 header must be this network's genesis.
    pub fn new(store: Arc<dyn ChainStore>) -> Result<Self, ChainError> {
        let stored = store.load_headers()?;
        let chain = Self {
            store,
            headers: RwLock::new(HeaderList::default()),
            commit: Mutex::new(()),
        };

        let genesis = genesis_block()?;
        let expected = hash_block(&genesis);

        if stored.is_empty() {
            chain.commit_genesis(&genesis)?;
            info!(genesis = %expected, "genesis committed");
            return Ok(chain);
        }

        let found = hash_header(&stored[0]);
        if found != expected {
            return Err(ChainError::GenesisMismatch { expected, found });
        }
        {
            let mut g = chain.headers.write().map_err(|_| ChainError::Poisoned)?;
            for (i, h) in stored.into_iter().enumerate() {
                if h.height != i as u64 {
                    return Err(ChainError::UnexpectedHeight {
                        expected: i as u64,
                        got: h.height,
                    });
                }
                g.push(h);
            }
            info!(height = g.height(), "chain restored");
        }
        Ok(chain)
    }

    /// Chain over a fresh in-memory store.
    pub fn in_memory() -> Result<Self, ChainError> {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn commit_genesis(&self, genesis: &Block) -> Result<(), ChainError> {
        let _guard = self.commit.lock().map_err(|_| ChainError::Poisoned)?;
        verify_block(genesis)?;
        let mut staged = Staging::new(self.store.as_ref());
        for tx in genesis.transactions.iter() {
            staged.credit(tx)?;
        }
        self.commit_staged(genesis, staged)
    }

    /// Run the acceptance pipeline and append `block`. Errors are never swallowed.
    pub fn add_block(&self, block: &Block) -> Result<(), ChainError> {
        let _guard = self.commit.lock().map_err(|_| ChainError::Poisoned)?;

        verify_block(block)?;

        let tip = self.tip()?;
        let tip_hash = hash_header(&tip);
        if block.header.previous_hash != tip_hash {
            return Err(ChainError::BrokenChain {
                expected: tip_hash,
                got: block.header.previous_hash,
            });
        }
        let expected = tip.height + 1;
        if block.header.height != expected {
            return Err(ChainError::UnexpectedHeight {
                expected,
                got: block.header.height,
            });
        }

        let mut staged = Staging::new(self.store.as_ref());
        for tx in block.transactions.iter() {
            staged.stage(tx)?;
        }
        self.commit_staged(block, staged)?;

        debug!(
            height = block.header.height,
            hash = %hash_block(block),
            txs = block.transactions.len(),
            "block committed"
        );
        Ok(())
    }

    fn commit_staged(&self, block: &Block, staged: Staging<'_>) -> Result<(), ChainError> {
        let mut g = self.headers.write().map_err(|_| ChainError::Poisoned)?;
        let utxos: Vec<Utxo> = staged
            .order
            .iter()
            .filter_map(|key| staged.touched.get(key).cloned())
            .collect();
        self.store.commit_block(block, &staged.txs, &utxos)?;
        g.push(block.header.clone());
        Ok(())
    }

    /// Validate one transaction against the current UTXO set without committing it.
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<(), ChainError> {
        Staging::new(self.store.as_ref()).stage(tx).map(|_| ())
    }

    /// Keep the transactions that validate in sequence, preserving order.
    ///
    /// Later candidates see the effects of earlier accepted ones.
    pub fn select_valid(&self, txs: Vec<Transaction>) -> Vec<Transaction> {
        let mut staged = Staging::new(self.store.as_ref());
        let mut out = Vec::with_capacity(txs.len());
        for tx in txs {
            match staged.stage(&tx) {
                Ok(_) => out.push(tx),
                Err(e) => debug!(
                    tx = %hash_transaction(&tx),
                    err = %e,
                    "dropping invalid pending transaction"
                ),
            }
        }
        out
    }

    /// Index of the last header. Genesis alone is height 0.
    pub fn height(&self) -> Result<u64, ChainError> {
        let g = self.headers.read().map_err(|_| ChainError::Poisoned)?;
        Ok(g.height())
    }

    /// Tip header.
    pub fn tip(&self) -> Result<Header, ChainError> {
        let g = self.headers.read().map_err(|_| ChainError::Poisoned)?;
        g.last()
            .cloned()
            .ok_or_else(|| ChainError::NotFound("tip".into()))
    }

    /// Block at height `h`; `NotFound` when `h > height()`.
    pub fn get_block_by_height(&self, h: u64) -> Result<Block, ChainError> {
        let hash = {
            let g = self.headers.read().map_err(|_| ChainError::Poisoned)?;
            match g.get(h) {
                Some(header) => hash_header(header),
                None => return Err(ChainError::NotFound(format!("height {h}"))),
            }
        };
        self.store.get_block(&hash).map_err(not_found)
    }

    /// Accepted block by header hash.
    pub fn get_block_by_hash(&self, hash: &H256) -> Result<Block, ChainError> {
        if !self.contains_block(hash)? {
            return Err(ChainError::NotFound(hash.to_hex()));
        }
        self.store.get_block(hash).map_err(not_found)
    }

    /// Whether a block with this header hash has been accepted.
    pub fn contains_block(&self, hash: &H256) -> Result<bool, ChainError> {
        let g = self.headers.read().map_err(|_| ChainError::Poisoned)?;
        Ok(g.contains(hash))
    }

    /// Committed transaction by hash.
    pub fn get_transaction(&self, hash: &H256) -> Result<Transaction, ChainError> {
        self.store.get_transaction(hash).map_err(not_found)
    }

    /// Whether a transaction with this hash is committed.
    pub fn has_transaction(&self, hash: &H256) -> Result<bool, ChainError> {
        match self.store.get_transaction(hash) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Output record by key.
    pub fn get_utxo(&self, key: &UtxoKey) -> Result<Utxo, ChainError> {
        self.store.get_utxo(key).map_err(not_found)
    }
}
