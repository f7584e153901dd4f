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

//! Durable stores on sled. One tree per collaborator; values are canonical bincode.
//!
//! A block commit is one sled transaction over all three trees.

use crate::core::{
    ledger::block::hash_block,
    state::store::{BlockStore, ChainStore, StoreError, TransactionStore, UtxoStore},
    types::{
        decode_canonical_limited, encode_canonical, Block, Header, Transaction, Utxo, UtxoKey,
        H256,
    },
};
use serde::{de::DeserializeOwned, Serialize};
use sled::{
    transaction::{ConflictableTransactionError, TransactionError},
    Transactional,
};
use std::path::Path;

type Record = (Vec<u8>, Vec<u8>);

const MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// sled-backed block, transaction and UTXO store.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    blocks: sled::Tree,
    txs: sled::Tree,
    utxos: sled::Tree,
}

fn db_err(e: sled::Error) -> StoreError {
    StoreError::Db(e.to_string())
}

impl SledStore {
    /// Open (or create) the database directory at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(db_err)?;
        let blocks = db.open_tree("blocks").map_err(db_err)?;
        let txs = db.open_tree("txs").map_err(db_err)?;
        let utxos = db.open_tree("utxos").map_err(db_err)?;
        Ok(Self {
            db,
            blocks,
            txs,
            utxos,
        })
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(db_err)?;
        Ok(())
    }

    fn encode<T: Serialize>(v: &T) -> Result<Vec<u8>, StoreError> {
        encode_canonical(v).map_err(|_| StoreError::Codec)
    }

    fn put<T: Serialize>(tree: &sled::Tree, key: &[u8], v: &T) -> Result<(), StoreError> {
        tree.insert(key, Self::encode(v)?).map_err(db_err)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(
        tree: &sled::Tree,
        key: &[u8],
        label: impl FnOnce() -> String,
    ) -> Result<T, StoreError> {
        let Some(v) = tree.get(key).map_err(db_err)? else {
            return Err(StoreError::NotFound(label()));
        };
        decode_canonical_limited(&v, MAX_RECORD_BYTES).map_err(|_| StoreError::Codec)
    }
}

impl BlockStore for SledStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        Self::put(&self.blocks, hash_block(block).as_bytes(), block)
    }

    fn get_block(&self, hash: &H256) -> Result<Block, StoreError> {
        Self::get(&self.blocks, hash.as_bytes(), || hash.to_hex())
    }

    fn load_headers(&self) -> Result<Vec<Header>, StoreError> {
        let mut headers = Vec::new();
        for item in self.blocks.iter() {
            let (_, v) = item.map_err(db_err)?;
            let block: Block =
                decode_canonical_limited(&v, MAX_RECORD_BYTES).map_err(|_| StoreError::Codec)?;
            headers.push(block.header);
        }
        headers.sort_by_key(|h| h.height);
        Ok(headers)
    }
}

impl TransactionStore for SledStore {
    fn put_transaction(&self, hash: &H256, tx: &Transaction) -> Result<(), StoreError> {
        Self::put(&self.txs, hash.as_bytes(), tx)
    }

    fn get_transaction(&self, hash: &H256) -> Result<Transaction, StoreError> {
        Self::get(&self.txs, hash.as_bytes(), || hash.to_hex())
    }
}

impl UtxoStore for SledStore {
    fn put_utxo(&self, utxo: &Utxo) -> Result<(), StoreError> {
        Self::put(&self.utxos, &utxo.key().to_bytes(), utxo)
    }

    fn get_utxo(&self, key: &UtxoKey) -> Result<Utxo, StoreError> {
        Self::get(&self.utxos, &key.to_bytes(), || key.to_string())
    }
}

impl ChainStore for SledStore {
    fn commit_block(
        &self,
        block: &Block,
        txs: &[(H256, Transaction)],
        utxos: &[Utxo],
    ) -> Result<(), StoreError> {
        // Encode outside the transaction closure, which sled may retry.
        let block_rec: Record = (hash_block(block).as_bytes().to_vec(), Self::encode(block)?);
        let tx_recs = txs
            .iter()
            .map(|(h, tx)| Ok((h.as_bytes().to_vec(), Self::encode(tx)?)))
            .collect::<Result<Vec<Record>, StoreError>>()?;
        let utxo_recs = utxos
            .iter()
            .map(|u| Ok((u.key().to_bytes().to_vec(), Self::encode(u)?)))
            .collect::<Result<Vec<Record>, StoreError>>()?;

        (&self.blocks, &self.txs, &self.utxos)
            .transaction(|(block_tree, tx_tree, utxo_tree)| {
                for (k, v) in tx_recs.iter() {
                    tx_tree.insert(k.as_slice(), v.as_slice())?;
                }
                for (k, v) in utxo_recs.iter() {
                    utxo_tree.insert(k.as_slice(), v.as_slice())?;
                }
                block_tree.insert(block_rec.0.as_slice(), block_rec.1.as_slice())?;
                Ok::<(), ConflictableTransactionError<StoreError>>(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(se) => se,
                TransactionError::Storage(e) => db_err(e),
            })
    }
}
