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

mod common;

use blocker::core::{
    chain::{genesis_block, genesis_key, Chain, ChainError, GENESIS_SUPPLY},
    ledger::{
        block::{hash_block, hash_header, sign_block, BlockError},
        transaction::{hash_transaction, TxError},
    },
    state::store::{
        BlockStore, ChainStore, MemoryStore, StoreError, TransactionStore, UtxoStore,
    },
    types::{Block, Header, Transaction, Utxo, UtxoKey, H256},
};
use common::{addr_of, block_on, genesis_spend_to, genesis_utxo, header_on, key, out, spend};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Barrier,
    },
    thread,
};

fn unspent_total(chain: &Chain, keys: &[UtxoKey]) -> u64 {
    keys.iter()
        .map(|k| chain.get_utxo(k).unwrap())
        .filter(|u| !u.spent)
        .map(|u| u.amount)
        .sum()
}

#[test]
fn genesis_is_identical_across_nodes() {
    let a = Chain::in_memory().unwrap();
    let b = Chain::in_memory().unwrap();

    assert_eq!(a.height().unwrap(), 0);
    assert_eq!(a.tip().unwrap(), b.tip().unwrap());
    assert_eq!(
        hash_header(&a.tip().unwrap()),
        hash_block(&genesis_block().unwrap())
    );

    let g = a.get_utxo(&genesis_utxo()).unwrap();
    assert_eq!(g.amount, GENESIS_SUPPLY);
    assert!(!g.spent);
    assert_eq!(g.owner, addr_of(&genesis_key().unwrap()));
}

#[test]
fn lookups_are_bounded_by_height() {
    let chain = Chain::in_memory().unwrap();
    let g = chain.get_block_by_height(0).unwrap();
    assert_eq!(g, genesis_block().unwrap());
    assert_eq!(chain.get_block_by_hash(&hash_block(&g)).unwrap(), g);

    assert!(matches!(
        chain.get_block_by_height(1),
        Err(ChainError::NotFound(_))
    ));
    assert!(matches!(
        chain.get_block_by_hash(&H256::sha256(b"nope")),
        Err(ChainError::NotFound(_))
    ));
    assert!(matches!(
        chain.get_transaction(&H256::sha256(b"nope")),
        Err(ChainError::NotFound(_))
    ));
}

#[test]
fn spend_moves_value_and_preserves_supply() {
    let chain = Chain::in_memory().unwrap();
    let alice = key(1);
    let bob = key(2);

    let tx = spend(
        &genesis_key().unwrap(),
        genesis_utxo(),
        vec![out(400, addr_of(&alice)), out(600, addr_of(&bob))],
    );
    let h = hash_transaction(&tx);
    let block = block_on(&chain, &alice, vec![tx.clone()]);
    chain.add_block(&block).unwrap();

    assert_eq!(chain.height().unwrap(), 1);
    assert_eq!(chain.get_block_by_height(1).unwrap(), block);
    assert_eq!(chain.get_transaction(&h).unwrap(), tx);
    assert!(chain.get_utxo(&genesis_utxo()).unwrap().spent);

    let keys = [genesis_utxo(), UtxoKey::new(h, 0), UtxoKey::new(h, 1)];
    assert_eq!(unspent_total(&chain, &keys), GENESIS_SUPPLY);
    assert_eq!(chain.get_utxo(&keys[2]).unwrap().owner, addr_of(&bob));
}

#[test]
fn double_spend_across_blocks_is_rejected() {
    let chain = Chain::in_memory().unwrap();
    let alice = key(1);
    let first = genesis_spend_to(addr_of(&alice));
    chain
        .add_block(&block_on(&chain, &alice, vec![first]))
        .unwrap();

    let again = spend(
        &genesis_key().unwrap(),
        genesis_utxo(),
        vec![out(1000, addr_of(&key(3)))],
    );
    let err = chain
        .add_block(&block_on(&chain, &alice, vec![again]))
        .unwrap_err();
    assert!(matches!(err, ChainError::DoubleSpend { key } if key == genesis_utxo()));
    assert_eq!(chain.height().unwrap(), 1);
}

#[test]
fn double_spend_within_block_is_rejected_and_nothing_commits() {
    let chain = Chain::in_memory().unwrap();
    let a = genesis_spend_to(addr_of(&key(1)));
    let b = genesis_spend_to(addr_of(&key(2)));
    assert_ne!(hash_transaction(&a), hash_transaction(&b));

    let err = chain
        .add_block(&block_on(&chain, &key(1), vec![a.clone(), b]))
        .unwrap_err();
    assert!(matches!(err, ChainError::DoubleSpend { .. }));

    assert_eq!(chain.height().unwrap(), 0);
    assert!(!chain.get_utxo(&genesis_utxo()).unwrap().spent);
    assert!(!chain.has_transaction(&hash_transaction(&a)).unwrap());
}

#[test]
fn output_created_earlier_in_block_can_be_spent() {
    let chain = Chain::in_memory().unwrap();
    let alice = key(1);
    let first = genesis_spend_to(addr_of(&alice));
    let second = spend(
        &alice,
        UtxoKey::new(hash_transaction(&first), 0),
        vec![out(1000, addr_of(&key(2)))],
    );
    chain
        .add_block(&block_on(&chain, &alice, vec![first, second]))
        .unwrap();
    assert_eq!(chain.height().unwrap(), 1);
}

#[test]
fn unbalanced_transaction_reports_sums() {
    let chain = Chain::in_memory().unwrap();
    let alice = key(1);
    let tx = spend(
        &genesis_key().unwrap(),
        genesis_utxo(),
        vec![out(1000, addr_of(&alice)), out(900, addr_of(&alice))],
    );
    let err = chain
        .add_block(&block_on(&chain, &alice, vec![tx]))
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::UnbalancedTransaction {
            inputs: 1000,
            outputs: 1900
        }
    ));
    assert!(err.to_string().contains("inputs 1000 outputs 1900"));
}

#[test]
fn overflowing_outputs_are_rejected() {
    let chain = Chain::in_memory().unwrap();
    let alice = key(1);
    let tx = spend(
        &genesis_key().unwrap(),
        genesis_utxo(),
        vec![out(u64::MAX, addr_of(&alice)), out(1, addr_of(&alice))],
    );
    let err = chain.validate_transaction(&tx).unwrap_err();
    assert!(matches!(err, ChainError::AmountOverflow));
}

#[test]
fn broken_chain_is_rejected() {
    let chain = Chain::in_memory().unwrap();
    let mut b = block_on(&chain, &key(1), vec![]);
    b.header.previous_hash = H256::sha256(b"elsewhere");
    sign_block(&key(1), &mut b);
    assert!(matches!(
        chain.add_block(&b),
        Err(ChainError::BrokenChain { .. })
    ));
}

#[test]
fn wrong_height_is_rejected() {
    let chain = Chain::in_memory().unwrap();
    let tip = chain.tip().unwrap();
    let mut header = header_on(&tip);
    header.height = 5;
    let mut b = Block::new(header, vec![]);
    sign_block(&key(1), &mut b);
    assert!(matches!(
        chain.add_block(&b),
        Err(ChainError::UnexpectedHeight {
            expected: 1,
            got: 5
        })
    ));
}

#[test]
fn unsigned_block_fails_verification_first() {
    let chain = Chain::in_memory().unwrap();
    let tip = chain.tip().unwrap();
    let b = Block::new(header_on(&tip), vec![]);
    assert!(matches!(
        chain.add_block(&b),
        Err(ChainError::Block(BlockError::Unsigned))
    ));
}

#[test]
fn spending_someone_elses_output_is_unauthorized() {
    let chain = Chain::in_memory().unwrap();
    let thief = key(66);
    let tx = spend(&thief, genesis_utxo(), vec![out(1000, addr_of(&thief))]);
    assert!(matches!(
        chain.validate_transaction(&tx),
        Err(ChainError::UnauthorizedSpend { .. })
    ));
}

#[test]
fn unsigned_input_is_rejected() {
    let chain = Chain::in_memory().unwrap();
    let mut tx = genesis_spend_to(addr_of(&key(1)));
    tx.inputs[0].signature.clear();
    assert!(matches!(
        chain.validate_transaction(&tx),
        Err(ChainError::Tx(TxError::MissingSignature { input: 0 }))
    ));
}

#[test]
fn unknown_input_counts_as_double_spend() {
    let chain = Chain::in_memory().unwrap();
    let alice = key(1);
    let ghost = UtxoKey::new(H256::sha256(b"ghost"), 0);
    let tx = spend(&alice, ghost, vec![]);
    assert!(matches!(
        chain.validate_transaction(&tx),
        Err(ChainError::DoubleSpend { key }) if key == ghost
    ));
}

#[test]
fn select_valid_keeps_only_sequentially_valid() {
    let chain = Chain::in_memory().unwrap();
    let alice = key(1);
    let good = genesis_spend_to(addr_of(&alice));
    let conflicting = genesis_spend_to(addr_of(&key(2)));
    let thief = key(66);
    let stolen = spend(&thief, genesis_utxo(), vec![out(1000, addr_of(&thief))]);
    let chained = spend(
        &alice,
        UtxoKey::new(hash_transaction(&good), 0),
        vec![out(1000, addr_of(&key(3)))],
    );

    let kept = chain.select_valid(vec![good.clone(), conflicting, stolen, chained.clone()]);
    assert_eq!(kept, vec![good, chained]);
}

/// Memory store whose block commits fail while `failing` is set.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl BlockStore for FlakyStore {
    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        self.inner.put_block(block)
    }

    fn get_block(&self, hash: &H256) -> Result<Block, StoreError> {
        self.inner.get_block(hash)
    }

    fn load_headers(&self) -> Result<Vec<Header>, StoreError> {
        self.inner.load_headers()
    }
}

impl TransactionStore for FlakyStore {
    fn put_transaction(&self, hash: &H256, tx: &Transaction) -> Result<(), StoreError> {
        self.inner.put_transaction(hash, tx)
    }

    fn get_transaction(&self, hash: &H256) -> Result<Transaction, StoreError> {
        self.inner.get_transaction(hash)
    }
}

impl UtxoStore for FlakyStore {
    fn put_utxo(&self, utxo: &Utxo) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Db("disk full".into()));
        }
        self.inner.put_utxo(utxo)
    }

    fn get_utxo(&self, key: &UtxoKey) -> Result<Utxo, StoreError> {
        self.inner.get_utxo(key)
    }
}

impl ChainStore for FlakyStore {
    fn commit_block(
        &self,
        block: &Block,
        txs: &[(H256, Transaction)],
        utxos: &[Utxo],
    ) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Db("disk full".into()));
        }
        self.inner.commit_block(block, txs, utxos)
    }
}

#[test]
fn failed_store_commit_applies_nothing_and_block_can_be_retried() {
    let store = Arc::new(FlakyStore::default());
    let chain = Chain::new(store.clone()).unwrap();
    let alice = key(1);
    let tx = genesis_spend_to(addr_of(&alice));
    let block = block_on(&chain, &alice, vec![tx.clone()]);

    store.failing.store(true, Ordering::SeqCst);
    assert!(matches!(
        chain.add_block(&block),
        Err(ChainError::Store(StoreError::Db(_)))
    ));
    assert_eq!(chain.height().unwrap(), 0);
    assert!(!chain.get_utxo(&genesis_utxo()).unwrap().spent);
    assert!(!chain.has_transaction(&hash_transaction(&tx)).unwrap());
    assert!(!chain.contains_block(&hash_block(&block)).unwrap());
    assert!(store.get_block(&hash_block(&block)).is_err());

    store.failing.store(false, Ordering::SeqCst);
    chain.add_block(&block).unwrap();
    assert_eq!(chain.height().unwrap(), 1);
    assert!(chain.get_utxo(&genesis_utxo()).unwrap().spent);
    assert_eq!(
        unspent_total(&chain, &[UtxoKey::new(hash_transaction(&tx), 0)]),
        GENESIS_SUPPLY
    );
}

#[test]
fn concurrent_conflicting_blocks_commit_once() {
    let chain = Arc::new(Chain::in_memory().unwrap());
    let payouts: Vec<_> = (1..=2u8)
        .map(|n| genesis_spend_to(addr_of(&key(n))))
        .collect();
    let blocks: Vec<Block> = payouts
        .iter()
        .map(|tx| block_on(&chain, &key(10), vec![tx.clone()]))
        .collect();

    let barrier = Arc::new(Barrier::new(blocks.len()));
    let handles: Vec<_> = blocks
        .into_iter()
        .map(|b| {
            let chain = Arc::clone(&chain);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                chain.add_block(&b)
            })
        })
        .collect();
    let results: Vec<Result<(), ChainError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(
        err,
        ChainError::BrokenChain { .. } | ChainError::DoubleSpend { .. }
    ));
    assert_eq!(chain.height().unwrap(), 1);
    assert!(chain.get_utxo(&genesis_utxo()).unwrap().spent);

    // Only the winner's output exists, so the supply was spent once.
    let created: Vec<UtxoKey> = payouts
        .iter()
        .map(|tx| UtxoKey::new(hash_transaction(tx), 0))
        .filter(|k| chain.get_utxo(k).is_ok())
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(unspent_total(&chain, &created), GENESIS_SUPPLY);
}
