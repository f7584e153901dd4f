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
    ledger::{
        block::{hash_block, sign_block, verify_block, BlockError},
        transaction::{
            hash_transaction, sign_transaction, signing_hash, verify_transaction, TxError,
        },
    },
    state::merkle::{merkle_root, MerkleError},
    types::{Block, Header, Transaction, TxInput, H256},
};
use common::{addr_of, key, out};

fn header() -> Header {
    Header {
        version: 1,
        height: 1,
        previous_hash: H256::sha256(b"parent"),
        merkle_root: H256::ZERO,
        timestamp: 1_700_000_000_000,
    }
}

fn tx(seed: u8, amount: u64) -> Transaction {
    let k = key(seed);
    let mut t = Transaction {
        version: 1,
        inputs: vec![TxInput {
            prev_tx_hash: H256::sha256(&[seed]),
            prev_out_index: 0,
            public_key: k.public().to_vec(),
            signature: vec![],
        }],
        outputs: vec![out(amount, addr_of(&key(99)))],
    };
    assert_eq!(sign_transaction(&k, &mut t), 1);
    t
}

#[test]
fn sign_block_sets_root_and_verifies() {
    let k = key(1);
    let mut b = Block::new(header(), vec![tx(2, 10), tx(3, 20)]);
    let sig = sign_block(&k, &mut b);

    let hashes: Vec<H256> = b.transactions.iter().map(hash_transaction).collect();
    assert_eq!(b.header.merkle_root, merkle_root(&hashes));
    assert_eq!(b.public_key, k.public().to_vec());
    assert_eq!(b.signature, sig.to_vec());
    assert_eq!(verify_block(&b), Ok(()));
}

#[test]
fn tampered_header_fails_signature() {
    let mut b = Block::new(header(), vec![tx(2, 10)]);
    sign_block(&key(1), &mut b);
    let before = hash_block(&b);

    b.header.timestamp += 1;
    assert_ne!(hash_block(&b), before);
    assert_eq!(verify_block(&b), Err(BlockError::InvalidSignature));
}

#[test]
fn tampered_transactions_fail_root_check() {
    let mut b = Block::new(header(), vec![tx(2, 10), tx(3, 20)]);
    sign_block(&key(1), &mut b);

    b.transactions.swap(0, 1);
    assert!(matches!(
        verify_block(&b),
        Err(BlockError::InvalidRootHash(MerkleError::RootHashMismatch { .. }))
    ));
}

#[test]
fn empty_block_keeps_zero_root() {
    let mut b = Block::new(header(), vec![]);
    sign_block(&key(1), &mut b);
    assert_eq!(b.header.merkle_root, H256::ZERO);
    assert_eq!(verify_block(&b), Ok(()));
}

#[test]
fn malformed_proposer_fields_are_rejected() {
    let mut b = Block::new(header(), vec![]);
    assert_eq!(verify_block(&b), Err(BlockError::Unsigned));

    sign_block(&key(1), &mut b);
    let mut short_key = b.clone();
    short_key.public_key.truncate(31);
    assert_eq!(verify_block(&short_key), Err(BlockError::InvalidKeyLength(31)));

    let mut short_sig = b.clone();
    short_sig.signature.pop();
    assert_eq!(
        verify_block(&short_sig),
        Err(BlockError::InvalidSignatureLength(63))
    );

    let mut other_key = b;
    other_key.public_key = key(5).public().to_vec();
    assert_eq!(verify_block(&other_key), Err(BlockError::InvalidSignature));
}

#[test]
fn transaction_roundtrip_and_tamper() {
    let t = tx(4, 50);
    assert_eq!(verify_transaction(&t), Ok(()));

    let mut tampered = t.clone();
    tampered.outputs[0].amount = 51;
    assert_eq!(
        verify_transaction(&tampered),
        Err(TxError::InvalidSignature { input: 0 })
    );
}

#[test]
fn unsigned_input_is_missing_signature() {
    let mut t = tx(4, 50);
    t.inputs[0].signature.clear();
    assert_eq!(
        verify_transaction(&t),
        Err(TxError::MissingSignature { input: 0 })
    );
}

#[test]
fn inputs_from_different_signers_sign_the_same_blanked_hash() {
    let alice = key(10);
    let bob = key(11);
    let mut t = Transaction {
        version: 1,
        inputs: vec![
            TxInput {
                prev_tx_hash: H256::sha256(b"a"),
                prev_out_index: 0,
                public_key: alice.public().to_vec(),
                signature: vec![],
            },
            TxInput {
                prev_tx_hash: H256::sha256(b"b"),
                prev_out_index: 1,
                public_key: bob.public().to_vec(),
                signature: vec![],
            },
        ],
        outputs: vec![out(5, addr_of(&key(12)))],
    };
    let blank = signing_hash(&t);

    assert_eq!(sign_transaction(&alice, &mut t), 1);
    assert_eq!(
        verify_transaction(&t),
        Err(TxError::MissingSignature { input: 1 })
    );
    assert_eq!(sign_transaction(&bob, &mut t), 1);

    assert_eq!(signing_hash(&t), blank);
    assert_ne!(hash_transaction(&t), blank);
    assert_eq!(verify_transaction(&t), Ok(()));
}
