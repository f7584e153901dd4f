// Copyright (c) 2026 Blocker
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;

use blocker::core::{
    state::merkle::{merkle_proof, merkle_root, verify_proof, verify_root, MerkleError},
    types::H256,
};

fn leaves(raw: &[[u8; 32]]) -> Vec<H256> {
    raw.iter().map(|b| H256::from_bytes(*b)).collect()
}

#[test]
fn empty_set_has_zero_root() {
    assert_eq!(merkle_root(&[]), H256::ZERO);
    assert!(merkle_proof(&[], 0).is_none());
}

#[test]
fn mismatch_reports_both_roots() {
    let hs = leaves(&[[1u8; 32], [2u8; 32]]);
    let stored = H256::from_bytes([9u8; 32]);
    let computed = merkle_root(&hs);
    assert_eq!(
        verify_root(&hs, &stored),
        Err(MerkleError::RootHashMismatch { stored, computed })
    );
}

proptest! {
    #[test]
    fn prop_proof_verifies_for_every_leaf(raw in proptest::collection::vec(any::<[u8;32]>(), 1..40)) {
        let hs = leaves(&raw);
        let root = merkle_root(&hs);
        prop_assert_eq!(verify_root(&hs, &root), Ok(()));
        for (i, h) in hs.iter().enumerate() {
            let proof = merkle_proof(&hs, i).expect("index in range");
            prop_assert!(verify_proof(&root, h, &proof));
        }
        prop_assert!(merkle_proof(&hs, hs.len()).is_none());
    }

    #[test]
    fn prop_root_is_order_sensitive(raw in proptest::collection::vec(any::<[u8;32]>(), 2..20), i in 0usize..20, j in 0usize..20) {
        let mut hs = leaves(&raw);
        let (i, j) = (i % hs.len(), j % hs.len());
        prop_assume!(hs[i] != hs[j]);
        let before = merkle_root(&hs);
        hs.swap(i, j);
        prop_assert_ne!(merkle_root(&hs), before);
    }

    #[test]
    fn prop_proof_rejects_foreign_leaf(raw in proptest::collection::vec(any::<[u8;32]>(), 1..20), other in any::<[u8;32]>()) {
        let hs = leaves(&raw);
        let foreign = H256::from_bytes(other);
        prop_assume!(!hs.contains(&foreign));
        let root = merkle_root(&hs);
        let proof = merkle_proof(&hs, 0).expect("non-empty");
        prop_assert!(!verify_proof(&root, &foreign, &proof));
    }
}
