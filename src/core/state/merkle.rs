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

//! Binary Merkle tree over ordered transaction hashes.
//!
//! leaf = H( "Blocker-Tx-Leaf-v1" || tx_hash )
//! node = H( "Blocker-Tx-Node-v1" || left || right )
//!
//! A level with an odd number of nodes pairs its last node with itself.
//! The root of an empty leaf list is the zero hash.

use crate::core::types::H256;
use thiserror::Error;

const LEAF_DOMAIN: &[u8] = b"Blocker-Tx-Leaf-v1";
const NODE_DOMAIN: &[u8] = b"Blocker-Tx-Node-v1";

/// Merkle errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// Recomputed root differs from the stored one.
    #[error("root hash mismatch: stored {stored}, computed {computed}")]
    RootHashMismatch {
        /// Root carried by the header.
        stored: H256,
        /// Root recomputed from the leaves.
        computed: H256,
    },
}

/// Side of sibling in proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Sibling is left.
    Left,
    /// Sibling is right.
    Right,
}

/// One proof item.
#[derive(Clone, Debug)]
pub struct ProofItem {
    /// Whether sibling is left or right of current hash.
    pub side: Side,
    /// Sibling hash.
    pub sibling: H256,
}

/// Merkle inclusion proof for one transaction.
#[derive(Clone, Debug)]
pub struct MerkleProof {
    /// Leaf hash (domain-tagged transaction hash).
    pub leaf: H256,
    /// Path items from leaf to root.
    pub path: Vec<ProofItem>,
}

fn hash_leaf(tx_hash: &H256) -> H256 {
    let mut buf = Vec::with_capacity(LEAF_DOMAIN.len() + 32);
    buf.extend_from_slice(LEAF_DOMAIN);
    buf.extend_from_slice(tx_hash.as_bytes());
    H256::sha256(&buf)
}

fn hash_node(left: &H256, right: &H256) -> H256 {
    let mut buf = Vec::with_capacity(NODE_DOMAIN.len() + 64);
    buf.extend_from_slice(NODE_DOMAIN);
    buf.extend_from_slice(left.as_bytes());
    buf.extend_from_slice(right.as_bytes());
    H256::sha256(&buf)
}

fn next_level(level: &[H256]) -> Vec<H256> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_node(left, right)
        })
        .collect()
}

/// Merkle root over ordered transaction hashes. Empty input yields [`H256::ZERO`].
pub fn merkle_root(tx_hashes: &[H256]) -> H256 {
    if tx_hashes.is_empty() {
        return H256::ZERO;
    }
    let mut level: Vec<H256> = tx_hashes.iter().map(hash_leaf).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Recompute the root and compare it with `stored`.
pub fn verify_root(tx_hashes: &[H256], stored: &H256) -> Result<(), MerkleError> {
    let computed = merkle_root(tx_hashes);
    if &computed != stored {
        return Err(MerkleError::RootHashMismatch {
            stored: *stored,
            computed,
        });
    }
    Ok(())
}

/// Inclusion proof for the leaf at `index`.
pub fn merkle_proof(tx_hashes: &[H256], index: usize) -> Option<MerkleProof> {
    if index >= tx_hashes.len() {
        return None;
    }

    let mut level: Vec<H256> = tx_hashes.iter().map(hash_leaf).collect();
    let mut idx = index;
    let leaf = level[idx];
    let mut path = Vec::new();

    while level.len() > 1 {
        let is_right = idx % 2 == 1;
        let sib_idx = if is_right { idx - 1 } else { idx + 1 };
        let sibling = level.get(sib_idx).copied().unwrap_or(level[idx]);

        path.push(ProofItem {
            side: if is_right { Side::Left } else { Side::Right },
            sibling,
        });

        level = next_level(&level);
        idx /= 2;
    }

    Some(MerkleProof { leaf, path })
}

/// Verify that `proof` leads from `tx_hash` to `root`.
pub fn verify_proof(root: &H256, tx_hash: &H256, proof: &MerkleProof) -> bool {
    if hash_leaf(tx_hash) != proof.leaf {
        return false;
    }
    let mut cur = proof.leaf;
    for item in proof.path.iter() {
        cur = match item.side {
            Side::Left => hash_node(&item.sibling, &cur),
            Side::Right => hash_node(&cur, &item.sibling),
        };
    }
    &cur == root
}
