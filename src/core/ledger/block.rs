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

//! Header hashing and block signing/verification.

use crate::core::{
    ledger::transaction::hash_transaction,
    security::keys::{PrivateKey, PublicKey, Signature},
    state::merkle::{merkle_root, verify_root, MerkleError},
    types::{Block, Header, H256},
};
use thiserror::Error;

const HEADER_DOMAIN: &[u8] = b"Blocker-Header-v1";

/// Block verification errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// Transactions present and the header root does not match them.
    #[error("invalid root hash: {0}")]
    InvalidRootHash(#[from] MerkleError),
    /// Block carries neither a proposer key nor a signature.
    #[error("block is not signed")]
    Unsigned,
    /// Proposer key is not 32 bytes.
    #[error("invalid public key length {0}")]
    InvalidKeyLength(usize),
    /// Proposer signature is not 64 bytes.
    #[error("invalid signature length {0}")]
    InvalidSignatureLength(usize),
    /// Signature does not verify against the header hash.
    #[error("invalid block signature")]
    InvalidSignature,
}

/// Canonical header bytes: domain || tag/value pairs in declaration order.
pub fn header_signing_bytes(h: &Header) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_DOMAIN.len() + 5 + 4 + 8 + 32 + 32 + 8);
    out.extend_from_slice(HEADER_DOMAIN);
    out.push(0x01);
    out.extend_from_slice(&h.version.to_be_bytes());
    out.push(0x02);
    out.extend_from_slice(&h.height.to_be_bytes());
    out.push(0x03);
    out.extend_from_slice(h.previous_hash.as_bytes());
    out.push(0x04);
    out.extend_from_slice(h.merkle_root.as_bytes());
    out.push(0x05);
    out.extend_from_slice(&h.timestamp.to_be_bytes());
    out
}

/// SHA-256 of the canonical header bytes.
pub fn hash_header(h: &Header) -> H256 {
    H256::sha256(&header_signing_bytes(h))
}

/// Block identity is its header hash.
pub fn hash_block(b: &Block) -> H256 {
    hash_header(&b.header)
}

/// Transaction hashes in block order.
pub fn transaction_hashes(b: &Block) -> Vec<H256> {
    b.transactions.iter().map(hash_transaction).collect()
}

/// Set the Merkle root (when the block has transactions), sign the header hash and attach
/// the proposer key and signature.
pub fn sign_block(key: &PrivateKey, block: &mut Block) -> Signature {
    if !block.transactions.is_empty() {
        block.header.merkle_root = merkle_root(&transaction_hashes(block));
    }
    let sig = key.sign(hash_block(block).as_bytes());
    block.public_key = key.public().to_vec();
    block.signature = sig.to_vec();
    sig
}

/// Check the Merkle root, key/signature lengths and the proposer signature.
///
/// A block without transactions has no enforced root.
pub fn verify_block(block: &Block) -> Result<(), BlockError> {
    if !block.transactions.is_empty() {
        verify_root(&transaction_hashes(block), &block.header.merkle_root)?;
    }
    if block.public_key.is_empty() && block.signature.is_empty() {
        return Err(BlockError::Unsigned);
    }
    let pk = PublicKey::from_bytes(&block.public_key)
        .map_err(|_| BlockError::InvalidKeyLength(block.public_key.len()))?;
    let sig = Signature::from_bytes(&block.signature)
        .map_err(|_| BlockError::InvalidSignatureLength(block.signature.len()))?;
    if !pk.verify(hash_block(block).as_bytes(), &sig) {
        return Err(BlockError::InvalidSignature);
    }
    Ok(())
}
