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

//! Ledger value types and canonical encoding helpers.

use crate::core::security::keys::Address;
use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("serialization")]
    Serialize,
    /// Decoding failed or trailing bytes were present.
    #[error("deserialization")]
    Deserialize,
    /// Payload is over the size cap.
    #[error("size limit exceeded")]
    TooLarge,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules.
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    // Cap inside the deserializer too, so length prefixes cannot force huge allocations.
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// 256-bit hash type (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct H256([u8; 32]);

impl H256 {
    /// All-zero hash, used as the parent of genesis and the root of an empty block.
    pub const ZERO: H256 = H256([0u8; 32]);

    /// Construct from raw bytes.
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    /// Return bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from lowercase or uppercase hex.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim()).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Some(Self(out))
    }

    /// SHA-256 of `data`.
    pub fn sha256(data: &[u8]) -> Self {
        let d = ring::digest::digest(&ring::digest::SHA256, data);
        let mut out = [0u8; 32];
        out.copy_from_slice(d.as_ref());
        Self(out)
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.to_hex())
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Reference to a previously created output being spent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Hash of the transaction that created the output.
    pub prev_tx_hash: H256,
    /// Output index inside that transaction.
    pub prev_out_index: u32,
    /// Spender's Ed25519 public key bytes (expected 32); must own the referenced output.
    pub public_key: Vec<u8>,
    /// Ed25519 signature bytes (expected 64) over the blanked transaction hash. Empty until signed.
    pub signature: Vec<u8>,
}

/// A newly created spendable value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount; unsigned so it can never be negative.
    pub amount: u64,
    /// Destination address.
    pub to_address: Address,
}

/// A value transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Format version.
    pub version: u32,
    /// Ordered inputs.
    pub inputs: Vec<TxInput>,
    /// Ordered outputs.
    pub outputs: Vec<TxOutput>,
}

/// Block metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Format version.
    pub version: u32,
    /// Height in the chain (genesis = 0).
    pub height: u64,
    /// Hash of the parent header.
    pub previous_hash: H256,
    /// Merkle root of transaction hashes; zero when the block is empty.
    pub merkle_root: H256,
    /// Proposal time, milliseconds since UNIX epoch.
    pub timestamp: i64,
}

/// Ordered batch of transactions plus the proposer's signature over the header hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Header.
    pub header: Header,
    /// Ordered transactions.
    pub transactions: Vec<Transaction>,
    /// Proposer public key bytes (expected 32), set by signing.
    pub public_key: Vec<u8>,
    /// Proposer signature bytes (expected 64) over the header hash, set by signing.
    pub signature: Vec<u8>,
}

impl Block {
    /// Unsigned block.
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
            public_key: Vec::new(),
            signature: Vec::new(),
        }
    }
}

/// Composite UTXO key: `(source tx hash, output index)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtxoKey {
    /// Source transaction hash.
    pub tx_hash: H256,
    /// Output index.
    pub index: u32,
}

impl UtxoKey {
    /// Build a key.
    pub fn new(tx_hash: H256, index: u32) -> Self {
        Self { tx_hash, index }
    }

    /// Fixed-width byte form used by durable stores: `hash || index_be`.
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(self.tx_hash.as_bytes());
        out[32..].copy_from_slice(&self.index.to_be_bytes());
        out
    }
}

/// Renders as `<hex tx hash>_<index>`.
impl fmt::Display for UtxoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tx_hash, self.index)
    }
}

/// An unspent (or spent) output record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Transaction that created the output.
    pub tx_hash: H256,
    /// Output index.
    pub index: u32,
    /// Amount.
    pub amount: u64,
    /// Owner address copied from the output.
    pub owner: Address,
    /// Flipped exactly once by the consuming input.
    pub spent: bool,
}

impl Utxo {
    /// Store key of this record.
    pub fn key(&self) -> UtxoKey {
        UtxoKey::new(self.tx_hash, self.index)
    }
}
