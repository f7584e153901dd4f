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

//! Transaction hashing, signing and signature verification.

use crate::core::{
    security::keys::{CryptoError, PrivateKey, PublicKey, Signature},
    types::{Transaction, H256},
};
use thiserror::Error;

const TX_DOMAIN: &[u8] = b"Blocker-Tx-v1";

/// Transaction verification errors. `input` is the offending input index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    /// Input carries no signature.
    #[error("input {input}: missing signature")]
    MissingSignature {
        /// Input index.
        input: usize,
    },
    /// Input public key is not 32 bytes.
    #[error("input {input}: invalid public key length {len}")]
    InvalidKeyLength {
        /// Input index.
        input: usize,
        /// Observed length.
        len: usize,
    },
    /// Input signature is not 64 bytes.
    #[error("input {input}: invalid signature length {len}")]
    InvalidSignatureLength {
        /// Input index.
        input: usize,
        /// Observed length.
        len: usize,
    },
    /// Signature does not verify.
    #[error("input {input}: invalid signature")]
    InvalidSignature {
        /// Input index.
        input: usize,
    },
}

/// Which signature bytes go into the canonical encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Signatures {
    Include,
    Blank,
}

fn put_bytes(out: &mut Vec<u8>, tag: u8, b: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(b.len() as u32).to_be_bytes());
    out.extend_from_slice(b);
}

/// Canonical bytes: domain || tagged fields in declaration order.
///
/// Every variable-length field is length-prefixed, so distinct transactions never share an encoding.
fn canonical_bytes(tx: &Transaction, sigs: Signatures) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        TX_DOMAIN.len() + 16 + tx.inputs.len() * (32 + 4 + 32 + 64 + 16) + tx.outputs.len() * 32,
    );
    out.extend_from_slice(TX_DOMAIN);
    out.push(0x01);
    out.extend_from_slice(&tx.version.to_be_bytes());

    out.push(0x02);
    out.extend_from_slice(&(tx.inputs.len() as u32).to_be_bytes());
    for input in tx.inputs.iter() {
        out.push(0x10);
        out.extend_from_slice(input.prev_tx_hash.as_bytes());
        out.push(0x11);
        out.extend_from_slice(&input.prev_out_index.to_be_bytes());
        put_bytes(&mut out, 0x12, &input.public_key);
        match sigs {
            Signatures::Include => put_bytes(&mut out, 0x13, &input.signature),
            Signatures::Blank => put_bytes(&mut out, 0x13, &[]),
        }
    }

    out.push(0x03);
    out.extend_from_slice(&(tx.outputs.len() as u32).to_be_bytes());
    for output in tx.outputs.iter() {
        out.push(0x20);
        out.extend_from_slice(&output.amount.to_be_bytes());
        out.push(0x21);
        out.extend_from_slice(output.to_address.as_bytes());
    }
    out
}

/// Content hash of a transaction, signatures included. Keys the mempool, the tx store and UTXOs.
pub fn hash_transaction(tx: &Transaction) -> H256 {
    H256::sha256(&canonical_bytes(tx, Signatures::Include))
}

/// Hash every input signs: the transaction with all input signatures cleared.
pub fn signing_hash(tx: &Transaction) -> H256 {
    H256::sha256(&canonical_bytes(tx, Signatures::Blank))
}

/// Sign every input whose public key belongs to `key`. Returns the number of inputs signed.
pub fn sign_transaction(key: &PrivateKey, tx: &mut Transaction) -> usize {
    let own = key.public().to_vec();
    let sig = key.sign(signing_hash(tx).as_bytes()).to_vec();
    let mut signed = 0;
    for input in tx.inputs.iter_mut().filter(|i| i.public_key == own) {
        input.signature = sig.clone();
        signed += 1;
    }
    signed
}

/// Verify every input signature against the blanked transaction hash.
///
/// Inputs are checked in order and the first failure is reported. The transaction is not mutated.
pub fn verify_transaction(tx: &Transaction) -> Result<(), TxError> {
    let msg = signing_hash(tx);
    for (i, input) in tx.inputs.iter().enumerate() {
        if input.signature.is_empty() {
            return Err(TxError::MissingSignature { input: i });
        }
        let pk = PublicKey::from_bytes(&input.public_key).map_err(|e| match e {
            CryptoError::InvalidKeyLength(len) => TxError::InvalidKeyLength { input: i, len },
            _ => TxError::InvalidSignature { input: i },
        })?;
        let sig = Signature::from_bytes(&input.signature).map_err(|e| match e {
            CryptoError::InvalidSignatureLength(len) => {
                TxError::InvalidSignatureLength { input: i, len }
            }
            _ => TxError::InvalidSignature { input: i },
        })?;
        if !pk.verify(msg.as_bytes(), &sig) {
            return Err(TxError::InvalidSignature { input: i });
        }
    }
    Ok(())
}
