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

//! Ed25519 identities: key pairs, signatures and addresses.
//!
//! Byte lengths are fixed (seed 32, public key 32, signature 64, address 20). Every
//! constructor from raw bytes rejects a wrong length with a typed error.

use ring::{
    rand::{SecureRandom, SystemRandom},
    signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

/// Seed length in bytes.
pub const SEED_LEN: usize = 32;
/// Public key length in bytes.
pub const PUB_KEY_LEN: usize = 32;
/// Signature length in bytes.
pub const SIG_LEN: usize = 64;
/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Crypto errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Seed is not 32 bytes.
    #[error("invalid seed length: expected {SEED_LEN}, got {0}")]
    InvalidSeedLength(usize),
    /// Public key is not 32 bytes.
    #[error("invalid public key length: expected {PUB_KEY_LEN}, got {0}")]
    InvalidKeyLength(usize),
    /// Signature is not 64 bytes.
    #[error("invalid signature length: expected {SIG_LEN}, got {0}")]
    InvalidSignatureLength(usize),
    /// Address is not 20 bytes.
    #[error("invalid address length: expected {ADDRESS_LEN}, got {0}")]
    InvalidAddressLength(usize),
    /// System randomness or key construction failed.
    #[error("key generation")]
    KeyGeneration,
    /// Hex decoding failed.
    #[error("hex")]
    Hex,
}

/// Ed25519 private key, held as its 32-byte seed plus the expanded key pair.
pub struct PrivateKey {
    seed: [u8; SEED_LEN],
    keypair: Ed25519KeyPair,
}

impl PrivateKey {
    /// Generate a key from a fresh secure-random seed.
    pub fn generate() -> Result<Self, CryptoError> {
        let rng = SystemRandom::new();
        let mut seed = [0u8; SEED_LEN];
        rng.fill(&mut seed).map_err(|_| CryptoError::KeyGeneration)?;
        let key = Self::from_seed(&seed);
        seed.zeroize();
        key
    }

    /// Derive a key deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        if seed.len() != SEED_LEN {
            return Err(CryptoError::InvalidSeedLength(seed.len()));
        }
        let keypair =
            Ed25519KeyPair::from_seed_unchecked(seed).map_err(|_| CryptoError::KeyGeneration)?;
        let mut out = [0u8; SEED_LEN];
        out.copy_from_slice(seed);
        Ok(Self { seed: out, keypair })
    }

    /// Derive a key from a hex-encoded seed.
    pub fn from_hex_seed(seed_hex: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode(seed_hex.trim()).map_err(|_| CryptoError::Hex)?;
        let key = Self::from_seed(&bytes);
        bytes.zeroize();
        key
    }

    /// Raw seed bytes. Handle with care.
    pub fn seed(&self) -> &[u8; SEED_LEN] {
        &self.seed
    }

    /// Matching public key.
    pub fn public(&self) -> PublicKey {
        let mut out = [0u8; PUB_KEY_LEN];
        out.copy_from_slice(self.keypair.public_key().as_ref());
        PublicKey(out)
    }

    /// Sign an arbitrary message.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        let sig = self.keypair.sign(msg);
        let mut out = [0u8; SIG_LEN];
        out.copy_from_slice(sig.as_ref());
        Signature(out)
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public())
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey([u8; PUB_KEY_LEN]);

impl PublicKey {
    /// Parse from a byte slice, rejecting wrong lengths.
    pub fn from_bytes(b: &[u8]) -> Result<Self, CryptoError> {
        if b.len() != PUB_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength(b.len()));
        }
        let mut out = [0u8; PUB_KEY_LEN];
        out.copy_from_slice(b);
        Ok(Self(out))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUB_KEY_LEN] {
        &self.0
    }

    /// Owned byte vector, the form carried on the wire.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Address derived from this key: its last 20 bytes.
    pub fn address(&self) -> Address {
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&self.0[PUB_KEY_LEN - ADDRESS_LEN..]);
        Address(out)
    }

    /// Verify `sig` over `msg`. A mismatch is `false`, never an error.
    pub fn verify(&self, msg: &[u8], sig: &Signature) -> bool {
        UnparsedPublicKey::new(&ED25519, &self.0)
            .verify(msg, &sig.0)
            .is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIG_LEN]);

impl Signature {
    /// Parse from a byte slice, rejecting wrong lengths.
    pub fn from_bytes(b: &[u8]) -> Result<Self, CryptoError> {
        if b.len() != SIG_LEN {
            return Err(CryptoError::InvalidSignatureLength(b.len()));
        }
        let mut out = [0u8; SIG_LEN];
        out.copy_from_slice(b);
        Ok(Self(out))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIG_LEN] {
        &self.0
    }

    /// Owned byte vector, the form carried on the wire.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// Account address: last 20 bytes of a public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Parse from a byte slice, rejecting wrong lengths.
    pub fn from_bytes(b: &[u8]) -> Result<Self, CryptoError> {
        if b.len() != ADDRESS_LEN {
            return Err(CryptoError::InvalidAddressLength(b.len()));
        }
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(b);
        Ok(Self(out))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
