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

//! Blocker - a minimal UTXO blockchain node.
//!
//! This repository provides:
//! - Ed25519 keys, deterministic transaction/header hashing and a transaction Merkle tree
//! - An append-only chain with a UTXO set, a mempool and a fixed genesis
//! - A peer protocol (handshake discovery, transaction and block gossip, chain sync)
//! - A validator loop that proposes signed blocks
//! - In-memory and sled stores, Prometheus metrics and structured logging

/// Node configuration.
pub mod config;
/// Ledger primitives (types, crypto, hashing, state, chain, mempool).
pub mod core;
/// Observability (metrics, status endpoint).
pub mod monitoring;
/// Peer protocol (messages, transports, node).
pub mod networking;
