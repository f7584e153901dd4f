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

//! Peer protocol messages.

use crate::core::types::{
    decode_canonical_limited, encode_canonical, Block, CodecError, Transaction,
};
use serde::{Deserialize, Serialize};

/// Chain and peer metadata exchanged in a handshake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Protocol identifier, e.g. `blocker-1`.
    pub protocol_version: String,
    /// Sender's chain height.
    pub height: u64,
    /// Address the sender accepts peer calls on.
    pub listen_addr: String,
    /// Addresses of the sender's established peers.
    pub peers: Vec<String>,
}

/// Gossip payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Unconfirmed transaction.
    Transaction(Transaction),
    /// Accepted block.
    Block(Block),
}

/// Peer RPC request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Exchange versions.
    Handshake(Version),
    /// Offer a transaction.
    HandleTransaction(Transaction),
    /// Offer a block.
    HandleBlock(Block),
    /// Fetch the block at a height.
    GetBlock(u64),
}

/// Why a request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Payload was invalid for the receiver's ledger.
    Rejected,
    /// Lookup miss.
    NotFound,
    /// Receiver failed internally.
    Internal,
}

/// Peer RPC response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Handshake reply.
    Version(Version),
    /// Request accepted (or already known).
    Ack,
    /// `GetBlock` reply.
    Block(Block),
    /// Request refused.
    Error {
        /// Category.
        kind: ErrorKind,
        /// Human-readable reason.
        message: String,
    },
}

/// A request tagged with the sender's listen address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender listen address.
    pub from: String,
    /// Request body.
    pub request: Request,
}

impl Envelope {
    /// Canonical bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode_canonical(self)
    }

    /// Decode with a size cap.
    pub fn decode(bytes: &[u8], max: usize) -> Result<Self, CodecError> {
        decode_canonical_limited(bytes, max)
    }
}

impl Response {
    /// Canonical bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode_canonical(self)
    }

    /// Decode with a size cap.
    pub fn decode(bytes: &[u8], max: usize) -> Result<Self, CodecError> {
        decode_canonical_limited(bytes, max)
    }
}
