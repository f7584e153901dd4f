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

//! Transport seams: outbound clients, dialers and the inbound request handler.

use crate::{
    core::types::{Block, Transaction},
    networking::message::{Envelope, ErrorKind, Request, Response, Version},
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Peer call errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Socket failure.
    #[error("io: {0}")]
    Io(String),
    /// No reply within the peer timeout.
    #[error("timeout")]
    Timeout,
    /// Frame failed to encode or decode.
    #[error("codec")]
    Codec,
    /// Peer refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
    /// Peer has no such record.
    #[error("not found: {0}")]
    NotFound(String),
    /// Reply variant does not match the request.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// No peer at the address.
    #[error("unreachable: {0}")]
    Unreachable(String),
}

impl RpcError {
    /// True when the connection itself failed (the peer should be evicted).
    /// A refusal or lookup miss is an answer, not a failure.
    pub fn is_transport_failure(&self) -> bool {
        !matches!(self, RpcError::Rejected(_) | RpcError::NotFound(_))
    }
}

fn refused(kind: ErrorKind, message: String) -> RpcError {
    match kind {
        ErrorKind::NotFound => RpcError::NotFound(message),
        ErrorKind::Rejected | ErrorKind::Internal => RpcError::Rejected(message),
    }
}

/// Serves inbound requests.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle one request and produce its response.
    async fn handle(&self, envelope: Envelope) -> Response;
}

/// Outbound connection to one peer.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Remote listen address.
    fn addr(&self) -> &str;

    /// Send one request and wait for the reply.
    async fn call(&self, envelope: Envelope) -> Result<Response, RpcError>;

    /// Exchange versions.
    async fn handshake(&self, from: &str, version: Version) -> Result<Version, RpcError> {
        let env = Envelope {
            from: from.to_string(),
            request: Request::Handshake(version),
        };
        match self.call(env).await? {
            Response::Version(v) => Ok(v),
            Response::Error { kind, message } => Err(refused(kind, message)),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// Offer a transaction.
    async fn handle_transaction(&self, from: &str, tx: Transaction) -> Result<(), RpcError> {
        self.expect_ack(from, Request::HandleTransaction(tx)).await
    }

    /// Offer a block.
    async fn handle_block(&self, from: &str, block: Block) -> Result<(), RpcError> {
        self.expect_ack(from, Request::HandleBlock(block)).await
    }

    /// Fetch the block at `height`.
    async fn get_block(&self, from: &str, height: u64) -> Result<Block, RpcError> {
        let env = Envelope {
            from: from.to_string(),
            request: Request::GetBlock(height),
        };
        match self.call(env).await? {
            Response::Block(b) => Ok(b),
            Response::Error { kind, message } => Err(refused(kind, message)),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// Send a request whose success reply is `Ack`.
    async fn expect_ack(&self, from: &str, request: Request) -> Result<(), RpcError> {
        let env = Envelope {
            from: from.to_string(),
            request,
        };
        match self.call(env).await? {
            Response::Ack => Ok(()),
            Response::Error { kind, message } => Err(refused(kind, message)),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }
}

/// Creates clients for peer addresses.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Client for `addr`. May fail fast when the address is known to be unreachable.
    async fn dial(&self, addr: &str) -> Result<Arc<dyn PeerClient>, RpcError>;
}
