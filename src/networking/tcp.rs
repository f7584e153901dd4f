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

//! TCP transport.
//!
//! Frame: `len: u32 BE || canonical bincode`. A connection carries request/response pairs until
//! either side closes it. Clients open one connection per call.

use crate::networking::{
    message::{Envelope, Response},
    transport::{Dialer, PeerClient, RequestHandler, RpcError},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::watch,
};
use tracing::{debug, info, warn};

fn io_err(e: std::io::Error) -> RpcError {
    RpcError::Io(e.to_string())
}

/// Read one frame. `Ok(None)` on clean EOF before the length prefix.
pub async fn read_frame<R: AsyncRead + Unpin>(
    r: &mut R,
    max: usize,
) -> Result<Option<Vec<u8>>, RpcError> {
    let len = match r.read_u32().await {
        Ok(n) => n as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(io_err(e)),
    };
    if len > max {
        return Err(RpcError::Codec);
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).await.map_err(io_err)?;
    Ok(Some(buf))
}

/// Write one frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, payload: &[u8]) -> Result<(), RpcError> {
    let len = u32::try_from(payload.len()).map_err(|_| RpcError::Codec)?;
    w.write_u32(len).await.map_err(io_err)?;
    w.write_all(payload).await.map_err(io_err)?;
    w.flush().await.map_err(io_err)?;
    Ok(())
}

/// Accept peer connections until `shutdown` flips to `true`.
pub async fn serve(
    listener: TcpListener,
    handler: Arc<dyn RequestHandler>,
    max_frame: usize,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), RpcError> {
    let local = listener.local_addr().map_err(io_err)?;
    info!(addr = %local, "peer listener started");
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(addr = %local, "peer listener stopped");
                    return Ok(());
                }
            }
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(err = %e, "accept failed");
                        continue;
                    }
                };
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, handler, max_frame).await {
                        debug!(peer = %remote, err = %e, "connection closed with error");
                    }
                });
            }
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Arc<dyn RequestHandler>,
    max_frame: usize,
) -> Result<(), RpcError> {
    while let Some(frame) = read_frame(&mut stream, max_frame).await? {
        let env = Envelope::decode(&frame, max_frame).map_err(|_| RpcError::Codec)?;
        let resp = handler.handle(env).await;
        let bytes = resp.encode().map_err(|_| RpcError::Codec)?;
        write_frame(&mut stream, &bytes).await?;
    }
    Ok(())
}

/// Client for one TCP peer.
pub struct TcpClient {
    addr: String,
    max_frame: usize,
}

#[async_trait]
impl PeerClient for TcpClient {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn call(&self, envelope: Envelope) -> Result<Response, RpcError> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| RpcError::Unreachable(format!("{}: {e}", self.addr)))?;
        let bytes = envelope.encode().map_err(|_| RpcError::Codec)?;
        write_frame(&mut stream, &bytes).await?;
        let Some(frame) = read_frame(&mut stream, self.max_frame).await? else {
            return Err(RpcError::Io("connection closed before reply".into()));
        };
        Response::decode(&frame, self.max_frame).map_err(|_| RpcError::Codec)
    }
}

/// Creates [`TcpClient`]s. Dialing does no I/O; the first call connects.
pub struct TcpDialer {
    max_frame: usize,
}

impl TcpDialer {
    /// Dialer whose clients accept replies up to `max_frame` bytes.
    pub fn new(max_frame: usize) -> Self {
        Self { max_frame }
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, addr: &str) -> Result<Arc<dyn PeerClient>, RpcError> {
        Ok(Arc::new(TcpClient {
            addr: addr.to_string(),
            max_frame: self.max_frame,
        }))
    }
}
