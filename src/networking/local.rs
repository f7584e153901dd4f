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

//! In-process transport: addresses map to handlers in a shared registry.

use crate::networking::{
    message::{Envelope, Response},
    transport::{Dialer, PeerClient, RequestHandler, RpcError},
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock, Weak},
};

type Registry = RwLock<HashMap<String, Weak<dyn RequestHandler>>>;

/// Shared address registry. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    handlers: Arc<Registry>,
}

impl LocalNetwork {
    /// Empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `addr` to `handler`. Held weakly, so a dropped node becomes unreachable.
    pub fn register(&self, addr: &str, handler: &Arc<dyn RequestHandler>) {
        let mut g = self.handlers.write().unwrap_or_else(|p| p.into_inner());
        g.insert(addr.to_string(), Arc::downgrade(handler));
    }

    /// Make `addr` unreachable.
    pub fn unregister(&self, addr: &str) {
        let mut g = self.handlers.write().unwrap_or_else(|p| p.into_inner());
        g.remove(addr);
    }

    fn lookup(&self, addr: &str) -> Option<Arc<dyn RequestHandler>> {
        let g = self.handlers.read().unwrap_or_else(|p| p.into_inner());
        g.get(addr).and_then(Weak::upgrade)
    }
}

/// Client routed through a [`LocalNetwork`].
pub struct LocalClient {
    addr: String,
    network: LocalNetwork,
}

#[async_trait]
impl PeerClient for LocalClient {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn call(&self, envelope: Envelope) -> Result<Response, RpcError> {
        let Some(handler) = self.network.lookup(&self.addr) else {
            return Err(RpcError::Unreachable(self.addr.clone()));
        };
        // One task per inbound request, as a socket server would run it.
        tokio::spawn(async move { handler.handle(envelope).await })
            .await
            .map_err(|e| RpcError::Io(e.to_string()))
    }
}

#[async_trait]
impl Dialer for LocalNetwork {
    async fn dial(&self, addr: &str) -> Result<Arc<dyn PeerClient>, RpcError> {
        if self.lookup(addr).is_none() {
            return Err(RpcError::Unreachable(addr.to_string()));
        }
        Ok(Arc::new(LocalClient {
            addr: addr.to_string(),
            network: self.clone(),
        }))
    }
}
