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

//! `/metrics` (Prometheus text) and `/status` (JSON) endpoints.

use crate::networking::node::{Node, NodeStatus};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::watch};
use tracing::info;

async fn metrics(State(node): State<Arc<Node>>) -> Result<String, StatusCode> {
    node.metrics()
        .render()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn status(State(node): State<Arc<Node>>) -> Result<Json<NodeStatus>, StatusCode> {
    node.status()
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Router over `node`.
pub fn router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .with_state(node)
}

/// Serve the router on `listener` until `shutdown` flips to `true`.
pub async fn serve(
    listener: TcpListener,
    node: Arc<Node>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "http endpoint started");
    axum::serve(listener, router(node))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
}
