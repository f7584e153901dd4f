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

//! Blocker node entrypoint (systemd-friendly).
//! Serves the peer protocol, bootstraps, runs the validator loop and exits on Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use blocker::{
    config::{LogConfig, NodeConfig, StorageBackend},
    core::{
        chain::Chain,
        security::keystore,
        state::persistent_state::SledStore,
    },
    monitoring::{http, metrics::Metrics},
    networking::{
        node::{spawn_supervised, Node},
        tcp::{self, TcpDialer},
        transport::RequestHandler,
    },
};
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter, warn};

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn init_logging(cfg: &LogConfig) {
    let level: LevelFilter = cfg.level.parse().unwrap_or(LevelFilter::INFO);
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true);
    let _ = if cfg.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}

/// Open the configured chain. The sled handle is returned too, so shutdown can flush it.
fn open_chain(cfg: &NodeConfig) -> anyhow::Result<(Chain, Option<SledStore>)> {
    match cfg.storage.backend {
        StorageBackend::Memory => Ok((Chain::in_memory()?, None)),
        StorageBackend::Sled => {
            let path = cfg.storage_path();
            let store =
                SledStore::open(&path).with_context(|| format!("open {}", path.display()))?;
            let chain = Chain::new(Arc::new(store.clone()))?;
            Ok((chain, Some(store)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = env("BLOCKER_CONFIG", "");
    let cfg = if path.is_empty() {
        NodeConfig::default()
    } else {
        NodeConfig::load(&path).with_context(|| format!("load config {path}"))?
    };
    init_logging(&cfg.log);

    info!(
        name = %cfg.node.name,
        listen = %cfg.p2p.listen_addr,
        data_dir = %cfg.node.data_dir,
        git_sha = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        rustc = option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown"),
        "blocker node starting"
    );

    let metrics = Arc::new(Metrics::new()?);
    let (chain, durable) = open_chain(&cfg)?;
    let chain = Arc::new(chain);

    let validator = if cfg.validator.enabled {
        let key_file = cfg.key_file();
        let key = keystore::load_or_create(&key_file)
            .with_context(|| format!("validator key {}", key_file.display()))?;
        info!(public_key = %key.public(), address = %key.public().address(), "validator key loaded");
        Some(Arc::new(key))
    } else {
        None
    };

    let dialer = Arc::new(TcpDialer::new(cfg.p2p.max_frame_bytes));
    let node = Node::new(cfg.node_options(), chain, dialer, validator, metrics);

    let listener = TcpListener::bind(&cfg.p2p.listen_addr)
        .await
        .with_context(|| format!("bind {}", cfg.p2p.listen_addr))?;
    let handler: Arc<dyn RequestHandler> = node.clone();
    let p2p_task = spawn_supervised(
        "p2p",
        node.addr().to_string(),
        tcp::serve(
            listener,
            handler,
            cfg.p2p.max_frame_bytes,
            node.subscribe_shutdown(),
        ),
    );

    let http_task = match &cfg.http.listen_addr {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("bind http {addr}"))?;
            Some(spawn_supervised(
                "http",
                node.addr().to_string(),
                http::serve(listener, node.clone(), node.subscribe_shutdown()),
            ))
        }
        None => None,
    };

    if !cfg.p2p.bootstrap.is_empty() {
        let connected = node.bootstrap(&cfg.p2p.bootstrap).await;
        info!(connected, total = cfg.p2p.bootstrap.len(), "bootstrap finished");
    }

    let validator_task = node.spawn_validator();

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(err = %e, "signal handler failed; shutting down");
    }
    node.shutdown();

    let _ = p2p_task.await;
    if let Some(t) = http_task {
        let _ = t.await;
    }
    if let Some(t) = validator_task {
        let _ = t.await;
    }
    if let Some(store) = durable {
        store.flush().context("flush store")?;
        info!("store flushed");
    }
    info!("blocker node stopped");
    Ok(())
}
