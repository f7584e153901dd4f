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

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Established peers gauge.
    pub peers: IntGauge,
    /// Chain height gauge.
    pub block_height: IntGauge,
    /// Pending transactions gauge.
    pub mempool_size: IntGauge,
    /// Transactions newly admitted to the mempool.
    pub transactions_total: IntCounter,
    /// Blocks proposed and accepted locally.
    pub blocks_proposed_total: IntCounter,
    /// Blocks refused by the acceptance pipeline.
    pub blocks_rejected_total: IntCounter,
    /// Peers evicted after a failed call.
    pub peer_evictions_total: IntCounter,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, MetricsError> {
    let g = IntGauge::new(name, help).map_err(|_| MetricsError::Prom)?;
    registry
        .register(Box::new(g.clone()))
        .map_err(|_| MetricsError::Prom)?;
    Ok(g)
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let c = IntCounter::new(name, help).map_err(|_| MetricsError::Prom)?;
    registry
        .register(Box::new(c.clone()))
        .map_err(|_| MetricsError::Prom)?;
    Ok(c)
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let peers = gauge(&registry, "blocker_peers", "Established peers")?;
        let block_height = gauge(&registry, "blocker_block_height", "Current chain height")?;
        let mempool_size = gauge(&registry, "blocker_mempool_size", "Pending transactions")?;
        let transactions_total = counter(
            &registry,
            "blocker_transactions_total",
            "Transactions admitted to the mempool",
        )?;
        let blocks_proposed_total = counter(
            &registry,
            "blocker_blocks_proposed_total",
            "Blocks proposed by this validator",
        )?;
        let blocks_rejected_total = counter(
            &registry,
            "blocker_blocks_rejected_total",
            "Blocks refused by the acceptance pipeline",
        )?;
        let peer_evictions_total = counter(
            &registry,
            "blocker_peer_evictions_total",
            "Peers evicted after a failed call",
        )?;

        Ok(Self {
            registry,
            peers,
            block_height,
            mempool_size,
            transactions_total,
            blocks_proposed_total,
            blocks_rejected_total,
            peer_evictions_total,
        })
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|_| MetricsError::Prom)?;
        String::from_utf8(buf).map_err(|_| MetricsError::Prom)
    }
}
