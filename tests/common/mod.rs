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

#![allow(dead_code)]

use blocker::{
    core::{
        chain::{genesis_block, genesis_key, Chain},
        ledger::{
            block::{hash_header, sign_block},
            transaction::{hash_transaction, sign_transaction},
        },
        security::keys::{Address, PrivateKey},
        types::{Block, Header, Transaction, TxInput, TxOutput, UtxoKey, H256},
    },
    monitoring::metrics::Metrics,
    networking::{
        local::LocalNetwork,
        node::{Node, NodeOptions},
        transport::RequestHandler,
    },
};
use std::{future::Future, sync::Arc, time::Duration};

pub fn key(n: u8) -> PrivateKey {
    PrivateKey::from_seed(&[n; 32]).unwrap()
}

pub fn addr_of(k: &PrivateKey) -> Address {
    k.public().address()
}

pub fn genesis_utxo() -> UtxoKey {
    let g = genesis_block().unwrap();
    UtxoKey::new(hash_transaction(&g.transactions[0]), 0)
}

pub fn out(amount: u64, to: Address) -> TxOutput {
    TxOutput {
        amount,
        to_address: to,
    }
}

/// One-input transaction spending `prev` with `signer`, signed.
pub fn spend(signer: &PrivateKey, prev: UtxoKey, outputs: Vec<TxOutput>) -> Transaction {
    let mut tx = Transaction {
        version: 1,
        inputs: vec![TxInput {
            prev_tx_hash: prev.tx_hash,
            prev_out_index: prev.index,
            public_key: signer.public().to_vec(),
            signature: vec![],
        }],
        outputs,
    };
    sign_transaction(signer, &mut tx);
    tx
}

/// Spend the whole genesis output to `to`.
pub fn genesis_spend_to(to: Address) -> Transaction {
    spend(&genesis_key().unwrap(), genesis_utxo(), vec![out(1000, to)])
}

pub fn header_on(parent: &Header) -> Header {
    Header {
        version: 1,
        height: parent.height + 1,
        previous_hash: hash_header(parent),
        merkle_root: H256::ZERO,
        timestamp: parent.timestamp + 1,
    }
}

/// Signed block on the chain's tip.
pub fn block_on(chain: &Chain, proposer: &PrivateKey, txs: Vec<Transaction>) -> Block {
    let tip = chain.tip().unwrap();
    let mut b = Block::new(header_on(&tip), txs);
    sign_block(proposer, &mut b);
    b
}

pub fn local_node(net: &LocalNetwork, addr: &str, validator: Option<PrivateKey>) -> Arc<Node> {
    let chain = Arc::new(Chain::in_memory().unwrap());
    let metrics = Arc::new(Metrics::new().unwrap());
    let mut opts = NodeOptions::new(addr);
    opts.peer_timeout = Duration::from_millis(500);
    opts.block_time = Duration::from_millis(50);
    let node = Node::new(
        opts,
        chain,
        Arc::new(net.clone()),
        validator.map(Arc::new),
        metrics,
    );
    let handler: Arc<dyn RequestHandler> = node.clone();
    net.register(addr, &handler);
    node
}

/// Poll `check` every 10ms for up to 3s.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..300 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
