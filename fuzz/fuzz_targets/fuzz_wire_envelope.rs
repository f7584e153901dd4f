// Copyright (c) 2026 Blocker
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use blocker::{
    core::ledger::{block::verify_block, transaction::verify_transaction},
    networking::message::{Envelope, Request, Response},
};
use libfuzzer_sys::fuzz_target;

const MAX: usize = 1 << 20;

fuzz_target!(|data: &[u8]| {
    // Decoding and verifying untrusted frames must never panic.
    if let Ok(env) = Envelope::decode(data, MAX) {
        match env.request {
            Request::HandleTransaction(tx) => {
                let _ = verify_transaction(&tx);
            }
            Request::HandleBlock(b) => {
                let _ = verify_block(&b);
            }
            Request::Handshake(_) | Request::GetBlock(_) => {}
        }
    }
    let _ = Response::decode(data, MAX);
});
