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

#![no_main]
#![forbid(unsafe_code)]

use arbitrary::Arbitrary;
use blocker::core::{
    state::merkle::{merkle_proof, merkle_root, verify_proof},
    types::H256,
};
use libfuzzer_sys::fuzz_target;

#[derive(Clone, Debug, Arbitrary)]
struct Input {
    leaves: Vec<[u8; 32]>,
    index: u16,
}

fuzz_target!(|inp: Input| {
    let hashes: Vec<H256> = inp.leaves.into_iter().map(H256::from_bytes).collect();
    let root = merkle_root(&hashes);
    if hashes.is_empty() {
        return;
    }
    let idx = (inp.index as usize) % hashes.len();
    if let Some(p) = merkle_proof(&hashes, idx) {
        assert!(verify_proof(&root, &hashes[idx], &p));
    }
});
