// Copyright (c) 2026 Blocker
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(cfg) = blocker::config::NodeConfig::from_toml_str(s) {
            let _ = cfg.node_options();
        }
    }
});
