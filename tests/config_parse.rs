// Copyright (c) 2026 Blocker
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use blocker::{
    config::{ConfigError, NodeConfig, StorageBackend},
    networking::node::PROTOCOL_VERSION,
};
use std::{path::PathBuf, time::Duration};

#[test]
fn empty_document_uses_defaults() {
    let cfg = NodeConfig::from_toml_str("").unwrap();
    assert_eq!(cfg.p2p.listen_addr, "127.0.0.1:3000");
    assert_eq!(cfg.node.protocol_version, PROTOCOL_VERSION);
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert!(!cfg.validator.enabled);
    assert!(cfg.http.listen_addr.is_none());
    assert_eq!(cfg.log.level, "info");

    let opts = cfg.node_options();
    assert_eq!(opts.peer_timeout, Duration::from_millis(2000));
    assert_eq!(opts.block_time, Duration::from_millis(5000));
    assert_eq!(cfg.key_file(), PathBuf::from("./data").join("validator.seed"));
    assert_eq!(cfg.storage_path(), PathBuf::from("./data").join("db"));
}

#[test]
fn full_document_overrides() {
    let cfg = NodeConfig::from_toml_str(
        r#"
        [node]
        name = "v1"
        data_dir = "/var/lib/blocker"

        [p2p]
        listen_addr = "0.0.0.0:4000"
        bootstrap = ["10.0.0.2:4000", "10.0.0.3:4000"]
        peer_timeout_ms = 750

        [validator]
        enabled = true
        block_time_ms = 1000
        key_file = "/etc/blocker/seed"

        [storage]
        backend = "sled"

        [http]
        listen_addr = "127.0.0.1:9090"

        [log]
        level = "debug"
        json = true
        "#,
    )
    .unwrap();

    assert_eq!(cfg.node.name, "v1");
    assert_eq!(cfg.p2p.bootstrap.len(), 2);
    assert_eq!(cfg.storage.backend, StorageBackend::Sled);
    assert_eq!(cfg.storage_path(), PathBuf::from("/var/lib/blocker/db"));
    assert_eq!(cfg.key_file(), PathBuf::from("/etc/blocker/seed"));
    assert!(cfg.log.json);

    let opts = cfg.node_options();
    assert_eq!(opts.listen_addr, "0.0.0.0:4000");
    assert_eq!(opts.peer_timeout, Duration::from_millis(750));
    assert_eq!(opts.block_time, Duration::from_millis(1000));
}

#[test]
fn zero_timeouts_are_invalid() {
    let err = NodeConfig::from_toml_str("[p2p]\npeer_timeout_ms = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = NodeConfig::from_toml_str("[validator]\nblock_time_ms = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn unknown_backend_is_a_parse_error() {
    let err = NodeConfig::from_toml_str("[storage]\nbackend = \"rocks\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("node.toml");
    std::fs::write(&path, "[p2p]\nlisten_addr = \"127.0.0.1:3999\"\n").unwrap();
    assert_eq!(
        NodeConfig::load(&path).unwrap().p2p.listen_addr,
        "127.0.0.1:3999"
    );
    assert!(matches!(
        NodeConfig::load(dir.path().join("missing.toml")),
        Err(ConfigError::Read(_))
    ));
}
