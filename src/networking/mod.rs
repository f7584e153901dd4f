#![forbid(unsafe_code)]

//! Networking: peer protocol messages, transports, the peer table and the node.

pub mod local;
pub mod message;
pub mod node;
pub mod peer_table;
pub mod tcp;
pub mod transport;
