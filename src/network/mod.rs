//! Remote execution over TCP.
//!
//! - [`protocol`]: Message types, binary encoding and framing
//! - [`server`]: Connection-per-task request server
//! - [`client`]: Request client used by the `vasm --remote` front end

pub mod client;
pub mod protocol;
pub mod server;
