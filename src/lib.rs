//! Virtual assembler library.
//!
//! Provides the instruction executor, its configuration, and a small TCP
//! service that runs programs for remote clients.

pub mod config;
pub mod network;
pub mod types;
pub mod utils;
pub mod virtual_machine;
