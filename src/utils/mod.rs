//! Process-level utilities shared by the binaries and the server.
//!
//! - [`log`]: levelled, coloured logging macros

pub mod log;
