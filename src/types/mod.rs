//! Binary encoding shared by the wire protocol.

pub mod encoding;
