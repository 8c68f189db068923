//! Operand syntax.
//!
//! Classifies operand tokens without touching machine state. Resolution of
//! register contents and memory cells happens in the engine
//! ([`Machine`](crate::virtual_machine::vm::Machine)), which is also where a
//! [`Operand::Malformed`] token is reported.
//!
//! ```text
//! eax        register
//! [ebx]      memory, address held in a register
//! [16]       memory, absolute decimal address
//! 42  -7     decimal immediate
//! 0x1F       hexadecimal immediate
//! ```

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Register;
use std::fmt::{self, Display};

const HEX_PREFIX: &str = "0x";

/// Memory address expression inside `[...]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Address {
    /// Address is the current value of a register.
    Register(Register),
    /// Literal base-10 address (may be negative; bounds are checked on access).
    Absolute(i64),
}

impl Address {
    /// Parses the text between the brackets.
    pub fn parse(inner: &str) -> Option<Address> {
        if let Some(reg) = Register::from_name(inner) {
            return Some(Address::Register(reg));
        }
        inner.parse::<i64>().ok().map(Address::Absolute)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Register(reg) => write!(f, "[{reg}]"),
            Address::Absolute(addr) => write!(f, "[{addr}]"),
        }
    }
}

/// A readable operand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Register(Register),
    Memory(Address),
    Immediate(i64),
    /// Token that failed to parse; reading it logs the error and yields 0.
    Malformed(VMError),
}

impl Operand {
    /// Classifies a single operand token.
    pub fn parse(token: &str) -> Operand {
        if let Some(reg) = Register::from_name(token) {
            return Operand::Register(reg);
        }

        if let Some(inner) = bracketed(token) {
            return match Address::parse(inner) {
                Some(addr) => Operand::Memory(addr),
                None => Operand::Malformed(VMError::InvalidMemoryReference {
                    token: token.to_string(),
                }),
            };
        }

        match parse_immediate(token) {
            Some(value) => Operand::Immediate(value),
            None => Operand::Malformed(VMError::UnparsableValue {
                token: token.to_string(),
            }),
        }
    }
}

/// A write target: a register or a memory cell.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Destination {
    Register(Register),
    Memory(Address),
}

impl Destination {
    /// Parses a `MOV` destination.
    ///
    /// Immediates are rejected as [`VMError::InvalidDestination`]; a bad
    /// bracket expression keeps its [`VMError::InvalidMemoryReference`].
    pub fn parse(token: &str) -> Result<Destination, VMError> {
        match Operand::parse(token) {
            Operand::Register(reg) => Ok(Destination::Register(reg)),
            Operand::Memory(addr) => Ok(Destination::Memory(addr)),
            Operand::Malformed(err @ VMError::InvalidMemoryReference { .. }) => Err(err),
            Operand::Immediate(_) | Operand::Malformed(_) => Err(VMError::InvalidDestination {
                token: token.to_string(),
            }),
        }
    }
}

/// Returns the text between a leading `[` and a trailing `]`.
fn bracketed(token: &str) -> Option<&str> {
    token.strip_prefix('[')?.strip_suffix(']')
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer literal.
pub(crate) fn parse_immediate(token: &str) -> Option<i64> {
    match token.strip_prefix(HEX_PREFIX) {
        // from_str_radix would accept a sign after the prefix
        Some(digits) if digits.starts_with(['+', '-']) => None,
        Some(digits) => i64::from_str_radix(digits, 16).ok(),
        None => token.parse::<i64>().ok(),
    }
}
