use std::fmt::{self, Display};
use virtual_assembler_derive::Error;

/// Broad class of a [`VMError`], for callers that branch on error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed literal or bracket expression.
    Parse,
    /// Wrong operand count for an opcode.
    Arity,
    /// Destination is not a valid write target for the opcode.
    Target,
    /// Opcode not in the instruction table.
    UnknownOpcode,
    /// Memory address or stack pointer outside memory.
    Bounds,
    /// Program source could not be read.
    Io,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Arity => "arity",
            ErrorKind::Target => "target",
            ErrorKind::UnknownOpcode => "unknown-opcode",
            ErrorKind::Bounds => "bounds",
            ErrorKind::Io => "io",
        })
    }
}

/// Operand count rendered with its noun, e.g. `1 operand`, `2 operands`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandCount(pub usize);

impl Display for OperandCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => write!(f, "1 operand"),
            n => write!(f, "{n} operands"),
        }
    }
}

/// Errors raised while decoding or executing a single instruction.
///
/// None of these abort a run: the engine records them in the execution log
/// and moves on to the next line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    /// Immediate operand is neither a decimal nor a `0x` hexadecimal literal.
    #[error("Can't parse value {token}")]
    UnparsableValue { token: String },
    /// Bracketed operand whose inner text is neither a register nor an integer.
    #[error("Invalid memory reference {token}")]
    InvalidMemoryReference { token: String },
    /// Wrong number of operands for an instruction.
    #[error("{instruction} requires {expected}, got {actual}")]
    Arity {
        instruction: &'static str,
        expected: OperandCount,
        actual: usize,
    },
    /// `MOV` destination that is an immediate.
    #[error("Invalid destination {token}")]
    InvalidDestination { token: String },
    /// `ADD`, `SUB` or `POP` destination that is not a register.
    #[error("Invalid destination register {token}")]
    InvalidDestinationRegister { token: String },
    /// Unrecognized mnemonic.
    #[error("Unknown instruction {opcode}")]
    UnknownInstruction { opcode: String },
    /// Memory operand outside `[0, len)`.
    #[error("Memory address {address} out of bounds (0..{len})")]
    AddressOutOfBounds { address: i64, len: usize },
    /// Stack pointer outside `[-len, len)`.
    #[error("Stack pointer {sp} outside stack window (-{len}..{len})")]
    StackOutOfBounds { sp: i64, len: usize },
    /// Program file could not be read.
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}

impl VMError {
    /// Returns the error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VMError::UnparsableValue { .. } | VMError::InvalidMemoryReference { .. } => {
                ErrorKind::Parse
            }
            VMError::Arity { .. } => ErrorKind::Arity,
            VMError::InvalidDestination { .. } | VMError::InvalidDestinationRegister { .. } => {
                ErrorKind::Target
            }
            VMError::UnknownInstruction { .. } => ErrorKind::UnknownOpcode,
            VMError::AddressOutOfBounds { .. } | VMError::StackOutOfBounds { .. } => {
                ErrorKind::Bounds
            }
            VMError::Io { .. } => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_message_pluralizes() {
        let one = VMError::Arity {
            instruction: "PUSH",
            expected: OperandCount(1),
            actual: 0,
        };
        let two = VMError::Arity {
            instruction: "MOV",
            expected: OperandCount(2),
            actual: 3,
        };
        assert_eq!(one.to_string(), "PUSH requires 1 operand, got 0");
        assert_eq!(two.to_string(), "MOV requires 2 operands, got 3");
    }

    #[test]
    fn bounds_messages() {
        let addr = VMError::AddressOutOfBounds {
            address: -4,
            len: 1024,
        };
        let stack = VMError::StackOutOfBounds {
            sp: 2048,
            len: 1024,
        };
        assert_eq!(addr.to_string(), "Memory address -4 out of bounds (0..1024)");
        assert_eq!(
            stack.to_string(),
            "Stack pointer 2048 outside stack window (-1024..1024)"
        );
        assert_eq!(addr.kind(), ErrorKind::Bounds);
        assert_eq!(stack.kind(), ErrorKind::Bounds);
    }

    #[test]
    fn kinds() {
        let parse = VMError::UnparsableValue {
            token: "zz".into(),
        };
        let target = VMError::InvalidDestinationRegister {
            token: "[4]".into(),
        };
        let unknown = VMError::UnknownInstruction {
            opcode: "foo".into(),
        };
        assert_eq!(parse.kind(), ErrorKind::Parse);
        assert_eq!(target.kind(), ErrorKind::Target);
        assert_eq!(unknown.kind(), ErrorKind::UnknownOpcode);
        assert_eq!(unknown.to_string(), "Unknown instruction foo");
    }
}
