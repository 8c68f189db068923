//! Source line decoding.
//!
//! # Syntax
//!
//! ```text
//! MNEMONIC operand1, operand2   ; optional comment
//! ```
//!
//! - `;` starts a comment that runs to the end of the line
//! - mnemonics are case-insensitive
//! - operands are separated by any mix of commas and whitespace and keep
//!   their original casing (register names are lower-case)

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instr, Opcode};

const COMMENT_CHAR: char = ';';

/// A tokenized line: lower-cased opcode plus operand tokens in source order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawInstruction {
    pub opcode: String,
    pub operands: Vec<String>,
}

/// Splits a source line into opcode and operand tokens.
///
/// Returns `None` for lines that are blank once the comment is removed.
pub fn decode_line(line: &str) -> Option<RawInstruction> {
    let code = match line.split_once(COMMENT_CHAR) {
        Some((code, _comment)) => code,
        None => line,
    };

    let mut tokens = code
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty());

    let opcode = tokens.next()?.to_lowercase();
    Some(RawInstruction {
        opcode,
        operands: tokens.map(str::to_string).collect(),
    })
}

impl Instr {
    /// Resolves the opcode and shapes the operands of a tokenized line.
    pub fn decode(raw: &RawInstruction) -> Result<Instr, VMError> {
        let opcode =
            Opcode::from_mnemonic(&raw.opcode).ok_or_else(|| VMError::UnknownInstruction {
                opcode: raw.opcode.clone(),
            })?;
        Instr::from_operands(opcode, &raw.operands)
    }
}
