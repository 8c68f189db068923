//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the register set and the opcode table. The `for_each_opcode!`
//! macro holds the canonical opcode definitions and invokes a callback macro
//! for code generation; `define_opcodes!` is the callback used here and
//! generates:
//! - The [`Opcode`] enum with mnemonic, display name and arity
//! - The [`Instr`] enum, one variant per opcode carrying its typed operands
//! - `Instr::from_operands`, which checks arity and operand shape
//!
//! # Operand kinds
//!
//! - `Src`: any readable operand ([`Operand`]); malformed tokens are kept and
//!   reported when the instruction reads them
//! - `Reg`: a register destination ([`Register`])
//! - `Dest`: a register or memory destination ([`Destination`])

use crate::virtual_machine::errors::{OperandCount, VMError};
use crate::virtual_machine::operand::{Destination, Operand};
use std::fmt::{self, Display};

/// The general-purpose registers, in bank order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Register {
    Eax,
    Ebx,
    Ecx,
    Edx,
    Esi,
    Edi,
    Ebp,
    Esp,
}

impl Register {
    /// Number of registers in the bank.
    pub const COUNT: usize = 8;

    /// Every register, in bank order.
    pub const ALL: [Register; Register::COUNT] = [
        Register::Eax,
        Register::Ebx,
        Register::Ecx,
        Register::Edx,
        Register::Esi,
        Register::Edi,
        Register::Ebp,
        Register::Esp,
    ];

    /// Returns the register's assembly name.
    pub const fn name(self) -> &'static str {
        match self {
            Register::Eax => "eax",
            Register::Ebx => "ebx",
            Register::Ecx => "ecx",
            Register::Edx => "edx",
            Register::Esi => "esi",
            Register::Edi => "edi",
            Register::Ebp => "ebp",
            Register::Esp => "esp",
        }
    }

    /// Looks up a register by exact (lower-case) name.
    pub fn from_name(name: &str) -> Option<Register> {
        Register::ALL.into_iter().find(|r| r.name() == name)
    }

    /// Position of the register in the bank.
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Invokes a callback macro with the complete opcode definition list.
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// MOV dst, src ; dst = src (register or memory destination)
            Mov = "mov", "MOV" => [dst: Dest, src: Src],
            /// ADD dst, src ; dst += src (register destination)
            Add = "add", "ADD" => [dst: Reg, src: Src],
            /// SUB dst, src ; dst -= src (register destination)
            Sub = "sub", "SUB" => [dst: Reg, src: Src],
            /// PUSH src ; esp -= 4 ; [esp] = src
            Push = "push", "PUSH" => [src: Src],
            /// POP dst ; dst = [esp] ; esp += 4
            Pop = "pop", "POP" => [dst: Reg],
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal, $display:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// Instruction mnemonics understood by the decoder.
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// Every opcode, in table order.
            pub const ALL: &'static [Opcode] = &[$( Opcode::$name, )*];

            /// Looks up an opcode by lower-case mnemonic.
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                match mnemonic {
                    $( $mnemonic => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            /// Returns the lower-case assembly mnemonic.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the upper-case name used in the execution log.
            pub const fn display_name(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $display, )*
                }
            }

            /// Returns the fixed operand count.
            pub const fn arity(&self) -> usize {
                match self {
                    $( Opcode::$name => define_opcodes!(@count $($field)*), )*
                }
            }
        }

        /// A decoded instruction with operands already shaped for its opcode.
        #[derive(Clone, Debug, Eq, PartialEq)]
        pub enum Instr {
            $(
                $(#[$doc])*
                $name { $( $field: define_opcodes!(@ty $kind), )* },
            )*
        }

        impl Instr {
            /// Builds an instruction from its operand tokens.
            ///
            /// Fails on an operand count mismatch or a destination of the
            /// wrong shape; malformed source operands are kept for the engine.
            pub fn from_operands(opcode: Opcode, operands: &[String]) -> Result<Self, VMError> {
                if operands.len() != opcode.arity() {
                    return Err(VMError::Arity {
                        instruction: opcode.display_name(),
                        expected: OperandCount(opcode.arity()),
                        actual: operands.len(),
                    });
                }

                match opcode {
                    $(
                        Opcode::$name => {
                            let mut tokens = operands.iter().map(String::as_str);
                            $(
                                let token = tokens.next().unwrap_or_default();
                                let $field = define_opcodes!(@parse $kind, token)?;
                            )*
                            Ok(Instr::$name { $( $field, )* })
                        }
                    )*
                }
            }

            /// Returns the opcode of this instruction.
            pub const fn opcode(&self) -> Opcode {
                match self {
                    $( Instr::$name { .. } => Opcode::$name, )*
                }
            }
        }
    };

    // ---------- operand count ----------
    (@count) => { 0usize };
    (@count $head:ident $($tail:ident)*) => { 1usize + define_opcodes!(@count $($tail)*) };

    // ---------- types ----------
    (@ty Src)  => { Operand };
    (@ty Reg)  => { Register };
    (@ty Dest) => { Destination };

    // ---------- decoding ----------
    (@parse Src, $tok:ident) => { Ok::<Operand, VMError>(Operand::parse($tok)) };
    (@parse Reg, $tok:ident) => { Register::from_name($tok).ok_or_else(|| VMError::InvalidDestinationRegister {
        token: $tok.to_string(),
    }) };
    (@parse Dest, $tok:ident) => { Destination::parse($tok) };
}

for_each_opcode!(define_opcodes);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::operand::Address;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn register_names_roundtrip() {
        for reg in Register::ALL {
            assert_eq!(Register::from_name(reg.name()), Some(reg));
        }
        assert_eq!(Register::from_name("EAX"), None);
        assert_eq!(Register::from_name("rax"), None);
        assert_eq!(Register::Esp.index(), 7);
    }

    #[test]
    fn opcode_table() {
        assert_eq!(Opcode::from_mnemonic("mov"), Some(Opcode::Mov));
        assert_eq!(Opcode::from_mnemonic("MOV"), None);
        assert_eq!(Opcode::from_mnemonic("jmp"), None);
        assert_eq!(Opcode::Mov.arity(), 2);
        assert_eq!(Opcode::Push.arity(), 1);
        assert_eq!(Opcode::Pop.display_name(), "POP");
        assert_eq!(Opcode::ALL.len(), 5);
    }

    #[test]
    fn from_operands_shapes_operands() {
        let instr = Instr::from_operands(Opcode::Mov, &tokens(&["[ebx]", "0x10"])).unwrap();
        assert_eq!(
            instr,
            Instr::Mov {
                dst: Destination::Memory(Address::Register(Register::Ebx)),
                src: Operand::Immediate(16),
            }
        );
        assert_eq!(instr.opcode(), Opcode::Mov);
    }

    #[test]
    fn from_operands_checks_arity() {
        let err = Instr::from_operands(Opcode::Add, &tokens(&["eax"])).unwrap_err();
        assert_eq!(err.to_string(), "ADD requires 2 operands, got 1");
    }

    #[test]
    fn from_operands_requires_register_destination() {
        let err = Instr::from_operands(Opcode::Pop, &tokens(&["[4]"])).unwrap_err();
        assert_eq!(
            err,
            VMError::InvalidDestinationRegister {
                token: "[4]".into()
            }
        );
    }

    #[test]
    fn mov_rejects_immediate_destination() {
        let err = Instr::from_operands(Opcode::Mov, &tokens(&["5", "eax"])).unwrap_err();
        assert_eq!(err, VMError::InvalidDestination { token: "5".into() });
    }
}
