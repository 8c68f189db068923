//! Register-based instruction executor for a small x86-flavoured assembly.
//!
//! Source text is processed one line at a time. Each non-empty line is
//! tokenized, decoded into a typed instruction and applied to a machine made
//! of eight signed registers and a fixed block of memory cells. Errors never
//! abort a run: they are appended to the trace with their line number and
//! execution moves on to the next line.
//!
//! # Instructions
//!
//! | Opcode | Operands     | Effect                                  |
//! |--------|--------------|-----------------------------------------|
//! | `MOV`  | `dst, src`   | register or memory cell := src          |
//! | `ADD`  | `reg, src`   | reg += src                              |
//! | `SUB`  | `reg, src`   | reg -= src                              |
//! | `PUSH` | `src`        | esp -= 4, stack[esp] := src             |
//! | `POP`  | `reg`        | reg := stack[esp], esp += 4             |
//!
//! # Modules
//!
//! - [`decoder`]: Line tokenizer and instruction decoding
//! - [`errors`]: Error type and error classes
//! - [`isa`]: Registers, opcodes and the typed instruction set
//! - [`log`]: Execution trace
//! - [`operand`]: Operand syntax
//! - [`runner`]: Whole-program execution and snapshots
//! - [`vm`]: Machine state and instruction semantics

pub mod decoder;
pub mod errors;
pub mod isa;
pub mod log;
pub mod operand;
pub mod runner;
pub mod vm;
