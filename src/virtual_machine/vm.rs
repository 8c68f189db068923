//! Core virtual machine implementation.
//!
//! [`Machine`] owns the register bank, the memory and the execution log and
//! applies decoded instructions to them one at a time. There is no program
//! counter: a run is a fold over the source lines.
//!
//! Nothing here returns an error to the caller. Every failure is recorded as
//! a [`LogEntry::Fault`] and the offending instruction is skipped (or, for an
//! unreadable source operand, reads as 0). Arithmetic wraps at 64 bits.

mod memory;
mod registers;
#[cfg(test)]
mod tests;

pub use memory::Memory;
pub use registers::RegisterBank;

use crate::config::MachineConfig;
use crate::virtual_machine::decoder::RawInstruction;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instr, Register};
use crate::virtual_machine::log::{Effect, ExecutionLog, LogEntry};
use crate::virtual_machine::operand::{Address, Destination, Operand};

/// Bytes the stack pointer moves per `PUSH`/`POP`.
pub const STACK_SLOT: i64 = 4;

/// Register bank, memory and trace of one run.
#[derive(Clone, Debug)]
pub struct Machine {
    registers: RegisterBank,
    memory: Memory,
    log: ExecutionLog,
    /// Source line currently executing, attached to log entries.
    line: usize,
}

impl Machine {
    /// Creates a zeroed machine with the configured memory size.
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            registers: RegisterBank::new(),
            memory: Memory::new(config.memory_len),
            log: ExecutionLog::new(),
            line: 0,
        }
    }

    /// Zeroes registers and memory and clears the log.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.memory.reset();
        self.log.clear();
        self.line = 0;
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    /// Decodes and executes one tokenized source line.
    pub fn step(&mut self, line: usize, raw: &RawInstruction) {
        self.line = line;
        match Instr::decode(raw) {
            Ok(instr) => self.exec(&instr),
            Err(err) => self.fault(err),
        }
    }

    /// Executes an already decoded instruction attributed to `line`.
    pub fn execute(&mut self, line: usize, instr: &Instr) {
        self.line = line;
        self.exec(instr);
    }

    fn exec(&mut self, instr: &Instr) {
        match instr {
            Instr::Mov { dst, src } => self.op_mov(dst, src),
            Instr::Add { dst, src } => self.op_add(*dst, src),
            Instr::Sub { dst, src } => self.op_sub(*dst, src),
            Instr::Push { src } => self.op_push(src),
            Instr::Pop { dst } => self.op_pop(*dst),
        }
    }

    fn event(&mut self, effect: Effect) {
        self.log.push(LogEntry::Event {
            line: self.line,
            effect,
        });
    }

    fn fault(&mut self, error: VMError) {
        self.log.push(LogEntry::Fault {
            line: self.line,
            error,
        });
    }

    /// Computes the raw address named by a bracket expression.
    fn address(&self, addr: &Address) -> i64 {
        match addr {
            Address::Register(reg) => self.registers.get(*reg),
            Address::Absolute(value) => *value,
        }
    }

    /// Resolves a source operand. Failures are logged and read as 0.
    fn read(&mut self, operand: &Operand) -> i64 {
        let result = match operand {
            Operand::Register(reg) => Ok(self.registers.get(*reg)),
            Operand::Immediate(value) => Ok(*value),
            Operand::Memory(addr) => self.memory.load(self.address(addr)),
            Operand::Malformed(err) => Err(err.clone()),
        };

        result.unwrap_or_else(|err| {
            self.fault(err);
            0
        })
    }

    fn op_mov(&mut self, dst: &Destination, src: &Operand) {
        let value = self.read(src);
        match dst {
            Destination::Register(register) => {
                self.registers.set(*register, value);
                self.event(Effect::SetRegister {
                    register: *register,
                    value,
                });
            }
            Destination::Memory(addr) => {
                let address = self.address(addr);
                match self.memory.store(address, value) {
                    Ok(address) => self.event(Effect::SetMemory { address, value }),
                    Err(err) => self.fault(err),
                }
            }
        }
    }

    fn op_add(&mut self, register: Register, src: &Operand) {
        let operand = self.read(src);
        let result = self.registers.get(register).wrapping_add(operand);
        self.registers.set(register, result);
        self.event(Effect::Add {
            register,
            operand,
            result,
        });
    }

    fn op_sub(&mut self, register: Register, src: &Operand) {
        let operand = self.read(src);
        let result = self.registers.get(register).wrapping_sub(operand);
        self.registers.set(register, result);
        self.event(Effect::Sub {
            register,
            operand,
            result,
        });
    }

    fn op_push(&mut self, src: &Operand) {
        let value = self.read(src);
        let sp = self.registers.get(Register::Esp).wrapping_sub(STACK_SLOT);
        match self.memory.stack_store(sp, value) {
            Ok(_) => {
                self.registers.set(Register::Esp, sp);
                self.event(Effect::Push { value, sp });
            }
            Err(err) => self.fault(err),
        }
    }

    fn op_pop(&mut self, register: Register) {
        let sp = self.registers.get(Register::Esp);
        match self.memory.stack_load(sp) {
            Ok(value) => {
                self.registers.set(register, value);
                // Popping into esp overwrites it before the increment.
                let esp = self.registers.get(Register::Esp).wrapping_add(STACK_SLOT);
                self.registers.set(Register::Esp, esp);
                self.event(Effect::Pop { register, value });
            }
            Err(err) => self.fault(err),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(&MachineConfig::default())
    }
}
