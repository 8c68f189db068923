//! Execution trace of a single run.
//!
//! Every successful mutation and every recovered error becomes a
//! [`LogEntry`]. Entries keep their structure ([`Effect`], [`VMError`],
//! source line) and render to the human-readable trace through `Display`.

use crate::virtual_machine::errors::{ErrorKind, VMError};
use crate::virtual_machine::isa::Register;
use std::fmt::{self, Display};

/// The observable result of one executed instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    /// `MOV` into a register.
    SetRegister { register: Register, value: i64 },
    /// `MOV` into a memory cell.
    SetMemory { address: usize, value: i64 },
    /// `ADD`: `operand` added, `result` is the new register value.
    Add {
        register: Register,
        operand: i64,
        result: i64,
    },
    /// `SUB`: `operand` subtracted, `result` is the new register value.
    Sub {
        register: Register,
        operand: i64,
        result: i64,
    },
    /// `PUSH`: `value` stored at the new stack pointer `sp`.
    Push { value: i64, sp: i64 },
    /// `POP`: `value` loaded into `register`.
    Pop { register: Register, value: i64 },
}

impl Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SetRegister { register, value } => write!(f, "MOV: Set {register} = {value}"),
            Effect::SetMemory { address, value } => {
                write!(f, "MOV: Set memory[{address}] = {value}")
            }
            Effect::Add {
                register,
                operand,
                result,
            } => write!(f, "ADD: {register} += {operand} ({register} = {result})"),
            Effect::Sub {
                register,
                operand,
                result,
            } => write!(f, "SUB: {register} -= {operand} ({register} = {result})"),
            Effect::Push { value, sp } => write!(f, "PUSH: {value} to stack at ESP={sp}"),
            Effect::Pop { register, value } => write!(f, "POP: {register} = {value}"),
        }
    }
}

/// One line of the execution trace. `line` is the 1-based source line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogEntry {
    Event { line: usize, effect: Effect },
    Fault { line: usize, error: VMError },
}

impl LogEntry {
    /// Source line that produced this entry.
    pub fn line(&self) -> usize {
        match self {
            LogEntry::Event { line, .. } | LogEntry::Fault { line, .. } => *line,
        }
    }

    /// Returns the error if this entry records one.
    pub fn error(&self) -> Option<&VMError> {
        match self {
            LogEntry::Fault { error, .. } => Some(error),
            LogEntry::Event { .. } => None,
        }
    }

    /// Returns the effect if this entry records one.
    pub fn effect(&self) -> Option<&Effect> {
        match self {
            LogEntry::Event { effect, .. } => Some(effect),
            LogEntry::Fault { .. } => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, LogEntry::Fault { .. })
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Event { effect, .. } => effect.fmt(f),
            LogEntry::Fault { line, error } => write!(f, "Error: {error} (line {line})"),
        }
    }
}

/// Append-only trace, cleared only by a machine reset.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over recorded errors only.
    pub fn faults(&self) -> impl Iterator<Item = (usize, &VMError)> {
        self.entries
            .iter()
            .filter_map(|e| e.error().map(|err| (e.line(), err)))
    }

    /// Number of recorded errors of the given kind.
    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.faults().filter(|(_, err)| err.kind() == kind).count()
    }

    /// Renders every entry in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(LogEntry::to_string).collect()
    }
}
