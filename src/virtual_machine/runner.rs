//! Program runner: the entry point for executing source text.
//!
//! Every [`Runner::run`] starts from a freshly reset [`Machine`], so no
//! effect of one run is visible to the next.

use crate::config::MachineConfig;
use crate::debug;
use crate::virtual_machine::decoder::decode_line;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Register;
use crate::virtual_machine::log::LogEntry;
use crate::virtual_machine::vm::Machine;
use std::fs;
use std::path::Path;

/// Machine state as returned to a caller after `run` or `reset`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    /// Every register, in bank order.
    pub registers: Vec<(Register, i64)>,
    /// Leading memory cells (the configured window).
    pub memory: Vec<i64>,
    /// Full trace in emission order.
    pub log: Vec<LogEntry>,
}

impl Snapshot {
    /// Captures the current state of `machine`.
    pub fn capture(machine: &Machine, window_len: usize) -> Self {
        Self {
            registers: machine.registers().iter().collect(),
            memory: machine.memory().window(window_len).to_vec(),
            log: machine.log().entries().to_vec(),
        }
    }

    /// Value of `reg` at capture time.
    pub fn register(&self, reg: Register) -> i64 {
        self.registers
            .iter()
            .find(|(r, _)| *r == reg)
            .map_or(0, |(_, value)| *value)
    }

    /// Rendered trace lines.
    pub fn log_lines(&self) -> Vec<String> {
        self.log.iter().map(LogEntry::to_string).collect()
    }

    /// Whether any entry of the trace is an error.
    pub fn has_faults(&self) -> bool {
        self.log.iter().any(LogEntry::is_fault)
    }
}

/// Owns one machine and executes whole programs on it.
#[derive(Clone, Debug)]
pub struct Runner {
    machine: Machine,
    config: MachineConfig,
}

impl Runner {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            machine: Machine::new(&config),
            config,
        }
    }

    /// Resets the machine and executes `source` line by line.
    pub fn run(&mut self, source: &str) -> Snapshot {
        self.machine.reset();

        for (idx, line) in source.lines().enumerate() {
            if let Some(raw) = decode_line(line) {
                self.machine.step(idx + 1, &raw);
            }
        }

        let log = self.machine.log();
        debug!(
            "run finished: {} trace entries, {} errors",
            log.len(),
            log.faults().count()
        );
        self.snapshot()
    }

    /// Reads a program from disk and runs it.
    pub fn run_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Snapshot, VMError> {
        let source = read_source(path)?;
        Ok(self.run(&source))
    }

    /// Resets the machine without executing anything.
    pub fn reset(&mut self) -> Snapshot {
        self.machine.reset();
        self.snapshot()
    }

    /// Snapshot of the current machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.machine, self.config.window_len)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

/// Runs `source` on a fresh default machine.
pub fn run(source: &str) -> Snapshot {
    Runner::default().run(source)
}

/// Snapshot of a fresh default machine.
pub fn reset() -> Snapshot {
    Runner::default().reset()
}

/// Reads a program from disk and runs it on a fresh default machine.
pub fn run_file<P: AsRef<Path>>(path: P) -> Result<Snapshot, VMError> {
    Runner::default().run_file(path)
}

/// Reads program text, mapping failures to [`VMError::Io`].
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<String, VMError> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| VMError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::errors::ErrorKind;
    use std::io::Write;

    #[test]
    fn reset_is_idempotent() {
        let mut runner = Runner::default();
        let first = runner.reset();
        let second = runner.reset();
        assert_eq!(first, second);
        assert!(first.registers.iter().all(|(_, v)| *v == 0));
        assert_eq!(first.memory, vec![0; 64]);
        assert!(first.log.is_empty());
    }

    #[test]
    fn reset_after_run_clears_everything() {
        let mut runner = Runner::default();
        let ran = runner.run("MOV eax, 1\nMOV [0], 9\nFOO");
        assert_eq!(ran.register(Register::Eax), 1);
        assert_eq!(ran.memory[0], 9);
        assert_eq!(runner.reset(), reset());
    }

    #[test]
    fn mov_round_trip() {
        let snap = run("MOV eax, 42\nMOV ebx, eax");
        assert_eq!(snap.register(Register::Eax), 42);
        assert_eq!(snap.register(Register::Ebx), 42);
    }

    #[test]
    fn hex_immediate() {
        assert_eq!(run("MOV eax, 0x1F").register(Register::Eax), 31);
    }

    #[test]
    fn arithmetic() {
        let snap = run("MOV eax, 10\nADD eax, 5\nSUB eax, 3");
        assert_eq!(snap.register(Register::Eax), 12);
        assert_eq!(
            snap.log_lines(),
            [
                "MOV: Set eax = 10",
                "ADD: eax += 5 (eax = 15)",
                "SUB: eax -= 3 (eax = 12)",
            ]
        );
    }

    #[test]
    fn stack_round_trip() {
        let before = reset().register(Register::Esp);
        let snap = run("PUSH 99\nPOP ebx");
        assert_eq!(snap.register(Register::Ebx), 99);
        assert_eq!(snap.register(Register::Esp), before);
        assert!(!snap.has_faults());
    }

    #[test]
    fn indirect_memory() {
        let snap = run("MOV ebx, 4\nMOV [ebx], 77\nMOV ecx, [4]");
        assert_eq!(snap.register(Register::Ecx), 77);
        assert_eq!(snap.memory[4], 77);
    }

    #[test]
    fn unknown_opcode_does_not_abort() {
        let snap = run("FOO 1, 2\nMOV eax, 5");
        assert_eq!(snap.register(Register::Eax), 5);
        assert_eq!(snap.log[0].line(), 1);
        assert_eq!(
            snap.log[0].error().map(VMError::kind),
            Some(ErrorKind::UnknownOpcode)
        );
        assert!(snap.log_lines()[0].contains("Unknown instruction foo"));
    }

    #[test]
    fn comment_stripping() {
        assert_eq!(run("MOV eax, 1 ; set eax"), run("MOV eax, 1"));
    }

    #[test]
    fn arity_mismatch_is_non_fatal() {
        let snap = run("MOV eax, 7\nADD eax\nADD eax, 1");
        assert_eq!(snap.register(Register::Eax), 8);
        assert_eq!(
            snap.log_lines()[1],
            "Error: ADD requires 2 operands, got 1 (line 2)"
        );
    }

    #[test]
    fn blank_lines_count_toward_line_numbers() {
        let snap = run("\n; comment\n\nBAR");
        assert_eq!(snap.log.len(), 1);
        assert_eq!(snap.log[0].line(), 4);
    }

    #[test]
    fn window_follows_config() {
        let mut runner = Runner::new(MachineConfig {
            memory_len: 32,
            window_len: 8,
        });
        let snap = runner.run("MOV [31], 1\nMOV [32], 1");
        assert_eq!(snap.memory.len(), 8);
        assert_eq!(runner.machine().memory().cells()[31], 1);
        assert_eq!(
            snap.log[1].error(),
            Some(&VMError::AddressOutOfBounds {
                address: 32,
                len: 32
            })
        );
    }

    #[test]
    fn run_file_reads_program() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MOV eax, 3\nADD eax, eax").unwrap();
        let snap = run_file(file.path()).unwrap();
        assert_eq!(snap.register(Register::Eax), 6);
    }

    #[test]
    fn runner_run_file_uses_its_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MOV [2], 5").unwrap();

        let mut runner = Runner::new(MachineConfig {
            memory_len: 16,
            window_len: 4,
        });
        let snap = runner.run_file(file.path()).unwrap();
        assert_eq!(snap.memory, [0, 0, 5, 0]);
    }

    #[test]
    fn run_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_file(dir.path().join("missing.asm")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
