use crate::virtual_machine::isa::Register;

/// Register file holding one signed integer per [`Register`].
///
/// The register set is closed: every register always has a value, and all
/// start at 0.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegisterBank {
    regs: [i64; Register::COUNT],
}

impl RegisterBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value in `reg`.
    pub fn get(&self, reg: Register) -> i64 {
        self.regs[reg.index()]
    }

    /// Stores `value` into `reg`.
    pub fn set(&mut self, reg: Register, value: i64) {
        self.regs[reg.index()] = value;
    }

    /// Zeroes every register.
    pub fn reset(&mut self) {
        self.regs = [0; Register::COUNT];
    }

    /// Iterates `(register, value)` pairs in bank order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, i64)> + '_ {
        Register::ALL.into_iter().map(|reg| (reg, self.get(reg)))
    }
}
