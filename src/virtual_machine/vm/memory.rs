use crate::virtual_machine::errors::VMError;

/// Fixed-length linear memory of signed integer cells.
///
/// Ordinary accesses must fall in `[0, len)`. Stack accesses additionally
/// accept `[-len, 0)`, which addresses the top of memory counting down from
/// the end, so a stack pointer that starts at 0 grows into the last cells.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
    cells: Vec<i64>,
}

impl Memory {
    /// Creates `len` zeroed cells.
    pub fn new(len: usize) -> Self {
        Self {
            cells: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Zeroes every cell.
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    /// Checks `address` against `[0, len)`.
    pub fn index(&self, address: i64) -> Result<usize, VMError> {
        usize::try_from(address)
            .ok()
            .filter(|&idx| idx < self.cells.len())
            .ok_or(VMError::AddressOutOfBounds {
                address,
                len: self.cells.len(),
            })
    }

    /// Maps a stack pointer onto a cell: `[0, len)` as is, `[-len, 0)` from the end.
    pub fn stack_index(&self, sp: i64) -> Result<usize, VMError> {
        let len = self.cells.len();
        let out_of_bounds = VMError::StackOutOfBounds { sp, len };
        let len_i64 = i64::try_from(len).map_err(|_| out_of_bounds.clone())?;

        if (0..len_i64).contains(&sp) {
            Ok(sp as usize)
        } else if (-len_i64..0).contains(&sp) {
            Ok((len_i64 + sp) as usize)
        } else {
            Err(out_of_bounds)
        }
    }

    /// Reads the cell at `address`.
    pub fn load(&self, address: i64) -> Result<i64, VMError> {
        Ok(self.cells[self.index(address)?])
    }

    /// Writes the cell at `address`, returning its index.
    pub fn store(&mut self, address: i64, value: i64) -> Result<usize, VMError> {
        let idx = self.index(address)?;
        self.cells[idx] = value;
        Ok(idx)
    }

    /// Reads the stack slot for `sp`.
    pub fn stack_load(&self, sp: i64) -> Result<i64, VMError> {
        Ok(self.cells[self.stack_index(sp)?])
    }

    /// Writes the stack slot for `sp`, returning its index.
    pub fn stack_store(&mut self, sp: i64, value: i64) -> Result<usize, VMError> {
        let idx = self.stack_index(sp)?;
        self.cells[idx] = value;
        Ok(idx)
    }

    /// Returns the first `n` cells (fewer if memory is shorter).
    pub fn window(&self, n: usize) -> &[i64] {
        &self.cells[..n.min(self.cells.len())]
    }

    pub fn cells(&self) -> &[i64] {
        &self.cells
    }
}
