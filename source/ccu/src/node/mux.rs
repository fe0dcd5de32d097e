use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::{Muxable, Regs};
use crate::regs::{Field, Window};

/// Parent selection field in the control register.
///
/// Without a table, parent index `i` is programmed as the raw value `i`.
/// With one, it is programmed as `table[i]`, and read back by looking the
/// raw value up in the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MuxControl {
    pub field: Field,
    #[serde(default)]
    pub table: Option<Vec<u32>>,
}

impl MuxControl {
    #[must_use]
    pub const fn new(shift: u8, width: u8) -> Self {
        Self {
            field: Field::new(shift, width),
            table: None,
        }
    }

    #[must_use]
    pub fn with_table(self, table: impl Into<Vec<u32>>) -> Self {
        Self {
            table: Some(table.into()),
            ..self
        }
    }

    /// How many parents the mux can select between.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match &self.table {
            Some(table) => table.len(),
            None => self.field.mask() as usize + 1,
        }
    }

    /// Whether every table value fits the field.
    #[must_use]
    pub fn table_fits(&self) -> bool {
        let max = self.field.mask();
        self.table.iter().flatten().all(|&raw| raw <= max)
    }

    fn raw_for(&self, index: usize) -> Option<u32> {
        let raw = match &self.table {
            Some(table) => table.get(index).copied()?,
            None => u32::try_from(index).ok()?,
        };
        (raw <= self.field.mask()).then_some(raw)
    }
}

impl Muxable for MuxControl {
    fn parent_index(&self, w: &mut Window<'_>, regs: &Regs) -> usize {
        let raw = w.read_field(regs.ctrl, self.field);
        match &self.table {
            // an unlisted raw value is reported as an out-of-range index
            Some(table) => table.iter().position(|&v| v == raw).unwrap_or(table.len()),
            None => raw as usize,
        }
    }

    fn select(&self, w: &mut Window<'_>, regs: &Regs, index: usize) -> bool {
        let Some(raw) = self.raw_for(index) else {
            return false;
        };
        w.write_field(regs.ctrl, self.field, raw);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{regs::Bank, sim::SimRegisters};

    const REGS: Regs = Regs::new(Bank::Apbc, 0x0);

    #[test]
    fn plain_index() {
        let mux = MuxControl::new(4, 3);
        let mut sim = SimRegisters::new();
        let mut w = Window::new(&mut sim, 0);
        assert_eq!(mux.parent_index(&mut w, &REGS), 0);
        assert!(mux.select(&mut w, &REGS, 2));
        assert_eq!(w.read(0), 2 << 4);
        assert_eq!(mux.parent_index(&mut w, &REGS), 2);
    }

    #[test]
    fn table_lookup() {
        let mux = MuxControl::new(0, 3).with_table([0, 2, 5]);
        let mut sim = SimRegisters::new();
        let mut w = Window::new(&mut sim, 0);
        assert!(mux.select(&mut w, &REGS, 2));
        assert_eq!(w.read(0), 5);
        assert_eq!(mux.parent_index(&mut w, &REGS), 2);
        assert!(!mux.select(&mut w, &REGS, 3));

        w.write(0, 7);
        assert_eq!(mux.parent_index(&mut w, &REGS), 3);
    }

    #[test]
    fn index_beyond_the_field_is_refused() {
        let mux = MuxControl::new(4, 3);
        assert_eq!(mux.capacity(), 8);
        let mut sim = SimRegisters::new();
        let mut w = Window::new(&mut sim, 0);
        assert!(mux.select(&mut w, &REGS, 1));
        // 9 would truncate to 1 in a 3-bit field
        assert!(!mux.select(&mut w, &REGS, 9));
        assert!(!mux.select(&mut w, &REGS, 8));
        assert_eq!(w.read(0), 1 << 4);

        let oversized = MuxControl::new(0, 2).with_table([0, 1, 4]);
        assert_eq!(oversized.capacity(), 3);
        assert!(!oversized.table_fits());
        assert!(!oversized.select(&mut w, &REGS, 2));
        assert!(MuxControl::new(0, 3).with_table([0, 1, 4]).table_fits());
    }
}
