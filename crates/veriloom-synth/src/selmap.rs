//! Case selector compaction.
//!
//! Some bits of a case selector may be driven by constants. Those bits
//! carry no information, so they are elided from the mux select lines;
//! only guard values that agree with the constant bits are reachable at
//! all. [`SelMap`] records which selector bits vary and maps full-width
//! guard values onto compacted mux input indices. The map works at any
//! selector width, since the varying positions are enumerated directly
//! instead of shifting a machine-word mask.

use veriloom_netlist::{Bit, Bits, Design, SigVec};

/// The constant/varying split of a case selector.
#[derive(Debug)]
pub(crate) struct SelMap {
    /// Positions of selector bits with non-constant drivers, LSB first.
    varying: Vec<usize>,
    /// For every selector bit: `Some(true)` when constant-driven high,
    /// `Some(false)` when constant-driven to anything else, `None` when
    /// varying.
    fixed: Vec<Option<bool>>,
}

impl SelMap {
    /// Scan the synthesized selector for constant-driven bits.
    pub fn scan(des: &Design, esig: &SigVec) -> Self {
        let mut varying = Vec::new();
        let mut fixed = Vec::with_capacity(esig.width());
        for idx in 0..esig.width() {
            let nex = esig.pin(idx);
            if des.nexa().drivers_constant(nex) {
                fixed.push(Some(des.nexa().driven_value(nex) == Bit::One));
            } else {
                fixed.push(None);
                varying.push(idx);
            }
        }
        Self { varying, fixed }
    }

    /// Number of varying selector bits, i.e. mux select lines.
    pub fn sel_pins(&self) -> usize {
        self.varying.len()
    }

    /// The positions of the varying selector bits.
    pub fn varying_positions(&self) -> &[usize] {
        &self.varying
    }

    fn guard_bit(guard: &Bits, pos: usize) -> bool {
        pos < guard.width() && guard.get(pos) == Bit::One
    }

    /// True when `guard` agrees with every constant selector bit, so the
    /// guarded arm can be reached at all. Undefined guard bits read as 0,
    /// matching how plain `case` guards compare.
    pub fn reachable(&self, guard: &Bits) -> bool {
        self.fixed.iter().enumerate().all(|(pos, fixed)| match fixed {
            Some(value) => Self::guard_bit(guard, pos) == *value,
            None => true,
        })
    }

    /// The compacted mux input index for `guard`: its varying bits,
    /// packed LSB first.
    pub fn mux_input(&self, guard: &Bits) -> usize {
        self.varying
            .iter()
            .enumerate()
            .fold(0, |acc, (bit, &pos)| {
                if Self::guard_bit(guard, pos) {
                    acc | (1 << bit)
                } else {
                    acc
                }
            })
    }
}
