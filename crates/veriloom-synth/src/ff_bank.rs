//! Flip-flop bank accounting.
//!
//! Synchronous lowering starts from one wide DFF covering every output
//! bit of the process and slices it as the recursion discovers that
//! different bits carry different enables and set/reset lines. The
//! accounting array, one [`FfCell`] per output bit, is the single
//! source of truth for which device owns which bit; a DFF that drops out
//! of the array is garbage and must be deleted.

use veriloom_netlist::{Bit, Bits, Design, Loc, NodeId, ScopeId};

use crate::diag::{self, SynthError};

/// Per-output-bit accounting: which flip-flop drives the bit, at which
/// pin, and which statement introduced that flip-flop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FfCell {
    /// The owning flip-flop.
    pub ff: NodeId,
    /// The bit's pin index within the flip-flop.
    pub pin: usize,
    /// Location of the statement that introduced the flip-flop.
    pub origin: Loc,
}

/// The distinct flip-flops referenced by `cells`, in first-reference
/// order.
pub(crate) fn distinct_ffs(cells: &[FfCell]) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::new();
    for cell in cells {
        if !out.contains(&cell.ff) {
            out.push(cell.ff);
        }
    }
    out
}

/// True when any flip-flop in the accounting already uses a synchronous
/// set or clear. Only one of the pair is allowed per device, so a
/// second synchronous set/reset inference must fall back to general
/// lowering.
pub(crate) fn any_sync_set_clr(des: &Design, cells: &[FfCell]) -> bool {
    distinct_ffs(cells).into_iter().any(|ff| {
        let dff = des.dff(ff);
        des.nexa().is_linked(dff.sset) || des.nexa().is_linked(dff.sclr)
    })
}

/// Reconcile a freshly sliced flip-flop with the baseline device that
/// previously owned the same bits.
///
/// The two slices must agree on their asynchronous set and clear lines;
/// a disagreement is a structural conflict in the source. The baseline's
/// clock enable, if any, is pulled forward onto the new slice.
pub(crate) fn merge_ff_slices(des: &mut Design, new_ff: NodeId, base_ff: NodeId) -> bool {
    let new_loc = des.node(new_ff).loc;
    let base_loc = des.node(base_ff).loc;

    let (new_aset, new_aclr, new_enable) = {
        let d = des.dff(new_ff);
        (d.aset, d.aclr, d.enable)
    };
    let (base_aset, base_aclr, base_enable) = {
        let d = des.dff(base_ff);
        (d.aset, d.aclr, d.enable)
    };

    if des.nexa().is_linked(new_aset)
        && des.nexa().is_linked(base_aset)
        && !des.nexa().same(new_aset, base_aset)
    {
        diag::error(des, new_loc, &SynthError::AsetConflict(base_loc));
        return false;
    }

    if des.nexa().is_linked(new_aclr)
        && des.nexa().is_linked(base_aclr)
        && !des.nexa().same(new_aclr, base_aclr)
    {
        diag::error(des, new_loc, &SynthError::AclrConflict(base_loc));
        return false;
    }

    if des.nexa().is_linked(base_enable) {
        des.connect(new_enable, base_enable);
    }

    true
}

/// Split a flip-flop over a partial set/reset pattern: bits whose
/// pattern value is `z` are not covered by the reset and move to a new
/// uncontrolled device, the rest keep the reset on a narrower device.
///
/// The old device's Q and Data connections are carried over pin by pin,
/// the clock is copied to both halves, the accounting cells for every
/// affected bit are rewritten, and the old device is deleted. Returns
/// the reset-carrying flip-flop and the compacted pattern.
pub(crate) fn split_on_pattern(
    des: &mut Design,
    scope: ScopeId,
    ff: NodeId,
    pattern: &Bits,
    cells: &mut [FfCell],
) -> (NodeId, Bits) {
    let width = des.dff(ff).width();
    let count_z = pattern.iter().filter(|b| *b == Bit::Z).count();
    let loc = des.node(ff).loc;

    let ff1 = des.add_dff(scope, loc, width - count_z);
    let ffz = des.add_dff(scope, loc, count_z);

    let old_clock = des.dff(ff).clock;
    let clk1 = des.dff(ff1).clock;
    let clkz = des.dff(ffz).clock;
    des.connect(old_clock, clk1);
    des.connect(old_clock, clkz);

    let mut pattern1 = Bits::repeat(Bit::Zero, width - count_z);
    let mut bit1 = 0;
    let mut bitz = 0;
    for bit in 0..width {
        let old_q = des.dff(ff).q[bit];
        let old_d = des.dff(ff).data[bit];
        if pattern.get(bit) == Bit::Z {
            let new_q = des.dff(ffz).q[bitz];
            let new_d = des.dff(ffz).data[bitz];
            des.connect(new_q, old_q);
            des.connect(new_d, old_d);
            cells[bit].ff = ffz;
            cells[bit].pin = bitz;
            bitz += 1;
        } else {
            let new_q = des.dff(ff1).q[bit1];
            let new_d = des.dff(ff1).data[bit1];
            des.connect(new_q, old_q);
            des.connect(new_d, old_d);
            cells[bit].ff = ff1;
            cells[bit].pin = bit1;
            pattern1.set(bit1, pattern.get(bit));
            bit1 += 1;
        }
    }

    des.delete_node(ff);
    (ff1, pattern1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriloom_netlist::Bits;

    fn loc() -> Loc {
        Loc::line(1)
    }

    #[test]
    fn test_distinct_ffs_keeps_order() {
        let mut des = Design::new();
        let scope = des.new_scope("top");
        let a = des.add_dff(scope, loc(), 2);
        let b = des.add_dff(scope, loc(), 1);
        let cells = [
            FfCell { ff: a, pin: 0, origin: loc() },
            FfCell { ff: a, pin: 1, origin: loc() },
            FfCell { ff: b, pin: 0, origin: loc() },
        ];
        assert_eq!(distinct_ffs(&cells), vec![a, b]);
    }

    #[test]
    fn test_merge_pulls_enable_forward() {
        let mut des = Design::new();
        let scope = des.new_scope("top");
        let base = des.add_dff(scope, loc(), 2);
        let new = des.add_dff(scope, loc(), 1);
        let ce = des.nexa_mut().alloc();
        let base_en = des.dff(base).enable;
        des.connect(base_en, ce);
        assert!(merge_ff_slices(&mut des, new, base));
        assert!(des.nexa().same(des.dff(new).enable, ce));
        assert_eq!(des.errors, 0);
    }

    #[test]
    fn test_merge_detects_aset_conflict() {
        let mut des = Design::new();
        let scope = des.new_scope("top");
        let base = des.add_dff(scope, loc(), 2);
        let new = des.add_dff(scope, loc(), 1);
        let rst_a = des.nexa_mut().alloc();
        let rst_b = des.nexa_mut().alloc();
        let base_aset = des.dff(base).aset;
        let new_aset = des.dff(new).aset;
        des.connect(base_aset, rst_a);
        des.connect(new_aset, rst_b);
        assert!(!merge_ff_slices(&mut des, new, base));
        assert_eq!(des.errors, 1);
    }

    #[test]
    fn test_split_partitions_bits() {
        let mut des = Design::new();
        let scope = des.new_scope("top");
        let ff = des.add_dff(scope, loc(), 4);
        let clk = des.nexa_mut().alloc();
        let ff_clock = des.dff(ff).clock;
        des.connect(ff_clock, clk);

        let mut cells: Vec<FfCell> = (0..4)
            .map(|pin| FfCell { ff, pin, origin: loc() })
            .collect();

        // 4'b10zz: low two bits carry no reset.
        let pattern: Bits = "10zz".parse().unwrap();
        let (ff1, pattern1) = split_on_pattern(&mut des, scope, ff, &pattern, &mut cells);

        assert!(!des.has_node(ff));
        assert_eq!(des.dff(ff1).width(), 2);
        assert_eq!(pattern1.to_string(), "10");
        // Bits 2 and 3 stay with the reset half, 0 and 1 move away.
        assert_eq!(cells[2].ff, ff1);
        assert_eq!(cells[3].ff, ff1);
        assert_ne!(cells[0].ff, ff1);
        assert_eq!(cells[0].ff, cells[1].ff);
        // Both halves share the original clock.
        assert!(des.nexa().same(des.dff(ff1).clock, clk));
        assert!(des.nexa().same(des.dff(cells[0].ff).clock, clk));
    }
}
