//! Lowering of statements under an edge-triggered process.
//!
//! The per-process driver allocates one wide flip-flop bank covering
//! every output bit, then recurses. The event wait consumes exactly one
//! probe as the clock; conditionals near the surface become asynchronous
//! set/reset lines, synchronous set/reset lines, or clock enables;
//! blocks slice the bank so each child can infer its own control lines;
//! and plain data paths fall through to combinational lowering with the
//! flip-flop outputs available as feedback.

use veriloom_netlist::{
    Assign, Bit, Bits, Block, Condit, Edge, EventWait, GateKind, Loc, Lval, NexusSet, Probe,
    SigVec, Stmt,
};

use crate::diag::{self, SynthError};
use crate::ff_bank::{self, FfCell};
use crate::lower::Lowering;

impl Lowering<'_> {
    /// Top-level lowering of an edge-triggered process: allocate the
    /// wide flip-flop bank between the process outputs and the data
    /// vector the statement lowering will fill.
    pub(crate) fn synth_sync_top(&mut self, stmt: &Stmt, loc: Loc) -> bool {
        let nex_set = stmt.nex_output(self.des);
        let width = nex_set.len();

        let ff = self.new_dff(loc, width);
        let mut nex_ff: Vec<FfCell> = (0..width)
            .map(|pin| FfCell {
                ff,
                pin,
                origin: stmt.loc(),
            })
            .collect();

        // The D inputs of the bank receive the outputs of the statement
        // lowering.
        let nex_d = SigVec::new(self.des.nexa_mut(), width);
        for idx in 0..width {
            let dpin = self.des.dff(ff).data[idx];
            self.des.connect(nex_d.pin(idx), dpin);
        }

        // The Q outputs drive the actual process outputs, so the bank
        // sits between the statement and its consumers.
        let nex_q = SigVec::new(self.des.nexa_mut(), width);
        for idx in 0..width {
            self.des.connect(nex_set.get(idx), nex_q.pin(idx));
            let qpin = self.des.dff(ff).q[idx];
            self.des.connect(nex_q.pin(idx), qpin);
        }

        let flag = self.synth_sync(stmt, &mut nex_ff, &nex_q, &nex_d, &[]);

        self.release_sig(nex_q);
        flag
    }

    /// Event wait: partition the probes into exactly one clock (the
    /// edge whose net the body does not read) and the asynchronous
    /// probes passed down to set/reset inference.
    pub(crate) fn evwait_sync(
        &mut self,
        ew: &EventWait,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        events_in: &[Probe],
    ) -> bool {
        if !events_in.is_empty() {
            diag::error(self.des, ew.loc, &SynthError::EventsUnaccounted);
            return false;
        }

        let statement_input = ew.stmt.nex_input(self.des);

        let mut pclk: Option<Probe> = None;
        let mut events: Vec<Probe> = Vec::new();
        for probe in &ew.event.probes {
            let nex = self.des.net(probe.sig).pin(0);
            if statement_input.contains(self.des.nexa(), nex) {
                events.push(*probe);
            } else {
                if pclk.is_some() {
                    diag::error(self.des, ew.loc, &SynthError::TooManyClocks);
                }
                pclk = Some(*probe);
            }
        }

        let Some(pclk) = pclk else {
            diag::error(self.des, ew.loc, &SynthError::NoClock);
            return false;
        };

        let clk_nex = self.des.net(pclk.sig).pin(0);
        for ff in ff_bank::distinct_ffs(nex_ff) {
            let cpin = self.des.dff(ff).clock;
            self.des.connect(cpin, clk_nex);
            if pclk.edge == Edge::Neg {
                self.des.node_mut(ff).set_attribute("clock_polarity", "INVERT");
            }
        }

        self.synth_sync(&ew.stmt, nex_ff, nex_map, nex_out, &events)
    }

    /// Block under a synchronous process: each child gets its own
    /// narrow flip-flop so the children can infer different resets and
    /// enables; the slices are merged back into the accounting as the
    /// children return, and the original wide bank is deleted once it
    /// has been fully taken over.
    pub(crate) fn block_sync(
        &mut self,
        b: &Block,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        events_in: &[Probe],
    ) -> bool {
        if b.stmts.is_empty() {
            return true;
        }

        // This region must still be the single original bank.
        for idx in 1..nex_out.width() {
            if nex_ff[idx].ff != nex_ff[0].ff {
                diag::internal(self.des, b.loc, &SynthError::SplitAccounting);
                return false;
            }
        }
        let ff = nex_ff[0].ff;
        let ff_width = self.des.dff(ff).width();
        if ff_width != nex_out.width() {
            diag::internal(self.des, b.loc, &SynthError::SplitAccounting);
            return false;
        }
        let block_width = nex_out.width();

        let mut flag = true;
        for cur in &b.stmts {
            let tmp_set = cur.nex_output(self.des);
            let tmp_map = SigVec::new(self.des.nexa_mut(), tmp_set.len());
            for idx in 0..tmp_set.len() {
                self.des.connect(tmp_set.get(idx), tmp_map.pin(idx));
            }
            let tmp_out = SigVec::new(self.des.nexa_mut(), tmp_map.width());

            let tmp_aset = self.des.dff(ff).aset_value.clone();
            let tmp_sset = self.des.dff(ff).sset_value.clone();

            // A narrow bank for this child, paired with tmp_out, with
            // the set/clear value bits restricted to this slice.
            let ff2 = self.new_dff(cur.loc(), tmp_out.width());
            let w2 = tmp_out.width();
            let mut tmp_ff: Vec<FfCell> = (0..w2)
                .map(|pin| FfCell {
                    ff: ff2,
                    pin,
                    origin: cur.loc(),
                })
                .collect();

            let mut aset_value2 = Bits::repeat(Bit::One, w2);
            let mut sset_value2 = Bits::repeat(Bit::One, w2);
            for idx in 0..w2 {
                if let Some(ptr) = nex_map.position_of(self.des.nexa(), tmp_map.pin(idx)) {
                    if ptr < tmp_aset.width() {
                        aset_value2.set(idx, tmp_aset.get(ptr));
                    }
                    if ptr < tmp_sset.width() {
                        sset_value2.set(idx, tmp_sset.get(ptr));
                    }
                }
                let dpin = self.des.dff(ff2).data[idx];
                self.des.connect(tmp_out.pin(idx), dpin);
            }

            // Pull the non-sliced control inputs forward.
            let pairs = {
                let old = self.des.dff(ff);
                let new = self.des.dff(ff2);
                [
                    (old.aclr, new.aclr),
                    (old.aset, new.aset),
                    (old.sclr, new.sclr),
                    (old.sset, new.sset),
                    (old.clock, new.clock),
                    (old.enable, new.enable),
                ]
            };
            for (old_pin, new_pin) in pairs {
                if self.des.nexa().is_linked(old_pin) {
                    self.des.connect(old_pin, new_pin);
                }
            }

            // An all-zero set value is really a clear; moving the input
            // to the clear pin keeps the cell simpler.
            if tmp_aset.width() == ff_width {
                let aset2 = self.des.dff(ff2).aset;
                let aclr2 = self.des.dff(ff2).aclr;
                if aset_value2.is_zero()
                    && self.des.nexa().is_linked(aset2)
                    && !self.des.nexa().is_linked(aclr2)
                {
                    self.des.unlink_dff_aset(ff2);
                    let old_aset = self.des.dff(ff).aset;
                    let new_aclr = self.des.dff(ff2).aclr;
                    self.des.connect(new_aclr, old_aset);
                } else {
                    self.des.dff_mut(ff2).aset_value = aset_value2;
                }
            }
            if tmp_sset.width() == ff_width {
                let sset2 = self.des.dff(ff2).sset;
                let sclr2 = self.des.dff(ff2).sclr;
                if sset_value2.is_zero()
                    && self.des.nexa().is_linked(sset2)
                    && !self.des.nexa().is_linked(sclr2)
                {
                    self.des.unlink_dff_sset(ff2);
                    let old_sset = self.des.dff(ff).sset;
                    let new_sclr = self.des.dff(ff2).sclr;
                    self.des.connect(new_sclr, old_sset);
                } else {
                    self.des.dff_mut(ff2).sset_value = sset_value2;
                }
            }

            let ok = self.synth_sync(cur, &mut tmp_ff, &tmp_map, &tmp_out, events_in);
            flag &= ok;

            if ok {
                // Lift the child's bits into the block accounting: pair
                // the child bank with the baseline bank bit by bit,
                // reconcile their control lines, and let the child's
                // accounting take over.
                for idx in 0..tmp_out.width() {
                    let cell2 = tmp_ff[idx];
                    let Some(ptr) = nex_map.position_of(self.des.nexa(), tmp_map.pin(idx))
                    else {
                        continue;
                    };
                    if ptr >= nex_out.width() {
                        continue;
                    }
                    let cell1 = nex_ff[ptr];

                    let d1 = self.des.dff(cell1.ff).data[cell1.pin];
                    let d2 = self.des.dff(cell2.ff).data[cell2.pin];
                    self.des.connect(d1, d2);
                    let q1 = self.des.dff(cell1.ff).q[cell1.pin];
                    let q2 = self.des.dff(cell2.ff).q[cell2.pin];
                    self.des.connect(q1, q2);

                    if !ff_bank::merge_ff_slices(self.des, cell2.ff, cell1.ff) {
                        flag = false;
                    }

                    nex_ff[ptr] = cell2;

                    // A displaced baseline that no longer owns any bit
                    // is garbage.
                    if cell1.ff != ff
                        && !nex_ff[..block_width].iter().any(|c| c.ff == cell1.ff)
                    {
                        self.des.delete_node(cell1.ff);
                    }
                }
            }

            self.release_sig(tmp_map);
            self.release_sig(tmp_out);
        }

        if !flag {
            return false;
        }

        // The wide bank has been taken over by the per-child slices.
        self.des.delete_node(ff);

        // Every bit must have ended up with a data input.
        for idx in 0..block_width {
            let cell = nex_ff[idx];
            if !self.des.has_node(cell.ff) {
                diag::internal(self.des, cell.origin, &SynthError::DffDataMissing(cell.pin));
                flag = false;
                continue;
            }
            let width = self.des.dff(cell.ff).width();
            if cell.pin >= width {
                diag::internal(
                    self.des,
                    cell.origin,
                    &SynthError::DffPinRange {
                        pin: cell.pin,
                        width,
                    },
                );
                flag = false;
                continue;
            }
            let dpin = self.des.dff(cell.ff).data[cell.pin];
            if !self.des.nexa().is_linked(dpin) {
                diag::error(self.des, cell.origin, &SynthError::DffDataMissing(cell.pin));
                flag = false;
            }
        }

        flag
    }

    /// Conditional near the surface of a synchronous process. In order
    /// of preference: an asynchronous set/reset (the condition reads an
    /// edge probe), a synchronous set/reset (the true clause is purely
    /// constant), a plain combinational if/else, or a clock enable
    /// (`if` with no `else`).
    pub(crate) fn condit_sync(
        &mut self,
        stmt: &Stmt,
        c: &Condit,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        events_in: &[Probe],
    ) -> bool {
        let expr_input = c.cond.nex_input(self.des);

        for (idx, ev) in events_in.iter().enumerate() {
            let ev_nex = self.des.net(ev.sig).pin(0);
            if !expr_input.contains(self.des.nexa(), ev_nex) {
                continue;
            }

            // Taking this edge as an asynchronous set/clear requires
            // every input of the condition to be asynchronous too.
            let mut pin_set = NexusSet::new();
            pin_set.add(self.des.nexa(), ev_nex);
            if !pin_set.contains_all(self.des.nexa(), &expr_input) {
                let mut probes_set = pin_set;
                for later in &events_in[idx + 1..] {
                    let nex = self.des.net(later.sig).pin(0);
                    probes_set.add(self.des.nexa(), nex);
                }
                if !probes_set.contains_all(self.des.nexa(), &expr_input) {
                    diag::error(self.des, c.loc, &SynthError::MixedSyncAsync);
                }
            }

            return self.condit_async_set_clr(c, nex_ff, nex_map, nex_out, events_in, idx);
        }

        // Not asynchronous. A constant true clause with both clauses
        // present can become a synchronous set/clear, as long as the
        // bank is not already using one (only one of Sset/Sclr is
        // allowed per device).
        let Some(if_) = &c.if_ else {
            diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
            return false;
        };
        let true_inputs = if_.nex_input(self.des);

        if true_inputs.is_empty()
            && c.else_.is_some()
            && !ff_bank::any_sync_set_clr(self.des, nex_ff)
        {
            if let Some(done) = self.condit_sync_set_clr(c, nex_ff, nex_map, nex_out) {
                return done;
            }
            // Fell back: the clause values were not constant after all.
        }

        if c.if_.is_some() && c.else_.is_some() {
            // An ordinary if/then/else data path.
            return self.synth_async_noaccum(stmt, true, nex_ff, nex_map, nex_out);
        }

        // What is left is a clock enable: `if (expr) <statement>;`.
        let ce = c.cond.synthesize(self.des);
        if ce.width() != 1 {
            diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
            return false;
        }
        self.connect_enable(nex_ff, &ce);

        self.synth_sync(if_, nex_ff, nex_map, nex_out, events_in)
    }

    /// The asynchronous set/reset arm of [`Self::condit_sync`]: the
    /// condition is the set/clear line, the constant true clause is the
    /// value pattern, and the false clause recurses with the consumed
    /// probe removed. A pattern with `z` bits covers only part of the
    /// bank, which is split accordingly.
    fn condit_async_set_clr(
        &mut self,
        c: &Condit,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        events_in: &[Probe],
        consumed: usize,
    ) -> bool {
        let rst = c.cond.synthesize(self.des);
        if rst.width() != 1 {
            diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
            return false;
        }

        // This path relies on the bank still being one device.
        for bit in 1..nex_out.width() {
            if nex_ff[bit].ff != nex_ff[0].ff {
                diag::internal(self.des, c.loc, &SynthError::SplitAccounting);
                return false;
            }
        }
        let mut ff = nex_ff[0].ff;

        let Some(if_) = &c.if_ else {
            diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
            return false;
        };

        // The true clause tells us what kind of set/reset this is.
        let asig = SigVec::new(self.des.nexa_mut(), nex_map.width());
        if !self.synth_async_noaccum(if_, true, nex_ff, nex_map, &asig) {
            return false;
        }

        let width = self.des.dff(ff).width();
        if width != nex_map.width() {
            diag::internal(self.des, c.loc, &SynthError::SplitAccounting);
            return false;
        }
        let mut pattern = Bits::repeat(Bit::Zero, width);
        let mut count_x = 0usize;
        let mut count_z = 0usize;
        for bit in 0..width {
            let nex = asig.pin(bit);
            if !self.des.nexa().drivers_constant(nex) {
                diag::error(self.des, c.loc, &SynthError::ResetNotConstant);
                return false;
            }
            let value = self.des.nexa().driven_value(nex);
            pattern.set(bit, value);
            match value {
                Bit::Zero | Bit::One => {}
                Bit::Z => count_z += 1,
                Bit::X => count_x += 1,
            }
        }

        if count_x > 0 {
            diag::internal(self.des, c.loc, &SynthError::XResetPattern);
            return false;
        }

        if count_z > 0 {
            if count_z == width {
                diag::internal(self.des, c.loc, &SynthError::XResetPattern);
                return false;
            }
            // Some bits are not covered by this set/reset: split the
            // bank so only the covered half takes the control line.
            let (ff1, pattern1) = ff_bank::split_on_pattern(
                self.des,
                self.scope,
                ff,
                &pattern,
                &mut nex_ff[..width],
            );
            ff = ff1;
            pattern = pattern1;
        }

        if pattern.is_zero() {
            let aclr = self.des.dff(ff).aclr;
            self.des.connect(aclr, rst.pin(0));
        } else {
            let aset = self.des.dff(ff).aset;
            self.des.connect(aset, rst.pin(0));
            self.des.dff_mut(ff).aset_value = pattern;
        }

        self.release_sig(asig);

        // Without an else clause the data input is not defined here; an
        // enclosing block may still provide it, so this is not an error
        // yet.
        let Some(else_) = &c.else_ else {
            return true;
        };

        let events_rest: Vec<Probe> = events_in
            .iter()
            .enumerate()
            .filter_map(|(i, p)| (i != consumed).then_some(*p))
            .collect();
        self.synth_sync(else_, nex_ff, nex_map, nex_out, &events_rest)
    }

    /// The synchronous set/reset arm of [`Self::condit_sync`]. Returns
    /// `None` when the clause values turn out not to be constant, in
    /// which case the caller falls back to general lowering.
    fn condit_sync_set_clr(
        &mut self,
        c: &Condit,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
    ) -> Option<bool> {
        let Some(if_) = &c.if_ else {
            return None;
        };

        let rst = c.cond.synthesize(self.des);
        if rst.width() != 1 {
            diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
            return Some(false);
        }

        let asig = SigVec::new(self.des.nexa_mut(), nex_map.width());
        if !self.synth_async_noaccum(if_, true, nex_ff, nex_map, &asig) {
            self.release_sig(asig);
            return None;
        }

        let nbits = nex_map.width();
        let mut pattern = Bits::repeat(Bit::Zero, nbits);
        for bit in 0..nbits {
            let nex = asig.pin(bit);
            if !self.des.nexa().drivers_constant(nex) {
                self.release_sig(asig);
                return None;
            }
            pattern.set(bit, self.des.nexa().driven_value(nex));
        }

        if !pattern.is_defined() {
            // Presumably a partially connected clause; fall back to the
            // general synthesis.
            if self.debug > 0 {
                log::debug!(
                    "{}: give up on set/clr synthesis, value = {}",
                    c.loc,
                    pattern
                );
            }
            self.release_sig(asig);
            return None;
        }

        self.connect_set_clr(nex_ff, &rst, &pattern);

        let Some(else_) = &c.else_ else {
            diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
            return Some(false);
        };
        Some(self.synth_sync(else_, nex_ff, nex_map, nex_out, &[]))
    }

    /// Route a synchronous set/clear line onto every bank in the
    /// accounting, slicing the value pattern per device. All-zero
    /// slices use the clear input, everything else the set input with
    /// the pattern stored.
    fn connect_set_clr(&mut self, cells: &[FfCell], rst: &SigVec, value: &Bits) {
        for ff in ff_bank::distinct_ffs(cells) {
            let width = self.des.dff(ff).width();
            let mut slice = Bits::repeat(Bit::Zero, width);
            for (idx, cell) in cells.iter().enumerate() {
                if cell.ff == ff && idx < value.width() {
                    slice.set(cell.pin, value.get(idx));
                }
            }
            if slice.is_zero() {
                let sclr = self.des.dff(ff).sclr;
                self.des.connect(sclr, rst.pin(0));
            } else {
                let sset = self.des.dff(ff).sset;
                self.des.connect(sset, rst.pin(0));
                self.des.dff_mut(ff).sset_value = slice;
            }
            if self.debug > 0 {
                log::debug!("create a synchronous set/clear for {width} bit ff");
            }
        }
    }

    /// Connect a clock enable onto every bank in the accounting. A bank
    /// that already has an enable (nested `if (a) if (b) ...`) gets the
    /// two conditions ANDed.
    fn connect_enable(&mut self, cells: &[FfCell], ce: &SigVec) {
        for ff in ff_bank::distinct_ffs(cells) {
            let enable = self.des.dff(ff).enable;
            if self.des.nexa().is_linked(enable) {
                let loc = self.des.node(ff).loc;
                let gate = self.des.add_gate(self.scope, loc, GateKind::And, 2);
                let in1 = self.des.gate(gate).pins[1];
                let in2 = self.des.gate(gate).pins[2];
                self.des.connect(enable, in1);
                self.des.connect(ce.pin(0), in2);
                self.des.unlink_dff_enable(ff);
                let enable = self.des.dff(ff).enable;
                let out = self.des.gate(gate).pins[0];
                self.des.connect(enable, out);
            } else {
                self.des.connect(enable, ce.pin(0));
            }
        }
    }

    /// Assignment under a synchronous process. A plain target is just
    /// the combinational path into the data vector; an indexed or
    /// memory target puts an address decoder between the bank and the
    /// (replicated) write data.
    pub(crate) fn assign_sync(
        &mut self,
        stmt: &Stmt,
        a: &Assign,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
    ) -> bool {
        let mut count_lval = 0usize;
        let mut demux: Option<&Lval> = None;
        for lv in &a.lvals {
            if lv.bmux.is_some() || lv.mem.is_some() {
                demux = Some(lv);
            }
            count_lval += 1;
        }

        let Some(lv) = demux else {
            // No decoded target: synthesize the data path directly.
            return self.synth_async_noaccum(stmt, true, nex_ff, nex_map, nex_out);
        };

        if count_lval != 1 {
            diag::error(self.des, a.loc, &SynthError::MixedMemoryVector);
            return false;
        }

        let Some(bmux) = &lv.bmux else {
            diag::internal(self.des, a.loc, &SynthError::UnsupportedLval);
            return false;
        };

        let rsig = a.rval.synthesize(self.des);
        if rsig.width() < lv.lwidth {
            diag::internal(self.des, a.loc, &SynthError::RvalTooNarrow);
            return false;
        }

        // A constant word index needs no decoder; bind the addressed
        // bits of the exploded array directly.
        if let (Some(mem), Some(adr_bits)) = (lv.mem, bmux.as_const()) {
            let msig = self.des.explode_memory(mem);
            self.des.incr_mem_lref(mem);

            let adr = adr_bits.as_u64_lossy() as usize;
            if adr >= self.des.memory(mem).count() {
                diag::error(self.des, a.loc, &SynthError::AddressOutOfRange(adr as i64));
                return false;
            }
            let base = self.des.memory(mem).index_to_address(adr) * self.des.memory(mem).width();
            for idx in 0..lv.lwidth {
                let mpin = self.des.net(msig).pin(base + idx);
                let Some(ptr) = nex_map.position_of(self.des.nexa(), mpin) else {
                    diag::internal(self.des, a.loc, &SynthError::NexusNotInMap);
                    return false;
                };
                self.des.connect(nex_out.pin(ptr), rsig.pin(idx));
            }
            if let Some(sig) = lv.sig {
                self.des.mark_to_wire(sig);
            }
            return true;
        }

        // Dynamic index: decode the address in front of the bank and
        // replicate the write data across it.
        let adr = bmux.synthesize(self.des);
        let Some(cell) = nex_ff.first().copied() else {
            diag::internal(self.des, a.loc, &SynthError::SplitAccounting);
            return false;
        };
        let dq = self
            .des
            .add_decode(self.scope, a.loc, cell.ff, adr.width(), lv.lwidth);
        for idx in 0..adr.width() {
            let apin = self.des.decode(dq).address[idx];
            self.des.connect(apin, adr.pin(idx));
        }

        let width = self.des.dff(cell.ff).width();
        for idx in 0..width {
            let dpin = self.des.dff(cell.ff).data[idx];
            self.des.connect(dpin, rsig.pin(idx % lv.lwidth));
        }

        if let Some(mem) = lv.mem {
            self.des.incr_mem_lref(mem);
        }
        if let Some(sig) = lv.sig {
            self.des.mark_to_wire(sig);
        }
        true
    }
}
