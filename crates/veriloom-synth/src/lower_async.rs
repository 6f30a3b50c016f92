//! Lowering of statements to combinational logic.
//!
//! Assignments wire r-values straight into the frame's output slots;
//! blocks fold their children over a rolling accumulator so later
//! statements override earlier ones bit by bit; conditionals become 2:1
//! muxes; case statements become wide muxes, or banks of comparators
//! feeding a one-hot mux when only a few guards are live. When the
//! `sync_flag` is set (called from synchronous lowering) the flip-flop
//! outputs in `nex_map` are a legal fallback for bits a branch leaves
//! unwritten; in a purely combinational process they are not.

use veriloom_netlist::{
    Assign, Bit, Block, Case, CaseKind, Condit, GateKind, Lval, SigVec, Stmt,
};

use crate::diag::{self, SynthError};
use crate::ff_bank::FfCell;
use crate::lower::Lowering;
use crate::selmap::SelMap;

/// Widest workable mux select: beyond this the input count is past any
/// plausible device, so the case is rejected rather than enumerated.
const MAX_SEL_PINS: usize = 16;

impl Lowering<'_> {
    /// Top-level lowering of a combinational process.
    pub(crate) fn synth_async_top(&mut self, stmt: &Stmt) -> bool {
        let nex_set = stmt.nex_output(self.des);
        let nex_out = SigVec::new(self.des.nexa_mut(), nex_set.len());
        for idx in 0..nex_set.len() {
            self.des.connect(nex_set.get(idx), nex_out.pin(idx));
        }
        let flag = self.synth_async_noaccum(stmt, false, &mut [], &nex_out, &nex_out);
        self.release_sig(nex_out);
        flag
    }

    /// Assignment: synthesize the r-value, then bind each l-value
    /// fragment's bits into the output slots located through `nex_map`.
    pub(crate) fn assign_async(
        &mut self,
        a: &Assign,
        sync_flag: bool,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
    ) -> bool {
        let rsig = a.rval.synthesize(self.des);
        let mut roff = 0usize;
        let mut flag = true;

        for lv in &a.lvals {
            if lv.mem.is_some() && !sync_flag {
                diag::error(self.des, a.loc, &SynthError::MemoryInAsync);
                return false;
            }
            if lv.mem.is_some() {
                flag &= self.assign_mem_sync(a, lv, &rsig, &mut roff, nex_map, nex_out);
                continue;
            }

            let Some(lsig) = lv.sig else {
                diag::error(self.des, a.loc, &SynthError::UnsupportedLval);
                return false;
            };

            if lv.bmux.is_some() && !sync_flag {
                diag::error(self.des, a.loc, &SynthError::BitSelectInAsync);
                return false;
            }

            if let Some(bmux) = &lv.bmux {
                // Decoded enable: a demux whose Data inputs cycle the
                // flip-flop Q outputs back, so only the addressed bit
                // takes the write data.
                let adr = bmux.synthesize(self.des);
                let lsig_width = self.des.net(lsig).width();
                let dq = self
                    .des
                    .add_demux(self.scope, a.loc, lsig_width, adr.width(), lsig_width);
                for idx in 0..adr.width() {
                    let apin = self.des.demux(dq).address[idx];
                    self.des.connect(apin, adr.pin(idx));
                }

                if lv.lwidth != 1 {
                    diag::internal(self.des, a.loc, &SynthError::UnsupportedLval);
                    return false;
                }
                let Some(cell) = nex_ff.first().copied() else {
                    diag::internal(self.des, a.loc, &SynthError::SplitAccounting);
                    return false;
                };
                if self.des.dff(cell.ff).width() < lv.loff + lsig_width {
                    diag::internal(self.des, a.loc, &SynthError::SplitAccounting);
                    return false;
                }
                for idx in 0..lsig_width {
                    let off = lv.loff + idx;
                    let qpin = self.des.dff(cell.ff).q[off];
                    let dpin = self.des.demux(dq).data[idx];
                    self.des.connect(qpin, dpin);
                }
                for idx in 0..lsig_width {
                    let off = lv.loff + idx;
                    let lpin = self.des.net(lsig).pin(off);
                    let Some(ptr) = nex_map.position_of(self.des.nexa(), lpin) else {
                        diag::internal(self.des, a.loc, &SynthError::NexusNotInMap);
                        flag = false;
                        continue;
                    };
                    let qpin = self.des.demux(dq).q[idx];
                    self.des.connect(nex_out.pin(ptr), qpin);
                }
                if roff >= rsig.width() {
                    diag::internal(self.des, a.loc, &SynthError::RvalTooNarrow);
                    return false;
                }
                let wd = self.des.demux(dq).write_data[0];
                self.des.connect(wd, rsig.pin(roff));
                roff += lv.lwidth;
                self.des.mark_to_wire(lsig);
                continue;
            }

            for idx in 0..lv.lwidth {
                let off = lv.loff + idx;
                let lpin = self.des.net(lsig).pin(off);
                let Some(ptr) = nex_map.position_of(self.des.nexa(), lpin) else {
                    diag::internal(self.des, a.loc, &SynthError::NexusNotInMap);
                    return false;
                };
                if roff + idx >= rsig.width() {
                    diag::internal(self.des, a.loc, &SynthError::RvalTooNarrow);
                    return false;
                }
                self.des.connect(nex_out.pin(ptr), rsig.pin(roff + idx));
            }
            roff += lv.lwidth;

            // The target reg is structurally driven now; schedule its
            // conversion to a wire for when the process is released.
            self.des.mark_to_wire(lsig);
        }

        flag
    }

    /// Assignment to a memory word, under an edge-triggered process. The
    /// memory has been exploded to a flat reg vector; a constant index
    /// binds the addressed bits directly, a dynamic index goes through a
    /// write-port demux with feedback from `nex_map`.
    fn assign_mem_sync(
        &mut self,
        a: &Assign,
        lv: &Lval,
        rsig: &SigVec,
        roff: &mut usize,
        nex_map: &SigVec,
        nex_out: &SigVec,
    ) -> bool {
        let Some(mem) = lv.mem else {
            diag::internal(self.des, a.loc, &SynthError::UnsupportedLval);
            return false;
        };
        let msig = self.des.explode_memory(mem);
        self.des.incr_mem_lref(mem);

        let Some(bmux) = &lv.bmux else {
            diag::internal(self.des, a.loc, &SynthError::UnsupportedLval);
            return false;
        };

        if let Some(adr_bits) = bmux.as_const() {
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
                if *roff + idx >= rsig.width() {
                    diag::internal(self.des, a.loc, &SynthError::RvalTooNarrow);
                    return false;
                }
                self.des.connect(nex_out.pin(ptr), rsig.pin(*roff + idx));
            }
            *roff += lv.lwidth;
            return true;
        }

        let adr = bmux.synthesize(self.des);
        let mwidth = self.des.net(msig).width();
        let dq = self.des.add_demux(
            self.scope,
            a.loc,
            mwidth,
            adr.width(),
            mwidth / lv.lwidth,
        );
        for idx in 0..adr.width() {
            let apin = self.des.demux(dq).address[idx];
            self.des.connect(apin, adr.pin(idx));
        }
        for idx in 0..mwidth {
            let mpin = self.des.net(msig).pin(idx);
            let Some(ptr) = nex_map.position_of(self.des.nexa(), mpin) else {
                diag::internal(self.des, a.loc, &SynthError::NexusNotInMap);
                return false;
            };
            let qpin = self.des.demux(dq).q[idx];
            self.des.connect(nex_out.pin(ptr), qpin);
        }
        for idx in 0..mwidth {
            if *roff + idx >= nex_map.width() {
                diag::internal(self.des, a.loc, &SynthError::NexusNotInMap);
                return false;
            }
            let dpin = self.des.demux(dq).data[idx];
            self.des.connect(dpin, nex_map.pin(*roff + idx));
        }
        for idx in 0..lv.lwidth {
            if *roff + idx >= rsig.width() {
                diag::internal(self.des, a.loc, &SynthError::RvalTooNarrow);
                return false;
            }
            let wpin = self.des.demux(dq).write_data[idx];
            self.des.connect(wpin, rsig.pin(*roff + idx));
        }
        *roff += lv.lwidth;
        true
    }

    /// Sequential block: lower the children in source order, folding
    /// their outputs through a rolling accumulator so that the last
    /// writer of each bit wins.
    pub(crate) fn block_async(
        &mut self,
        b: &Block,
        sync_flag: bool,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        _accum: &SigVec,
    ) -> bool {
        if b.stmts.is_empty() {
            return true;
        }

        let mut accum_out = SigVec::new(self.des.nexa_mut(), nex_out.width());
        let mut flag = true;

        for cur in &b.stmts {
            // The child's own output set, and fresh map/out vectors
            // sized to it.
            let tmp_set = cur.nex_output(self.des);
            let tmp_map = SigVec::new(self.des.nexa_mut(), tmp_set.len());
            for idx in 0..tmp_set.len() {
                self.des.connect(tmp_set.get(idx), tmp_map.pin(idx));
            }
            let tmp_out = SigVec::new(self.des.nexa_mut(), tmp_map.width());

            // Project the accumulated values of earlier children down to
            // the child's output set. Bits nothing has driven yet stay
            // unlinked.
            let narrow_accum = SigVec::new(self.des.nexa_mut(), tmp_map.width());
            for idx in 0..tmp_map.width() {
                if let Some(ptr) = nex_map.position_of(self.des.nexa(), tmp_map.pin(idx)) {
                    if self.des.nexa().is_linked(accum_out.pin(ptr)) {
                        self.des.connect(narrow_accum.pin(idx), accum_out.pin(ptr));
                    }
                }
            }

            let ok = self.synth_async(cur, sync_flag, nex_ff, &tmp_map, &tmp_out, &narrow_accum);
            self.release_sig(narrow_accum);
            flag &= ok;
            if !ok {
                continue;
            }

            // Lift the child's outputs back to full block width...
            let new_accum = SigVec::new(self.des.nexa_mut(), nex_out.width());
            for idx in 0..tmp_out.width() {
                let Some(ptr) = nex_map.position_of(self.des.nexa(), tmp_map.pin(idx)) else {
                    diag::internal(self.des, cur.loc(), &SynthError::NexusNotInMap);
                    flag = false;
                    continue;
                };
                self.des.connect(new_accum.pin(ptr), tmp_out.pin(idx));
            }
            self.release_sig(tmp_map);
            self.release_sig(tmp_out);

            // ...and let everything this child did not redrive inherit
            // the earlier value.
            for idx in 0..new_accum.width() {
                if self.des.nexa().is_linked(new_accum.pin(idx)) {
                    continue;
                }
                self.des.connect(new_accum.pin(idx), accum_out.pin(idx));
            }
            self.release_sig(accum_out);
            accum_out = new_accum;
        }

        for idx in 0..accum_out.width() {
            self.des.connect(nex_out.pin(idx), accum_out.pin(idx));
        }
        self.release_sig(accum_out);

        flag
    }

    /// Conditional: both clauses are synthesized into fresh vectors and
    /// reconciled bit by bit onto a 2:1 mux. A clause that leaves a bit
    /// unwritten is covered by the accumulator, or by flip-flop feedback
    /// when running under synchronous lowering. A bit driven on only one
    /// side of a purely combinational conditional would need a latch;
    /// there is no latch support, so the driver is connected straight
    /// through and a warning notes the elision.
    pub(crate) fn condit_async(
        &mut self,
        c: &Condit,
        sync_flag: bool,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        accum: &SigVec,
    ) -> bool {
        let ssig = c.cond.synthesize(self.des);
        if ssig.width() == 0 {
            diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
            return false;
        }

        if c.if_.is_none() && c.else_.is_none() {
            diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
            return false;
        }

        // The accumulated input can stand in for a missing clause, but
        // only when every bit of it is actually driven.
        let default_sig: Option<SigVec> = if accum.fully_linked(self.des.nexa()) {
            Some(accum.clone())
        } else {
            None
        };

        if default_sig.is_none() && !sync_flag {
            if c.if_.is_none() {
                diag::error(self.des, c.loc, &SynthError::MissingIfClause);
                return false;
            }
            if c.else_.is_none() {
                diag::error(self.des, c.loc, &SynthError::MissingElseClause);
                return false;
            }
        }

        let asig = SigVec::new(self.des.nexa_mut(), nex_map.width());
        match &c.if_ {
            Some(if_) => {
                if !self.synth_async(if_, sync_flag, nex_ff, nex_map, &asig, accum) {
                    diag::error(self.des, c.loc, &SynthError::TrueClauseFailed);
                    return false;
                }
            }
            None => {
                for idx in 0..asig.width() {
                    match &default_sig {
                        Some(ds) => self.des.connect(asig.pin(idx), ds.pin(idx)),
                        None => self.des.connect(asig.pin(idx), nex_map.pin(idx)),
                    }
                }
            }
        }

        let bsig = SigVec::new(self.des.nexa_mut(), nex_map.width());
        match &c.else_ {
            Some(else_) => {
                if !self.synth_async(else_, sync_flag, nex_ff, nex_map, &bsig, accum) {
                    diag::error(self.des, c.loc, &SynthError::FalseClauseFailed);
                    return false;
                }
            }
            None => {
                for idx in 0..bsig.width() {
                    match &default_sig {
                        Some(ds) => self.des.connect(bsig.pin(idx), ds.pin(idx)),
                        None => self.des.connect(bsig.pin(idx), nex_map.pin(idx)),
                    }
                }
            }
        }

        // First pass: how many bits actually need a mux?
        let linkage = |des: &veriloom_netlist::Design, idx: usize| {
            (
                des.nexa().is_linked(asig.pin(idx)),
                des.nexa().is_linked(bsig.pin(idx)),
                des.nexa().is_linked(accum.pin(idx)),
            )
        };
        let mut mux_width = 0;
        for idx in 0..nex_out.width() {
            match linkage(self.des, idx) {
                (true, true, _) | (true, false, true) | (false, true, true) | (false, false, true) => {
                    mux_width += 1;
                }
                (true, false, false) | (false, true, false) => {
                    if sync_flag {
                        mux_width += 1;
                    }
                }
                (false, false, false) => {}
            }
        }

        let mux = self.des.add_mux(self.scope, c.loc, mux_width, 2, 1);
        let sel = self.des.mux(mux).sel[0];
        self.des.connect(sel, ssig.pin(0));

        let mut w = 0usize;
        let mut flag = true;
        for idx in 0..nex_out.width() {
            let mut mux_bit = |low: &mut Self, d1, d0| {
                let p1 = low.des.mux(mux).data_pin(w, 1);
                let p0 = low.des.mux(mux).data_pin(w, 0);
                low.des.connect(p1, d1);
                low.des.connect(p0, d0);
                let res = low.des.mux(mux).result[w];
                low.des.connect(nex_out.pin(idx), res);
                w += 1;
            };
            match linkage(self.des, idx) {
                (true, true, _) => mux_bit(self, asig.pin(idx), bsig.pin(idx)),
                (true, false, true) => mux_bit(self, asig.pin(idx), accum.pin(idx)),
                (true, false, false) => {
                    if sync_flag {
                        mux_bit(self, asig.pin(idx), nex_map.pin(idx));
                    } else {
                        // A latch would be needed to hold the false-case
                        // value. There is no latch support; treat the
                        // bit as internal and connect it through.
                        diag::warning(
                            c.loc,
                            "conditional bit driven only by the true clause; no latch inferred",
                        );
                        self.des.connect(nex_out.pin(idx), asig.pin(idx));
                    }
                }
                (false, true, true) => mux_bit(self, accum.pin(idx), bsig.pin(idx)),
                (false, true, false) => {
                    if sync_flag {
                        mux_bit(self, nex_map.pin(idx), bsig.pin(idx));
                    } else {
                        diag::warning(
                            c.loc,
                            "conditional bit driven only by the false clause; no latch inferred",
                        );
                        self.des.connect(nex_out.pin(idx), bsig.pin(idx));
                    }
                }
                (false, false, true) => mux_bit(self, accum.pin(idx), accum.pin(idx)),
                (false, false, false) => {
                    if sync_flag {
                        self.des.connect(nex_out.pin(idx), nex_map.pin(idx));
                    } else {
                        diag::internal(self.des, c.loc, &SynthError::ConditBitUndriven);
                        flag = false;
                    }
                }
            }
        }

        flag
    }

    /// Case statement: build a mux over the varying selector bits, map
    /// guard values to mux inputs through the constant-bit compaction,
    /// and fill unguarded inputs from the default arm, the accumulator,
    /// or flip-flop feedback. Sparse cases divert to the one-hot form.
    pub(crate) fn case_async(
        &mut self,
        c: &Case,
        sync_flag: bool,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        accum: &SigVec,
    ) -> bool {
        let esig = c.selector.synthesize(self.des);
        let selmap = SelMap::scan(self.des, &esig);
        let sel_pins = selmap.sel_pins();

        let nondefault_items = c.items.iter().filter(|item| item.guard.is_some()).count();
        if nondefault_items < sel_pins {
            return self.case_async_1hot(
                c,
                sync_flag,
                nex_ff,
                nex_map,
                nex_out,
                accum,
                &esig,
                nondefault_items,
            );
        }

        if sel_pins > MAX_SEL_PINS {
            diag::error(self.des, c.loc, &SynthError::CaseSelectorTooWide(sel_pins));
            return false;
        }
        let size = 1usize << sel_pins;

        let mux = self
            .des
            .add_mux(self.scope, c.loc, nex_out.width(), size, sel_pins);
        for (cur, &pos) in selmap.varying_positions().iter().enumerate() {
            let spin = self.des.mux(mux).sel[cur];
            self.des.connect(spin, esig.pin(pos));
        }
        for idx in 0..nex_out.width() {
            let rpin = self.des.mux(mux).result[idx];
            self.des.connect(nex_out.pin(idx), rpin);
        }

        // Assign arm statements to mux inputs via the guard compaction.
        let mut statement_map: Vec<Option<&Stmt>> = vec![None; size];
        let mut default_statement: Option<&Stmt> = None;
        let mut return_flag = true;
        for item in &c.items {
            let Some(guard) = &item.guard else {
                default_statement = Some(&item.stmt);
                continue;
            };
            let Some(gval) = guard.as_const() else {
                diag::error(self.des, c.loc, &SynthError::CaseGuardNotConstant);
                return_flag = false;
                continue;
            };
            // A casex guard with x/z bits covers the cross product of 0/1
            // substitutions; the work stack expands one bit at a time.
            let mut gstack = vec![gval.clone()];
            while let Some(tmp) = gstack.pop() {
                if tmp.is_defined() || c.kind == CaseKind::Eq {
                    if !selmap.reachable(&tmp) {
                        continue;
                    }
                    statement_map[selmap.mux_input(&tmp)] = Some(&item.stmt);
                } else if c.kind == CaseKind::EqX {
                    let Some(pos) = tmp.first_undefined() else {
                        continue;
                    };
                    let mut tmp0 = tmp.clone();
                    tmp0.set(pos, Bit::Zero);
                    let mut tmp1 = tmp;
                    tmp1.set(pos, Bit::One);
                    gstack.push(tmp1);
                    gstack.push(tmp0);
                } else {
                    diag::error(self.des, c.loc, &SynthError::CasezUnsupported);
                    return false;
                }
            }
        }

        // Without an explicit default arm the accumulated input covers
        // the missing codes, provided all of it is driven.
        let mut default_sig: Option<SigVec> = None;
        if default_statement.is_none() && accum.fully_linked(self.des.nexa()) {
            default_sig = Some(accum.clone());
        }

        for item in 0..size {
            if statement_map[item].is_none() {
                if let Some(ds) = &default_sig {
                    for idx in 0..nex_out.width() {
                        let dpin = self.des.mux(mux).data_pin(idx, item);
                        self.des.connect(dpin, ds.pin(idx));
                    }
                    continue;
                }
            }

            let sig = SigVec::new(self.des.nexa_mut(), nex_map.width());

            // The first input with no statement consumes the default
            // arm; its result vector covers later misses.
            if statement_map[item].is_none() {
                if let Some(ds) = default_statement.take() {
                    statement_map[item] = Some(ds);
                    default_sig = Some(sig.clone());
                }
            }

            let Some(st) = statement_map[item] else {
                if sync_flag {
                    for idx in 0..nex_out.width() {
                        let dpin = self.des.mux(mux).data_pin(idx, item);
                        self.des.connect(dpin, nex_map.pin(idx));
                    }
                } else {
                    diag::error(self.des, c.loc, &SynthError::CaseItemMissing(item));
                    return_flag = false;
                }
                continue;
            };

            return_flag &= self.synth_async(st, sync_flag, nex_ff, nex_map, &sig, accum);
            for idx in 0..nex_out.width() {
                let dpin = self.des.mux(mux).data_pin(idx, item);
                if self.des.nexa().is_linked(sig.pin(idx)) {
                    self.des.connect(dpin, sig.pin(idx));
                } else if self.des.nexa().is_linked(accum.pin(idx)) {
                    self.des.connect(dpin, accum.pin(idx));
                } else if sync_flag {
                    self.des.connect(dpin, nex_map.pin(idx));
                }
                // Otherwise leave the input; the connectivity check
                // below decides whether that is an error.
            }
        }

        // Connectivity check: every output bit must see a driver on
        // every mux input.
        for wdx in 0..nex_out.width() {
            let mut linked_count = 0usize;
            let mut last_linked = 0usize;
            for item in 0..size {
                if self.des.nexa().is_linked(self.des.mux(mux).data_pin(wdx, item)) {
                    linked_count += 1;
                    last_linked = item;
                }
            }
            if linked_count == size {
                continue;
            }
            // A single driver usually means an internal value that is
            // not really an output; repeat it across all inputs so the
            // bit follows its expression regardless of the select.
            if linked_count == 1 {
                for item in 0..size {
                    if item == last_linked {
                        continue;
                    }
                    let src = self.des.mux(mux).data_pin(wdx, last_linked);
                    let dst = self.des.mux(mux).data_pin(wdx, item);
                    self.des.connect(dst, src);
                }
                continue;
            }
            if return_flag {
                diag::error(
                    self.des,
                    c.loc,
                    &SynthError::CaseOutputsMissing(last_linked),
                );
                return_flag = false;
            }
        }

        return_flag
    }

    /// Sparse case: one select line per live guard, each driven by a
    /// case-compare of the selector against the guard, AND-reduced. Data
    /// inputs sit at the one-hot codes `1 << i`; every other code takes
    /// the default.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn case_async_1hot(
        &mut self,
        c: &Case,
        sync_flag: bool,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        accum: &SigVec,
        esig: &SigVec,
        hot_items: usize,
    ) -> bool {
        let sel_pins = hot_items;
        if sel_pins > MAX_SEL_PINS {
            diag::error(self.des, c.loc, &SynthError::CaseSelectorTooWide(sel_pins));
            return false;
        }
        let size = 1usize << sel_pins;

        let mux = self
            .des
            .add_mux(self.scope, c.loc, nex_out.width(), size, sel_pins);
        for idx in 0..nex_out.width() {
            let rpin = self.des.mux(mux).result[idx];
            self.des.connect(nex_out.pin(idx), rpin);
        }

        let mut flag = true;
        let mut default_statement: Option<&Stmt> = None;
        let mut use_item = 0usize;
        for item in &c.items {
            let Some(guard) = &item.guard else {
                default_statement = Some(&item.stmt);
                continue;
            };
            let gsig = guard.synthesize(self.des);
            if gsig.width() != esig.width() {
                diag::internal(self.des, c.loc, &SynthError::CaseGuardNotConstant);
                return false;
            }

            // Bitwise case-compare of selector and guard, reduced to a
            // single select line.
            let reduc = self
                .des
                .add_gate(self.scope, c.loc, GateKind::And, esig.width());
            for idx in 0..esig.width() {
                let cmp = self.des.add_casecmp(self.scope, c.loc);
                let [out, a, b] = self.des.casecmp(cmp).pins;
                let gpin = self.des.gate(reduc).pins[1 + idx];
                self.des.connect(out, gpin);
                self.des.connect(a, esig.pin(idx));
                self.des.connect(b, gsig.pin(idx));
            }
            let spin = self.des.mux(mux).sel[use_item];
            let gout = self.des.gate(reduc).pins[0];
            self.des.connect(spin, gout);

            let item_sig = SigVec::new(self.des.nexa_mut(), nex_map.width());
            flag &= self.synth_async(&item.stmt, sync_flag, nex_ff, nex_map, &item_sig, accum);
            for idx in 0..item_sig.width() {
                let dpin = self.des.mux(mux).data_pin(idx, 1 << use_item);
                self.des.connect(dpin, item_sig.pin(idx));
            }
            use_item += 1;
        }
        debug_assert_eq!(use_item, hot_items);

        let mut default_sig: Option<SigVec> = None;
        if let Some(ds) = default_statement {
            let sig = SigVec::new(self.des.nexa_mut(), nex_map.width());
            flag &= self.synth_async(ds, sync_flag, nex_ff, nex_map, &sig, accum);
            default_sig = Some(sig);
        } else if accum.fully_linked(self.des.nexa()) {
            default_sig = Some(accum.clone());
        }
        if default_sig.is_none() && sync_flag {
            // Synchronous fallback: the flip-flop output holds its value
            // for unmatched selector codes.
            let sig = SigVec::new(self.des.nexa_mut(), nex_map.width());
            for idx in 0..sig.width() {
                self.des.connect(sig.pin(idx), nex_map.pin(idx));
            }
            default_sig = Some(sig);
        }
        let Some(default_sig) = default_sig else {
            diag::error(self.des, c.loc, &SynthError::CaseDefaultRequired);
            return false;
        };

        for item in 0..size {
            if item.count_ones() == 1 {
                continue;
            }
            for idx in 0..nex_out.width() {
                let dpin = self.des.mux(mux).data_pin(idx, item);
                self.des.connect(dpin, default_sig.pin(idx));
            }
        }

        flag
    }
}
