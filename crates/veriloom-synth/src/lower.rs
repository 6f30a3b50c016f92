//! Shared lowering state and statement dispatch.
//!
//! One [`Lowering`] exists per process under synthesis. It carries the
//! design being mutated, the scope devices are created in, and the debug
//! verbosity read off the design flags. Statement dispatch matches on
//! the statement variant and forwards to the per-variant routines in
//! `lower_async` and `lower_sync`.

use veriloom_netlist::{Design, Loc, NodeId, Probe, ScopeId, SigVec, Stmt};

use crate::diag::{self, SynthError};
use crate::ff_bank::FfCell;

fn stmt_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Assign(_) => "assign",
        Stmt::Block(_) => "block",
        Stmt::Condit(_) => "condit",
        Stmt::Case(_) => "case",
        Stmt::EventWait(_) => "event wait",
        Stmt::While(_) => "while",
    }
}

/// Per-process lowering context.
pub(crate) struct Lowering<'d> {
    /// The design under mutation.
    pub des: &'d mut Design,
    /// The scope synthesized devices are created in.
    pub scope: ScopeId,
    /// Debug verbosity from the `synth-debug` design flag.
    pub debug: u32,
}

impl<'d> Lowering<'d> {
    pub fn new(des: &'d mut Design, scope: ScopeId, debug: u32) -> Self {
        Self { des, scope, debug }
    }

    /// Create a flip-flop bank tagged for downstream passes.
    pub fn new_dff(&mut self, loc: Loc, width: usize) -> NodeId {
        let ff = self.des.add_dff(self.scope, loc, width);
        self.des.node_mut(ff).set_attribute("lpm_fftype", "DFF");
        ff
    }

    /// Drop a frame-local signal vector, detaching its pins from their
    /// nexa. Synthesis leans on this: a pin that was only held alive by
    /// a released vector must read as unlinked again.
    pub fn release_sig(&mut self, sig: SigVec) {
        for idx in 0..sig.width() {
            self.des.nexa_mut().unlink(sig.pin(idx));
        }
    }

    /// Lower a statement to combinational logic.
    ///
    /// On success every output bit the statement writes is connected
    /// into the matching position of `nex_out`; `nex_map` identifies
    /// those positions by nexus, and `accum` supplies the values driven
    /// by earlier statements of an enclosing block. `sync_flag` is set
    /// when this runs under synchronous lowering, which permits feedback
    /// from `nex_map` (the flip-flop outputs) where a combinational
    /// process would have to fail.
    pub fn synth_async(
        &mut self,
        stmt: &Stmt,
        sync_flag: bool,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        accum: &SigVec,
    ) -> bool {
        if self.debug > 0 {
            log::debug!(
                "{}: {} synthesis of {} statement",
                stmt.loc(),
                if sync_flag { "sync" } else { "async" },
                stmt_kind(stmt)
            );
        }
        match stmt {
            Stmt::Assign(a) => self.assign_async(a, sync_flag, nex_ff, nex_map, nex_out),
            Stmt::Block(b) => self.block_async(b, sync_flag, nex_ff, nex_map, nex_out, accum),
            Stmt::Condit(c) => self.condit_async(c, sync_flag, nex_ff, nex_map, nex_out, accum),
            Stmt::Case(c) => self.case_async(c, sync_flag, nex_ff, nex_map, nex_out, accum),
            Stmt::EventWait(ew) => {
                self.synth_async(&ew.stmt, sync_flag, nex_ff, nex_map, nex_out, accum)
            }
            Stmt::While(w) => {
                diag::error(self.des, w.loc, &SynthError::LoopInProcess);
                false
            }
        }
    }

    /// [`Self::synth_async`] with an unconnected stub for the
    /// accumulator, for callers that have no earlier-sibling values to
    /// offer.
    pub fn synth_async_noaccum(
        &mut self,
        stmt: &Stmt,
        sync_flag: bool,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
    ) -> bool {
        let stub = SigVec::new(self.des.nexa_mut(), nex_out.width());
        let flag = self.synth_async(stmt, sync_flag, nex_ff, nex_map, nex_out, &stub);
        self.release_sig(stub);
        flag
    }

    /// Lower a statement under an edge-triggered process: wire the
    /// flip-flop bank recorded in `nex_ff` and feed its data inputs.
    /// `events` carries the edge probes not yet consumed as clock or
    /// asynchronous set/reset.
    pub fn synth_sync(
        &mut self,
        stmt: &Stmt,
        nex_ff: &mut [FfCell],
        nex_map: &SigVec,
        nex_out: &SigVec,
        events: &[Probe],
    ) -> bool {
        if self.debug > 0 {
            log::debug!(
                "{}: sync synthesis, {} pending probe(s)",
                stmt.loc(),
                events.len()
            );
        }
        match stmt {
            Stmt::Assign(a) => self.assign_sync(stmt, a, nex_ff, nex_map, nex_out),
            Stmt::Block(b) => self.block_sync(b, nex_ff, nex_map, nex_out, events),
            Stmt::Condit(c) => self.condit_sync(stmt, c, nex_ff, nex_map, nex_out, events),
            Stmt::EventWait(ew) => self.evwait_sync(ew, nex_ff, nex_map, nex_out, events),
            _ => self.synth_async_noaccum(stmt, true, nex_ff, nex_map, nex_out),
        }
    }
}
