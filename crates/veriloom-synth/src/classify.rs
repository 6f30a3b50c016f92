//! Per-process classification and dispatch.
//!
//! Each process is inspected once: edge-triggered processes go through
//! synchronous lowering, combinational processes through asynchronous
//! lowering, and anything else is left in place with a warning (or an
//! error, when an attribute promised synthesizability the shape does
//! not deliver). A successfully synthesized process is deleted from the
//! design; a failed one stays, with the error counter bumped.

use veriloom_netlist::{Design, ProcessId};

use crate::diag::{self, SynthError};
use crate::lower::Lowering;

/// Attribute that opts a process out of synthesis.
pub const ATTR_SYNTHESIS_OFF: &str = "synthesis_off";
/// Scope attribute marking a hand-instantiated cell; its processes are
/// left alone.
pub const ATTR_SYNTHESIS_CELL: &str = "synthesis_cell";
/// Attribute asserting the process is combinational.
pub const ATTR_COMBINATIONAL: &str = "combinational";
/// Attribute demanding the process be synthesized.
pub const ATTR_SYNTHESIS_ON: &str = "synthesis_on";

/// Design flag holding the debug verbosity for this pass.
pub const FLAG_SYNTH_DEBUG: &str = "synth-debug";

fn attr_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty() && v != "0")
}

/// Synthesize every eligible process of the design.
///
/// Diagnostics go to stderr; the number of failures is reflected in
/// `des.errors`.
pub fn synthesize(des: &mut Design) {
    let debug: u32 = des.get_flag(FLAG_SYNTH_DEBUG).parse().unwrap_or(0);
    for pid in des.process_ids() {
        process_one(des, debug, pid);
    }
}

fn process_one(des: &mut Design, debug: u32, pid: ProcessId) {
    let proc = des.process(pid);
    if attr_truthy(proc.attribute(ATTR_SYNTHESIS_OFF)) {
        return;
    }
    let scope = proc.scope;
    if des
        .scope_attribute(scope, ATTR_SYNTHESIS_CELL)
        .is_some_and(|v| !v.is_empty())
    {
        return;
    }
    let loc = proc.loc;

    if des.process(pid).is_synchronous() {
        let stmt = des.process(pid).stmt.clone();
        let ok = Lowering::new(des, scope, debug).synth_sync_top(&stmt, loc);
        if !ok {
            diag::error(des, loc, &SynthError::SyncProcessFailed);
            des.finish_wire_marks(false);
            return;
        }
        des.finish_wire_marks(true);
        des.delete_process(pid);
        return;
    }

    if !des.process(pid).is_asynchronous(des) {
        let proc = des.process(pid);
        let combinational = attr_truthy(proc.attribute(ATTR_COMBINATIONAL));
        let demanded = attr_truthy(proc.attribute(ATTR_SYNTHESIS_ON));
        if combinational {
            diag::error(des, loc, &SynthError::NotCombinational);
        }
        if demanded {
            diag::error(des, loc, &SynthError::SynthesisRequired);
        }
        if !combinational && !demanded {
            diag::warning(loc, "process not synthesized");
        }
        return;
    }

    let stmt = des.process(pid).stmt.clone();
    let ok = Lowering::new(des, scope, debug).synth_async_top(&stmt);
    if !ok {
        diag::error(des, loc, &SynthError::AsyncProcessFailed);
        des.finish_wire_marks(false);
        return;
    }
    des.finish_wire_marks(true);
    des.delete_process(pid);
}
