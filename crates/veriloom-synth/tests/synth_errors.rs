//! Failure paths: unsupported constructs and structural mismatches must
//! bump the design error counter and leave the process in place.

mod common;

use common::{assign_w, loc, Fixture};
use veriloom_netlist::{
    Assign, Case, CaseItem, CaseKind, Condit, Expr, Lval, NetKind, Stmt, While,
};
use veriloom_synth::synthesize;

/// Loops cannot be synthesized.
#[test]
fn loop_is_rejected() {
    let mut f = Fixture::new();
    let c = f.input("c", 1);
    let d = f.input("d", 1);
    let q = f.reg("q", 1);

    let stmt = Stmt::While(While {
        loc: loc(2),
        cond: Expr::Signal(c),
        stmt: Box::new(assign_w(3, q, 1, d)),
    });
    let pid = f.async_process(&[c, d], stmt);
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
    assert!(f.des.has_process(pid));
    // The failed process leaves its register alone.
    assert_eq!(f.des.net(q).kind, NetKind::Reg);
}

/// Memory word assignment is only workable under a clock.
#[test]
fn memory_assign_in_async_is_rejected() {
    let mut f = Fixture::new();
    let adr = f.input("adr", 2);
    let d = f.input("d", 8);
    let mem = f.des.new_memory(f.scope, "ram", 8, 4);

    let stmt = Stmt::Assign(Assign {
        loc: loc(2),
        lvals: vec![Lval::memory(mem, Expr::Signal(adr), 8)],
        rval: Expr::Signal(d),
    });
    let pid = f.async_process(&[adr, d], stmt);
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
    assert!(f.des.has_process(pid));
}

/// Bit-select assignment is only workable under a clock.
#[test]
fn bit_select_in_async_is_rejected() {
    let mut f = Fixture::new();
    let i = f.input("i", 2);
    let d = f.input("d", 1);
    let q = f.reg("q", 4);

    let stmt = Stmt::Assign(Assign {
        loc: loc(2),
        lvals: vec![Lval::bit_select(q, Expr::Signal(i))],
        rval: Expr::Signal(d),
    });
    let pid = f.async_process(&[i, d], stmt);
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
    assert!(f.des.has_process(pid));
}

/// A combinational `if` with no `else` and no earlier assignment would
/// need a latch for the untaken side.
#[test]
fn async_if_without_else_is_rejected() {
    let mut f = Fixture::new();
    let c = f.input("c", 1);
    let a = f.input("a", 1);
    let y = f.reg("y", 1);

    let stmt = Stmt::Condit(Condit {
        loc: loc(2),
        cond: Expr::Signal(c),
        if_: Some(Box::new(assign_w(3, y, 1, a))),
        else_: None,
    });
    let pid = f.async_process(&[c, a], stmt);
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
    assert!(f.des.has_process(pid));
}

/// casez guards are not supported.
#[test]
fn casez_is_rejected() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let s = f.input("s", 2);
    let a = f.input("a", 1);
    let b = f.input("b", 1);
    let y = f.reg("y", 1);

    let stmt = Stmt::Case(Case {
        loc: loc(2),
        kind: CaseKind::EqZ,
        selector: Expr::Signal(s),
        items: vec![
            CaseItem {
                guard: Some(Expr::Const("1z".parse().unwrap())),
                stmt: assign_w(3, y, 1, a),
            },
            CaseItem {
                guard: Some(Expr::Const("0z".parse().unwrap())),
                stmt: assign_w(4, y, 1, b),
            },
        ],
    });
    let pid = f.sync_process(clk, &[], stmt);
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
    assert!(f.des.has_process(pid));
}

/// A combinational case that covers only some selector values and has
/// no default is missing drivers.
#[test]
fn incomplete_case_without_default_is_rejected() {
    let mut f = Fixture::new();
    let s = f.input("s", 1);
    let a = f.input("a", 1);
    let y = f.reg("y", 1);

    let stmt = Stmt::Case(Case {
        loc: loc(2),
        kind: CaseKind::Eq,
        selector: Expr::Signal(s),
        items: vec![CaseItem {
            guard: Some(Expr::Const("1".parse().unwrap())),
            stmt: assign_w(3, y, 1, a),
        }],
    });
    let pid = f.async_process(&[s, a], stmt);
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
    assert!(f.des.has_process(pid));
}

/// A condition that reads both an edge probe and an ordinary signal
/// mixes synchronous and asynchronous inputs.
#[test]
fn mixed_sync_async_condition_is_reported() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let d = f.input("d", 1);
    let q = f.reg("q", 1);

    // A 2-bit condition net whose low bit is the probed reset and whose
    // high bit is an ordinary signal.
    let wide = f.input("rst_wide", 2);
    let rst = f.des.new_net(f.scope, "rst", NetKind::Wire, 1);
    let (wp, rp) = (f.des.net(wide).pin(0), f.des.net(rst).pin(0));
    f.des.connect(wp, rp);

    let stmt = Stmt::Condit(Condit {
        loc: loc(2),
        cond: Expr::Signal(wide),
        if_: Some(Box::new(common::assign_const(3, q, 1, "0"))),
        else_: Some(Box::new(assign_w(4, q, 1, d))),
    });
    f.sync_process(clk, &[rst], stmt);
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
}

/// A constant memory index beyond the array is reported and skipped.
#[test]
fn memory_address_out_of_range_is_rejected() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let d = f.input("d", 8);
    let mem = f.des.new_memory(f.scope, "ram", 8, 4);

    let stmt = Stmt::Assign(Assign {
        loc: loc(2),
        lvals: vec![Lval::memory(mem, Expr::Const("1001".parse().unwrap()), 8)],
        rval: Expr::Signal(d),
    });
    let pid = f.sync_process(clk, &[], stmt);
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
    assert!(f.des.has_process(pid));
}

/// Two probes that the body never reads cannot both be the clock.
#[test]
fn two_clock_candidates_are_reported() {
    let mut f = Fixture::new();
    let clk1 = f.input("clk1", 1);
    let clk2 = f.input("clk2", 1);
    let d = f.input("d", 1);
    let q = f.reg("q", 1);

    f.sync_process(clk1, &[clk2], assign_w(2, q, 1, d));
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
}

/// When every probe is read by the body, no probe qualifies as clock.
#[test]
fn no_clock_candidate_is_rejected() {
    let mut f = Fixture::new();
    let d = f.input("d", 1);
    let q = f.reg("q", 1);

    let pid = f.sync_process(d, &[], assign_w(2, q, 1, d));
    synthesize(&mut f.des);

    assert!(f.des.errors > 0);
    assert!(f.des.has_process(pid));
}
