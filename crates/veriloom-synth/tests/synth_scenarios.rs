//! End-to-end synthesis scenarios: small behavioral processes lowered
//! to structural logic, with the produced devices checked bit by bit.

mod common;

use common::{assign_const, assign_w, loc, Fixture};
use veriloom_netlist::{
    Block, Case, CaseItem, CaseKind, Condit, Device, Expr, NetKind, Stmt,
};
use veriloom_synth::{synthesize, ATTR_SYNTHESIS_OFF};

/// `always @(*) if (s) y = a; else y = b;` with 4-bit data: one 2:1
/// mux, four bits wide, no flip-flop.
#[test]
fn comb_if_else_is_single_mux() {
    let mut f = Fixture::new();
    let s = f.input("s", 1);
    let a = f.input("a", 4);
    let b = f.input("b", 4);
    let y = f.reg("y", 4);

    let stmt = Stmt::Condit(Condit {
        loc: loc(2),
        cond: Expr::Signal(s),
        if_: Some(Box::new(assign_w(3, y, 4, a))),
        else_: Some(Box::new(assign_w(4, y, 4, b))),
    });
    let pid = f.async_process(&[s, a, b], stmt);

    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(!f.des.has_process(pid));

    let counts = f.device_counts();
    assert_eq!(counts.mux, 1);
    assert_eq!(counts.dff, 0);

    let muxes = f.muxes();
    let (_, mux) = muxes[0];
    assert_eq!(mux.width(), 4);
    assert_eq!(mux.size(), 2);
    assert!(f.des.nexa().same(mux.sel[0], f.des.net(s).pin(0)));
    for idx in 0..4 {
        assert!(f
            .des
            .nexa()
            .same(mux.data_pin(idx, 1), f.des.net(a).pin(idx)));
        assert!(f
            .des
            .nexa()
            .same(mux.data_pin(idx, 0), f.des.net(b).pin(idx)));
        // Exactly one driver per output bit.
        assert_eq!(f.drivers_of(f.des.net(y).pin(idx)), 1);
    }

    // The register is structurally driven now.
    assert_eq!(f.des.net(y).kind, NetKind::Wire);
}

/// `always @(posedge clk) q <= d;`: one DFF, clock wired, no control
/// lines inferred.
#[test]
fn basic_dff() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let d = f.input("d", 4);
    let q = f.reg("q", 4);

    let pid = f.sync_process(clk, &[], assign_w(2, q, 4, d));
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(!f.des.has_process(pid));

    let dffs = f.dffs();
    assert_eq!(dffs.len(), 1);
    let (id, dff) = dffs[0];
    assert_eq!(dff.width(), 4);
    assert!(f.des.nexa().same(dff.clock, f.des.net(clk).pin(0)));
    assert!(!f.des.nexa().is_linked(dff.enable));
    assert!(!f.des.nexa().is_linked(dff.aset));
    assert!(!f.des.nexa().is_linked(dff.aclr));
    assert!(!f.des.nexa().is_linked(dff.sset));
    assert!(!f.des.nexa().is_linked(dff.sclr));
    for idx in 0..4 {
        assert!(f.des.nexa().is_linked(dff.data[idx]));
        assert!(f.des.nexa().same(dff.data[idx], f.des.net(d).pin(idx)));
        assert!(f.des.nexa().same(dff.q[idx], f.des.net(q).pin(idx)));
    }
    assert_eq!(f.des.node(id).attribute("lpm_fftype"), Some("DFF"));
}

/// `always @(posedge clk or posedge rst) if (rst) q <= 0; else q <= d;`:
/// the reset edge becomes an asynchronous clear.
#[test]
fn async_reset_infers_aclr() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let rst = f.input("rst", 1);
    let d = f.input("d", 4);
    let q = f.reg("q", 4);

    let stmt = Stmt::Condit(Condit {
        loc: loc(2),
        cond: Expr::Signal(rst),
        if_: Some(Box::new(assign_const(3, q, 4, "0000"))),
        else_: Some(Box::new(assign_w(4, q, 4, d))),
    });
    let pid = f.sync_process(clk, &[rst], stmt);
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(!f.des.has_process(pid));

    let dffs = f.dffs();
    assert_eq!(dffs.len(), 1);
    let (_, dff) = dffs[0];
    // All-zero reset pattern lands on Aclr, not Aset.
    assert!(f.des.nexa().same(dff.aclr, f.des.net(rst).pin(0)));
    assert!(!f.des.nexa().is_linked(dff.aset));
    for idx in 0..4 {
        assert!(f.des.nexa().same(dff.data[idx], f.des.net(d).pin(idx)));
    }
}

/// As above but `q <= 4'b10zz`: the z bits carry no reset, so the bank
/// splits into a 2-bit flip-flop with Aset value `10` and a 2-bit
/// flip-flop with no set/clear at all.
#[test]
fn partial_async_set_splits_bank() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let rst = f.input("rst", 1);
    let d = f.input("d", 4);
    let q = f.reg("q", 4);

    let stmt = Stmt::Condit(Condit {
        loc: loc(2),
        cond: Expr::Signal(rst),
        if_: Some(Box::new(assign_const(3, q, 4, "10zz"))),
        else_: Some(Box::new(assign_w(4, q, 4, d))),
    });
    let pid = f.sync_process(clk, &[rst], stmt);
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(!f.des.has_process(pid));

    let dffs = f.dffs();
    assert_eq!(dffs.len(), 2);

    let set_half = dffs
        .iter()
        .find(|(_, dff)| f.des.nexa().is_linked(dff.aset))
        .expect("one half carries the set");
    let free_half = dffs
        .iter()
        .find(|(_, dff)| !f.des.nexa().is_linked(dff.aset))
        .expect("one half is uncontrolled");

    assert_eq!(set_half.1.width(), 2);
    assert_eq!(set_half.1.aset_value.to_string(), "10");
    assert!(f.des.nexa().same(set_half.1.aset, f.des.net(rst).pin(0)));

    assert_eq!(free_half.1.width(), 2);
    assert!(!f.des.nexa().is_linked(free_half.1.aclr));

    // Both halves share the clock, and the high bits stayed with the
    // reset half.
    assert!(f.des.nexa().same(set_half.1.clock, f.des.net(clk).pin(0)));
    assert!(f.des.nexa().same(free_half.1.clock, f.des.net(clk).pin(0)));
    assert!(f.des.nexa().same(set_half.1.q[0], f.des.net(q).pin(2)));
    assert!(f.des.nexa().same(free_half.1.q[0], f.des.net(q).pin(0)));
}

/// `always @(posedge clk) if (a) if (b) q <= d;`: nested enables
/// collapse into one DFF whose Enable is AND(a, b).
#[test]
fn nested_enables_stack_through_and() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let a = f.input("a", 1);
    let b = f.input("b", 1);
    let d = f.input("d", 4);
    let q = f.reg("q", 4);

    let inner = Stmt::Condit(Condit {
        loc: loc(3),
        cond: Expr::Signal(b),
        if_: Some(Box::new(assign_w(4, q, 4, d))),
        else_: None,
    });
    let outer = Stmt::Condit(Condit {
        loc: loc(2),
        cond: Expr::Signal(a),
        if_: Some(Box::new(inner)),
        else_: None,
    });
    let pid = f.sync_process(clk, &[], outer);
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(!f.des.has_process(pid));

    let counts = f.device_counts();
    assert_eq!(counts.dff, 1);
    assert_eq!(counts.gate, 1);

    let dffs = f.dffs();
    let (_, dff) = dffs[0];
    // The enable comes from the AND of both conditions.
    let gate = f
        .des
        .nodes()
        .find_map(|(id, node)| match &node.device {
            Device::Gate(_) => Some(id),
            _ => None,
        })
        .unwrap();
    let gate = f.des.gate(gate);
    assert!(f.des.nexa().same(dff.enable, gate.pins[0]));
    let in_a = f.des.nexa().same(gate.pins[1], f.des.net(a).pin(0))
        || f.des.nexa().same(gate.pins[2], f.des.net(a).pin(0));
    let in_b = f.des.nexa().same(gate.pins[1], f.des.net(b).pin(0))
        || f.des.nexa().same(gate.pins[2], f.des.net(b).pin(0));
    assert!(in_a && in_b);
    for idx in 0..4 {
        assert!(f.des.nexa().same(dff.data[idx], f.des.net(d).pin(idx)));
    }
}

/// A sparse case (two arms, three varying selector bits) under a clock
/// lowers to a one-hot mux: one select line per arm, each fed by an
/// AND-reduced bank of case comparators.
#[test]
fn sparse_case_uses_one_hot_mux() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let s = f.input("s", 3);
    let x1 = f.input("x1", 4);
    let x2 = f.input("x2", 4);
    let y = f.reg("y", 4);

    let stmt = Stmt::Case(Case {
        loc: loc(2),
        kind: CaseKind::Eq,
        selector: Expr::Signal(s),
        items: vec![
            CaseItem {
                guard: Some(Expr::Const("001".parse().unwrap())),
                stmt: assign_w(3, y, 4, x1),
            },
            CaseItem {
                guard: Some(Expr::Const("010".parse().unwrap())),
                stmt: assign_w(4, y, 4, x2),
            },
        ],
    });
    let pid = f.sync_process(clk, &[], stmt);
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(!f.des.has_process(pid));

    let counts = f.device_counts();
    assert_eq!(counts.mux, 1);
    // One comparator per selector bit per arm, one AND per arm.
    assert_eq!(counts.casecmp, 6);
    assert_eq!(counts.gate, 2);
    assert_eq!(counts.dff, 1);

    let muxes = f.muxes();
    let (_, mux) = muxes[0];
    // Two one-hot select lines, four data codes.
    assert_eq!(mux.sel.len(), 2);
    assert_eq!(mux.size(), 4);
    // The arm data sits at the one-hot codes.
    for idx in 0..4 {
        assert!(f
            .des
            .nexa()
            .same(mux.data_pin(idx, 0b01), f.des.net(x1).pin(idx)));
        assert!(f
            .des
            .nexa()
            .same(mux.data_pin(idx, 0b10), f.des.net(x2).pin(idx)));
    }
}

/// `always @(*) begin y = a; if (c) y = b; end`: the accumulator makes
/// the later conditional override the earlier assignment, producing
/// `c ? b : a`.
#[test]
fn block_accumulator_preserves_override_order() {
    let mut f = Fixture::new();
    let c = f.input("c", 1);
    let a = f.input("a", 4);
    let b = f.input("b", 4);
    let y = f.reg("y", 4);

    let stmt = Stmt::Block(Block {
        loc: loc(2),
        stmts: vec![
            assign_w(3, y, 4, a),
            Stmt::Condit(Condit {
                loc: loc(4),
                cond: Expr::Signal(c),
                if_: Some(Box::new(assign_w(5, y, 4, b))),
                else_: None,
            }),
        ],
    });
    let pid = f.async_process(&[c, a, b], stmt);
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(!f.des.has_process(pid));

    let counts = f.device_counts();
    assert_eq!(counts.mux, 1);
    assert_eq!(counts.dff, 0);

    let muxes = f.muxes();
    let (_, mux) = muxes[0];
    assert!(f.des.nexa().same(mux.sel[0], f.des.net(c).pin(0)));
    for idx in 0..4 {
        // True side: the overriding assignment. False side: the
        // accumulated earlier value.
        assert!(f
            .des
            .nexa()
            .same(mux.data_pin(idx, 1), f.des.net(b).pin(idx)));
        assert!(f
            .des
            .nexa()
            .same(mux.data_pin(idx, 0), f.des.net(a).pin(idx)));
        assert_eq!(f.drivers_of(f.des.net(y).pin(idx)), 1);
    }
}

/// A casex guard with an x bit covers both substitutions of that bit.
#[test]
fn casex_guard_expands_wildcards() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let s = f.input("s", 2);
    let x0 = f.input("x0", 1);
    let x1 = f.input("x1", 1);
    let xd = f.input("xd", 1);
    let y = f.reg("y", 1);

    let stmt = Stmt::Case(Case {
        loc: loc(2),
        kind: CaseKind::EqX,
        selector: Expr::Signal(s),
        items: vec![
            CaseItem {
                guard: Some(Expr::Const("1x".parse().unwrap())),
                stmt: assign_w(3, y, 1, x1),
            },
            CaseItem {
                guard: Some(Expr::Const("00".parse().unwrap())),
                stmt: assign_w(4, y, 1, x0),
            },
            CaseItem {
                guard: None,
                stmt: assign_w(5, y, 1, xd),
            },
        ],
    });
    let pid = f.sync_process(clk, &[], stmt);
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(!f.des.has_process(pid));

    let muxes = f.muxes();
    assert_eq!(muxes.len(), 1);
    let (_, mux) = muxes[0];
    assert_eq!(mux.size(), 4);
    // Codes 10 and 11 take the wildcard arm, 00 the exact arm, 01 the
    // default arm.
    assert!(f.des.nexa().same(mux.data_pin(0, 0b10), f.des.net(x1).pin(0)));
    assert!(f.des.nexa().same(mux.data_pin(0, 0b11), f.des.net(x1).pin(0)));
    assert!(f.des.nexa().same(mux.data_pin(0, 0b00), f.des.net(x0).pin(0)));
    assert!(f.des.nexa().same(mux.data_pin(0, 0b01), f.des.net(xd).pin(0)));
}

/// A process carrying the opt-out attribute is left completely alone.
#[test]
fn synthesis_off_is_respected() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let d = f.input("d", 1);
    let q = f.reg("q", 1);

    let pid = f.sync_process(clk, &[], assign_w(2, q, 1, d));
    f.des.set_process_attribute(pid, ATTR_SYNTHESIS_OFF, "1");
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    assert!(f.des.has_process(pid));
    assert_eq!(f.des.nodes().count(), 0);
    assert_eq!(f.des.net(q).kind, NetKind::Reg);
}

/// A negative-edge clock is recorded as an inverted-clock attribute on
/// the flip-flop.
#[test]
fn negedge_clock_sets_polarity_attribute() {
    let mut f = Fixture::new();
    let clk = f.input("clk", 1);
    let d = f.input("d", 1);
    let q = f.reg("q", 1);

    let wait = Stmt::EventWait(veriloom_netlist::EventWait {
        loc: loc(1),
        event: veriloom_netlist::Event {
            probes: vec![veriloom_netlist::Probe {
                edge: veriloom_netlist::Edge::Neg,
                sig: clk,
            }],
        },
        stmt: Box::new(assign_w(2, q, 1, d)),
    });
    f.des.add_process(f.scope, loc(1), wait);
    synthesize(&mut f.des);

    assert_eq!(f.des.errors, 0);
    let dffs = f.dffs();
    assert_eq!(dffs.len(), 1);
    let id = dffs[0].0;
    assert_eq!(f.des.node(id).attribute("clock_polarity"), Some("INVERT"));
}
