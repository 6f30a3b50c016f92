//! Shared helpers for the synthesis integration tests.
//!
//! The tests build little elaborated designs by hand (a few nets, a
//! statement tree, a process), run the synthesis pass, and inspect the
//! devices left behind.

#![allow(dead_code)] // each test binary uses a different subset

use veriloom_netlist::{
    Assign, Design, Device, Dff, Edge, Event, EventWait, Expr, Loc, Lval, Mux, NetId, NetKind,
    NexusId, NodeId, Probe, ScopeId, Stmt,
};

/// A design under construction plus its single scope.
pub struct Fixture {
    pub des: Design,
    pub scope: ScopeId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut des = Design::new();
        let scope = des.new_scope("top");
        Self { des, scope }
    }

    /// An externally driven input signal.
    pub fn input(&mut self, name: &str, width: usize) -> NetId {
        let net = self.des.new_net(self.scope, name, NetKind::Wire, width);
        self.des.drive_external(net);
        net
    }

    /// A behavioral register (process output).
    pub fn reg(&mut self, name: &str, width: usize) -> NetId {
        self.des.new_net(self.scope, name, NetKind::Reg, width)
    }

    /// Wrap a statement in `always @(posedge clk [or posedge extra...])`
    /// and attach it as a process.
    pub fn sync_process(&mut self, clk: NetId, extra: &[NetId], stmt: Stmt) -> veriloom_netlist::ProcessId {
        let mut probes = vec![Probe { edge: Edge::Pos, sig: clk }];
        probes.extend(extra.iter().map(|&sig| Probe { edge: Edge::Pos, sig }));
        let wait = Stmt::EventWait(EventWait {
            loc: loc(1),
            event: Event { probes },
            stmt: Box::new(stmt),
        });
        self.des.add_process(self.scope, loc(1), wait)
    }

    /// Wrap a statement in a level-sensitive wait on `sens` and attach
    /// it as a process (the `always @(*)` shape).
    pub fn async_process(&mut self, sens: &[NetId], stmt: Stmt) -> veriloom_netlist::ProcessId {
        let probes = sens
            .iter()
            .map(|&sig| Probe { edge: Edge::Any, sig })
            .collect();
        let wait = Stmt::EventWait(EventWait {
            loc: loc(1),
            event: Event { probes },
            stmt: Box::new(stmt),
        });
        self.des.add_process(self.scope, loc(1), wait)
    }

    /// All flip-flop devices currently in the design.
    pub fn dffs(&self) -> Vec<(NodeId, &Dff)> {
        self.des
            .nodes()
            .filter_map(|(id, node)| match &node.device {
                Device::Dff(d) => Some((id, d)),
                _ => None,
            })
            .collect()
    }

    /// All mux devices currently in the design.
    pub fn muxes(&self) -> Vec<(NodeId, &Mux)> {
        self.des
            .nodes()
            .filter_map(|(id, node)| match &node.device {
                Device::Mux(m) => Some((id, m)),
                _ => None,
            })
            .collect()
    }

    /// Count the devices of each kind for structural assertions.
    pub fn device_counts(&self) -> DeviceCounts {
        let mut counts = DeviceCounts::default();
        for (_, node) in self.des.nodes() {
            match &node.device {
                Device::Dff(_) => counts.dff += 1,
                Device::Mux(_) => counts.mux += 1,
                Device::Demux(_) => counts.demux += 1,
                Device::Decode(_) => counts.decode += 1,
                Device::Gate(_) => counts.gate += 1,
                Device::CaseCmp(_) => counts.casecmp += 1,
            }
        }
        counts
    }

    /// Number of device output pins driving the class of `nex`.
    pub fn drivers_of(&self, nex: NexusId) -> usize {
        let mut count = 0;
        for (_, node) in self.des.nodes() {
            let outputs: Vec<NexusId> = match &node.device {
                Device::Dff(d) => d.q.clone(),
                Device::Mux(m) => m.result.clone(),
                Device::Demux(d) => d.q.clone(),
                Device::Gate(g) => vec![g.pins[0]],
                Device::CaseCmp(c) => vec![c.pins[0]],
                Device::Decode(_) => Vec::new(),
            };
            count += outputs
                .into_iter()
                .filter(|&pin| self.des.nexa().same(pin, nex))
                .count();
        }
        count
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeviceCounts {
    pub dff: usize,
    pub mux: usize,
    pub demux: usize,
    pub decode: usize,
    pub gate: usize,
    pub casecmp: usize,
}

pub fn loc(line: u32) -> Loc {
    Loc::line(line)
}

/// `target = source;` writing `width` bits from offset 0.
pub fn assign_w(line: u32, target: NetId, width: usize, source: NetId) -> Stmt {
    Stmt::Assign(Assign {
        loc: loc(line),
        lvals: vec![Lval::signal(target, 0, width)],
        rval: Expr::Signal(source),
    })
}

/// `target = constant;`
pub fn assign_const(line: u32, target: NetId, width: usize, value: &str) -> Stmt {
    Stmt::Assign(Assign {
        loc: loc(line),
        lvals: vec![Lval::signal(target, 0, width)],
        rval: Expr::Const(value.parse().unwrap()),
    })
}
