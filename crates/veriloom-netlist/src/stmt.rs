//! The behavioral statement tree attached to processes.
//!
//! Statements arrive from the elaborator as trees: blocks of sequential
//! statements, conditionals, case statements, event waits and
//! assignments. Synthesis walks these trees; the two queries it needs
//! from every statement are the set of nexa the statement *writes*
//! ([`Stmt::nex_output`]) and the set it *reads* ([`Stmt::nex_input`]).

use crate::design::{Design, MemoryId, NetId};
use crate::expr::Expr;
use crate::nexus::NexusSet;
use crate::Loc;

/// One fragment of an assignment target. A statement like
/// `{a, b[i]} = rhs` produces a chain of these.
#[derive(Debug, Clone)]
pub struct Lval {
    /// The target net, when the target is a plain signal or bit select.
    pub sig: Option<NetId>,
    /// Bit offset into the target.
    pub loff: usize,
    /// Number of bits written.
    pub lwidth: usize,
    /// Bit/word select expression, when the target is indexed.
    pub bmux: Option<Expr>,
    /// The target memory, when the target is a register array word.
    pub mem: Option<MemoryId>,
}

impl Lval {
    /// A plain full-width or part-select signal target.
    pub fn signal(sig: NetId, loff: usize, lwidth: usize) -> Self {
        Self {
            sig: Some(sig),
            loff,
            lwidth,
            bmux: None,
            mem: None,
        }
    }

    /// A dynamically indexed bit select of a signal.
    pub fn bit_select(sig: NetId, index: Expr) -> Self {
        Self {
            sig: Some(sig),
            loff: 0,
            lwidth: 1,
            bmux: Some(index),
            mem: None,
        }
    }

    /// An indexed word of a memory.
    pub fn memory(mem: MemoryId, index: Expr, lwidth: usize) -> Self {
        Self {
            sig: None,
            loff: 0,
            lwidth,
            bmux: Some(index),
            mem: Some(mem),
        }
    }
}

/// An assignment statement.
#[derive(Debug, Clone)]
pub struct Assign {
    /// Source location.
    pub loc: Loc,
    /// The l-value chain.
    pub lvals: Vec<Lval>,
    /// The r-value expression.
    pub rval: Expr,
}

/// A sequential `begin`/`end` block.
#[derive(Debug, Clone)]
pub struct Block {
    /// Source location.
    pub loc: Loc,
    /// Child statements in source order.
    pub stmts: Vec<Stmt>,
}

/// An `if`/`else` conditional. Either clause may be absent.
#[derive(Debug, Clone)]
pub struct Condit {
    /// Source location.
    pub loc: Loc,
    /// The condition expression.
    pub cond: Expr,
    /// The true clause.
    pub if_: Option<Box<Stmt>>,
    /// The false clause.
    pub else_: Option<Box<Stmt>>,
}

/// The comparison flavor of a case statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    /// Plain `case`: exact comparison.
    Eq,
    /// `casex`: `x`/`z` guard bits match anything.
    EqX,
    /// `casez`: `z` guard bits match anything.
    EqZ,
}

/// One arm of a case statement. A `None` guard is the default arm.
#[derive(Debug, Clone)]
pub struct CaseItem {
    /// The guard value, or `None` for the default arm.
    pub guard: Option<Expr>,
    /// The arm body.
    pub stmt: Stmt,
}

/// A case statement.
#[derive(Debug, Clone)]
pub struct Case {
    /// Source location.
    pub loc: Loc,
    /// Comparison flavor.
    pub kind: CaseKind,
    /// The selector expression.
    pub selector: Expr,
    /// The arms.
    pub items: Vec<CaseItem>,
}

/// The edge sensitivity of an event probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Level sensitivity (`@(*)` style).
    Any,
    /// Rising edge.
    Pos,
    /// Falling edge.
    Neg,
}

/// One probe of an event: a watched net and its edge.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// Edge sensitivity.
    pub edge: Edge,
    /// The watched net (one bit).
    pub sig: NetId,
}

/// The event of an event wait.
#[derive(Debug, Clone)]
pub struct Event {
    /// The probes, e.g. `posedge clk or posedge rst`.
    pub probes: Vec<Probe>,
}

/// An event wait wrapping a statement.
#[derive(Debug, Clone)]
pub struct EventWait {
    /// Source location.
    pub loc: Loc,
    /// The waited-for event.
    pub event: Event,
    /// The guarded statement.
    pub stmt: Box<Stmt>,
}

/// A while/for loop. Not synthesizable; kept so the diagnostic can name
/// its location.
#[derive(Debug, Clone)]
pub struct While {
    /// Source location.
    pub loc: Loc,
    /// The loop condition.
    pub cond: Expr,
    /// The loop body.
    pub stmt: Box<Stmt>,
}

/// A behavioral statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Assignment.
    Assign(Assign),
    /// Sequential block.
    Block(Block),
    /// Conditional.
    Condit(Condit),
    /// Case statement.
    Case(Case),
    /// Event wait.
    EventWait(EventWait),
    /// Loop.
    While(While),
}

impl Stmt {
    /// Source location of the statement.
    pub fn loc(&self) -> Loc {
        match self {
            Self::Assign(s) => s.loc,
            Self::Block(s) => s.loc,
            Self::Condit(s) => s.loc,
            Self::Case(s) => s.loc,
            Self::EventWait(s) => s.loc,
            Self::While(s) => s.loc,
        }
    }

    /// The ordered set of nexa this statement writes.
    ///
    /// Memory targets contribute the bits of the exploded array (the
    /// array is exploded here if it has not been already); bit-select
    /// targets contribute every bit of the selected signal, since the
    /// demux that implements them redrives the whole vector.
    pub fn nex_output(&self, des: &mut Design) -> NexusSet {
        let mut set = NexusSet::new();
        self.collect_outputs(des, &mut set);
        set
    }

    fn collect_outputs(&self, des: &mut Design, set: &mut NexusSet) {
        match self {
            Self::Assign(a) => {
                for lv in &a.lvals {
                    if let Some(mem) = lv.mem {
                        let msig = des.explode_memory(mem);
                        let net = des.net(msig);
                        for idx in 0..net.width() {
                            let pin = net.pin(idx);
                            set.add(des.nexa(), pin);
                        }
                    } else if let Some(sig) = lv.sig {
                        let net = des.net(sig);
                        let range = if lv.bmux.is_some() {
                            0..net.width()
                        } else {
                            lv.loff..lv.loff + lv.lwidth
                        };
                        let pins: Vec<_> = range.map(|idx| net.pin(idx)).collect();
                        for pin in pins {
                            set.add(des.nexa(), pin);
                        }
                    }
                }
            }
            Self::Block(b) => {
                for stmt in &b.stmts {
                    stmt.collect_outputs(des, set);
                }
            }
            Self::Condit(c) => {
                if let Some(stmt) = &c.if_ {
                    stmt.collect_outputs(des, set);
                }
                if let Some(stmt) = &c.else_ {
                    stmt.collect_outputs(des, set);
                }
            }
            Self::Case(c) => {
                for item in &c.items {
                    item.stmt.collect_outputs(des, set);
                }
            }
            Self::EventWait(ew) => ew.stmt.collect_outputs(des, set),
            Self::While(w) => w.stmt.collect_outputs(des, set),
        }
    }

    /// The set of nexa this statement reads.
    pub fn nex_input(&self, des: &Design) -> NexusSet {
        let mut set = NexusSet::new();
        self.collect_inputs(des, &mut set);
        set
    }

    fn collect_inputs(&self, des: &Design, set: &mut NexusSet) {
        match self {
            Self::Assign(a) => {
                set.add_all(des.nexa(), &a.rval.nex_input(des));
                for lv in &a.lvals {
                    if let Some(bmux) = &lv.bmux {
                        set.add_all(des.nexa(), &bmux.nex_input(des));
                    }
                }
            }
            Self::Block(b) => {
                for stmt in &b.stmts {
                    stmt.collect_inputs(des, set);
                }
            }
            Self::Condit(c) => {
                set.add_all(des.nexa(), &c.cond.nex_input(des));
                if let Some(stmt) = &c.if_ {
                    stmt.collect_inputs(des, set);
                }
                if let Some(stmt) = &c.else_ {
                    stmt.collect_inputs(des, set);
                }
            }
            Self::Case(c) => {
                set.add_all(des.nexa(), &c.selector.nex_input(des));
                for item in &c.items {
                    if let Some(guard) = &item.guard {
                        set.add_all(des.nexa(), &guard.nex_input(des));
                    }
                    item.stmt.collect_inputs(des, set);
                }
            }
            Self::EventWait(ew) => ew.stmt.collect_inputs(des, set),
            Self::While(w) => {
                set.add_all(des.nexa(), &w.cond.nex_input(des));
                w.stmt.collect_inputs(des, set);
            }
        }
    }
}
