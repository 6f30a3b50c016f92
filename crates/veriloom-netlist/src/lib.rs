//! Elaborated netlist substrate for the veriloom synthesis passes.
//!
//! This crate holds the data model that behavioral-to-structural
//! synthesis operates on:
//!
//! - Four-state logic values and arbitrary-width bit vectors ([`Bits`])
//! - The nexus arena: electrical equivalence classes over pins, with
//!   union-find linkage ([`NexusArena`])
//! - Nets, transient signal vectors, memories and expressions
//! - The behavioral statement tree attached to processes ([`Stmt`])
//! - Primitive structural devices (DFF, MUX, DEMUX, DECODE, gates,
//!   case comparators) and the [`Design`] container that owns them
//!
//! # Example
//!
//! ```
//! use veriloom_netlist::{Design, NetKind};
//!
//! let mut des = Design::new();
//! let scope = des.new_scope("top");
//! let a = des.new_net(scope, "a", NetKind::Wire, 4);
//! let b = des.new_net(scope, "b", NetKind::Wire, 4);
//!
//! // Joining pins makes them electrically identical.
//! let (pa, pb) = (des.net(a).pin(0), des.net(b).pin(0));
//! des.connect(pa, pb);
//! assert!(des.nexa().same(pa, pb));
//! ```

#![warn(missing_docs)]

mod bits;
mod design;
mod device;
mod expr;
mod memory;
mod net;
mod nexus;
mod stmt;

pub use bits::{Bit, Bits, ParseBitsError};
pub use design::{Design, MemoryId, NetId, NodeId, Process, ProcessId, Scope, ScopeId};
pub use device::{CaseCmp, Decode, Demux, Device, Dff, Gate, GateKind, Mux, Node};
pub use expr::Expr;
pub use memory::Memory;
pub use net::{Net, NetFlags, NetKind, SigVec};
pub use nexus::{NexusArena, NexusId, NexusSet};
pub use stmt::{
    Assign, Block, Case, CaseItem, CaseKind, Condit, Edge, Event, EventWait, Lval, Probe, Stmt,
    While,
};

use std::fmt;

/// A source location carried by statements, processes and synthesized
/// devices, used to anchor diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
    /// One-based source line.
    pub line: u32,
}

impl Loc {
    /// A location at the given line.
    pub const fn line(line: u32) -> Self {
        Self { line }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.line)
    }
}
