//! Behavioral-to-structural process synthesis.
//!
//! This crate rewrites the synthesizable processes of an elaborated
//! [`veriloom_netlist::Design`] into structural logic: multiplexers,
//! write-port demuxes, address decoders, D-type flip-flop banks and
//! gates, all wired through the existing nexa. Combinational processes
//! become pure gate networks; edge-triggered processes get a flip-flop
//! bank with inferred clock, enable and set/reset lines, sliced and
//! merged as coverage is discovered.
//!
//! The entry point is [`synthesize`], which classifies every process,
//! runs the appropriate lowering, and deletes each process it fully
//! replaced. Failures leave the process in place and bump the design
//! error counter; diagnostics go to stderr.
//!
//! # Example
//!
//! ```
//! use veriloom_netlist::{Design, Expr, NetKind, Stmt, Loc};
//! use veriloom_netlist::{Assign, Event, EventWait, Lval, Probe, Edge};
//!
//! // always @(posedge clk) q <= d;
//! let mut des = Design::new();
//! let scope = des.new_scope("top");
//! let clk = des.new_net(scope, "clk", NetKind::Wire, 1);
//! let d = des.new_net(scope, "d", NetKind::Wire, 1);
//! let q = des.new_net(scope, "q", NetKind::Reg, 1);
//! des.drive_external(clk);
//! des.drive_external(d);
//!
//! let stmt = Stmt::EventWait(EventWait {
//!     loc: Loc::line(1),
//!     event: Event { probes: vec![Probe { edge: Edge::Pos, sig: clk }] },
//!     stmt: Box::new(Stmt::Assign(Assign {
//!         loc: Loc::line(1),
//!         lvals: vec![Lval::signal(q, 0, 1)],
//!         rval: Expr::Signal(d),
//!     })),
//! });
//! des.add_process(scope, Loc::line(1), stmt);
//!
//! veriloom_synth::synthesize(&mut des);
//! assert_eq!(des.errors, 0);
//! ```

#![warn(missing_docs)]

mod classify;
mod diag;
mod ff_bank;
mod lower;
mod lower_async;
mod lower_sync;
mod selmap;

pub use classify::{
    synthesize, ATTR_COMBINATIONAL, ATTR_SYNTHESIS_CELL, ATTR_SYNTHESIS_OFF, ATTR_SYNTHESIS_ON,
    FLAG_SYNTH_DEBUG,
};
pub use diag::SynthError;
