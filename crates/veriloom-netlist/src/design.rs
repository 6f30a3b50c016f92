//! The design container.
//!
//! A [`Design`] owns everything the elaborator produced (scopes, nets,
//! memories, processes) plus everything synthesis adds: device nodes
//! and the error counter. Synthesis passes mutate the design in place;
//! device nodes are added with the `add_*` constructors and removed with
//! [`Design::delete_node`] when slicing supersedes them.

use std::collections::HashMap;

use crate::bits::Bit;
use crate::device::{CaseCmp, Decode, Demux, Device, Dff, Gate, GateKind, Mux, Node};
use crate::memory::Memory;
use crate::net::{Net, NetFlags, NetKind};
use crate::nexus::{NexusArena, NexusId};
use crate::stmt::{Edge, Stmt};
use crate::Loc;

macro_rules! ids {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(u32);
        )*
    };
}

ids! {
    /// Handle to a net in the design.
    NetId,
    /// Handle to a device node in the design.
    NodeId,
    /// Handle to a memory in the design.
    MemoryId,
    /// Handle to a scope in the design.
    ScopeId,
    /// Handle to a process in the design.
    ProcessId,
}

/// A named scope with attributes.
#[derive(Debug)]
pub struct Scope {
    /// Scope name.
    pub name: String,
    attributes: HashMap<String, String>,
    symbol_counter: u32,
}

/// A behavioral process: a statement tree attached to a scope.
#[derive(Debug)]
pub struct Process {
    /// Owning scope.
    pub scope: ScopeId,
    /// Source location.
    pub loc: Loc,
    /// The statement tree.
    pub stmt: Stmt,
    attributes: HashMap<String, String>,
}

impl Process {
    /// True when the process is shaped as edge-triggered logic: its
    /// statement is an event wait and every probe watches an edge.
    pub fn is_synchronous(&self) -> bool {
        match &self.stmt {
            Stmt::EventWait(ew) => {
                !ew.event.probes.is_empty()
                    && ew.event.probes.iter().all(|p| p.edge != Edge::Any)
            }
            _ => false,
        }
    }

    /// True when the process is shaped as combinational logic: its
    /// statement is a level-sensitive event wait whose probes cover
    /// every input the body reads.
    pub fn is_asynchronous(&self, des: &Design) -> bool {
        let Stmt::EventWait(ew) = &self.stmt else {
            return false;
        };
        if ew.event.probes.is_empty() || ew.event.probes.iter().any(|p| p.edge != Edge::Any) {
            return false;
        }
        let inputs = ew.stmt.nex_input(des);
        let result = inputs.iter().all(|nex| {
            ew.event
                .probes
                .iter()
                .any(|p| des.nexa.same(des.net(p.sig).pin(0), nex))
        });
        result
    }

    /// Look up a process attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// The elaborated design under synthesis.
#[derive(Debug, Default)]
pub struct Design {
    nexa: NexusArena,
    nets: Vec<Net>,
    nodes: Vec<Option<Node>>,
    memories: Vec<Memory>,
    scopes: Vec<Scope>,
    processes: Vec<Option<Process>>,
    flags: HashMap<String, String>,
    /// Count of errors reported against this design.
    pub errors: u32,
}

impl Design {
    /// Create an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    // ----- nexus plumbing -----

    /// The nexus arena, for queries.
    pub fn nexa(&self) -> &NexusArena {
        &self.nexa
    }

    /// The nexus arena, for pin allocation.
    pub fn nexa_mut(&mut self) -> &mut NexusArena {
        &mut self.nexa
    }

    /// Electrically connect two pins.
    pub fn connect(&mut self, a: NexusId, b: NexusId) {
        self.nexa.connect(a, b);
    }

    // ----- scopes -----

    /// Create a scope.
    pub fn new_scope(&mut self, name: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            name: name.into(),
            attributes: HashMap::new(),
            symbol_counter: 0,
        });
        id
    }

    /// Look up a scope attribute.
    pub fn scope_attribute(&self, scope: ScopeId, name: &str) -> Option<&str> {
        self.scopes[scope.0 as usize]
            .attributes
            .get(name)
            .map(String::as_str)
    }

    /// Set a scope attribute.
    pub fn set_scope_attribute(&mut self, scope: ScopeId, name: &str, value: &str) {
        self.scopes[scope.0 as usize]
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    /// Generate a scope-local symbol for a synthesized device.
    pub fn local_symbol(&mut self, scope: ScopeId) -> String {
        let s = &mut self.scopes[scope.0 as usize];
        s.symbol_counter += 1;
        format!("{}._s{}", s.name, s.symbol_counter)
    }

    // ----- nets -----

    /// Create a net of `width` pins.
    pub fn new_net(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        kind: NetKind,
        width: usize,
    ) -> NetId {
        let id = NetId(self.nets.len() as u32);
        self.nets.push(Net::new(&mut self.nexa, scope, name, kind, width));
        id
    }

    /// Borrow a net.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.0 as usize]
    }

    /// Borrow a net mutably.
    pub fn net_mut(&mut self, id: NetId) -> &mut Net {
        &mut self.nets[id.0 as usize]
    }

    /// Mark an externally driven net (a port, a testbench input): its
    /// pins are not constant no matter what else joins their nexa.
    pub fn drive_external(&mut self, id: NetId) {
        for idx in 0..self.net(id).width() {
            let pin = self.net(id).pin(idx);
            self.nexa.drive_varying(pin);
        }
    }

    /// Schedule a reg net for conversion to a wire when the process
    /// driving it is successfully released.
    pub fn mark_to_wire(&mut self, id: NetId) {
        self.net_mut(id).flags.insert(NetFlags::TO_WIRE);
    }

    /// Clear all pending wire-conversion marks, converting the marked
    /// regs to wires when `convert` is true (process synthesized) and
    /// leaving them untouched otherwise (process kept).
    pub fn finish_wire_marks(&mut self, convert: bool) {
        for net in &mut self.nets {
            if net.flags.contains(NetFlags::TO_WIRE) {
                net.flags.remove(NetFlags::TO_WIRE);
                if convert {
                    net.kind = NetKind::Wire;
                }
            }
        }
    }

    // ----- memories -----

    /// Create a memory of `count` words of `width` bits.
    pub fn new_memory(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        width: usize,
        count: usize,
    ) -> MemoryId {
        let id = MemoryId(self.memories.len() as u32);
        self.memories.push(Memory::new(scope, name, width, count));
        id
    }

    /// Borrow a memory.
    pub fn memory(&self, id: MemoryId) -> &Memory {
        &self.memories[id.0 as usize]
    }

    /// Explode a memory into its flat reg net, creating the net on
    /// first use. Idempotent.
    pub fn explode_memory(&mut self, id: MemoryId) -> NetId {
        if let Some(net) = self.memories[id.0 as usize].exploded {
            return net;
        }
        let mem = &self.memories[id.0 as usize];
        let scope = mem.scope;
        let name = format!("{}.bits", mem.name);
        let width = mem.width() * mem.count();
        let net = self.new_net(scope, name, NetKind::Reg, width);
        self.net_mut(net).flags.insert(NetFlags::LOCAL);
        self.memories[id.0 as usize].exploded = Some(net);
        net
    }

    /// Count another assignment l-value referencing the memory.
    pub fn incr_mem_lref(&mut self, id: MemoryId) {
        self.memories[id.0 as usize].lref += 1;
    }

    // ----- processes -----

    /// Attach a process to the design.
    pub fn add_process(&mut self, scope: ScopeId, loc: Loc, stmt: Stmt) -> ProcessId {
        let id = ProcessId(self.processes.len() as u32);
        self.processes.push(Some(Process {
            scope,
            loc,
            stmt,
            attributes: HashMap::new(),
        }));
        id
    }

    /// Borrow a process.
    ///
    /// # Panics
    /// Panics if the process was deleted.
    pub fn process(&self, id: ProcessId) -> &Process {
        self.processes[id.0 as usize]
            .as_ref()
            .expect("process was deleted")
    }

    /// True while the process is still attached to the design.
    pub fn has_process(&self, id: ProcessId) -> bool {
        self.processes[id.0 as usize].is_some()
    }

    /// Remove a successfully synthesized process.
    pub fn delete_process(&mut self, id: ProcessId) {
        self.processes[id.0 as usize] = None;
    }

    /// Set a process attribute.
    pub fn set_process_attribute(&mut self, id: ProcessId, name: &str, value: &str) {
        if let Some(p) = &mut self.processes[id.0 as usize] {
            p.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// The ids of all processes currently attached.
    pub fn process_ids(&self) -> Vec<ProcessId> {
        self.processes
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| p.as_ref().map(|_| ProcessId(idx as u32)))
            .collect()
    }

    // ----- device nodes -----

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    /// Add a flip-flop bank.
    pub fn add_dff(&mut self, scope: ScopeId, loc: Loc, width: usize) -> NodeId {
        let name = self.local_symbol(scope);
        let dev = Device::Dff(Dff::new(&mut self.nexa, width));
        self.push_node(Node::new(name, loc, dev))
    }

    /// Add a multiplexer.
    pub fn add_mux(
        &mut self,
        scope: ScopeId,
        loc: Loc,
        width: usize,
        size: usize,
        selw: usize,
    ) -> NodeId {
        let name = self.local_symbol(scope);
        let dev = Device::Mux(Mux::new(&mut self.nexa, width, size, selw));
        self.push_node(Node::new(name, loc, dev))
    }

    /// Add a write-port demux.
    pub fn add_demux(
        &mut self,
        scope: ScopeId,
        loc: Loc,
        width: usize,
        awidth: usize,
        size: usize,
    ) -> NodeId {
        let name = self.local_symbol(scope);
        let dev = Device::Demux(Demux::new(&mut self.nexa, width, awidth, size));
        self.push_node(Node::new(name, loc, dev))
    }

    /// Add an address decoder in front of a flip-flop bank.
    pub fn add_decode(
        &mut self,
        scope: ScopeId,
        loc: Loc,
        ff: NodeId,
        awidth: usize,
        width: usize,
    ) -> NodeId {
        let name = self.local_symbol(scope);
        let dev = Device::Decode(Decode::new(&mut self.nexa, ff, awidth, width));
        self.push_node(Node::new(name, loc, dev))
    }

    /// Add a logic gate with `inputs` input pins.
    pub fn add_gate(&mut self, scope: ScopeId, loc: Loc, kind: GateKind, inputs: usize) -> NodeId {
        let name = self.local_symbol(scope);
        let dev = Device::Gate(Gate::new(&mut self.nexa, kind, inputs));
        self.push_node(Node::new(name, loc, dev))
    }

    /// Add a case-equality comparator.
    pub fn add_casecmp(&mut self, scope: ScopeId, loc: Loc) -> NodeId {
        let name = self.local_symbol(scope);
        let dev = Device::CaseCmp(CaseCmp::new(&mut self.nexa));
        self.push_node(Node::new(name, loc, dev))
    }

    /// Borrow a node.
    ///
    /// # Panics
    /// Panics if the node was deleted.
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0 as usize].as_ref().expect("node was deleted")
    }

    /// Borrow a node mutably.
    ///
    /// # Panics
    /// Panics if the node was deleted.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0 as usize].as_mut().expect("node was deleted")
    }

    /// True while the node is still owned by the design.
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes[id.0 as usize].is_some()
    }

    /// Remove a node, detaching all its pins from their nexa.
    pub fn delete_node(&mut self, id: NodeId) {
        if let Some(node) = self.nodes[id.0 as usize].take() {
            for pin in node.pins() {
                self.nexa.unlink(pin);
            }
        }
    }

    /// Iterate the live nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, n)| n.as_ref().map(|n| (NodeId(idx as u32), n)))
    }

    // ----- typed node accessors -----

    /// The flip-flop payload of `id`.
    ///
    /// # Panics
    /// Panics if `id` is not a flip-flop.
    pub fn dff(&self, id: NodeId) -> &Dff {
        match &self.node(id).device {
            Device::Dff(d) => d,
            _ => panic!("node is not a DFF"),
        }
    }

    /// The flip-flop payload of `id`, mutably.
    ///
    /// # Panics
    /// Panics if `id` is not a flip-flop.
    pub fn dff_mut(&mut self, id: NodeId) -> &mut Dff {
        match &mut self.node_mut(id).device {
            Device::Dff(d) => d,
            _ => panic!("node is not a DFF"),
        }
    }

    /// The mux payload of `id`.
    ///
    /// # Panics
    /// Panics if `id` is not a mux.
    pub fn mux(&self, id: NodeId) -> &Mux {
        match &self.node(id).device {
            Device::Mux(m) => m,
            _ => panic!("node is not a MUX"),
        }
    }

    /// The demux payload of `id`.
    ///
    /// # Panics
    /// Panics if `id` is not a demux.
    pub fn demux(&self, id: NodeId) -> &Demux {
        match &self.node(id).device {
            Device::Demux(d) => d,
            _ => panic!("node is not a DEMUX"),
        }
    }

    /// The gate payload of `id`.
    ///
    /// # Panics
    /// Panics if `id` is not a gate.
    pub fn gate(&self, id: NodeId) -> &Gate {
        match &self.node(id).device {
            Device::Gate(g) => g,
            _ => panic!("node is not a gate"),
        }
    }

    /// The decoder payload of `id`.
    ///
    /// # Panics
    /// Panics if `id` is not a decoder.
    pub fn decode(&self, id: NodeId) -> &Decode {
        match &self.node(id).device {
            Device::Decode(d) => d,
            _ => panic!("node is not a DECODE"),
        }
    }

    /// The case-comparator payload of `id`.
    ///
    /// # Panics
    /// Panics if `id` is not a case comparator.
    pub fn casecmp(&self, id: NodeId) -> &CaseCmp {
        match &self.node(id).device {
            Device::CaseCmp(c) => c,
            _ => panic!("node is not a case comparator"),
        }
    }

    // ----- targeted pin rewiring -----

    /// Detach the Aset pin of a flip-flop from its nexus.
    pub fn unlink_dff_aset(&mut self, id: NodeId) {
        let old = self.dff(id).aset;
        let fresh = self.nexa.unlink(old);
        self.dff_mut(id).aset = fresh;
    }

    /// Detach the Sset pin of a flip-flop from its nexus.
    pub fn unlink_dff_sset(&mut self, id: NodeId) {
        let old = self.dff(id).sset;
        let fresh = self.nexa.unlink(old);
        self.dff_mut(id).sset = fresh;
    }

    /// Detach the Enable pin of a flip-flop from its nexus.
    pub fn unlink_dff_enable(&mut self, id: NodeId) {
        let old = self.dff(id).enable;
        let fresh = self.nexa.unlink(old);
        self.dff_mut(id).enable = fresh;
    }

    // ----- flags -----

    /// Set a design flag.
    pub fn set_flag(&mut self, name: &str, value: &str) {
        self.flags.insert(name.to_string(), value.to_string());
    }

    /// Look up a design flag; unknown flags read as the empty string.
    pub fn get_flag(&self, name: &str) -> &str {
        self.flags.get(name).map_or("", String::as_str)
    }

    // ----- misc -----

    /// Record a constant driver of `bit` on a pin's nexus.
    pub fn drive_constant(&mut self, pin: NexusId, bit: Bit) {
        self.nexa.drive_constant(pin, bit);
    }
}
