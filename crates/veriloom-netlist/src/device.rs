//! Primitive structural devices.
//!
//! Synthesis replaces behavioral processes with instances of these
//! primitives: D-type flip-flops, multiplexers, write-port demuxes,
//! address decoders, logic gates and case-equality comparators. Devices
//! are owned by the design; their output pins mark the nexa they join as
//! non-constant drivers.

use std::collections::BTreeMap;

use crate::bits::Bits;
use crate::design::NodeId;
use crate::nexus::{NexusArena, NexusId};
use crate::Loc;

/// A D-type flip-flop bank of a given width.
///
/// Control pins are one bit each and shared by the whole bank. The
/// asynchronous and synchronous set inputs load the stored
/// `aset_value`/`sset_value` patterns.
#[derive(Debug)]
pub struct Dff {
    width: usize,
    /// Data inputs, one per bit.
    pub data: Vec<NexusId>,
    /// Outputs, one per bit.
    pub q: Vec<NexusId>,
    /// Clock input.
    pub clock: NexusId,
    /// Clock-enable input.
    pub enable: NexusId,
    /// Asynchronous set input.
    pub aset: NexusId,
    /// Asynchronous clear input.
    pub aclr: NexusId,
    /// Synchronous set input.
    pub sset: NexusId,
    /// Synchronous clear input.
    pub sclr: NexusId,
    /// Pattern loaded by `aset` (empty when unused).
    pub aset_value: Bits,
    /// Pattern loaded by `sset` (empty when unused).
    pub sset_value: Bits,
}

impl Dff {
    pub(crate) fn new(arena: &mut NexusArena, width: usize) -> Self {
        let q: Vec<_> = (0..width).map(|_| arena.alloc()).collect();
        for &pin in &q {
            arena.drive_varying(pin);
        }
        Self {
            width,
            data: (0..width).map(|_| arena.alloc()).collect(),
            q,
            clock: arena.alloc(),
            enable: arena.alloc(),
            aset: arena.alloc(),
            aclr: arena.alloc(),
            sset: arena.alloc(),
            sclr: arena.alloc(),
            aset_value: Bits::empty(),
            sset_value: Bits::empty(),
        }
    }

    /// Number of bits in the bank.
    pub fn width(&self) -> usize {
        self.width
    }

    fn pins(&self) -> Vec<NexusId> {
        let mut pins = Vec::with_capacity(2 * self.width + 6);
        pins.extend_from_slice(&self.data);
        pins.extend_from_slice(&self.q);
        pins.extend([
            self.clock,
            self.enable,
            self.aset,
            self.aclr,
            self.sset,
            self.sclr,
        ]);
        pins
    }
}

/// A multiplexer: `size` data inputs of `width` bits selected by `selw`
/// select lines onto a `width`-bit result.
#[derive(Debug)]
pub struct Mux {
    width: usize,
    size: usize,
    /// Result pins, one per bit.
    pub result: Vec<NexusId>,
    /// Select pins.
    pub sel: Vec<NexusId>,
    data: Vec<NexusId>,
}

impl Mux {
    pub(crate) fn new(arena: &mut NexusArena, width: usize, size: usize, selw: usize) -> Self {
        let result: Vec<_> = (0..width).map(|_| arena.alloc()).collect();
        for &pin in &result {
            arena.drive_varying(pin);
        }
        Self {
            width,
            size,
            result,
            sel: (0..selw).map(|_| arena.alloc()).collect(),
            data: (0..size * width).map(|_| arena.alloc()).collect(),
        }
    }

    /// Number of bits per data input.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of data inputs.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The data pin for bit `wdx` of input `input`.
    pub fn data_pin(&self, wdx: usize, input: usize) -> NexusId {
        self.data[input * self.width + wdx]
    }

    fn pins(&self) -> Vec<NexusId> {
        let mut pins = Vec::new();
        pins.extend_from_slice(&self.result);
        pins.extend_from_slice(&self.sel);
        pins.extend_from_slice(&self.data);
        pins
    }
}

/// A write-port demux: routes `WriteData` onto the addressed slice of a
/// `width`-bit vector while passing the `Data` feedback through on every
/// other slice.
#[derive(Debug)]
pub struct Demux {
    width: usize,
    /// Outputs, one per bit of the vector.
    pub q: Vec<NexusId>,
    /// Feedback inputs, one per bit of the vector.
    pub data: Vec<NexusId>,
    /// Address inputs.
    pub address: Vec<NexusId>,
    /// Write data, `width / size` bits.
    pub write_data: Vec<NexusId>,
}

impl Demux {
    pub(crate) fn new(arena: &mut NexusArena, width: usize, awidth: usize, size: usize) -> Self {
        let q: Vec<_> = (0..width).map(|_| arena.alloc()).collect();
        for &pin in &q {
            arena.drive_varying(pin);
        }
        Self {
            width,
            q,
            data: (0..width).map(|_| arena.alloc()).collect(),
            address: (0..awidth).map(|_| arena.alloc()).collect(),
            write_data: (0..width / size).map(|_| arena.alloc()).collect(),
        }
    }

    /// Number of bits in the routed vector.
    pub fn width(&self) -> usize {
        self.width
    }

    fn pins(&self) -> Vec<NexusId> {
        let mut pins = Vec::new();
        pins.extend_from_slice(&self.q);
        pins.extend_from_slice(&self.data);
        pins.extend_from_slice(&self.address);
        pins.extend_from_slice(&self.write_data);
        pins
    }
}

/// An address decoder standing between a flip-flop bank and its
/// replicated write data: the addressed `width`-bit slice of the bank is
/// enabled for writing.
#[derive(Debug)]
pub struct Decode {
    /// The flip-flop bank this decoder drives.
    pub ff: NodeId,
    /// Width of one addressed slice.
    pub width: usize,
    /// Address inputs.
    pub address: Vec<NexusId>,
}

impl Decode {
    pub(crate) fn new(arena: &mut NexusArena, ff: NodeId, awidth: usize, width: usize) -> Self {
        Self {
            ff,
            width,
            address: (0..awidth).map(|_| arena.alloc()).collect(),
        }
    }

    fn pins(&self) -> Vec<NexusId> {
        self.address.clone()
    }
}

/// Gate function of a [`Gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    /// Logical AND of all inputs.
    And,
}

/// A simple logic gate. Pin 0 is the output; the rest are inputs.
#[derive(Debug)]
pub struct Gate {
    /// Gate function.
    pub kind: GateKind,
    /// Pin 0 is the output.
    pub pins: Vec<NexusId>,
}

impl Gate {
    pub(crate) fn new(arena: &mut NexusArena, kind: GateKind, inputs: usize) -> Self {
        let pins: Vec<_> = (0..=inputs).map(|_| arena.alloc()).collect();
        arena.drive_varying(pins[0]);
        Self { kind, pins }
    }
}

/// A one-bit case-equality comparator: pin 0 is the output, pins 1 and 2
/// the compared bits. Matches `x`/`z` literally, as `===` does.
#[derive(Debug)]
pub struct CaseCmp {
    /// Output, then the two compared bits.
    pub pins: [NexusId; 3],
}

impl CaseCmp {
    pub(crate) fn new(arena: &mut NexusArena) -> Self {
        let pins = [arena.alloc(), arena.alloc(), arena.alloc()];
        arena.drive_varying(pins[0]);
        Self { pins }
    }
}

/// The device payload of a [`Node`].
#[derive(Debug)]
pub enum Device {
    /// Flip-flop bank.
    Dff(Dff),
    /// Multiplexer.
    Mux(Mux),
    /// Write-port demux.
    Demux(Demux),
    /// Address decoder.
    Decode(Decode),
    /// Logic gate.
    Gate(Gate),
    /// Case-equality comparator.
    CaseCmp(CaseCmp),
}

/// A device instance owned by the design.
#[derive(Debug)]
pub struct Node {
    /// Generated instance name.
    pub name: String,
    /// Source location of the statement that produced the device.
    pub loc: Loc,
    /// Free-form attributes consumed by downstream passes.
    pub attributes: BTreeMap<String, String>,
    /// The device payload.
    pub device: Device,
}

impl Node {
    pub(crate) fn new(name: String, loc: Loc, device: Device) -> Self {
        Self {
            name,
            loc,
            attributes: BTreeMap::new(),
            device,
        }
    }

    /// All pins of the device, for unlinking on deletion.
    pub(crate) fn pins(&self) -> Vec<NexusId> {
        match &self.device {
            Device::Dff(d) => d.pins(),
            Device::Mux(m) => m.pins(),
            Device::Demux(d) => d.pins(),
            Device::Decode(d) => d.pins(),
            Device::Gate(g) => g.pins.clone(),
            Device::CaseCmp(c) => c.pins.to_vec(),
        }
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
