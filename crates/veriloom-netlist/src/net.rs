//! Nets and transient signal vectors.
//!
//! A [`Net`] is a named, indexed vector of pins owned by a scope: the
//! signals of the elaborated design. A [`SigVec`] is the unowned cousin:
//! a plain vector of pins used for the working sets of one synthesis
//! recursion frame (output maps, accumulators, branch results). A
//! `SigVec` is dropped at the end of its frame; the nexa its pins joined
//! live on in the arena.

use crate::design::ScopeId;
use crate::nexus::{NexusArena, NexusId};

bitflags::bitflags! {
    /// Per-net flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NetFlags: u8 {
        /// Compiler-generated net, not visible in the source design.
        const LOCAL = 0x01;
        /// Reg net scheduled for conversion to a wire when the process
        /// that drives it is released.
        const TO_WIRE = 0x02;
    }
}

/// The storage class of a net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetKind {
    /// Structurally driven signal.
    Wire,
    /// Behaviorally assigned register.
    Reg,
}

/// A named vector of pins owned by a scope.
#[derive(Debug)]
pub struct Net {
    /// Source-level name.
    pub name: String,
    /// Wire or reg.
    pub kind: NetKind,
    /// Flag bits.
    pub flags: NetFlags,
    /// Owning scope.
    pub scope: ScopeId,
    pins: Vec<NexusId>,
}

impl Net {
    pub(crate) fn new(
        arena: &mut NexusArena,
        scope: ScopeId,
        name: impl Into<String>,
        kind: NetKind,
        width: usize,
    ) -> Self {
        let pins = (0..width).map(|_| arena.alloc()).collect();
        Self {
            name: name.into(),
            kind,
            flags: NetFlags::empty(),
            scope,
            pins,
        }
    }

    /// Number of pins.
    pub fn width(&self) -> usize {
        self.pins.len()
    }

    /// The nexus of pin `idx`.
    pub fn pin(&self, idx: usize) -> NexusId {
        self.pins[idx]
    }
}

/// A transient, unowned pin vector for one recursion frame.
#[derive(Debug, Clone)]
pub struct SigVec {
    pins: Vec<NexusId>,
}

impl SigVec {
    /// Allocate `width` fresh, unlinked pins.
    pub fn new(arena: &mut NexusArena, width: usize) -> Self {
        Self {
            pins: (0..width).map(|_| arena.alloc()).collect(),
        }
    }

    /// A vector sharing the pins of `net` (no new pins are allocated;
    /// connecting to the result connects to the net).
    pub fn from_net(net: &Net) -> Self {
        Self {
            pins: net.pins.clone(),
        }
    }

    /// Number of pins.
    pub fn width(&self) -> usize {
        self.pins.len()
    }

    /// The nexus of pin `idx`.
    pub fn pin(&self, idx: usize) -> NexusId {
        self.pins[idx]
    }

    /// Position of the pin sharing `nex`'s class, if any. This is the
    /// lookup that pairs a logical output (by nexus) with its slot in a
    /// frame's output map.
    pub fn position_of(&self, arena: &NexusArena, nex: NexusId) -> Option<usize> {
        self.pins.iter().position(|&pin| arena.same(pin, nex))
    }

    /// True when every pin is linked to something.
    pub fn fully_linked(&self, arena: &NexusArena) -> bool {
        self.pins.iter().all(|&pin| arena.is_linked(pin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigvec_position_of_follows_connections() {
        let mut arena = NexusArena::new();
        let vec = SigVec::new(&mut arena, 4);
        let probe = arena.alloc();
        assert_eq!(vec.position_of(&arena, probe), None);
        arena.connect(vec.pin(2), probe);
        assert_eq!(vec.position_of(&arena, probe), Some(2));
    }

    #[test]
    fn test_sigvec_fully_linked() {
        let mut arena = NexusArena::new();
        let vec = SigVec::new(&mut arena, 2);
        assert!(!vec.fully_linked(&arena));
        let a = arena.alloc();
        let b = arena.alloc();
        arena.connect(vec.pin(0), a);
        arena.connect(vec.pin(1), b);
        assert!(vec.fully_linked(&arena));
    }
}
