//! The nexus arena: electrical equivalence classes over pins.
//!
//! A *nexus* is the unit of electrical identity in the netlist. Every pin
//! (of a net, of a device, of a transient signal vector) is born into a
//! fresh singleton nexus; [`NexusArena::connect`] merges two nexa so that
//! all pins in either class become electrically identical. The arena is a
//! union-find structure: pin holders keep [`NexusId`]s and every query
//! resolves through the class representative, so ids stay valid across
//! merges.
//!
//! A nexus also tracks what drives it. A class driven only by constant
//! sources reports [`NexusArena::drivers_constant`] and yields its value
//! through [`NexusArena::driven_value`]; an undriven class reads as `z`.

use crate::bits::Bit;

/// Handle to one pin's equivalence class. Allocated by
/// [`NexusArena::alloc`] and stable for the life of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NexusId(u32);

/// What is known about the drivers of a nexus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drive {
    /// Nothing drives this class.
    None,
    /// All drivers are constants agreeing on this value.
    Const(Bit),
    /// At least one non-constant driver (device output, external port).
    Varying,
}

impl Drive {
    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::None, d) | (d, Self::None) => d,
            (Self::Const(a), Self::Const(b)) if a == b => Self::Const(a),
            (Self::Const(_), Self::Const(_)) => {
                log::warn!("nexus merged with conflicting constant drivers");
                Self::Varying
            }
            _ => Self::Varying,
        }
    }
}

#[derive(Debug)]
struct Entry {
    /// Parent entry index; self-parent marks a representative.
    parent: u32,
    rank: u8,
    /// Number of pins in the class (valid at the representative).
    population: u32,
    /// Driver summary (valid at the representative).
    drive: Drive,
}

/// Arena of nexus equivalence classes.
#[derive(Debug, Default)]
pub struct NexusArena {
    entries: Vec<Entry>,
}

impl NexusArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh singleton nexus for a newly created pin.
    pub fn alloc(&mut self) -> NexusId {
        let idx = u32::try_from(self.entries.len()).expect("nexus arena overflow");
        self.entries.push(Entry {
            parent: idx,
            rank: 0,
            population: 1,
            drive: Drive::None,
        });
        NexusId(idx)
    }

    fn rep(&self, id: NexusId) -> u32 {
        let mut cur = id.0;
        while self.entries[cur as usize].parent != cur {
            cur = self.entries[cur as usize].parent;
        }
        cur
    }

    /// Merge the classes of `a` and `b`. A no-op when already connected.
    pub fn connect(&mut self, a: NexusId, b: NexusId) {
        let ra = self.rep(a);
        let rb = self.rep(b);
        if ra == rb {
            return;
        }
        let (root, child) = if self.entries[ra as usize].rank >= self.entries[rb as usize].rank {
            (ra, rb)
        } else {
            (rb, ra)
        };
        let child_pop = self.entries[child as usize].population;
        let child_drive = self.entries[child as usize].drive;
        self.entries[child as usize].parent = root;
        let root_entry = &mut self.entries[root as usize];
        root_entry.population += child_pop;
        root_entry.drive = root_entry.drive.merge(child_drive);
        if self.entries[root as usize].rank == self.entries[child as usize].rank {
            self.entries[root as usize].rank += 1;
        }
    }

    /// Detach one pin from its class, returning the fresh singleton nexus
    /// the pin now belongs to. The rest of the class is untouched.
    pub fn unlink(&mut self, id: NexusId) -> NexusId {
        let rep = self.rep(id);
        let entry = &mut self.entries[rep as usize];
        entry.population = entry.population.saturating_sub(1);
        self.alloc()
    }

    /// True when `a` and `b` are in the same class.
    pub fn same(&self, a: NexusId, b: NexusId) -> bool {
        self.rep(a) == self.rep(b)
    }

    /// True when the pin shares its nexus with at least one other pin.
    pub fn is_linked(&self, id: NexusId) -> bool {
        self.entries[self.rep(id) as usize].population > 1
    }

    /// True when every driver of the class is a constant (vacuously true
    /// for an undriven class).
    pub fn drivers_constant(&self, id: NexusId) -> bool {
        !matches!(self.entries[self.rep(id) as usize].drive, Drive::Varying)
    }

    /// The constant value driven onto the class. An undriven class reads
    /// as `z`; a class with varying drivers reads as `x` (callers should
    /// check [`Self::drivers_constant`] first).
    pub fn driven_value(&self, id: NexusId) -> Bit {
        match self.entries[self.rep(id) as usize].drive {
            Drive::Const(bit) => bit,
            Drive::None => Bit::Z,
            Drive::Varying => Bit::X,
        }
    }

    /// Record a constant driver of `bit` on the pin's class.
    pub fn drive_constant(&mut self, id: NexusId, bit: Bit) {
        let rep = self.rep(id);
        let entry = &mut self.entries[rep as usize];
        entry.drive = entry.drive.merge(Drive::Const(bit));
    }

    /// Record a non-constant driver (device output, external port) on the
    /// pin's class.
    pub fn drive_varying(&mut self, id: NexusId) {
        let rep = self.rep(id);
        self.entries[rep as usize].drive = Drive::Varying;
    }
}

/// An ordered, deduplicated collection of nexa, as produced by statement
/// output/input analysis. Positions in the set are meaningful: synthesis
/// uses them to pair logical outputs with physical sink pins.
#[derive(Debug, Default, Clone)]
pub struct NexusSet {
    items: Vec<NexusId>,
}

impl NexusSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless its class is already present.
    pub fn add(&mut self, arena: &NexusArena, id: NexusId) {
        if !self.items.iter().any(|&have| arena.same(have, id)) {
            self.items.push(id);
        }
    }

    /// Append every member of `other` (deduplicated).
    pub fn add_all(&mut self, arena: &NexusArena, other: &Self) {
        for &id in &other.items {
            self.add(arena, id);
        }
    }

    /// Number of distinct nexa in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The nexus at `idx`.
    pub fn get(&self, idx: usize) -> NexusId {
        self.items[idx]
    }

    /// True when `id`'s class is a member.
    pub fn contains(&self, arena: &NexusArena, id: NexusId) -> bool {
        self.items.iter().any(|&have| arena.same(have, id))
    }

    /// True when every member of `other` is a member of `self`.
    pub fn contains_all(&self, arena: &NexusArena, other: &Self) -> bool {
        other.items.iter().all(|&id| self.contains(arena, id))
    }

    /// Iterate the members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = NexusId> + '_ {
        self.items.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_pins_are_unlinked() {
        let mut arena = NexusArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        assert!(!arena.is_linked(a));
        assert!(!arena.same(a, b));
    }

    #[test]
    fn test_connect_is_transitive() {
        let mut arena = NexusArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        let c = arena.alloc();
        arena.connect(a, b);
        arena.connect(b, c);
        assert!(arena.same(a, c));
        assert!(arena.is_linked(a));
        assert!(arena.is_linked(c));
    }

    #[test]
    fn test_unlink_detaches_one_pin() {
        let mut arena = NexusArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        arena.connect(a, b);
        let a2 = arena.unlink(a);
        assert!(!arena.is_linked(a2));
        // The remaining class is back to population 1.
        assert!(!arena.is_linked(b));
    }

    #[test]
    fn test_constant_drive_propagates_through_connect() {
        let mut arena = NexusArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        arena.drive_constant(a, Bit::One);
        arena.connect(a, b);
        assert!(arena.drivers_constant(b));
        assert_eq!(arena.driven_value(b), Bit::One);
    }

    #[test]
    fn test_undriven_reads_as_z() {
        let mut arena = NexusArena::new();
        let a = arena.alloc();
        assert!(arena.drivers_constant(a));
        assert_eq!(arena.driven_value(a), Bit::Z);
    }

    #[test]
    fn test_varying_drive_wins() {
        let mut arena = NexusArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        arena.drive_constant(a, Bit::Zero);
        arena.drive_varying(b);
        arena.connect(a, b);
        assert!(!arena.drivers_constant(a));
    }

    #[test]
    fn test_nexus_set_dedups_merged_classes() {
        let mut arena = NexusArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        arena.connect(a, b);
        let mut set = NexusSet::new();
        set.add(&arena, a);
        set.add(&arena, b);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&arena, b));
    }
}
