//! Synthesis diagnostics.
//!
//! Diagnostics go to stderr as `<loc>: <severity>: <message>` lines and
//! bump the design error counter; the caller decides the exit status
//! from the counter. Lowering routines signal failure to each other by
//! returning `false`, so one pass can surface several independent
//! errors.

use veriloom_netlist::{Design, Loc};

/// The reasons process synthesis can reject or mangle a process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthError {
    /// An assignment target synthesis does not understand.
    #[error("cannot synthesize this l-value")]
    UnsupportedLval,

    /// Memory word assignment outside an edge-triggered process.
    #[error("cannot synthesize memory assignment in asynchronous logic")]
    MemoryInAsync,

    /// Bit-select assignment outside an edge-triggered process.
    #[error("cannot synthesize assignment to bit select in asynchronous logic")]
    BitSelectInAsync,

    /// Constant memory index beyond the end of the array.
    #[error("address {0} is outside range of memory, skipping assignment")]
    AddressOutOfRange(i64),

    /// Loops cannot be synthesized.
    #[error("cannot synthesize for or while loops")]
    LoopInProcess,

    /// A combinational case has an uncovered selector value.
    #[error("case item {0} is missing in combinational process; is a default case needed?")]
    CaseItemMissing(usize),

    /// A case arm drives some output bits but not others.
    #[error("case {0} statement does not assign expected outputs")]
    CaseOutputsMissing(usize),

    /// `casez` comparison is not supported.
    #[error("cannot synthesize casez statements")]
    CasezUnsupported,

    /// A case guard that is not an elaborated constant.
    #[error("case guard is not a constant")]
    CaseGuardNotConstant,

    /// A sparse case with nothing to cover the unmatched codes.
    #[error("case statement has no default to cover unmatched selector values")]
    CaseDefaultRequired,

    /// More varying selector bits than the mux builder can enumerate.
    #[error("case selector has {0} varying bits, too many to synthesize as a mux")]
    CaseSelectorTooWide(usize),

    /// Combinational `if` with no true clause and no default.
    #[error("asynchronous if statement is missing the if clause")]
    MissingIfClause,

    /// Combinational `if` with no false clause and no default.
    #[error("asynchronous if statement is missing the else clause")]
    MissingElseClause,

    /// The true clause of a conditional failed to synthesize.
    #[error("asynchronous if statement true clause failed to synthesize")]
    TrueClauseFailed,

    /// The false clause of a conditional failed to synthesize.
    #[error("asynchronous if statement false clause failed to synthesize")]
    FalseClauseFailed,

    /// A condition reads both edge probes and ordinary signals.
    #[error("condition expression mixes synchronous and asynchronous inputs")]
    MixedSyncAsync,

    /// More than one candidate clock edge.
    #[error("too many clocks for synchronous logic; is an asynchronous set/reset misused?")]
    TooManyClocks,

    /// No probe qualifies as the clock.
    #[error("none of the edges are valid clock inputs; is the clock read by a statement or expression?")]
    NoClock,

    /// Edge probes left over where none can be consumed.
    #[error("events are unaccounted for in process synthesis")]
    EventsUnaccounted,

    /// Two slices of one register disagree on their Aset line.
    #[error("DFF Aset conflicts with the slice at {0}")]
    AsetConflict(Loc),

    /// Two slices of one register disagree on their Aclr line.
    #[error("DFF Aclr conflicts with the slice at {0}")]
    AclrConflict(Loc),

    /// A set/reset clause produced x bits.
    #[error("set/reset clause yields x bits, which are not plausible for set/reset")]
    XResetPattern,

    /// A set/reset clause that is not constant-valued.
    #[error("set/reset clause does not reduce to constant values")]
    ResetNotConstant,

    /// A flip-flop bit was never given a data input.
    #[error("DFF introduced here is missing Data {0} input")]
    DffDataMissing(usize),

    /// One statement assigns both memory words and plain vectors.
    #[error("cannot synthesize assignments that mix memory and vector targets")]
    MixedMemoryVector,

    /// Top-level failure of an edge-triggered process.
    #[error("unable to synthesize synchronous process")]
    SyncProcessFailed,

    /// Top-level failure of a combinational process.
    #[error("asynchronous process cannot be synthesized")]
    AsyncProcessFailed,

    /// Attribute says combinational; the shape disagrees.
    #[error("process is marked combinational, but isn't really")]
    NotCombinational,

    /// Attribute demands synthesis; the shape does not allow it.
    #[error("process is marked for synthesis, but cannot be synthesized")]
    SynthesisRequired,

    /// An output nexus that should be in the frame's output map is not.
    #[error("output nexus is missing from the output map")]
    NexusNotInMap,

    /// The r-value ran out of bits before the l-value did.
    #[error("r-value is narrower than the assignment target")]
    RvalTooNarrow,

    /// A statement region expected to sit in one flip-flop spans several.
    #[error("statement region spans more than one flip-flop")]
    SplitAccounting,

    /// A conditional output bit with no driver on either side.
    #[error("conditional output bit has no driver")]
    ConditBitUndriven,

    /// A flip-flop accounting entry points past the end of its device.
    #[error("pin {pin} out of range of {width} bit DFF")]
    DffPinRange {
        /// The out-of-range pin.
        pin: usize,
        /// The device width.
        width: usize,
    },
}

/// Report an error at `loc` and bump the design error counter.
pub(crate) fn error(des: &mut Design, loc: Loc, err: &SynthError) {
    eprintln!("{loc}: error: {err}");
    des.errors += 1;
}

/// Report an internal inconsistency at `loc`. Counts as an error.
pub(crate) fn internal(des: &mut Design, loc: Loc, err: &SynthError) {
    eprintln!("{loc}: internal error: {err}");
    des.errors += 1;
}

/// Report a warning at `loc`. Does not touch the error counter.
pub(crate) fn warning(loc: Loc, msg: &str) {
    eprintln!("{loc}: warning: {msg}");
}
