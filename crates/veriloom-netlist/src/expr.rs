//! Elaborated expressions, as consumed by synthesis.
//!
//! The synthesis core does not evaluate expressions; it asks them to
//! *synthesize* (produce a signal vector carrying their value) and it
//! asks which nexa they read. Rich operator lowering lives with the
//! elaborator; by the time a process reaches this crate its expressions
//! have been reduced to constants and signal references.

use crate::bits::Bits;
use crate::design::{Design, NetId};
use crate::net::SigVec;
use crate::nexus::NexusSet;

/// An elaborated expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A constant bit pattern.
    Const(Bits),
    /// A reference to a net.
    Signal(NetId),
}

impl Expr {
    /// Produce a signal vector carrying this expression's value.
    ///
    /// Constants drive fresh pins with their bit values; signal
    /// references share the pins of the referenced net.
    pub fn synthesize(&self, des: &mut Design) -> SigVec {
        match self {
            Self::Const(bits) => {
                let sig = SigVec::new(des.nexa_mut(), bits.width());
                for (idx, bit) in bits.iter().enumerate() {
                    des.nexa_mut().drive_constant(sig.pin(idx), bit);
                }
                sig
            }
            Self::Signal(net) => SigVec::from_net(des.net(*net)),
        }
    }

    /// The set of nexa this expression reads.
    pub fn nex_input(&self, des: &Design) -> NexusSet {
        let mut set = NexusSet::new();
        if let Self::Signal(net) = self {
            let net = des.net(*net);
            for idx in 0..net.width() {
                set.add(des.nexa(), net.pin(idx));
            }
        }
        set
    }

    /// The constant pattern, when this expression is a constant.
    pub fn as_const(&self) -> Option<&Bits> {
        match self {
            Self::Const(bits) => Some(bits),
            Self::Signal(_) => None,
        }
    }

    /// Width of the synthesized value in bits.
    pub fn width(&self, des: &Design) -> usize {
        match self {
            Self::Const(bits) => bits.width(),
            Self::Signal(net) => des.net(*net).width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Bit;
    use crate::net::NetKind;

    #[test]
    fn test_const_synthesizes_to_constant_pins() {
        let mut des = Design::new();
        let expr = Expr::Const("10".parse().unwrap());
        let sig = expr.synthesize(&mut des);
        assert_eq!(sig.width(), 2);
        assert!(des.nexa().drivers_constant(sig.pin(0)));
        assert_eq!(des.nexa().driven_value(sig.pin(0)), Bit::Zero);
        assert_eq!(des.nexa().driven_value(sig.pin(1)), Bit::One);
    }

    #[test]
    fn test_signal_shares_net_pins() {
        let mut des = Design::new();
        let scope = des.new_scope("top");
        let net = des.new_net(scope, "a", NetKind::Wire, 4);
        let expr = Expr::Signal(net);
        let sig = expr.synthesize(&mut des);
        assert_eq!(sig.width(), 4);
        assert!(des.nexa().same(sig.pin(1), des.net(net).pin(1)));
        let inputs = expr.nex_input(&des);
        assert_eq!(inputs.len(), 4);
    }
}
