//! Combinational primitives built from NAND gates.
//!
//! Each chip is a struct exposing its unwired sinks and its outputs. The free
//! functions at the bottom build a chip and wire its inputs in one step, for
//! glue logic where nothing else needs the sinks.

mod arith;
mod logic;
mod mux;

pub use arith::{FullAdder, HalfAdder, IsZero};
pub use logic::{And, Nor, Not, Or, Xnor, Xor};
pub use mux::{BusSwitch, DMux, Mux, Mux1};

use crate::hdl::{Bus, Circuit, Signal};
use crate::Fault;

/// Wired `!a`.
pub fn not(c: &mut Circuit, a: Signal) -> Signal {
    let gate = Not::new(c);
    c.bind(gate.a, a);
    gate.out
}

/// Wired `!(a && b)`.
pub fn nand(c: &mut Circuit, a: Signal, b: Signal) -> Signal {
    let gate = c.nand();
    c.bind(gate.a, a);
    c.bind(gate.b, b);
    gate.out
}

/// Wired `a && b`.
pub fn and(c: &mut Circuit, a: Signal, b: Signal) -> Signal {
    let gate = And::new(c);
    c.bind(gate.a, a);
    c.bind(gate.b, b);
    gate.out
}

/// Wired `a || b`.
pub fn or(c: &mut Circuit, a: Signal, b: Signal) -> Signal {
    let gate = Or::new(c);
    c.bind(gate.a, a);
    c.bind(gate.b, b);
    gate.out
}

/// Wired `!(a || b)`.
pub fn nor(c: &mut Circuit, a: Signal, b: Signal) -> Signal {
    let gate = Nor::new(c);
    c.bind(gate.a, a);
    c.bind(gate.b, b);
    gate.out
}

/// Wired `a != b`.
pub fn xor(c: &mut Circuit, a: Signal, b: Signal) -> Signal {
    let gate = Xor::new(c);
    c.bind(gate.a, a);
    c.bind(gate.b, b);
    gate.out
}

/// Wired [`BusSwitch`]: `select ? b : a`.
///
/// # Errors
///
/// Returns [`Fault::WidthMismatch`] when `a` and `b` differ in width and
/// [`Fault::InvalidWidth`] when they are empty.
pub fn switch(c: &mut Circuit, a: &[Signal], b: &[Signal], select: Signal) -> Result<Bus, Fault> {
    let chip = BusSwitch::new(c, a.len())?;
    c.bind_bus(chip.a, a)?;
    c.bind_bus(chip.b, b)?;
    c.bind(chip.select, select);
    Ok(chip.out)
}

#[cfg(test)]
mod tests {
    use super::{and, nand, nor, not, or, switch, xor};
    use crate::hdl::{BusSource, Circuit};

    #[test]
    fn wired_helpers_compose() {
        let mut c = Circuit::new();
        let a = c.source(true);
        let b = c.source(false);
        let (a, b) = (a.signal(), b.signal());

        let x = xor(&mut c, a, b);
        let n = nor(&mut c, a, b);
        let both = and(&mut c, a, b);
        let either = or(&mut c, a, b);
        let not_both = nand(&mut c, a, b);
        let inverted = not(&mut c, either);

        assert_eq!(c.read(x), Ok(true));
        assert_eq!(c.read(n), Ok(false));
        assert_eq!(c.read(both), Ok(false));
        assert_eq!(c.read(inverted), Ok(false));
        assert_eq!(c.read(not_both), Ok(true));
    }

    #[test]
    fn switch_rejects_unequal_buses() {
        let mut c = Circuit::new();
        let a = BusSource::new(&mut c, 4);
        let b = BusSource::new(&mut c, 3);
        let select = c.constant(false);
        assert!(switch(&mut c, a.bus(), b.bus(), select).is_err());
    }
}
