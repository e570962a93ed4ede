//! Adders and zero detection.

use super::logic::{And, Not, Or, Xor};
use crate::hdl::{Circuit, InBus, InPin, Signal};
use crate::Fault;

/// One-bit adder without carry-in.
#[derive(Debug)]
pub struct HalfAdder {
    /// First addend.
    pub a: InPin,
    /// Second addend.
    pub b: InPin,
    /// `a ^ b`.
    pub sum: Signal,
    /// `a & b`.
    pub carry: Signal,
}

impl HalfAdder {
    /// Builds the adder.
    pub fn new(c: &mut Circuit) -> Self {
        let xor = Xor::new(c);
        let and = And::new(c);
        let a = c.fan_out(vec![xor.a, and.a]);
        let b = c.fan_out(vec![xor.b, and.b]);
        Self {
            a,
            b,
            sum: xor.out,
            carry: and.out,
        }
    }
}

/// One-bit adder with carry-in: two chained half adders.
#[derive(Debug)]
pub struct FullAdder {
    /// First addend.
    pub a: InPin,
    /// Second addend.
    pub b: InPin,
    /// Incoming carry.
    pub carry_in: InPin,
    /// Sum bit.
    pub sum: Signal,
    /// Outgoing carry.
    pub carry_out: Signal,
}

impl FullAdder {
    /// Builds the adder.
    pub fn new(c: &mut Circuit) -> Self {
        let first = HalfAdder::new(c);
        let second = HalfAdder::new(c);
        let or = Or::new(c);
        c.bind(second.a, first.sum);
        c.bind(or.a, first.carry);
        c.bind(or.b, second.carry);
        Self {
            a: first.a,
            b: first.b,
            carry_in: second.b,
            sum: second.sum,
            carry_out: or.out,
        }
    }
}

/// High when every input line is low. Halves the bus recursively and ANDs
/// the two halves.
#[derive(Debug)]
pub struct IsZero {
    /// Bus under test.
    pub input: InBus,
    /// `input == 0`.
    pub out: Signal,
}

impl IsZero {
    /// Builds a detector for a `width`-bit bus.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] for an empty bus.
    pub fn new(c: &mut Circuit, width: usize) -> Result<Self, Fault> {
        if width == 0 {
            return Err(Fault::InvalidWidth { width });
        }
        let and = And::new(c);
        if width == 1 {
            let not = Not::new(c);
            c.bind(and.a, not.out);
            c.bind(and.b, not.out);
            return Ok(Self {
                input: vec![not.a],
                out: and.out,
            });
        }
        let left = Self::new(c, width / 2)?;
        let right = Self::new(c, width - width / 2)?;
        c.bind(and.a, left.out);
        c.bind(and.b, right.out);
        let mut input = left.input;
        input.extend(right.input);
        Ok(Self {
            input,
            out: and.out,
        })
    }
}
