//! Derived logic gates. Each one is a fixed arrangement of NAND gates.

use crate::hdl::{Circuit, InPin, Signal};

/// `NAND(a, a)`.
#[derive(Debug)]
pub struct Not {
    /// Input.
    pub a: InPin,
    /// `!a`.
    pub out: Signal,
}

impl Not {
    /// Builds the gate.
    pub fn new(c: &mut Circuit) -> Self {
        let nand = c.nand();
        let a = c.fan_out(vec![nand.a, nand.b]);
        Self { a, out: nand.out }
    }
}

/// `NOT(NAND(a, b))`.
#[derive(Debug)]
pub struct And {
    /// First input.
    pub a: InPin,
    /// Second input.
    pub b: InPin,
    /// `a && b`.
    pub out: Signal,
}

impl And {
    /// Builds the gate.
    pub fn new(c: &mut Circuit) -> Self {
        let nand = c.nand();
        let not = Not::new(c);
        c.bind(not.a, nand.out);
        Self {
            a: nand.a,
            b: nand.b,
            out: not.out,
        }
    }
}

/// `NAND(NOT a, NOT b)`.
#[derive(Debug)]
pub struct Or {
    /// First input.
    pub a: InPin,
    /// Second input.
    pub b: InPin,
    /// `a || b`.
    pub out: Signal,
}

impl Or {
    /// Builds the gate.
    pub fn new(c: &mut Circuit) -> Self {
        let nand = c.nand();
        let not_a = Not::new(c);
        let not_b = Not::new(c);
        c.bind(nand.a, not_a.out);
        c.bind(nand.b, not_b.out);
        Self {
            a: not_a.a,
            b: not_b.a,
            out: nand.out,
        }
    }
}

/// `NOT(OR(a, b))`.
#[derive(Debug)]
pub struct Nor {
    /// First input.
    pub a: InPin,
    /// Second input.
    pub b: InPin,
    /// `!(a || b)`.
    pub out: Signal,
}

impl Nor {
    /// Builds the gate.
    pub fn new(c: &mut Circuit) -> Self {
        let or = Or::new(c);
        let not = Not::new(c);
        c.bind(not.a, or.out);
        Self {
            a: or.a,
            b: or.b,
            out: not.out,
        }
    }
}

/// `AND(OR(a, b), NAND(a, b))`.
#[derive(Debug)]
pub struct Xor {
    /// First input.
    pub a: InPin,
    /// Second input.
    pub b: InPin,
    /// `a != b`.
    pub out: Signal,
}

impl Xor {
    /// Builds the gate.
    pub fn new(c: &mut Circuit) -> Self {
        let or = Or::new(c);
        let nand = c.nand();
        let and = And::new(c);
        c.bind(and.a, or.out);
        c.bind(and.b, nand.out);
        let a = c.fan_out(vec![or.a, nand.a]);
        let b = c.fan_out(vec![or.b, nand.b]);
        Self { a, b, out: and.out }
    }
}

/// `NOT(XOR(a, b))`.
#[derive(Debug)]
pub struct Xnor {
    /// First input.
    pub a: InPin,
    /// Second input.
    pub b: InPin,
    /// `a == b`.
    pub out: Signal,
}

impl Xnor {
    /// Builds the gate.
    pub fn new(c: &mut Circuit) -> Self {
        let xor = Xor::new(c);
        let not = Not::new(c);
        c.bind(not.a, xor.out);
        Self {
            a: xor.a,
            b: xor.b,
            out: not.out,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{And, Nor, Not, Or, Xnor, Xor};
    use crate::hdl::{Circuit, InPin, Signal};

    fn truth_table(build: impl FnOnce(&mut Circuit) -> (InPin, InPin, Signal)) -> [bool; 4] {
        let mut c = Circuit::new();
        let a = c.source(false);
        let b = c.source(false);
        let (sink_a, sink_b, out) = build(&mut c);
        c.bind(sink_a, a.signal());
        c.bind(sink_b, b.signal());
        c.validate().unwrap();

        let mut rows = [false; 4];
        for (row, (va, vb)) in [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .enumerate()
        {
            c.set_source(a, va);
            c.set_source(b, vb);
            rows[row] = c.read(out).unwrap();
        }
        rows
    }

    fn and_gate(c: &mut Circuit) -> (InPin, InPin, Signal) {
        let g = And::new(c);
        (g.a, g.b, g.out)
    }

    fn or_gate(c: &mut Circuit) -> (InPin, InPin, Signal) {
        let g = Or::new(c);
        (g.a, g.b, g.out)
    }

    fn nor_gate(c: &mut Circuit) -> (InPin, InPin, Signal) {
        let g = Nor::new(c);
        (g.a, g.b, g.out)
    }

    fn xor_gate(c: &mut Circuit) -> (InPin, InPin, Signal) {
        let g = Xor::new(c);
        (g.a, g.b, g.out)
    }

    fn xnor_gate(c: &mut Circuit) -> (InPin, InPin, Signal) {
        let g = Xnor::new(c);
        (g.a, g.b, g.out)
    }

    #[rstest]
    #[case::and(and_gate, [false, false, false, true])]
    #[case::or(or_gate, [false, true, true, true])]
    #[case::nor(nor_gate, [true, false, false, false])]
    #[case::xor(xor_gate, [false, true, true, false])]
    #[case::xnor(xnor_gate, [true, false, false, true])]
    fn two_input_gates_match_truth_tables(
        #[case] build: fn(&mut Circuit) -> (InPin, InPin, Signal),
        #[case] expected: [bool; 4],
    ) {
        assert_eq!(truth_table(build), expected);
    }

    #[test]
    fn not_inverts() {
        let mut c = Circuit::new();
        let a = c.source(false);
        let not = Not::new(&mut c);
        c.bind(not.a, a.signal());
        assert_eq!(c.read(not.out), Ok(true));
        c.set_source(a, true);
        assert_eq!(c.read(not.out), Ok(false));
    }

    #[test]
    fn derived_gates_are_built_only_from_nands() {
        let mut c = Circuit::new();
        let _ = Xor::new(&mut c);
        let stats = c.stats();
        assert_eq!(stats.nands, 3 + 1 + 2);
        assert_eq!(stats.flip_flops + stats.lookups + stats.sources, 0);
    }
}
