//! The gate-level ALU: a Hack-style adder/logic unit extended with XOR and
//! arithmetic shift-right, selected by control-line patterns the main unit
//! never uses on its own.

use crate::gates::{and, nand, nor, not, or, switch, xor, FullAdder, HalfAdder, IsZero};
use crate::hdl::{Bus, Circuit, InBus, Signal};
use crate::Fault;

/// Decodes the alternate-function selectors from the six control lines.
///
/// `c0` is `za` with `na`, `nb` and `no` all low; `c1` is the same for `zb`
/// and `c2` for `f`.
#[derive(Debug)]
pub struct ControlBits {
    /// `[za, na, zb, nb, f, no]`.
    pub lines: InBus,
    /// Shift `b` (or, with `c1`, XOR).
    pub c0: Signal,
    /// Shift `a` (or, with `c0`, XOR).
    pub c1: Signal,
    /// Enables the alternate path.
    pub c2: Signal,
}

impl ControlBits {
    /// Builds the selector decoder.
    pub fn new(c: &mut Circuit) -> Self {
        let (lines, l) = c.header(6);
        let (za, na, zb, nb, f, no) = (l[0], l[1], l[2], l[3], l[4], l[5]);
        let inverted = or(c, na, nb);
        let plain = nor(c, no, inverted);
        let not_na = not(c, na);
        let not_nb = not(c, nb);
        let not_no = not(c, no);
        let za_only = and(c, za, not_na);
        let zb_only = and(c, zb, not_nb);
        let f_only = and(c, f, not_no);
        Self {
            lines,
            c0: and(c, plain, za_only),
            c1: and(c, plain, zb_only),
            c2: and(c, plain, f_only),
        }
    }
}

/// Zero/negate each operand, add or AND them, optionally negate the result.
///
/// Overflow is detected with a seventeenth adder stage that sign-extends the
/// operands, and is gated by `f` so only the addition path reports it.
#[derive(Debug)]
pub struct MainUnit {
    /// First operand.
    pub a: InBus,
    /// Second operand.
    pub b: InBus,
    /// `[za, na, zb, nb, f, no]`.
    pub control: InBus,
    /// Result.
    pub out: Bus,
    /// Signed overflow of the addition.
    pub overflow: Signal,
}

impl MainUnit {
    /// Builds a `width`-bit unit.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] below two bits.
    pub fn new(c: &mut Circuit, width: usize) -> Result<Self, Fault> {
        if width < 2 {
            return Err(Fault::InvalidWidth { width });
        }
        let (a_in, a) = c.header(width);
        let (b_in, b) = c.header(width);
        let (control, l) = c.header(6);
        let (za, na, zb, nb, f, no) = (l[0], l[1], l[2], l[3], l[4], l[5]);

        let x = condition(c, &a, za, na)?;
        let y = condition(c, &b, zb, nb)?;

        // Ripple from the least significant bit, which sits at the end.
        let mut sums = Vec::with_capacity(width);
        let half = HalfAdder::new(c);
        c.bind(half.a, x[width - 1]);
        c.bind(half.b, y[width - 1]);
        sums.push(half.sum);
        let mut carry = half.carry;
        for i in (0..width - 1).rev() {
            let full = FullAdder::new(c);
            c.bind(full.a, x[i]);
            c.bind(full.b, y[i]);
            c.bind(full.carry_in, carry);
            sums.push(full.sum);
            carry = full.carry_out;
        }
        sums.reverse();

        let extension = FullAdder::new(c);
        c.bind(extension.a, x[0]);
        c.bind(extension.b, y[0]);
        c.bind(extension.carry_in, carry);
        let sign_changed = xor(c, extension.sum, sums[0]);
        let overflow = and(c, f, sign_changed);

        let products: Bus = x.iter().zip(&y).map(|(&p, &q)| and(c, p, q)).collect();
        let picked = switch(c, &products, &sums, f)?;
        let negated: Bus = picked.iter().map(|&bit| not(c, bit)).collect();
        let out = switch(c, &picked, &negated, no)?;

        Ok(Self {
            a: a_in,
            b: b_in,
            control,
            out,
            overflow,
        })
    }
}

/// `zero ? 0 : v`, then `negate ? !that : that`.
fn condition(c: &mut Circuit, v: &[Signal], zero: Signal, negate: Signal) -> Result<Bus, Fault> {
    let keep = not(c, zero);
    let zeroed: Bus = v.iter().map(|&bit| and(c, bit, keep)).collect();
    let inverted: Bus = zeroed.iter().map(|&bit| not(c, bit)).collect();
    switch(c, &zeroed, &inverted, negate)
}

/// The full ALU: [`MainUnit`] plus the XOR and shift paths and the flag
/// outputs.
#[derive(Debug)]
pub struct Alu {
    /// First operand.
    pub a: InBus,
    /// Second operand.
    pub b: InBus,
    /// `[za, na, zb, nb, f, no]`, the low six bits of an ALU instruction.
    pub control: InBus,
    /// Result.
    pub out: Bus,
    /// Most significant bit of the result.
    pub negative: Signal,
    /// Result is zero.
    pub zero: Signal,
    /// Signed overflow on the addition path.
    pub overflow: Signal,
}

impl Alu {
    /// Builds a `width`-bit ALU.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] below two bits.
    pub fn new(c: &mut Circuit, width: usize) -> Result<Self, Fault> {
        let main = MainUnit::new(c, width)?;
        let bits = ControlBits::new(c);
        let (a_in, a) = c.header(width);
        let (b_in, b) = c.header(width);
        let (control, lines) = c.header(6);
        c.bind_bus(main.a, &a)?;
        c.bind_bus(main.b, &b)?;
        c.bind_bus(main.control, &lines)?;
        c.bind_bus(bits.lines, &lines)?;

        let xors: Bus = a.iter().zip(&b).map(|(&p, &q)| xor(c, p, q)).collect();
        let shifted = switch(c, &a[..width - 1], &b[..width - 1], bits.c0)?;
        let mut sign_extended = vec![shifted[0]];
        sign_extended.extend(shifted);

        let not_both = nand(c, bits.c0, bits.c1);
        let alternate = switch(c, &xors, &sign_extended, not_both)?;
        let either = or(c, bits.c0, bits.c1);
        let use_alternate = and(c, either, bits.c2);
        let out = switch(c, &main.out, &alternate, use_alternate)?;

        let zero_test = IsZero::new(c, width)?;
        c.bind_bus(zero_test.input, &out)?;

        Ok(Self {
            a: a_in,
            b: b_in,
            control,
            negative: out[0],
            zero: zero_test.out,
            overflow: main.overflow,
            out,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::Alu;
    use crate::encoding::AluOperation;
    use crate::hdl::{Bus, BusSource, Circuit, Signal};

    struct Bench {
        c: Circuit,
        a: BusSource,
        b: BusSource,
        op: BusSource,
        out: Bus,
        negative: Signal,
        zero: Signal,
        overflow: Signal,
    }

    impl Bench {
        fn new() -> Self {
            let mut c = Circuit::new();
            let a = BusSource::new(&mut c, 16);
            let b = BusSource::new(&mut c, 16);
            let op = BusSource::new(&mut c, 6);
            let alu = Alu::new(&mut c, 16).unwrap();
            c.bind_bus(alu.a, a.bus()).unwrap();
            c.bind_bus(alu.b, b.bus()).unwrap();
            c.bind_bus(alu.control, op.bus()).unwrap();
            c.validate().unwrap();
            Self {
                c,
                a,
                b,
                op,
                out: alu.out,
                negative: alu.negative,
                zero: alu.zero,
                overflow: alu.overflow,
            }
        }

        fn check(&mut self, op: AluOperation, a: u16, b: u16) {
            self.a.set(&mut self.c, u64::from(a));
            self.b.set(&mut self.c, u64::from(b));
            self.op.set(&mut self.c, u64::from(op.code()));
            let want = op.evaluate(a, b);
            let context = format!("{} a={a:#06x} b={b:#06x}", op.name());
            assert_eq!(self.c.read_word(&self.out), Ok(want.value), "{context}");
            assert_eq!(self.c.read(self.zero), Ok(want.zero), "{context}");
            assert_eq!(self.c.read(self.negative), Ok(want.negative), "{context}");
            assert_eq!(self.c.read(self.overflow), Ok(want.overflow), "{context}");
        }
    }

    #[allow(clippy::cast_sign_loss)]
    const fn word(v: i16) -> u16 {
        v as u16
    }

    #[test]
    fn matches_reference_on_small_signed_range() {
        let mut bench = Bench::new();
        for op in AluOperation::ALL {
            for a in -8_i16..8 {
                for b in -8_i16..8 {
                    bench.check(op, word(a), word(b));
                }
            }
        }
    }

    #[rstest]
    #[case(AluOperation::APlusB, 0x7FFF, 0x0001)]
    #[case(AluOperation::APlusB, 0x8000, 0x8000)]
    #[case(AluOperation::AMinusB, 0x8000, 0x0001)]
    #[case(AluOperation::BMinusA, 0x0001, 0x8000)]
    #[case(AluOperation::NegA, 0x8000, 0)]
    #[case(AluOperation::APlus1, 0x7FFF, 0)]
    #[case(AluOperation::BMinus1, 0, 0x8000)]
    #[case(AluOperation::AShr, 0x8001, 0)]
    #[case(AluOperation::BShr, 0, 0x7FFE)]
    #[case(AluOperation::Xor, 0xF0F0, 0xFF00)]
    fn matches_reference_at_the_edges(#[case] op: AluOperation, #[case] a: u16, #[case] b: u16) {
        Bench::new().check(op, a, b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn matches_reference_on_full_words(
            index in 0..AluOperation::ALL.len(),
            a in any::<u16>(),
            b in any::<u16>(),
        ) {
            Bench::new().check(AluOperation::ALL[index], a, b);
        }
    }
}
