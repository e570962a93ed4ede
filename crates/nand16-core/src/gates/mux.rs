//! Multiplexers, demultiplexers and bus switches.

use super::logic::{And, Not, Or};
use crate::hdl::{Bus, Circuit, InBus, InPin, Signal};
use crate::Fault;

/// Two-way selector: `select ? b : a`.
#[derive(Debug)]
pub struct Mux1 {
    /// Chosen while `select` is low.
    pub a: InPin,
    /// Chosen while `select` is high.
    pub b: InPin,
    /// Selector.
    pub select: InPin,
    /// Selected input.
    pub out: Signal,
}

impl Mux1 {
    /// Builds the selector.
    pub fn new(c: &mut Circuit) -> Self {
        let not = Not::new(c);
        let and_a = And::new(c);
        let and_b = And::new(c);
        let or = Or::new(c);
        c.bind(and_a.a, not.out);
        c.bind(or.a, and_a.out);
        c.bind(or.b, and_b.out);
        let select = c.fan_out(vec![not.a, and_b.a]);
        Self {
            a: and_a.b,
            b: and_b.b,
            select,
            out: or.out,
        }
    }
}

/// Selects one of `2^n` inputs. `addr[0]` picks the half, recursively.
#[derive(Debug)]
pub struct Mux {
    /// Data inputs in address order.
    pub inputs: InBus,
    /// Address, most significant bit first.
    pub addr: InBus,
    /// Selected input.
    pub out: Signal,
}

impl Mux {
    /// Builds a selector with `addr_bits` address lines.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] for zero address bits.
    pub fn new(c: &mut Circuit, addr_bits: usize) -> Result<Self, Fault> {
        if addr_bits == 0 {
            return Err(Fault::InvalidWidth { width: addr_bits });
        }
        let top = Mux1::new(c);
        if addr_bits == 1 {
            return Ok(Self {
                inputs: vec![top.a, top.b],
                addr: vec![top.select],
                out: top.out,
            });
        }
        let low = Self::new(c, addr_bits - 1)?;
        let high = Self::new(c, addr_bits - 1)?;
        c.bind(top.a, low.out);
        c.bind(top.b, high.out);
        let mut addr = vec![top.select];
        addr.extend(c.fan_out_bus(vec![low.addr, high.addr])?);
        let mut inputs = low.inputs;
        inputs.extend(high.inputs);
        Ok(Self {
            inputs,
            addr,
            out: top.out,
        })
    }
}

/// Routes one input to one of `2^n` outputs; the rest read low.
#[derive(Debug)]
pub struct DMux {
    /// Routed value.
    pub input: InPin,
    /// Address, most significant bit first.
    pub addr: InBus,
    /// Outputs in address order.
    pub outs: Bus,
}

impl DMux {
    /// Builds a router with `addr_bits` address lines.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] for zero address bits.
    pub fn new(c: &mut Circuit, addr_bits: usize) -> Result<Self, Fault> {
        if addr_bits == 0 {
            return Err(Fault::InvalidWidth { width: addr_bits });
        }
        let not = Not::new(c);
        let and_a = And::new(c);
        let and_b = And::new(c);
        c.bind(and_a.a, not.out);
        let input = c.fan_out(vec![and_a.b, and_b.b]);
        let mut addr = vec![c.fan_out(vec![not.a, and_b.a])];
        if addr_bits == 1 {
            return Ok(Self {
                input,
                addr,
                outs: vec![and_a.out, and_b.out],
            });
        }
        let low = Self::new(c, addr_bits - 1)?;
        let high = Self::new(c, addr_bits - 1)?;
        c.bind(low.input, and_a.out);
        c.bind(high.input, and_b.out);
        addr.extend(c.fan_out_bus(vec![low.addr, high.addr])?);
        let mut outs = low.outs;
        outs.extend(high.outs);
        Ok(Self { input, addr, outs })
    }
}

/// A bank of [`Mux1`]s sharing one select line: `select ? b : a`, bitwise.
#[derive(Debug)]
pub struct BusSwitch {
    /// Chosen while `select` is low.
    pub a: InBus,
    /// Chosen while `select` is high.
    pub b: InBus,
    /// Shared selector.
    pub select: InPin,
    /// Selected bus.
    pub out: Bus,
}

impl BusSwitch {
    /// Builds a `width`-bit switch.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] for an empty bus.
    pub fn new(c: &mut Circuit, width: usize) -> Result<Self, Fault> {
        if width == 0 {
            return Err(Fault::InvalidWidth { width });
        }
        let mut a = Vec::with_capacity(width);
        let mut b = Vec::with_capacity(width);
        let mut selects = Vec::with_capacity(width);
        let mut out = Vec::with_capacity(width);
        for _ in 0..width {
            let mux = Mux1::new(c);
            a.push(mux.a);
            b.push(mux.b);
            selects.push(mux.select);
            out.push(mux.out);
        }
        let select = c.fan_out(selects);
        Ok(Self { a, b, select, out })
    }
}
