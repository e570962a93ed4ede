//! Register file, program counter and the small selectors around them.

use crate::gates::{switch, BusSwitch, DMux, HalfAdder, Mux};
use crate::hdl::{Bus, Circuit, InBus, InPin};
use crate::memory::Register;
use crate::state::GENERAL_REGISTER_COUNT;
use crate::Fault;

/// Eight 16-bit registers with one write port and two read ports.
#[derive(Debug)]
pub struct CpuRegisters {
    /// Word written at the next edge.
    pub d: InBus,
    /// Write enable.
    pub w: InPin,
    /// Register written.
    pub w_addr: InBus,
    /// Register read on port A.
    pub addr_a: InBus,
    /// Register read on port B.
    pub addr_b: InBus,
    /// Port A.
    pub a: Bus,
    /// Port B.
    pub b: Bus,
}

impl CpuRegisters {
    /// Builds the register file.
    ///
    /// # Errors
    ///
    /// Propagates wiring faults.
    pub fn new(c: &mut Circuit) -> Result<Self, Fault> {
        let mut inputs = Vec::with_capacity(GENERAL_REGISTER_COUNT);
        let mut outputs = Vec::with_capacity(GENERAL_REGISTER_COUNT);
        let select = DMux::new(c, 3)?;
        for &enable in &select.outs {
            let reg = Register::new(c, 16)?;
            c.bind(reg.w, enable);
            inputs.push(reg.d);
            outputs.push(reg.out);
        }
        let d = c.fan_out_bus(inputs)?;
        let (addr_a, a) = read_port(c, &outputs)?;
        let (addr_b, b) = read_port(c, &outputs)?;
        Ok(Self {
            d,
            w: select.input,
            w_addr: select.addr,
            addr_a,
            addr_b,
            a,
            b,
        })
    }
}

/// One [`Mux`] per bit, all sharing an address.
fn read_port(c: &mut Circuit, registers: &[Bus]) -> Result<(InBus, Bus), Fault> {
    let mut addrs = Vec::with_capacity(16);
    let mut out = Vec::with_capacity(16);
    for bit in 0..16 {
        let mux = Mux::new(c, 3)?;
        for (input, reg) in mux.inputs.into_iter().zip(registers) {
            c.bind(input, reg[bit]);
        }
        addrs.push(mux.addr);
        out.push(mux.out);
    }
    Ok((c.fan_out_bus(addrs)?, out))
}

/// Counter with increment enable and parallel load; load wins.
#[derive(Debug)]
pub struct ProgramCounter {
    /// Value loaded when `w` is high.
    pub input: InBus,
    /// Increment at the next edge.
    pub en: InPin,
    /// Load `input` at the next edge.
    pub w: InPin,
    /// Current count.
    pub out: Bus,
}

impl ProgramCounter {
    /// Builds a `width`-bit counter.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWidth`] below two bits.
    pub fn new(c: &mut Circuit, width: usize) -> Result<Self, Fault> {
        if width < 2 {
            return Err(Fault::InvalidWidth { width });
        }
        let (en, mut carry) = c.pin();
        let mut out = Vec::with_capacity(width);
        let mut incremented = Vec::with_capacity(width);
        let load = BusSwitch::new(c, width)?;
        let flops: Vec<_> = (0..width).map(|_| c.dff()).collect();
        // Least significant bit first so each stage takes the carry below it.
        for (dff, &d) in flops.into_iter().zip(&load.out).rev() {
            let adder = HalfAdder::new(c);
            c.bind(adder.a, dff.out);
            c.bind(adder.b, carry);
            c.bind(dff.d, d);
            carry = adder.carry;
            incremented.push(adder.sum);
            out.push(dff.out);
        }
        out.reverse();
        incremented.reverse();
        c.bind_bus(load.a, &incremented)?;
        Ok(Self {
            input: load.b,
            en,
            w: load.select,
            out,
        })
    }
}

/// Source selector for `MOV`: a general register, `IP` or `FLAGS`, picked by
/// the 4-bit extended register code.
#[derive(Debug)]
pub struct XReg {
    /// Extended register code.
    pub x_addr: InBus,
    /// Register file read port.
    pub cpu_reg: InBus,
    /// Instruction pointer.
    pub ip: InBus,
    /// Flags register.
    pub flags: InBus,
    /// Selected value.
    pub out: Bus,
}

impl XReg {
    /// Builds the selector.
    ///
    /// # Errors
    ///
    /// Propagates wiring faults.
    pub fn new(c: &mut Circuit) -> Result<Self, Fault> {
        let (x_addr, code) = c.header(4);
        let (cpu_reg, reg) = c.header(16);
        let (ip, pc) = c.header(16);
        let (flags, f) = c.header(16);
        let special = switch(c, &pc, &f, code[3])?;
        let out = switch(c, &reg, &special, code[0])?;
        Ok(Self {
            x_addr,
            cpu_reg,
            ip,
            flags,
            out,
        })
    }
}

/// `SET` datapath: replaces one byte of the old register value.
#[derive(Debug)]
pub struct PartialWrite {
    /// Current register value.
    pub old: InBus,
    /// Immediate byte.
    pub partial: InBus,
    /// Replace the high byte instead of the low one.
    pub high: InPin,
    /// Merged value.
    pub out: Bus,
}

impl PartialWrite {
    /// Builds the merger for 16-bit words.
    ///
    /// # Errors
    ///
    /// Propagates wiring faults.
    pub fn new(c: &mut Circuit) -> Result<Self, Fault> {
        let (old, word) = c.header(16);
        let (partial, byte) = c.header(8);
        let (high, side) = c.pin();
        let mut out = switch(c, &word[..8], &byte, side)?;
        out.extend(switch(c, &byte, &word[8..], side)?);
        Ok(Self {
            old,
            partial,
            high,
            out,
        })
    }
}
