//! Sequencing and decode: the fetch/execute toggle, the instruction field
//! splitter and the jump-condition evaluator.

use crate::gates::{and, nor, not, or, xor, DMux};
use crate::hdl::{Bus, Circuit, InBus, InPin, Signal};
use crate::Fault;

/// Splits an instruction word into one-hot class lines and fields.
///
/// Decoding is total: every word asserts exactly one class line.
#[derive(Debug)]
pub struct InstructionDecoder {
    /// Instruction word.
    pub instruction: InBus,
    /// `HLT` class line.
    pub hlt: Signal,
    /// `NOP` class line.
    pub nop: Signal,
    /// `MOV` class line.
    pub mov: Signal,
    /// `SET` class line.
    pub set: Signal,
    /// `CMP` class line.
    pub cmp: Signal,
    /// `ALU` class line.
    pub alu: Signal,
    /// `MEM` class line.
    pub mem: Signal,
    /// `IO` class line.
    pub io: Signal,
    /// Bit 12: high byte, jump, `Q`, or write, depending on the class.
    pub flag: Signal,
    /// Bits 11..9: first register or jump condition.
    pub reg_a: Bus,
    /// Bits 12..9: extended `MOV` source.
    pub x_reg: Bus,
    /// Bits 8..6: second register.
    pub reg_b: Bus,
    /// Bits 5..0: ALU control lines.
    pub alu_op: Bus,
    /// Bits 7..0: `SET` immediate.
    pub immediate: Bus,
}

impl InstructionDecoder {
    /// Builds the decoder.
    ///
    /// # Errors
    ///
    /// Propagates wiring faults.
    pub fn new(c: &mut Circuit) -> Result<Self, Fault> {
        let (instruction, word) = c.header(16);
        let class = DMux::new(c, 3)?;
        let one = c.constant(true);
        c.bind(class.input, one);
        c.bind_bus(class.addr, &word[0..3])?;
        let lines = class.outs;
        Ok(Self {
            instruction,
            hlt: lines[0],
            nop: lines[1],
            mov: lines[2],
            set: lines[3],
            cmp: lines[4],
            alu: lines[5],
            mem: lines[6],
            io: lines[7],
            flag: word[3],
            reg_a: word[4..7].to_vec(),
            x_reg: word[3..7].to_vec(),
            reg_b: word[7..10].to_vec(),
            alu_op: word[10..16].to_vec(),
            immediate: word[8..16].to_vec(),
        })
    }
}

/// Alternates fetch and execute on every edge while enabled; parks in
/// execute while disabled.
#[derive(Debug)]
pub struct FetchState {
    /// Run enable.
    pub enable: InPin,
    /// High during the fetch half of an instruction.
    pub fetch: Signal,
}

impl FetchState {
    /// Builds the toggle.
    pub fn new(c: &mut Circuit) -> Self {
        let dff = c.dff();
        let (enable, en) = c.pin();
        let was_exec = not(c, dff.out);
        let fetch = and(c, was_exec, en);
        c.bind(dff.d, fetch);
        Self { enable, fetch }
    }
}

/// Evaluates a `[eq, lt, gt]` condition against the three ALU flags.
///
/// "Less" is negative xor overflow, "greater" is neither less nor equal.
#[derive(Debug)]
pub struct JmpCmp {
    /// Condition field, `eq` first.
    pub cond: InBus,
    /// Zero flag.
    pub zero: InPin,
    /// Negative flag.
    pub negative: InPin,
    /// Overflow flag.
    pub overflow: InPin,
    /// Condition holds.
    pub out: Signal,
}

impl JmpCmp {
    /// Builds the evaluator.
    pub fn new(c: &mut Circuit) -> Self {
        let (cond, want) = c.header(3);
        let (zero, z) = c.pin();
        let (negative, n) = c.pin();
        let (overflow, v) = c.pin();
        let lt = xor(c, n, v);
        let gt = nor(c, lt, z);
        let hit_eq = and(c, want[0], z);
        let hit_lt = and(c, want[1], lt);
        let hit_gt = and(c, want[2], gt);
        let ordered = or(c, hit_lt, hit_gt);
        let out = or(c, hit_eq, ordered);
        Self {
            cond,
            zero,
            negative,
            overflow,
            out,
        }
    }
}
