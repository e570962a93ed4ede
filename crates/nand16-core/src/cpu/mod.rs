//! The gate-level CPU.
//!
//! Every instruction takes two edges: fetch latches the word at `PC` into the
//! next-instruction register and advances `PC`, execute applies it. A 2-bit
//! debug mode lets the host read registers or memory, or inject a word
//! straight into execute:
//!
//! | mode | effect                                                 |
//! |------|--------------------------------------------------------|
//! | `00` | normal operation                                       |
//! | `01` | `dbg_out` shows the register named by `dbg_in[12..16]` |
//! | `10` | `addr_out` is `dbg_in`, `dbg_out` shows `mem_data`     |
//! | `11` | execute `dbg_in` instead of the fetched word           |

mod alu;
mod control;
mod datapath;

pub use alu::{Alu, ControlBits, MainUnit};
pub use control::{FetchState, InstructionDecoder, JmpCmp};
pub use datapath::{CpuRegisters, PartialWrite, ProgramCounter, XReg};

use crate::decoder::Instruction;
use crate::gates::{and, nor, not, or, switch, DMux};
use crate::hdl::{Bus, Circuit, InBus, InPin, Signal};
use crate::memory::Register;
use crate::Fault;

/// Debug mode: normal operation.
pub const DEBUG_OFF: u64 = 0b00;
/// Debug mode: read a register.
pub const DEBUG_REGISTER: u64 = 0b01;
/// Debug mode: read a memory word.
pub const DEBUG_MEMORY: u64 = 0b10;
/// Debug mode: inject an instruction.
pub const DEBUG_INJECT: u64 = 0b11;

/// CPU ports. Memory and the IO bus sit outside; the CPU only drives
/// addresses, data and write strobes.
#[derive(Debug)]
pub struct Cpu {
    /// Run enable; while low the CPU parks on `NOP` with `PC` held at zero.
    pub enable: InPin,
    /// Word at `addr_out` in memory.
    pub mem_data: InBus,
    /// Word at `addr_out` on the IO bus.
    pub io_data: InBus,
    /// Debug mode.
    pub dbg_mode: InBus,
    /// Debug operand.
    pub dbg_in: InBus,
    /// A `HLT` is in execute.
    pub hlt: Signal,
    /// Register B of the current instruction, for stores.
    pub data_out: Bus,
    /// Memory or port address.
    pub addr_out: Bus,
    /// Store `data_out` at `addr_out` on this edge.
    pub mem_write: Signal,
    /// Emit `data_out` on port `addr_out` on this edge.
    pub io_write: Signal,
    /// Debug read result.
    pub dbg_out: Bus,
    /// Enabled and in execute: between instructions from the host's view.
    pub exec_active: Signal,
}

impl Cpu {
    /// Builds and wires the CPU.
    ///
    /// # Errors
    ///
    /// Propagates wiring faults.
    #[allow(clippy::too_many_lines)]
    pub fn new(c: &mut Circuit) -> Result<Self, Fault> {
        let (enable_in, enable) = c.pin();
        let (mem_data_in, mem_data) = c.header(16);
        let (io_data_in, io_data) = c.header(16);
        let (dbg_mode_in, dbg_mode) = c.header(2);
        let (dbg_in_in, dbg_in) = c.header(16);

        let fetch_state = FetchState::new(c);
        c.bind(fetch_state.enable, enable);
        let fetch = fetch_state.fetch;
        let exec = not(c, fetch);
        let disabled = not(c, enable);

        let mode = DMux::new(c, 2)?;
        let one = c.constant(true);
        c.bind(mode.input, one);
        c.bind_bus(mode.addr, &dbg_mode)?;
        let (dbg_reg, dbg_mem, dbg_instr) = (mode.outs[1], mode.outs[2], mode.outs[3]);

        // Instruction line: NOP while disabled, else the injected or fetched word.
        let next_instruction = Register::new(c, 16)?;
        c.bind_bus(next_instruction.d, &mem_data)?;
        c.bind(next_instruction.w, fetch);
        let chosen = switch(c, &next_instruction.out, &dbg_in, dbg_instr)?;
        let nop = c.constant_bus(16, u64::from(Instruction::Nop.encode()));
        let instruction = switch(c, &chosen, &nop, disabled)?;
        let decoder = InstructionDecoder::new(c)?;
        c.bind_bus(decoder.instruction, &instruction)?;

        let regs = CpuRegisters::new(c)?;
        let addr_a = switch(c, &decoder.reg_a, &dbg_in[13..16], dbg_reg)?;
        c.bind_bus(regs.addr_a, &addr_a)?;
        c.bind_bus(regs.addr_b, &decoder.reg_b)?;

        let alu = Alu::new(c, 16)?;
        c.bind_bus(alu.a, &regs.a)?;
        c.bind_bus(alu.b, &regs.b)?;
        c.bind_bus(alu.control, &decoder.alu_op)?;

        let flags = Register::new(c, 16)?;
        let mut flags_d = c.constant_bus(13, 0);
        flags_d.extend([alu.zero, alu.negative, alu.overflow]);
        c.bind_bus(flags.d, &flags_d)?;
        let alu_exec = and(c, decoder.alu, exec);
        c.bind(flags.w, alu_exec);

        let cmp = JmpCmp::new(c);
        c.bind_bus(cmp.cond, &decoder.reg_a)?;
        c.bind(cmp.zero, flags.out[13]);
        c.bind(cmp.negative, flags.out[14]);
        c.bind(cmp.overflow, flags.out[15]);

        // PC: advance on fetch unless injecting, load on a taken jump, and
        // clear while disabled.
        let pc = ProgramCounter::new(c, 16)?;
        let not_injecting = not(c, dbg_instr);
        let advance = and(c, fetch, not_injecting);
        c.bind(pc.en, advance);
        let zero_word = c.constant_bus(16, 0);
        let target = switch(c, &zero_word, &regs.b, enable)?;
        c.bind_bus(pc.input, &target)?;
        let taken = and(c, decoder.flag, cmp.out);
        let cmp_exec = and(c, decoder.cmp, exec);
        let jump = and(c, taken, cmp_exec);
        let load_pc = or(c, jump, disabled);
        c.bind(pc.w, load_pc);

        let x_reg = XReg::new(c)?;
        let x_addr = switch(c, &decoder.x_reg, &dbg_in[12..16], dbg_reg)?;
        c.bind_bus(x_reg.x_addr, &x_addr)?;
        c.bind_bus(x_reg.cpu_reg, &regs.a)?;
        c.bind_bus(x_reg.ip, &pc.out)?;
        c.bind_bus(x_reg.flags, &flags.out)?;

        let partial = PartialWrite::new(c)?;
        c.bind_bus(partial.old, &regs.a)?;
        c.bind_bus(partial.partial, &decoder.immediate)?;
        c.bind(partial.high, decoder.flag);

        // Register write data, later classes overriding earlier ones.
        let data = switch(c, &x_reg.out, &partial.out, decoder.set)?;
        let data = switch(c, &data, &alu.out, decoder.alu)?;
        let data = switch(c, &data, &mem_data, decoder.mem)?;
        let data = switch(c, &data, &io_data, decoder.io)?;
        let mut cmp_word = c.constant_bus(15, 0);
        cmp_word.push(cmp.out);
        let data = switch(c, &data, &cmp_word, decoder.cmp)?;
        c.bind_bus(regs.d, &data)?;

        // Register write address: B, or A for SET, or P/Q for ALU.
        let w_addr = switch(c, &decoder.reg_b, &decoder.reg_a, decoder.set)?;
        let p_or_q = vec![one, c.constant(false), decoder.flag];
        let w_addr = switch(c, &w_addr, &p_or_q, decoder.alu)?;
        c.bind_bus(regs.w_addr, &w_addr)?;

        // No register write on fetch, NOP, HLT, or the write forms of
        // CMP/MEM/IO.
        let idle = or(c, decoder.nop, decoder.hlt);
        let mem_or_io = or(c, decoder.mem, decoder.io);
        let flagged_class = or(c, decoder.cmp, mem_or_io);
        let flagged = and(c, decoder.flag, flagged_class);
        let suppressed = or(c, idle, flagged);
        let reg_write = nor(c, fetch, suppressed);
        c.bind(regs.w, reg_write);

        let operand = switch(c, &regs.a, &pc.out, fetch)?;
        let addr_out = switch(c, &operand, &dbg_in, dbg_mem)?;
        let dbg_out = switch(c, &x_reg.out, &mem_data, dbg_mem)?;

        let write_exec = and(c, decoder.flag, exec);
        let mem_write = and(c, decoder.mem, write_exec);
        let io_write = and(c, decoder.io, write_exec);
        let hlt = and(c, decoder.hlt, exec);
        let exec_active = and(c, exec, enable);

        Ok(Self {
            enable: enable_in,
            mem_data: mem_data_in,
            io_data: io_data_in,
            dbg_mode: dbg_mode_in,
            dbg_in: dbg_in_in,
            hlt,
            data_out: regs.b,
            addr_out,
            mem_write,
            io_write,
            dbg_out,
            exec_active,
        })
    }
}
