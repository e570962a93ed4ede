//! Semantics of one decoded instruction against the interpreter's state.

use crate::decoder::Instruction;
use crate::peripherals::IoController;
use crate::state::{ArchitecturalState, GeneralRegister};

/// What a retired instruction asks of the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StepOutcome {
    Retired,
    Halted,
}

/// Applies `instruction`. `IP` must already point past it.
pub(super) fn execute(
    arch: &mut ArchitecturalState,
    ram: &mut [u16],
    io: &mut IoController,
    instruction: Instruction,
) -> StepOutcome {
    match instruction {
        Instruction::Hlt => return StepOutcome::Halted,
        Instruction::Nop => {}
        Instruction::Mov { src, dest } => arch.set_gpr(dest, arch.read(src)),
        Instruction::Set { high, dest, value } => {
            arch.set_gpr(dest, merge_byte(arch.gpr(dest), high, value));
        }
        Instruction::Cmp { jump, cond, reg } => {
            let matched = cond.matches_flags(arch.flags());
            if jump {
                if matched {
                    arch.set_ip(arch.gpr(reg));
                }
            } else {
                arch.set_gpr(reg, u16::from(matched));
            }
        }
        Instruction::Alu { q, a, b, op } => {
            let out = op.evaluate(arch.gpr(a), arch.gpr(b));
            let dest = if q {
                GeneralRegister::Q
            } else {
                GeneralRegister::P
            };
            arch.set_gpr(dest, out.value);
            arch.set_flags(out.flags());
        }
        Instruction::Mem { write, addr, data } => {
            let slot = usize::from(arch.gpr(addr));
            if write {
                ram[slot] = arch.gpr(data);
            } else {
                arch.set_gpr(data, ram[slot]);
            }
        }
        Instruction::Io { write, port, data } => {
            let port = arch.gpr(port);
            if write {
                io.latch_output(port, arch.gpr(data));
            } else {
                arch.set_gpr(data, io.ports().read_input(port));
            }
        }
    }
    StepOutcome::Retired
}

/// Replaces the high or low byte of `word`.
const fn merge_byte(word: u16, high: bool, value: u8) -> u16 {
    if high {
        (word & 0x00FF) | ((value as u16) << 8)
    } else {
        (word & 0xFF00) | value as u16
    }
}
