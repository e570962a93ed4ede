//! Instruction words: the tagged [`Instruction`] value and its 16-bit encoding.

use crate::encoding::{
    AluOperation, JumpCondition, OpcodeClass, ALU_MASK, FLAG_SHIFT, IMMEDIATE_MASK, OP_SHIFT,
    REG_A_SHIFT, REG_B_SHIFT,
};
use crate::state::{GeneralRegister, Register};
use crate::Fault;

/// One decoded instruction. Each variant carries only the fields its class
/// uses; everything else in the word is ignored on decode and zero on encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Instruction {
    /// Stop `run_until_halt`.
    Hlt,
    /// Do nothing.
    Nop,
    /// `dest = src`. The source may be `IP` or `FLAGS`.
    Mov {
        /// Register read.
        src: Register,
        /// Register written.
        dest: GeneralRegister,
    },
    /// Replace one byte of `dest` with `value`.
    Set {
        /// `true` replaces the high byte, `false` the low byte.
        high: bool,
        /// Register written.
        dest: GeneralRegister,
        /// Immediate byte.
        value: u8,
    },
    /// Evaluate `cond` against `FLAGS`: with `jump`, load `IP` from `reg` on a
    /// match; without, write 1 or 0 into `reg`.
    Cmp {
        /// Jump instead of storing the result.
        jump: bool,
        /// Condition tested.
        cond: JumpCondition,
        /// Jump target or result register.
        reg: GeneralRegister,
    },
    /// `P` (or `Q`) `= op(a, b)`, updating `FLAGS`.
    Alu {
        /// Write `Q` instead of `P`.
        q: bool,
        /// First operand.
        a: GeneralRegister,
        /// Second operand.
        b: GeneralRegister,
        /// Operation.
        op: AluOperation,
    },
    /// Memory access: `write` stores `data` at `[addr]`, otherwise loads it.
    Mem {
        /// Store instead of load.
        write: bool,
        /// Register holding the address.
        addr: GeneralRegister,
        /// Register stored or loaded.
        data: GeneralRegister,
    },
    /// Port access: `write` emits `data` on port `[port]`, otherwise reads it.
    Io {
        /// Output instead of input.
        write: bool,
        /// Register holding the port number.
        port: GeneralRegister,
        /// Register emitted or loaded.
        data: GeneralRegister,
    },
}

#[allow(clippy::cast_possible_truncation)]
const fn field(word: u16, shift: u16, mask: u16) -> u8 {
    ((word >> shift) & mask) as u8
}

const fn header(class: OpcodeClass, flag: bool) -> u16 {
    ((class.code() as u16) << OP_SHIFT) | ((flag as u16) << FLAG_SHIFT)
}

const fn regs(a: u8, b: u8) -> u16 {
    ((a as u16) << REG_A_SHIFT) | ((b as u16) << REG_B_SHIFT)
}

impl Instruction {
    /// Returns the instruction class.
    #[must_use]
    pub const fn class(self) -> OpcodeClass {
        match self {
            Self::Hlt => OpcodeClass::Hlt,
            Self::Nop => OpcodeClass::Nop,
            Self::Mov { .. } => OpcodeClass::Mov,
            Self::Set { .. } => OpcodeClass::Set,
            Self::Cmp { .. } => OpcodeClass::Cmp,
            Self::Alu { .. } => OpcodeClass::Alu,
            Self::Mem { .. } => OpcodeClass::Mem,
            Self::Io { .. } => OpcodeClass::Io,
        }
    }

    /// Encodes into one instruction word.
    #[must_use]
    pub fn encode(self) -> u16 {
        match self {
            Self::Hlt => header(OpcodeClass::Hlt, false),
            Self::Nop => header(OpcodeClass::Nop, false),
            // The 4-bit source code overlaps the flag bit.
            Self::Mov { src, dest } => {
                header(OpcodeClass::Mov, false) | regs(src.x_code(), dest.code())
            }
            Self::Set { high, dest, value } => {
                header(OpcodeClass::Set, high) | regs(dest.code(), 0) | u16::from(value)
            }
            Self::Cmp { jump, cond, reg } => {
                header(OpcodeClass::Cmp, jump) | regs(cond.code(), reg.code())
            }
            Self::Alu { q, a, b, op } => {
                header(OpcodeClass::Alu, q) | regs(a.code(), b.code()) | u16::from(op.code())
            }
            Self::Mem { write, addr, data } => {
                header(OpcodeClass::Mem, write) | regs(addr.code(), data.code())
            }
            Self::Io { write, port, data } => {
                header(OpcodeClass::Io, write) | regs(port.code(), data.code())
            }
        }
    }

    /// Decodes one instruction word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownRegister`] for a `MOV` source code above
    /// `FLAGS` and [`Fault::UnknownAluCode`] for an unassigned ALU code.
    pub fn decode(word: u16) -> Result<Self, Fault> {
        let flag = (word >> FLAG_SHIFT) & 1 == 1;
        let reg_a = GeneralRegister::from_u3(field(word, REG_A_SHIFT, 0b111));
        let reg_b = GeneralRegister::from_u3(field(word, REG_B_SHIFT, 0b111));

        Ok(match OpcodeClass::from_u3(field(word, OP_SHIFT, 0b111)) {
            OpcodeClass::Hlt => Self::Hlt,
            OpcodeClass::Nop => Self::Nop,
            OpcodeClass::Mov => Self::Mov {
                src: Register::from_x_code(field(word, REG_A_SHIFT, 0b1111))?,
                dest: reg_b,
            },
            OpcodeClass::Set => Self::Set {
                high: flag,
                dest: reg_a,
                value: field(word, 0, IMMEDIATE_MASK),
            },
            OpcodeClass::Cmp => Self::Cmp {
                jump: flag,
                cond: JumpCondition::from_code(field(word, REG_A_SHIFT, 0b111)),
                reg: reg_b,
            },
            OpcodeClass::Alu => {
                let code = field(word, 0, ALU_MASK);
                Self::Alu {
                    q: flag,
                    a: reg_a,
                    b: reg_b,
                    op: AluOperation::from_code(code).ok_or(Fault::UnknownAluCode { code })?,
                }
            }
            OpcodeClass::Mem => Self::Mem {
                write: flag,
                addr: reg_a,
                data: reg_b,
            },
            OpcodeClass::Io => Self::Io {
                write: flag,
                port: reg_a,
                data: reg_b,
            },
        })
    }
}

impl From<Instruction> for u16 {
    fn from(instruction: Instruction) -> Self {
        instruction.encode()
    }
}

impl TryFrom<u16> for Instruction {
    type Error = Fault;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        Self::decode(word)
    }
}
