//! Instruction disassembly.
//!
//! [`Instruction`] renders as one line of assembly through `Display`;
//! [`disassemble`] walks a memory image word by word, rendering anything the
//! decoder rejects as a `.word` directive.

use std::fmt;

use crate::decoder::Instruction;
use crate::encoding::JumpCondition;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled word.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the word.
    pub addr: u16,
    /// Raw instruction word.
    pub word: u16,
    /// Decoded instruction, `None` when the word does not decode.
    pub instruction: Option<Instruction>,
    /// Rendered assembly text.
    pub text: String,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}: {:04X}  {}", self.addr, self.word, self.text)
    }
}

/// Disassembles `words`, assuming the first one lives at address 0. Words
/// past the 16-bit address space are not rendered.
#[must_use]
pub fn disassemble(words: &[u16]) -> Vec<DisassemblyRow> {
    words
        .iter()
        .enumerate()
        .map_while(|(addr, &word)| u16::try_from(addr).ok().map(|addr| row(addr, word)))
        .collect()
}

/// Disassembles up to `before` words ahead of `center` and `after` words past
/// it, clamped to `memory`.
#[must_use]
pub fn disassemble_window(
    center: u16,
    before: usize,
    after: usize,
    memory: &[u16],
) -> Vec<DisassemblyRow> {
    let center = usize::from(center);
    let start = center.saturating_sub(before);
    let end = center.saturating_add(after).saturating_add(1).min(memory.len());
    (start..end)
        .zip(memory.get(start..end).unwrap_or_default())
        .filter_map(|(addr, &word)| u16::try_from(addr).ok().map(|addr| row(addr, word)))
        .collect()
}

fn row(addr: u16, word: u16) -> DisassemblyRow {
    let instruction = Instruction::decode(word).ok();
    let text = instruction.map_or_else(|| format!(".word 0x{word:04X}"), |i| i.to_string());
    DisassemblyRow {
        addr,
        word,
        instruction,
        text,
    }
}

struct Condition(JumpCondition);

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            JumpCondition::NEVER => return f.write_str("NEVER"),
            JumpCondition::ALWAYS => return f.write_str("ALWAYS"),
            _ => {}
        }
        let names = [(self.0.eq, "EQ"), (self.0.lt, "LT"), (self.0.gt, "GT")];
        let mut sep = "";
        for (_, name) in names.iter().filter(|(set, _)| *set) {
            write!(f, "{sep}{name}")?;
            sep = "|";
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Hlt => f.write_str("HLT"),
            Self::Nop => f.write_str("NOP"),
            Self::Mov { src, dest } => write!(f, "MOV {}, {}", dest.name(), src.name()),
            Self::Set { high, dest, value } => {
                let side = if high { "SETH" } else { "SETL" };
                write!(f, "{side} {}, 0x{value:02X}", dest.name())
            }
            Self::Cmp { jump, cond, reg } => {
                let op = if jump { "JMP" } else { "CMP" };
                write!(f, "{op} {}, {}", Condition(cond), reg.name())
            }
            Self::Alu { q, a, b, op } => {
                let dest = if q { "Q" } else { "P" };
                write!(f, "ALU {dest}, {}, {}, {}", op.name(), a.name(), b.name())
            }
            Self::Mem { write: true, addr, data } => {
                write!(f, "STORE [{}], {}", addr.name(), data.name())
            }
            Self::Mem { write: false, addr, data } => {
                write!(f, "LOAD {}, [{}]", data.name(), addr.name())
            }
            Self::Io { write: true, port, data } => {
                write!(f, "OUT [{}], {}", port.name(), data.name())
            }
            Self::Io { write: false, port, data } => {
                write!(f, "IN {}, [{}]", data.name(), port.name())
            }
        }
    }
}
