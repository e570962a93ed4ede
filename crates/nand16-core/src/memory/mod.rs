//! Sequential storage built on flip-flops, plus the flat-table RAM used for
//! the full 16-bit address space.

/// Multi-bit register with combinational write enable.
pub mod register;
/// Binary-tree RAM and its flat-table substitute.
pub mod ram;

pub use ram::{Ram, VirtualRam};
pub use register::Register;

/// Number of addressable words in the 16-bit address space.
pub const ADDRESS_SPACE_WORDS: usize = u16::MAX as usize + 1;
