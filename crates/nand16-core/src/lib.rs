//! A 16-bit computer built twice: once from NAND gates and flip-flops, once
//! as a bytecode interpreter, both behind the [`Computer`] trait.

/// Fault taxonomy shared by the netlist, the decoder and the run loops.
pub mod fault;
pub use fault::{Fault, FaultClass};

pub mod hdl;
pub use hdl::{Bus, BusSource, Circuit, CircuitStats, Clocked, InBus, InPin, Signal, SourceId};

pub mod gates;

pub mod memory;
pub use memory::{Ram, VirtualRam, ADDRESS_SPACE_WORDS};

pub mod state;
pub use state::{ArchitecturalState, GeneralRegister, Register, RunState, GENERAL_REGISTER_COUNT};

/// Instruction field layout, ALU operation table and jump conditions.
pub mod encoding;
pub use encoding::{AluOperation, AluOutput, JumpCondition, OpcodeClass};

pub mod decoder;
pub use decoder::Instruction;

pub mod disasm;
pub use disasm::{disassemble, disassemble_window, DisassemblyRow};

pub mod api;
pub use api::{Computer, ComputerConfig, MachineSnapshot, DEFAULT_INSTRUCTION_BUDGET};

pub mod peripherals;
pub use peripherals::{DeviceId, IoController, IoDevice, IoListener, PortBuffers};

pub mod execute;
pub use execute::Interpreter;

pub mod cpu;
pub use cpu::Cpu;

pub mod machine;
pub use machine::HardwareComputer;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
