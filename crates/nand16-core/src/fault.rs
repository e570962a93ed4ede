use thiserror::Error;

/// Fault classes used to group faults by the layer that raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Malformed netlist: bad widths, unbound pins, combinational loops.
    Netlist,
    /// Interpreter rejected an instruction word.
    Decode,
    /// Peripheral bus misconfiguration.
    Io,
    /// Run-loop guard tripped.
    Run,
}

/// Every fatal condition the core can raise.
///
/// None of these are retried: each one points at a defect in the wiring or in
/// the caller-supplied bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// A bus was bound to a source bus of a different width.
    #[error("bus width mismatch: expected {expected} signals, found {found}")]
    WidthMismatch {
        /// Width of the sink bus.
        expected: usize,
        /// Width of the source bus.
        found: usize,
    },
    /// A chip was requested with a width it cannot be built with.
    #[error("invalid chip width {width}")]
    InvalidWidth {
        /// The rejected width.
        width: usize,
    },
    /// A sink was read before anything was bound to it.
    #[error("pin {node} read before being bound")]
    UnboundPin {
        /// Arena index of the unbound pin.
        node: usize,
    },
    /// Evaluation reached a node that is already being evaluated.
    #[error("combinational cycle through node {node}")]
    CombinationalCycle {
        /// Arena index where the loop closed.
        node: usize,
    },
    /// Two devices declared the same port in the same direction.
    #[error("port {port} already claimed by another device")]
    PortConflict {
        /// The contested port.
        port: u16,
    },
    /// The ROM image does not fit the bootloader's counter.
    #[error("rom of {len} words exceeds bootloader capacity")]
    RomTooLarge {
        /// ROM length in words.
        len: usize,
    },
    /// Register field does not name a known register.
    #[error("bad register code {code:#06b}")]
    UnknownRegister {
        /// The offending extended register code.
        code: u8,
    },
    /// ALU field does not name a known operation.
    #[error("bad alu code {code:#08b}")]
    UnknownAluCode {
        /// The offending 6-bit code.
        code: u8,
    },
    /// `run_until_halt` executed its whole budget without reaching `HLT`.
    #[error("no halt after {executed} instructions")]
    InstructionBudgetExceeded {
        /// Instructions executed before giving up.
        executed: u64,
    },
}

impl Fault {
    /// Returns the class of this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::WidthMismatch { .. }
            | Self::InvalidWidth { .. }
            | Self::UnboundPin { .. }
            | Self::CombinationalCycle { .. }
            | Self::RomTooLarge { .. } => FaultClass::Netlist,
            Self::UnknownRegister { .. } | Self::UnknownAluCode { .. } => FaultClass::Decode,
            Self::PortConflict { .. } => FaultClass::Io,
            Self::InstructionBudgetExceeded { .. } => FaultClass::Run,
        }
    }
}
