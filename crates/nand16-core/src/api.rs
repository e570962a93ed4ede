//! Host-facing machine contract shared by the interpreter and the gate-level
//! backend.

use crate::decoder::Instruction;
use crate::peripherals::IoController;
use crate::state::{GeneralRegister, Register, GENERAL_REGISTER_COUNT};
use crate::Fault;

/// Default bound on instructions executed by one `run_until_halt` call.
pub const DEFAULT_INSTRUCTION_BUDGET: u64 = 1 << 24;

/// Construction-time configuration for either backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ComputerConfig {
    /// Instructions `run_until_halt` may execute before giving up. `None`
    /// runs until `HLT` no matter how long that takes.
    pub instruction_budget: Option<u64>,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            instruction_budget: Some(DEFAULT_INSTRUCTION_BUDGET),
        }
    }
}

impl ComputerConfig {
    /// Configuration without an instruction budget.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            instruction_budget: None,
        }
    }

    pub(crate) fn check_budget(&self, executed: u64) -> Result<(), Fault> {
        match self.instruction_budget {
            Some(budget) if executed >= budget => {
                tracing::warn!(executed, "instruction budget exhausted before halt");
                Err(Fault::InstructionBudgetExceeded { executed })
            }
            _ => Ok(()),
        }
    }
}

/// Register file contents read through the debug surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineSnapshot {
    /// General registers in code order (`A` through `SP`).
    pub registers: [u16; GENERAL_REGISTER_COUNT],
    /// Address of the next instruction.
    pub ip: u16,
    /// `FLAGS` register.
    pub flags: u16,
}

impl MachineSnapshot {
    /// Value of one general register.
    #[must_use]
    pub const fn gpr(&self, reg: GeneralRegister) -> u16 {
        self.registers[reg.index()]
    }
}

/// A machine that runs a ROM image of 16-bit instruction words.
///
/// Both backends honour the same contract so that one can check the other
/// instruction for instruction. The debug methods never disturb the state a
/// running program observes.
pub trait Computer {
    /// The image loaded at address 0 on every reset.
    fn rom(&self) -> &[u16];

    /// Peripheral bus.
    fn io_controller(&self) -> &IoController;

    /// Mutable peripheral bus, for installing devices and feeding input.
    fn io_controller_mut(&mut self) -> &mut IoController;

    /// Reloads the ROM, zeroes `IP` and clears the halted state. General
    /// registers are not guaranteed to be cleared.
    ///
    /// # Errors
    ///
    /// Propagates evaluation faults.
    fn reset(&mut self) -> Result<(), Fault>;

    /// Executes exactly one instruction.
    ///
    /// # Errors
    ///
    /// Returns a decode fault for an undecodable word (interpreter only) and
    /// propagates evaluation faults.
    fn run_next_instruction(&mut self) -> Result<(), Fault>;

    /// Runs until a `HLT` executes. The `HLT` itself is consumed, so a second
    /// call resumes after it.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InstructionBudgetExceeded`] when the configured budget
    /// runs out first, plus anything `run_next_instruction` can return.
    fn run_until_halt(&mut self) -> Result<(), Fault>;

    /// Reads a register without consuming an instruction.
    ///
    /// # Errors
    ///
    /// Propagates evaluation faults.
    fn debug_register(&mut self, register: Register) -> Result<u16, Fault>;

    /// Reads a word of working memory without consuming an instruction.
    ///
    /// # Errors
    ///
    /// Propagates evaluation faults.
    fn debug_memory(&mut self, address: u16) -> Result<u16, Fault>;

    /// Executes `instructions` directly, without fetching them from memory.
    /// `IP` and `Q` hold the same values afterwards as before.
    ///
    /// # Errors
    ///
    /// Propagates evaluation faults.
    fn run_instructions(&mut self, instructions: &[Instruction]) -> Result<(), Fault>;

    /// Reads the whole register file through the debug surface.
    ///
    /// # Errors
    ///
    /// Propagates evaluation faults.
    fn snapshot(&mut self) -> Result<MachineSnapshot, Fault> {
        let mut snapshot = MachineSnapshot::default();
        for reg in GeneralRegister::ALL {
            snapshot.registers[reg.index()] = self.debug_register(reg.into())?;
        }
        snapshot.ip = self.debug_register(Register::Ip)?;
        snapshot.flags = self.debug_register(Register::Flags)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::{ComputerConfig, DEFAULT_INSTRUCTION_BUDGET};
    use crate::Fault;

    #[test]
    fn default_config_is_bounded() {
        assert_eq!(
            ComputerConfig::default().instruction_budget,
            Some(DEFAULT_INSTRUCTION_BUDGET)
        );
        assert_eq!(ComputerConfig::unbounded().instruction_budget, None);
    }

    #[test]
    fn budget_check_trips_at_the_limit() {
        let config = ComputerConfig {
            instruction_budget: Some(3),
        };
        assert_eq!(config.check_budget(2), Ok(()));
        assert_eq!(
            config.check_budget(3),
            Err(Fault::InstructionBudgetExceeded { executed: 3 })
        );
        assert_eq!(ComputerConfig::unbounded().check_budget(u64::MAX), Ok(()));
    }
}
