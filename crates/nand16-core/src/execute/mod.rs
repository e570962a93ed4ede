//! Bytecode interpreter: decodes and executes ROM words directly against an
//! integer register file, with no gate network behind it.
//!
//! It is the fast path for running programs and the reference the gate-level
//! backend is checked against.

mod step;

use tracing::{debug, trace};

use crate::api::{Computer, ComputerConfig};
use crate::decoder::Instruction;
use crate::memory::ADDRESS_SPACE_WORDS;
use crate::peripherals::IoController;
use crate::state::{ArchitecturalState, GeneralRegister, Register, RunState};
use crate::Fault;
use step::{execute, StepOutcome};

/// Fetch-decode-execute machine over a 64 Ki-word working memory.
#[derive(Debug)]
pub struct Interpreter {
    rom: Vec<u16>,
    config: ComputerConfig,
    arch: ArchitecturalState,
    ram: Box<[u16]>,
    run_state: RunState,
    io: IoController,
}

impl Interpreter {
    /// Builds an interpreter with the default configuration and loads `rom`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RomTooLarge`] when `rom` does not fit the address space.
    pub fn new(rom: Vec<u16>) -> Result<Self, Fault> {
        Self::with_config(rom, ComputerConfig::default())
    }

    /// Builds an interpreter and loads `rom`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RomTooLarge`] when `rom` does not fit the address space.
    pub fn with_config(rom: Vec<u16>, config: ComputerConfig) -> Result<Self, Fault> {
        if rom.len() >= ADDRESS_SPACE_WORDS {
            return Err(Fault::RomTooLarge { len: rom.len() });
        }
        let mut interpreter = Self {
            rom,
            config,
            arch: ArchitecturalState::default(),
            ram: vec![0; ADDRESS_SPACE_WORDS].into_boxed_slice(),
            run_state: RunState::default(),
            io: IoController::new(),
        };
        interpreter.load_rom();
        Ok(interpreter)
    }

    /// Current register file.
    #[must_use]
    pub const fn state(&self) -> &ArchitecturalState {
        &self.arch
    }

    /// Whether a `HLT` retired since `run_until_halt` last started or returned.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Configuration this interpreter was built with.
    #[must_use]
    pub const fn config(&self) -> &ComputerConfig {
        &self.config
    }

    fn load_rom(&mut self) {
        self.arch.set_ip(0);
        self.run_state = RunState::Running;
        self.ram[..self.rom.len()].copy_from_slice(&self.rom);
    }

    fn exec(&mut self, instruction: Instruction) {
        if execute(&mut self.arch, &mut self.ram, &mut self.io, instruction) == StepOutcome::Halted
        {
            self.run_state = RunState::Halted;
        }
        self.io.update_devices();
    }
}

impl Computer for Interpreter {
    fn rom(&self) -> &[u16] {
        &self.rom
    }

    fn io_controller(&self) -> &IoController {
        &self.io
    }

    fn io_controller_mut(&mut self) -> &mut IoController {
        &mut self.io
    }

    fn reset(&mut self) -> Result<(), Fault> {
        self.load_rom();
        debug!(rom_words = self.rom.len(), "interpreter reset");
        Ok(())
    }

    fn run_next_instruction(&mut self) -> Result<(), Fault> {
        let ip = self.arch.ip();
        let word = self.ram[usize::from(ip)];
        let instruction = Instruction::decode(word)?;
        trace!(ip, word, %instruction, "retire");
        self.arch.set_ip(ip.wrapping_add(1));
        self.exec(instruction);
        Ok(())
    }

    fn run_until_halt(&mut self) -> Result<(), Fault> {
        // Only a HLT retired by this call stops it.
        self.run_state = RunState::Running;
        let mut executed = 0_u64;
        while !self.run_state.is_halted() {
            self.config.check_budget(executed)?;
            self.run_next_instruction()?;
            executed += 1;
        }
        debug!(executed, ip = self.arch.ip(), "halted");
        self.run_state = RunState::Running;
        Ok(())
    }

    fn debug_register(&mut self, register: Register) -> Result<u16, Fault> {
        Ok(self.arch.read(register))
    }

    fn debug_memory(&mut self, address: u16) -> Result<u16, Fault> {
        Ok(self.ram[usize::from(address)])
    }

    fn run_instructions(&mut self, instructions: &[Instruction]) -> Result<(), Fault> {
        let ip = self.arch.ip();
        let q = self.arch.gpr(GeneralRegister::Q);
        let run_state = self.run_state;
        for &instruction in instructions {
            self.exec(instruction);
        }
        self.arch.set_ip(ip);
        self.arch.set_gpr(GeneralRegister::Q, q);
        self.run_state = run_state;
        Ok(())
    }
}
