//! The gate-level computer: bootloader, CPU, working memory and the port bus
//! on one clock.
//!
//! Between host calls the machine rests in the execute phase with the next
//! instruction already fetched, so one instruction is always exactly two
//! edges: execute, then fetch the following word.

/// ROM copy sequencer.
pub mod bootloader;
/// Port bus adapter.
pub mod io;

pub use bootloader::Bootloader;
pub use io::HardwareIoController;

use tracing::{debug, info};

use crate::api::{Computer, ComputerConfig};
use crate::cpu::{Cpu, DEBUG_INJECT, DEBUG_MEMORY, DEBUG_OFF, DEBUG_REGISTER};
use crate::decoder::Instruction;
use crate::encoding::JumpCondition;
use crate::gates::{nor, or, switch};
use crate::hdl::{Bus, BusSource, Circuit, CircuitStats, Signal, SourceId};
use crate::memory::VirtualRam;
use crate::peripherals::IoController;
use crate::state::{GeneralRegister, Register};
use crate::Fault;

/// A [`Computer`] evaluated through NAND gates and flip-flops.
#[derive(Debug)]
pub struct HardwareComputer {
    rom: Vec<u16>,
    config: ComputerConfig,
    circuit: Circuit,
    io: HardwareIoController,
    rst: SourceId,
    dbg_mode: BusSource,
    dbg_in: BusSource,
    exec_active: Signal,
    hlt: Signal,
    dbg_out: Bus,
}

impl HardwareComputer {
    /// Builds the machine with the default configuration and boots `rom`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RomTooLarge`] when the image does not fit, or a
    /// netlist fault if the wiring fails validation.
    pub fn new(rom: Vec<u16>) -> Result<Self, Fault> {
        Self::with_config(rom, ComputerConfig::default())
    }

    /// Builds the machine and boots `rom`.
    ///
    /// # Errors
    ///
    /// See [`HardwareComputer::new`].
    pub fn with_config(rom: Vec<u16>, config: ComputerConfig) -> Result<Self, Fault> {
        let mut c = Circuit::new();
        let rst = c.source(false);
        let dbg_mode = BusSource::new(&mut c, 2);
        let dbg_in = BusSource::new(&mut c, 16);

        let boot = Bootloader::new(&mut c, &rom)?;
        c.bind(boot.rst, rst.signal());
        let cpu = Cpu::new(&mut c)?;
        let ram = VirtualRam::new(&mut c, 16, 16)?;

        // The bootloader owns memory while it runs.
        let ram_w = or(&mut c, boot.w, cpu.mem_write);
        c.bind(ram.w, ram_w);
        let ram_in = switch(&mut c, &cpu.data_out, &boot.data, boot.w)?;
        c.bind_bus(ram.input, &ram_in)?;
        let ram_addr = switch(&mut c, &cpu.addr_out, &boot.addr, boot.w)?;
        c.bind_bus(ram.addr, &ram_addr)?;
        c.bind_bus(cpu.mem_data, &ram.out)?;

        let enable = nor(&mut c, rst.signal(), boot.w);
        c.bind(cpu.enable, enable);
        c.bind_bus(cpu.dbg_mode, dbg_mode.bus())?;
        c.bind_bus(cpu.dbg_in, dbg_in.bus())?;

        let io = HardwareIoController::new(&mut c, cpu.addr_out, cpu.data_out, cpu.io_write)?;
        c.bind_bus(cpu.io_data, io.read_lines())?;

        c.validate()?;
        debug!(stats = ?c.stats(), "netlist built");

        let mut computer = Self {
            rom,
            config,
            circuit: c,
            io,
            rst,
            dbg_mode,
            dbg_in,
            exec_active: cpu.exec_active,
            hlt: cpu.hlt,
            dbg_out: cpu.dbg_out,
        };
        let edges = computer.settle()?;
        info!(rom_words = computer.rom.len(), edges, "bootloader done");
        Ok(computer)
    }

    /// Node counts of the netlist.
    #[must_use]
    pub fn stats(&self) -> CircuitStats {
        self.circuit.stats()
    }

    /// The underlying circuit.
    #[must_use]
    pub const fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Configuration this machine was built with.
    #[must_use]
    pub const fn config(&self) -> &ComputerConfig {
        &self.config
    }

    fn pulse(&mut self) -> Result<(), Fault> {
        self.io.sync_inputs(&mut self.circuit);
        self.circuit.pulse_with(&mut [&mut self.io])
    }

    /// Clocks until the CPU rests in execute, returning the edge count.
    fn settle(&mut self) -> Result<u64, Fault> {
        let mut edges = 0;
        while !self.circuit.read(self.exec_active)? {
            self.pulse()?;
            edges += 1;
        }
        Ok(edges)
    }

    fn debug_read(&mut self, mode: u64, operand: u16) -> Result<u16, Fault> {
        self.dbg_in.set(&mut self.circuit, u64::from(operand));
        self.dbg_mode.set(&mut self.circuit, mode);
        let value = self.circuit.read_word(&self.dbg_out);
        self.dbg_mode.set(&mut self.circuit, DEBUG_OFF);
        value
    }

    /// Loads `PC` with `ip` through Q, then puts Q back. Must run in
    /// injection mode; `last_edges` is the edge count of the final step.
    fn jump_restoring_q(&mut self, ip: u16, q: u16, last_edges: usize) -> Result<(), Fault> {
        self.inject(set_byte(true, ip), 2)?;
        self.inject(set_byte(false, ip), 2)?;
        self.inject(JUMP_THROUGH_Q, 2)?;
        self.inject(set_byte(true, q), 2)?;
        self.inject(set_byte(false, q), last_edges)
    }

    /// Executes `instruction` in injection mode over `edges` edges.
    fn inject(&mut self, instruction: Instruction, edges: usize) -> Result<(), Fault> {
        self.dbg_in
            .set(&mut self.circuit, u64::from(instruction.encode()));
        for _ in 0..edges {
            self.pulse()?;
        }
        Ok(())
    }
}

const JUMP_THROUGH_Q: Instruction = Instruction::Cmp {
    jump: true,
    cond: JumpCondition::ALWAYS,
    reg: GeneralRegister::Q,
};

fn set_byte(high: bool, value: u16) -> Instruction {
    let [hi, lo] = value.to_be_bytes();
    Instruction::Set {
        high,
        dest: GeneralRegister::Q,
        value: if high { hi } else { lo },
    }
}

impl Computer for HardwareComputer {
    fn rom(&self) -> &[u16] {
        &self.rom
    }

    fn io_controller(&self) -> &IoController {
        self.io.controller()
    }

    fn io_controller_mut(&mut self) -> &mut IoController {
        self.io.controller_mut()
    }

    fn reset(&mut self) -> Result<(), Fault> {
        self.circuit.set_source(self.rst, true);
        self.pulse()?;
        self.circuit.set_source(self.rst, false);
        let edges = self.settle()?;
        info!(rom_words = self.rom.len(), edges, "hardware reset");
        Ok(())
    }

    fn run_next_instruction(&mut self) -> Result<(), Fault> {
        self.pulse()?;
        self.pulse()
    }

    fn run_until_halt(&mut self) -> Result<(), Fault> {
        let mut executed = 0_u64;
        loop {
            self.config.check_budget(executed)?;
            let halting = self.circuit.read(self.hlt)?;
            self.run_next_instruction()?;
            executed += 1;
            if halting {
                break;
            }
        }
        debug!(executed, "halted");
        Ok(())
    }

    fn debug_register(&mut self, register: Register) -> Result<u16, Fault> {
        let value = self.debug_read(DEBUG_REGISTER, u16::from(register.x_code()))?;
        // The counter has already moved past the fetched instruction.
        Ok(match register {
            Register::Ip => value.wrapping_sub(1),
            _ => value,
        })
    }

    fn debug_memory(&mut self, address: u16) -> Result<u16, Fault> {
        self.debug_read(DEBUG_MEMORY, address)
    }

    fn run_instructions(&mut self, instructions: &[Instruction]) -> Result<(), Fault> {
        let ip = self.debug_register(Register::Ip)?;
        let q = self.debug_register(GeneralRegister::Q.into())?;

        self.dbg_mode.set(&mut self.circuit, DEBUG_INJECT);
        // Fetches made while injecting do not advance the counter, so once it
        // is parked on `ip` the injected code reads `IP` as the interpreter
        // does.
        self.jump_restoring_q(ip, q, 2)?;
        for &instruction in instructions {
            self.inject(instruction, 2)?;
        }
        // The last fetch is left to normal mode.
        self.jump_restoring_q(ip, q, 1)?;
        self.dbg_mode.set(&mut self.circuit, DEBUG_OFF);
        self.dbg_in.set(&mut self.circuit, 0);
        self.pulse()
    }
}

#[cfg(test)]
mod tests {
    use super::HardwareComputer;
    use crate::api::{Computer, ComputerConfig};
    use crate::decoder::Instruction;
    use crate::encoding::{AluOperation, JumpCondition};
    use crate::peripherals::IoListener;
    use crate::state::{GeneralRegister, Register};
    use crate::Fault;

    fn program(instructions: &[Instruction]) -> Vec<u16> {
        instructions.iter().map(|i| i.encode()).collect()
    }

    fn set(dest: GeneralRegister, value: u16) -> [Instruction; 2] {
        let [high, low] = value.to_be_bytes();
        [
            Instruction::Set {
                high: true,
                dest,
                value: high,
            },
            Instruction::Set {
                high: false,
                dest,
                value: low,
            },
        ]
    }

    #[test]
    fn boot_copies_the_rom_and_rests_at_zero() {
        let rom = vec![0x2000, 0xBEEF, 0x1234];
        let mut hw = HardwareComputer::new(rom.clone()).unwrap();
        for (address, word) in (0_u16..).zip(rom) {
            assert_eq!(hw.debug_memory(address), Ok(word));
        }
        assert_eq!(hw.debug_memory(3), Ok(0));
        assert_eq!(hw.debug_register(Register::Ip), Ok(0));
        assert!(hw.stats().nands > 0);
    }

    #[test]
    fn empty_rom_halts_on_zeroed_memory() {
        let mut hw = HardwareComputer::new(Vec::new()).unwrap();
        hw.run_until_halt().unwrap();
        assert_eq!(hw.debug_register(Register::Ip), Ok(1));
    }

    #[test]
    fn one_instruction_per_call() {
        let mut rom = program(&set(GeneralRegister::B, 0x0A0B));
        rom.push(Instruction::Hlt.encode());
        let mut hw = HardwareComputer::new(rom).unwrap();
        hw.run_next_instruction().unwrap();
        assert_eq!(hw.debug_register(Register::Ip), Ok(1));
        assert_eq!(hw.debug_register(GeneralRegister::B.into()), Ok(0x0A00));
        hw.run_next_instruction().unwrap();
        assert_eq!(hw.debug_register(GeneralRegister::B.into()), Ok(0x0A0B));
    }

    #[test]
    fn run_until_halt_consumes_the_hlt() {
        let mut hw = HardwareComputer::new(program(&[
            Instruction::Nop,
            Instruction::Hlt,
            Instruction::Nop,
            Instruction::Hlt,
        ]))
        .unwrap();
        hw.run_until_halt().unwrap();
        assert_eq!(hw.debug_register(Register::Ip), Ok(2));
        hw.run_until_halt().unwrap();
        assert_eq!(hw.debug_register(Register::Ip), Ok(4));
    }

    #[test]
    fn budget_stops_a_runaway_loop() {
        let mut rom = program(&set(GeneralRegister::A, 0));
        rom.push(
            Instruction::Cmp {
                jump: true,
                cond: JumpCondition::ALWAYS,
                reg: GeneralRegister::A,
            }
            .encode(),
        );
        let mut hw = HardwareComputer::with_config(
            rom,
            ComputerConfig {
                instruction_budget: Some(20),
            },
        )
        .unwrap();
        assert_eq!(
            hw.run_until_halt(),
            Err(Fault::InstructionBudgetExceeded { executed: 20 })
        );
    }

    #[test]
    fn memory_writes_and_flags() {
        let mut rom = program(&set(GeneralRegister::A, 0x7FFF));
        rom.extend(program(&set(GeneralRegister::B, 0x0100)));
        rom.extend(program(&[
            Instruction::Mem {
                write: true,
                addr: GeneralRegister::B,
                data: GeneralRegister::A,
            },
            Instruction::Alu {
                q: false,
                a: GeneralRegister::A,
                b: GeneralRegister::A,
                op: AluOperation::APlusB,
            },
            Instruction::Mov {
                src: Register::Flags,
                dest: GeneralRegister::C,
            },
            Instruction::Hlt,
        ]));
        let mut hw = HardwareComputer::new(rom).unwrap();
        hw.run_until_halt().unwrap();
        assert_eq!(hw.debug_memory(0x0100), Ok(0x7FFF));
        assert_eq!(hw.debug_register(GeneralRegister::P.into()), Ok(0xFFFE));
        assert_eq!(hw.debug_register(GeneralRegister::C.into()), Ok(0b011));
    }

    #[test]
    fn injected_instructions_preserve_ip_and_q() {
        let mut rom = program(&set(GeneralRegister::Q, 0x4321));
        rom.extend(program(&[Instruction::Nop, Instruction::Hlt]));
        let mut hw = HardwareComputer::new(rom).unwrap();
        for _ in 0..3 {
            hw.run_next_instruction().unwrap();
        }
        let mut injected = set(GeneralRegister::Q, 0xBEEF).to_vec();
        injected.extend(set(GeneralRegister::C, 0x0102));
        injected.push(Instruction::Alu {
            q: false,
            a: GeneralRegister::C,
            b: GeneralRegister::C,
            op: AluOperation::APlusB,
        });
        hw.run_instructions(&injected).unwrap();
        let snapshot = hw.snapshot().unwrap();
        assert_eq!(snapshot.ip, 3);
        assert_eq!(snapshot.gpr(GeneralRegister::Q), 0x4321);
        assert_eq!(snapshot.gpr(GeneralRegister::C), 0x0102);
        assert_eq!(snapshot.gpr(GeneralRegister::P), 0x0204);

        hw.run_until_halt().unwrap();
        assert_eq!(hw.debug_register(Register::Ip), Ok(5));
    }

    #[test]
    fn injected_mov_ip_sees_the_pending_address() {
        let mut hw = HardwareComputer::new(program(&[
            Instruction::Nop,
            Instruction::Nop,
            Instruction::Hlt,
        ]))
        .unwrap();
        hw.run_next_instruction().unwrap();
        hw.run_instructions(&[Instruction::Mov {
            src: Register::Ip,
            dest: GeneralRegister::D,
        }])
        .unwrap();
        assert_eq!(hw.debug_register(GeneralRegister::D.into()), Ok(1));
        hw.run_until_halt().unwrap();
        assert_eq!(hw.debug_register(Register::Ip), Ok(3));
    }

    #[test]
    fn reset_reboots_without_clearing_registers() {
        let mut rom = program(&set(GeneralRegister::A, 0x00FF));
        rom.extend(program(&[
            Instruction::Mem {
                write: true,
                addr: GeneralRegister::B,
                data: GeneralRegister::A,
            },
            Instruction::Hlt,
        ]));
        let mut hw = HardwareComputer::new(rom).unwrap();
        hw.run_until_halt().unwrap();
        assert_eq!(hw.debug_memory(0), Ok(0x00FF));
        hw.reset().unwrap();
        assert_eq!(hw.debug_memory(0), Ok(hw.rom()[0]));
        assert_eq!(hw.debug_register(Register::Ip), Ok(0));
        assert_eq!(hw.debug_register(GeneralRegister::A.into()), Ok(0x00FF));
    }

    #[test]
    fn io_round_trip_through_devices() {
        let mut rom = program(&set(GeneralRegister::A, 9));
        rom.extend(program(&set(GeneralRegister::B, 2)));
        rom.extend(program(&[
            Instruction::Io {
                write: true,
                port: GeneralRegister::B,
                data: GeneralRegister::A,
            },
            Instruction::Io {
                write: false,
                port: GeneralRegister::B,
                data: GeneralRegister::D,
            },
            Instruction::Hlt,
        ]));
        let mut hw = HardwareComputer::new(rom).unwrap();
        let id = hw.io_controller_mut().install(IoListener::new(2)).unwrap();
        hw.io_controller_mut().write_input(2, 0x5555);
        hw.run_until_halt().unwrap();
        assert_eq!(
            hw.io_controller().device(id).map(IoListener::output),
            Some(&[9][..])
        );
        assert_eq!(hw.debug_register(GeneralRegister::D.into()), Ok(0x5555));
    }
}
