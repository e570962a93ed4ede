//! Host contract shared by both backends: reset, debug reads, injection and
//! the port bus.

use nand16_core::{
    AluOperation, Computer, GeneralRegister, HardwareComputer, Instruction, Interpreter,
    IoDevice, IoListener, JumpCondition, PortBuffers, Register,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use GeneralRegister::{A, B, C, P, Q};

#[derive(Debug, Clone, Copy)]
enum Backend {
    Interpreter,
    Hardware,
}

fn boot(backend: Backend, rom: Vec<u16>) -> Box<dyn Computer> {
    match backend {
        Backend::Interpreter => Box::new(Interpreter::new(rom).unwrap()),
        Backend::Hardware => Box::new(HardwareComputer::new(rom).unwrap()),
    }
}

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

/// Sums `A` into `B` three times, storing each partial sum at `[C]`.
fn accumulate() -> Vec<u16> {
    let mut rom = Vec::new();
    rom.extend(set(A, 0x0011));
    rom.extend(set(C, 0x0200));
    for _ in 0..3 {
        rom.extend([
            Instruction::Alu {
                q: false,
                a: A,
                b: B,
                op: AluOperation::APlusB,
            },
            Instruction::Mov {
                src: Register::General(P),
                dest: B,
            },
            Instruction::Mem {
                write: true,
                addr: C,
                data: B,
            },
        ]);
    }
    rom.push(Instruction::Hlt);
    program(&rom)
}

#[rstest]
#[case::interpreter(Backend::Interpreter)]
#[case::hardware(Backend::Hardware)]
fn reset_is_idempotent(#[case] backend: Backend) {
    let mut computer = boot(backend, accumulate());
    computer.run_until_halt().unwrap();
    let first = computer.snapshot().unwrap();
    assert_eq!(first.gpr(B), 0x0033);
    assert_eq!(computer.debug_memory(0x0200), Ok(0x0033));

    computer.reset().unwrap();
    assert_eq!(computer.debug_register(Register::Ip), Ok(0));
    computer.run_until_halt().unwrap();
    let second = computer.snapshot().unwrap();
    // B carries over, so the second run starts from 0x33.
    assert_eq!(second.gpr(B), 0x0066);

    computer.reset().unwrap();
    computer.reset().unwrap();
    assert_eq!(computer.debug_register(Register::Ip), Ok(0));
    let rom = computer.rom().to_vec();
    for (address, word) in (0_u16..).zip(rom) {
        assert_eq!(computer.debug_memory(address), Ok(word));
    }
}

#[rstest]
#[case::interpreter(Backend::Interpreter)]
#[case::hardware(Backend::Hardware)]
fn debug_reads_are_transparent(#[case] backend: Backend) {
    let mut plain = boot(backend, accumulate());
    let mut probed = boot(backend, accumulate());
    for _ in 0..accumulate().len() {
        plain.run_next_instruction().unwrap();
        for address in [0, 0x0200, 0xFFFF] {
            probed.debug_memory(address).unwrap();
        }
        probed.snapshot().unwrap();
        probed.run_next_instruction().unwrap();
        assert_eq!(probed.snapshot().unwrap(), plain.snapshot().unwrap());
    }
    assert_eq!(probed.debug_memory(0x0200), plain.debug_memory(0x0200));
}

#[rstest]
#[case::interpreter(Backend::Interpreter)]
#[case::hardware(Backend::Hardware)]
fn injection_leaves_the_program_on_course(#[case] backend: Backend) {
    let mut computer = boot(backend, accumulate());
    for _ in 0..5 {
        computer.run_next_instruction().unwrap();
    }
    let before = computer.snapshot().unwrap();

    let mut injected = set(Q, 0xFFFF).to_vec();
    injected.extend(set(C, 0x0300));
    computer.run_instructions(&injected).unwrap();

    let after = computer.snapshot().unwrap();
    assert_eq!(after.ip, before.ip);
    assert_eq!(after.gpr(Q), before.gpr(Q));
    assert_eq!(after.gpr(C), 0x0300);

    computer.run_until_halt().unwrap();
    assert_eq!(computer.debug_memory(0x0300), Ok(0x0033));
    assert_eq!(computer.debug_memory(0x0200), Ok(0));
}

#[rstest]
#[case::interpreter(Backend::Interpreter)]
#[case::hardware(Backend::Hardware)]
fn injected_memory_and_io_take_effect(#[case] backend: Backend) {
    let mut computer = boot(backend, program(&[Instruction::Hlt]));
    let id = computer
        .io_controller_mut()
        .install(IoListener::new(4))
        .unwrap();
    let mut injected = set(A, 0x0ABC).to_vec();
    injected.extend(set(B, 4));
    injected.extend([
        Instruction::Mem {
            write: true,
            addr: B,
            data: A,
        },
        Instruction::Io {
            write: true,
            port: B,
            data: A,
        },
        Instruction::Nop,
    ]);
    computer.run_instructions(&injected).unwrap();
    assert_eq!(computer.debug_memory(4), Ok(0x0ABC));
    assert_eq!(
        computer.io_controller().device(id).map(IoListener::output),
        Some(&[0x0ABC][..])
    );
    computer.run_until_halt().unwrap();
    assert_eq!(computer.debug_register(Register::Ip), Ok(1));
}

/// Answers every write on port 1 with the value doubled on port 1.
struct Doubler;

impl IoDevice for Doubler {
    fn input_ports(&self) -> Vec<u16> {
        vec![1]
    }

    fn output_ports(&self) -> Vec<u16> {
        vec![1]
    }

    fn update(&mut self, ports: &mut PortBuffers) {
        let value = ports.read_output(1);
        ports.write_input(1, value.wrapping_mul(2));
    }
}

#[rstest]
#[case::interpreter(Backend::Interpreter)]
#[case::hardware(Backend::Hardware)]
fn device_answers_are_visible_to_the_next_instruction(#[case] backend: Backend) {
    let mut rom = set(A, 21).to_vec();
    rom.extend(set(B, 1));
    rom.extend([
        Instruction::Io {
            write: true,
            port: B,
            data: A,
        },
        Instruction::Io {
            write: false,
            port: B,
            data: C,
        },
        Instruction::Hlt,
    ]);
    let mut computer = boot(backend, program(&rom));
    computer.io_controller_mut().install(Doubler).unwrap();
    computer.run_until_halt().unwrap();
    assert_eq!(computer.debug_register(C.into()), Ok(42));
}

fn halts() -> Vec<u16> {
    program(&[
        Instruction::Hlt,
        Instruction::Nop,
        Instruction::Nop,
        Instruction::Hlt,
        Instruction::Nop,
    ])
}

#[rstest]
#[case::interpreter(Backend::Interpreter)]
#[case::hardware(Backend::Hardware)]
fn stepping_over_hlt_then_running_stops_at_the_next_one(#[case] backend: Backend) {
    let mut computer = boot(backend, halts());
    computer.run_next_instruction().unwrap();
    computer.run_until_halt().unwrap();
    assert_eq!(computer.debug_register(Register::Ip), Ok(4));
}

#[rstest]
#[case::interpreter(Backend::Interpreter)]
#[case::hardware(Backend::Hardware)]
fn injected_hlt_does_not_stop_the_next_run(#[case] backend: Backend) {
    let mut computer = boot(backend, halts());
    computer.run_until_halt().unwrap();
    computer.run_instructions(&[Instruction::Hlt]).unwrap();
    assert_eq!(computer.debug_register(Register::Ip), Ok(1));
    computer.run_until_halt().unwrap();
    assert_eq!(computer.debug_register(Register::Ip), Ok(4));
}

#[rstest]
#[case::interpreter(Backend::Interpreter)]
#[case::hardware(Backend::Hardware)]
fn injected_code_reads_ip_as_the_next_address(#[case] backend: Backend) {
    let mut computer = boot(backend, accumulate());
    computer.run_next_instruction().unwrap();
    let mut injected = vec![Instruction::Mov {
        src: Register::Ip,
        dest: A,
    }];
    injected.extend(set(C, 0x0010));
    injected.extend([
        Instruction::Cmp {
            jump: true,
            cond: JumpCondition::ALWAYS,
            reg: C,
        },
        Instruction::Mov {
            src: Register::Ip,
            dest: B,
        },
    ]);
    computer.run_instructions(&injected).unwrap();

    let snapshot = computer.snapshot().unwrap();
    assert_eq!(snapshot.gpr(A), 1);
    assert_eq!(snapshot.gpr(B), 0x0010);
    assert_eq!(snapshot.ip, 1);
}
