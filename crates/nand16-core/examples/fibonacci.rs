//! Runs a Fibonacci program on both backends and prints what each emits on
//! port 0.

use std::time::Instant;

use nand16_core::{
    disassemble, AluOperation, Computer, Fault, GeneralRegister, HardwareComputer, Instruction,
    Interpreter, IoListener, JumpCondition, Register,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use GeneralRegister::{A, B, C, D, P};

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

fn program() -> Vec<u16> {
    let mut program = Vec::new();
    program.extend(set(A, 1));
    program.extend(set(B, 0));
    // Loop head is the word after the MOV below.
    program.extend(set(D, 7));
    program.push(Instruction::Mov {
        src: Register::General(B),
        dest: C,
    });
    program.extend([
        Instruction::Io {
            write: true,
            port: C,
            data: A,
        },
        Instruction::Alu {
            q: false,
            a: A,
            b: B,
            op: AluOperation::APlusB,
        },
        Instruction::Mov {
            src: Register::General(A),
            dest: B,
        },
        Instruction::Mov {
            src: Register::General(P),
            dest: A,
        },
        Instruction::Alu {
            q: false,
            a: A,
            b: B,
            op: AluOperation::AMinusB,
        },
        Instruction::Cmp {
            jump: true,
            cond: JumpCondition::new(true, false, true),
            reg: D,
        },
        Instruction::Hlt,
    ]);
    program.iter().map(|i| i.encode()).collect()
}

fn run(name: &str, computer: &mut dyn Computer) -> Result<Vec<u16>, Fault> {
    let id = computer.io_controller_mut().install(IoListener::new(0))?;
    let started = Instant::now();
    computer.run_until_halt()?;
    let output = computer
        .io_controller()
        .device(id)
        .map(|listener| listener.output().to_vec())
        .unwrap_or_default();
    println!(
        "{name:<12} {:>10.3?}  {}",
        started.elapsed(),
        output
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    );
    Ok(output)
}

fn main() -> Result<(), Fault> {
    let rom = program();
    for row in disassemble(&rom) {
        println!("{row}");
    }
    println!();

    let mut interpreter = Interpreter::new(rom.clone())?;
    let expected = run("interpreter", &mut interpreter)?;

    let mut hardware = HardwareComputer::new(rom)?;
    let stats = hardware.stats();
    println!(
        "netlist: {} nands, {} flip-flops, {} lookups",
        stats.nands, stats.flip_flops, stats.lookups
    );
    let actual = run("hardware", &mut hardware)?;

    if actual != expected {
        eprintln!("backends disagree");
        std::process::exit(1);
    }
    Ok(())
}
