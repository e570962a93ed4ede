//! The gate-level machine checked against the interpreter.

use nand16_core::{
    AluOperation, Computer, ComputerConfig, Fault, FaultClass, GeneralRegister, HardwareComputer,
    Instruction, Interpreter, IoListener, JumpCondition, Register,
};
use proptest::prelude::*;
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

/// Writes successive Fibonacci numbers to port 0 until the next one no
/// longer fits in a signed word.
fn fibonacci() -> Vec<u16> {
    let mut program = Vec::new();
    program.extend(set(A, 1));
    program.extend(set(B, 0));
    program.extend(set(D, 7));
    program.push(Instruction::Mov {
        src: Register::General(B),
        dest: C,
    });
    assert_eq!(program.len(), 7);
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

fn expected_fibonacci() -> Vec<u16> {
    let (mut a, mut b) = (1_u16, 2_u16);
    let mut out = vec![1];
    while b < 0x8000 {
        out.push(b);
        (a, b) = (b, a.wrapping_add(b));
    }
    out
}

fn run_fibonacci(computer: &mut dyn Computer) -> Vec<u16> {
    let id = computer
        .io_controller_mut()
        .install(IoListener::new(0))
        .unwrap();
    computer.run_until_halt().unwrap();
    computer
        .io_controller()
        .device(id)
        .map(|listener| listener.output().to_vec())
        .unwrap()
}

#[test]
fn fibonacci_matches_on_both_backends() {
    let mut vm = Interpreter::new(fibonacci()).unwrap();
    let mut hw = HardwareComputer::new(fibonacci()).unwrap();

    let expected = expected_fibonacci();
    assert_eq!(expected.last(), Some(&28_657));
    assert_eq!(run_fibonacci(&mut vm), expected);
    assert_eq!(run_fibonacci(&mut hw), expected);

    let final_state = vm.snapshot().unwrap();
    assert_eq!(hw.snapshot().unwrap(), final_state);
    assert_eq!(final_state.ip, 14);
    assert_eq!(final_state.gpr(A), 46_368);
}

#[test]
fn fibonacci_steps_in_lockstep() {
    let mut vm = Interpreter::new(fibonacci()).unwrap();
    let mut hw = HardwareComputer::new(fibonacci()).unwrap();
    for _ in 0..60 {
        vm.run_next_instruction().unwrap();
        hw.run_next_instruction().unwrap();
        assert_eq!(hw.snapshot().unwrap(), vm.snapshot().unwrap());
    }
}

fn decodable() -> impl Strategy<Value = Instruction> {
    any::<u16>().prop_filter_map("undecodable word", |word| Instruction::decode(word).ok())
}

/// A host-side call on the `Computer` contract.
#[derive(Debug, Clone)]
enum Call {
    Step,
    RunUntilHalt,
    Inject(Vec<Instruction>),
}

fn call() -> impl Strategy<Value = Call> {
    prop_oneof![
        2 => Just(Call::Step),
        1 => Just(Call::RunUntilHalt),
        2 => proptest::collection::vec(decodable(), 1..4).prop_map(Call::Inject),
    ]
}

fn apply(computer: &mut dyn Computer, call: &Call) -> Result<(), Fault> {
    match call {
        Call::Step => computer.run_next_instruction(),
        Call::RunUntilHalt => computer.run_until_halt(),
        Call::Inject(instructions) => computer.run_instructions(instructions),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn mixed_host_calls_agree(
        program in proptest::collection::vec(decodable(), 1..16),
        calls in proptest::collection::vec(call(), 1..10),
    ) {
        let rom: Vec<u16> = program.iter().map(|i| i.encode()).collect();
        let config = ComputerConfig {
            instruction_budget: Some(48),
        };
        let mut vm = Interpreter::with_config(rom.clone(), config).unwrap();
        let mut hw = HardwareComputer::with_config(rom, config).unwrap();

        for call in &calls {
            let expected = apply(&mut vm, call);
            // Stores can turn code into undecodable words, which only the
            // interpreter rejects.
            if matches!(expected, Err(fault) if fault.class() == FaultClass::Decode) {
                break;
            }
            prop_assert_eq!(apply(&mut hw, call), expected, "{:?}", call);
            let snapshot = vm.snapshot().unwrap();
            prop_assert_eq!(hw.snapshot().unwrap(), snapshot, "{:?}", call);
            for address in GeneralRegister::ALL.map(|reg| snapshot.gpr(reg)) {
                prop_assert_eq!(hw.debug_memory(address), vm.debug_memory(address));
            }
        }
    }

    #[test]
    fn random_programs_agree_step_by_step(
        program in proptest::collection::vec(decodable(), 1..24),
        input in any::<u16>(),
    ) {
        let rom: Vec<u16> = program.iter().map(|i| i.encode()).collect();
        let mut vm = Interpreter::new(rom.clone()).unwrap();
        let mut hw = HardwareComputer::new(rom.clone()).unwrap();
        for port in [0, input] {
            vm.io_controller_mut().write_input(port, input ^ 0x5A5A);
            hw.io_controller_mut().write_input(port, input ^ 0x5A5A);
        }

        for _ in 0..rom.len() + 8 {
            // Interpreter faults only on undecodable words reached by a jump.
            if vm.run_next_instruction().is_err() {
                break;
            }
            hw.run_next_instruction().unwrap();
            let expected = vm.snapshot().unwrap();
            prop_assert_eq!(hw.snapshot().unwrap(), expected);
            for reg in GeneralRegister::ALL {
                let address = expected.gpr(reg);
                prop_assert_eq!(hw.debug_memory(address).unwrap(), vm.debug_memory(address).unwrap());
            }
        }
    }
}
