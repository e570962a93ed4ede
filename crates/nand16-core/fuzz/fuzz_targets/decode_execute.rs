#![no_main]

use libfuzzer_sys::fuzz_target;
use nand16_core::{
    disassemble, Computer, ComputerConfig, Instruction, Interpreter, IoListener, Register,
};

fuzz_target!(|data: &[u8]| {
    let words: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    for &word in &words {
        if let Ok(instruction) = Instruction::decode(word) {
            assert_eq!(Instruction::decode(instruction.encode()), Ok(instruction));
        }
    }
    assert_eq!(disassemble(&words).len(), words.len());

    let config = ComputerConfig {
        instruction_budget: Some(4096),
    };
    let Ok(mut vm) = Interpreter::with_config(words, config) else {
        return;
    };
    if vm.io_controller_mut().install(IoListener::new(0)).is_err() {
        return;
    }
    let _ = vm.run_until_halt();
    let _ = vm.snapshot();
    let _ = vm.reset();
    assert_eq!(vm.debug_register(Register::Ip), Ok(0));
});
