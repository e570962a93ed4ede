//! Architectural register model shared by both backends.

/// Register identifiers and the interpreter's register file.
pub mod registers;
/// Interpreter run-state machine.
pub mod run_state;

pub use registers::{
    ArchitecturalState, GeneralRegister, Register, FLAGS_ACTIVE_MASK, FLAGS_NEGATIVE,
    FLAGS_OVERFLOW, FLAGS_ZERO, GENERAL_REGISTER_COUNT,
};
pub use run_state::RunState;
