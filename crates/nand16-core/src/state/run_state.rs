/// Execution state of the interpreter between instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// A `HLT` retired. `run_until_halt` clears this when it starts and when
    /// it returns.
    Halted,
}

impl RunState {
    /// Returns `true` once a `HLT` has retired.
    #[must_use]
    pub const fn is_halted(self) -> bool {
        matches!(self, Self::Halted)
    }
}
