use crate::Fault;

/// Number of writable general-purpose registers (`A..SP`).
pub const GENERAL_REGISTER_COUNT: usize = 8;
/// `FLAGS` bit set when the last ALU result overflowed the signed range.
pub const FLAGS_OVERFLOW: u16 = 1 << 0;
/// `FLAGS` bit set when the last ALU result was negative.
pub const FLAGS_NEGATIVE: u16 = 1 << 1;
/// `FLAGS` bit set when the last ALU result was zero.
pub const FLAGS_ZERO: u16 = 1 << 2;
/// Mask of the bits the ALU can set in `FLAGS`.
pub const FLAGS_ACTIVE_MASK: u16 = FLAGS_OVERFLOW | FLAGS_NEGATIVE | FLAGS_ZERO;

/// Writable register identifier, encoded in 3-bit register fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum GeneralRegister {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    P = 4,
    Q = 5,
    Bp = 6,
    Sp = 7,
}

impl GeneralRegister {
    /// Ordered list of all writable registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::P,
        Self::Q,
        Self::Bp,
        Self::Sp,
    ];

    /// Returns the array index for this register (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the 3-bit field value.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a 3-bit register field. Only the low three bits are used.
    #[must_use]
    pub const fn from_u3(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Self::A,
            1 => Self::B,
            2 => Self::C,
            3 => Self::D,
            4 => Self::P,
            5 => Self::Q,
            6 => Self::Bp,
            _ => Self::Sp,
        }
    }

    /// Assembly name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::P => "P",
            Self::Q => "Q",
            Self::Bp => "BP",
            Self::Sp => "SP",
        }
    }
}

/// Any register a `MOV` may read: the writable file plus the read-only
/// pseudo-registers reachable through the 4-bit extended source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Register {
    /// One of `A..SP` (extended codes `0..=7`).
    General(GeneralRegister),
    /// Instruction pointer (extended code `0b1000`).
    Ip,
    /// ALU flags (extended code `0b1001`).
    Flags,
}

impl Register {
    /// Extended code of `IP`.
    pub const IP_CODE: u8 = 0b1000;
    /// Extended code of `FLAGS`.
    pub const FLAGS_CODE: u8 = 0b1001;

    /// Returns the 4-bit extended code.
    #[must_use]
    pub const fn x_code(self) -> u8 {
        match self {
            Self::General(reg) => reg.code(),
            Self::Ip => Self::IP_CODE,
            Self::Flags => Self::FLAGS_CODE,
        }
    }

    /// Decodes a 4-bit extended code.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownRegister`] for codes `0b1010..=0b1111` and
    /// anything wider than four bits.
    pub const fn from_x_code(code: u8) -> Result<Self, Fault> {
        match code {
            0..=7 => Ok(Self::General(GeneralRegister::from_u3(code))),
            Self::IP_CODE => Ok(Self::Ip),
            Self::FLAGS_CODE => Ok(Self::Flags),
            _ => Err(Fault::UnknownRegister { code }),
        }
    }

    /// Assembly name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::General(reg) => reg.name(),
            Self::Ip => "IP",
            Self::Flags => "FLAGS",
        }
    }
}

impl From<GeneralRegister> for Register {
    fn from(reg: GeneralRegister) -> Self {
        Self::General(reg)
    }
}

/// Architectural register state of the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArchitecturalState {
    gpr: [u16; GENERAL_REGISTER_COUNT],
    ip: u16,
    flags: u16,
}

impl ArchitecturalState {
    /// Reads a general-purpose register.
    #[must_use]
    pub const fn gpr(&self, reg: GeneralRegister) -> u16 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register.
    pub const fn set_gpr(&mut self, reg: GeneralRegister, value: u16) {
        self.gpr[reg.index()] = value;
    }

    /// Reads any register, including the read-only ones.
    #[must_use]
    pub const fn read(&self, reg: Register) -> u16 {
        match reg {
            Register::General(reg) => self.gpr(reg),
            Register::Ip => self.ip,
            Register::Flags => self.flags,
        }
    }

    /// Reads the instruction pointer.
    #[must_use]
    pub const fn ip(&self) -> u16 {
        self.ip
    }

    /// Writes the instruction pointer.
    pub const fn set_ip(&mut self, value: u16) {
        self.ip = value;
    }

    /// Reads `FLAGS`.
    #[must_use]
    pub const fn flags(&self) -> u16 {
        self.flags
    }

    /// Writes `FLAGS`; bits outside the ALU flags are dropped.
    pub const fn set_flags(&mut self, value: u16) {
        self.flags = value & FLAGS_ACTIVE_MASK;
    }

    /// Returns `true` when a specific `FLAGS` bit is set.
    #[must_use]
    pub const fn flag_is_set(&self, flag: u16) -> bool {
        (self.flags & flag) != 0
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        ArchitecturalState, GeneralRegister, Register, FLAGS_NEGATIVE, FLAGS_OVERFLOW, FLAGS_ZERO,
    };
    use crate::Fault;

    #[test]
    fn general_register_codes_follow_declaration_order() {
        for (code, reg) in GeneralRegister::ALL.into_iter().enumerate() {
            assert_eq!(reg.index(), code);
            assert_eq!(GeneralRegister::from_u3(reg.code()), reg);
        }
    }

    #[rstest]
    #[case(0b0000, Ok(Register::General(GeneralRegister::A)))]
    #[case(0b0111, Ok(Register::General(GeneralRegister::Sp)))]
    #[case(0b1000, Ok(Register::Ip))]
    #[case(0b1001, Ok(Register::Flags))]
    #[case(0b1010, Err(Fault::UnknownRegister { code: 0b1010 }))]
    #[case(0b1111, Err(Fault::UnknownRegister { code: 0b1111 }))]
    fn extended_codes_decode(#[case] code: u8, #[case] expected: Result<Register, Fault>) {
        assert_eq!(Register::from_x_code(code), expected);
        if let Ok(reg) = expected {
            assert_eq!(reg.x_code(), code);
        }
    }

    #[test]
    fn flags_writes_are_masked() {
        let mut state = ArchitecturalState::default();
        state.set_flags(0xFFFF);
        assert_eq!(state.flags(), FLAGS_ZERO | FLAGS_NEGATIVE | FLAGS_OVERFLOW);
        assert!(state.flag_is_set(FLAGS_ZERO));
    }

    #[test]
    fn read_covers_pseudo_registers() {
        let mut state = ArchitecturalState::default();
        state.set_ip(0x42);
        state.set_flags(FLAGS_NEGATIVE);
        state.set_gpr(GeneralRegister::Bp, 7);
        assert_eq!(state.read(Register::Ip), 0x42);
        assert_eq!(state.read(Register::Flags), FLAGS_NEGATIVE);
        assert_eq!(state.read(GeneralRegister::Bp.into()), 7);
    }
}
