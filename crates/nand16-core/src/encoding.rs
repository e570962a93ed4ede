use crate::state::{FLAGS_NEGATIVE, FLAGS_OVERFLOW, FLAGS_ZERO};

/// Instruction classes selected by the `OP` field (bits 15..13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum OpcodeClass {
    Hlt = 0,
    Nop = 1,
    Mov = 2,
    Set = 3,
    Cmp = 4,
    Alu = 5,
    Mem = 6,
    Io = 7,
}

impl OpcodeClass {
    /// Decodes a 3-bit `OP` field. Every value is assigned.
    #[must_use]
    pub const fn from_u3(op: u8) -> Self {
        match op & 0b111 {
            0 => Self::Hlt,
            1 => Self::Nop,
            2 => Self::Mov,
            3 => Self::Set,
            4 => Self::Cmp,
            5 => Self::Alu,
            6 => Self::Mem,
            _ => Self::Io,
        }
    }

    /// Returns the 3-bit field value.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Bit position of the `OP` field.
pub const OP_SHIFT: u16 = 13;
/// Bit position of the flag bit.
pub const FLAG_SHIFT: u16 = 12;
/// Bit position of register field A (and the condition field).
pub const REG_A_SHIFT: u16 = 9;
/// Bit position of register field B.
pub const REG_B_SHIFT: u16 = 6;
/// Mask of the 6-bit ALU field.
pub const ALU_MASK: u16 = 0x3F;
/// Mask of the 8-bit immediate.
pub const IMMEDIATE_MASK: u16 = 0xFF;

/// ALU control lines, from the most significant bit of the 6-bit code.
///
/// `za`/`zb` zero an operand, `na`/`nb` invert it, `f` picks add over and,
/// `no` inverts the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AluOperation {
    Zero,
    One,
    NegOne,
    A,
    B,
    NotA,
    NotB,
    NegA,
    NegB,
    APlus1,
    BPlus1,
    AMinus1,
    BMinus1,
    APlusB,
    AMinusB,
    BMinusA,
    And,
    Or,
    Nand,
    Nor,
    Xor,
    AShr,
    BShr,
}

/// Single source-of-truth ALU code table.
///
/// Any 6-bit code not present here is rejected by the interpreter's decoder.
pub const ALU_OPERATION_TABLE: &[(u8, AluOperation)] = &[
    (0b10_1000, AluOperation::Zero),
    (0b11_1111, AluOperation::One),
    (0b11_1010, AluOperation::NegOne),
    (0b00_1100, AluOperation::A),
    (0b11_0000, AluOperation::B),
    (0b00_1101, AluOperation::NotA),
    (0b11_0001, AluOperation::NotB),
    (0b00_1111, AluOperation::NegA),
    (0b11_0011, AluOperation::NegB),
    (0b01_1111, AluOperation::APlus1),
    (0b11_0111, AluOperation::BPlus1),
    (0b00_1110, AluOperation::AMinus1),
    (0b11_0010, AluOperation::BMinus1),
    (0b00_0010, AluOperation::APlusB),
    (0b01_0011, AluOperation::AMinusB),
    (0b00_0111, AluOperation::BMinusA),
    (0b00_0000, AluOperation::And),
    (0b01_0101, AluOperation::Or),
    (0b00_0001, AluOperation::Nand),
    (0b01_0100, AluOperation::Nor),
    (0b10_1010, AluOperation::Xor),
    (0b00_1010, AluOperation::AShr),
    (0b10_0010, AluOperation::BShr),
];

/// Opcode bit that marks the addition path; overflow is only reported when
/// it is set.
pub const ALU_ADD_BIT: u8 = 0b10;

/// Result of the reference ALU function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AluOutput {
    /// 16-bit result.
    pub value: u16,
    /// `value == 0`.
    pub zero: bool,
    /// Bit 15 of `value`.
    pub negative: bool,
    /// Signed overflow on the addition path.
    pub overflow: bool,
}

impl AluOutput {
    /// Packs the three flags into the `FLAGS` register layout.
    #[must_use]
    pub const fn flags(self) -> u16 {
        let mut flags = 0;
        if self.zero {
            flags |= FLAGS_ZERO;
        }
        if self.negative {
            flags |= FLAGS_NEGATIVE;
        }
        if self.overflow {
            flags |= FLAGS_OVERFLOW;
        }
        flags
    }
}

impl AluOperation {
    /// Every operation in table order.
    pub const ALL: [Self; 23] = [
        Self::Zero,
        Self::One,
        Self::NegOne,
        Self::A,
        Self::B,
        Self::NotA,
        Self::NotB,
        Self::NegA,
        Self::NegB,
        Self::APlus1,
        Self::BPlus1,
        Self::AMinus1,
        Self::BMinus1,
        Self::APlusB,
        Self::AMinusB,
        Self::BMinusA,
        Self::And,
        Self::Or,
        Self::Nand,
        Self::Nor,
        Self::Xor,
        Self::AShr,
        Self::BShr,
    ];

    /// Returns the 6-bit control code.
    #[must_use]
    pub fn code(self) -> u8 {
        ALU_OPERATION_TABLE
            .iter()
            .find_map(|&(code, op)| (op == self).then_some(code))
            .unwrap_or_default()
    }

    /// Decodes a 6-bit control code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        ALU_OPERATION_TABLE
            .iter()
            .find_map(|&(candidate, op)| (candidate == code).then_some(op))
    }

    /// The six control lines `[za, na, zb, nb, f, no]`.
    #[must_use]
    pub fn control_lines(self) -> [bool; 6] {
        let code = self.code();
        std::array::from_fn(|i| (code >> (5 - i)) & 1 == 1)
    }

    /// Returns `true` when overflow is reported for this operation.
    #[must_use]
    pub fn is_addition_class(self) -> bool {
        self.code() & ALU_ADD_BIT != 0
    }

    /// Reference integer function over sign-extended operands.
    #[must_use]
    pub const fn apply(self, a: i32, b: i32) -> i32 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::NegOne => -1,
            Self::A => a,
            Self::B => b,
            Self::NotA => !a,
            Self::NotB => !b,
            Self::NegA => -a,
            Self::NegB => -b,
            Self::APlus1 => a + 1,
            Self::BPlus1 => b + 1,
            Self::AMinus1 => a - 1,
            Self::BMinus1 => b - 1,
            Self::APlusB => a + b,
            Self::AMinusB => a - b,
            Self::BMinusA => b - a,
            Self::And => a & b,
            Self::Or => a | b,
            Self::Nand => !(a & b),
            Self::Nor => !(a | b),
            Self::Xor => a ^ b,
            Self::AShr => a >> 1,
            Self::BShr => b >> 1,
        }
    }

    /// Evaluates the operation on two 16-bit words, producing the result the
    /// hardware ALU must match bit for bit.
    #[must_use]
    pub fn evaluate(self, a: u16, b: u16) -> AluOutput {
        #[allow(clippy::cast_possible_wrap)]
        let wide = self.apply(i32::from(a as i16), i32::from(b as i16));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = wide as u16;
        AluOutput {
            value,
            zero: value == 0,
            negative: value & 0x8000 != 0,
            overflow: self.is_addition_class() && i16::try_from(wide).is_err(),
        }
    }

    /// Assembly name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Zero => "ZERO",
            Self::One => "ONE",
            Self::NegOne => "NEG_ONE",
            Self::A => "A",
            Self::B => "B",
            Self::NotA => "NOT_A",
            Self::NotB => "NOT_B",
            Self::NegA => "NEG_A",
            Self::NegB => "NEG_B",
            Self::APlus1 => "A_PLUS_1",
            Self::BPlus1 => "B_PLUS_1",
            Self::AMinus1 => "A_MINUS_1",
            Self::BMinus1 => "B_MINUS_1",
            Self::APlusB => "A_PLUS_B",
            Self::AMinusB => "A_MINUS_B",
            Self::BMinusA => "B_MINUS_A",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
            Self::AShr => "A_SHR",
            Self::BShr => "B_SHR",
        }
    }
}

/// Jump/compare condition: any combination of equal, less and greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct JumpCondition {
    /// Match when the compared value is zero.
    pub eq: bool,
    /// Match when it is negative.
    pub lt: bool,
    /// Match when it is positive.
    pub gt: bool,
}

impl JumpCondition {
    /// Never matches.
    pub const NEVER: Self = Self::new(false, false, false);
    /// Always matches.
    pub const ALWAYS: Self = Self::new(true, true, true);

    /// Builds a condition from its three flags.
    #[must_use]
    pub const fn new(eq: bool, lt: bool, gt: bool) -> Self {
        Self { eq, lt, gt }
    }

    /// Decodes a 3-bit condition field (`eq` is the most significant bit).
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        Self::new(code & 0b100 != 0, code & 0b010 != 0, code & 0b001 != 0)
    }

    /// Returns the 3-bit condition field.
    #[must_use]
    pub const fn code(self) -> u8 {
        ((self.eq as u8) << 2) | ((self.lt as u8) << 1) | self.gt as u8
    }

    /// Ground-truth predicate over a signed difference.
    #[must_use]
    pub const fn should_jump(self, diff: i32) -> bool {
        (self.eq && diff == 0) || (self.lt && diff < 0) || (self.gt && diff > 0)
    }

    /// Evaluates the condition against a `FLAGS` word, reading "less" as
    /// negative xor overflow so that a wrapped subtraction still orders
    /// correctly.
    #[must_use]
    pub const fn matches_flags(self, flags: u16) -> bool {
        let eq = flags & FLAGS_ZERO != 0;
        let lt = (flags & FLAGS_NEGATIVE != 0) != (flags & FLAGS_OVERFLOW != 0);
        let gt = !lt && !eq;
        (self.eq && eq) || (self.lt && lt) || (self.gt && gt)
    }
}
