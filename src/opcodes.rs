//! # Opcode Metadata
//!
//! This module contains the opcode enumeration and the metadata table that serves
//! as the single source of truth for instruction names and operand counts.
//!
//! Each entry includes:
//! - Mnemonic (instruction name)
//! - Number of operands consumed from memory
//! - Whether the last operand is a write destination

/// The ten Intcode operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `1`: `dst = a + b`
    Add,
    /// `2`: `dst = a * b`
    Multiply,
    /// `3`: `dst = <next input>`
    Input,
    /// `4`: emit `a`
    Output,
    /// `5`: jump to `target` if `a != 0`
    JumpIfTrue,
    /// `6`: jump to `target` if `a == 0`
    JumpIfFalse,
    /// `7`: `dst = (a < b) as i64`
    LessThan,
    /// `8`: `dst = (a == b) as i64`
    Equals,
    /// `9`: `relative_base += a`
    AdjustRelativeBase,
    /// `99`: stop
    Halt,
}

/// Static information about an opcode.
///
/// # Examples
///
/// ```
/// use intcode::{Opcode, OPCODE_TABLE};
///
/// let add = &OPCODE_TABLE[0];
/// assert_eq!(add.opcode, Opcode::Add);
/// assert_eq!(add.mnemonic, "ADD");
/// assert_eq!(add.operand_count, 3);
/// assert!(add.writes_result);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeMetadata {
    /// The opcode this entry describes.
    pub opcode: Opcode,

    /// Numeric code found in the low two digits of an instruction word.
    pub code: i64,

    /// Instruction mnemonic used by traces and listings.
    pub mnemonic: &'static str,

    /// Number of operands that follow the instruction word.
    ///
    /// Fixed per opcode, independent of parameter modes.
    pub operand_count: u8,

    /// Whether the last operand names a destination address.
    pub writes_result: bool,
}

/// Metadata for every opcode, in numeric order.
pub const OPCODE_TABLE: [OpcodeMetadata; 10] = [
    OpcodeMetadata {
        opcode: Opcode::Add,
        code: 1,
        mnemonic: "ADD",
        operand_count: 3,
        writes_result: true,
    },
    OpcodeMetadata {
        opcode: Opcode::Multiply,
        code: 2,
        mnemonic: "MUL",
        operand_count: 3,
        writes_result: true,
    },
    OpcodeMetadata {
        opcode: Opcode::Input,
        code: 3,
        mnemonic: "IN",
        operand_count: 1,
        writes_result: true,
    },
    OpcodeMetadata {
        opcode: Opcode::Output,
        code: 4,
        mnemonic: "OUT",
        operand_count: 1,
        writes_result: false,
    },
    OpcodeMetadata {
        opcode: Opcode::JumpIfTrue,
        code: 5,
        mnemonic: "JT",
        operand_count: 2,
        writes_result: false,
    },
    OpcodeMetadata {
        opcode: Opcode::JumpIfFalse,
        code: 6,
        mnemonic: "JF",
        operand_count: 2,
        writes_result: false,
    },
    OpcodeMetadata {
        opcode: Opcode::LessThan,
        code: 7,
        mnemonic: "LT",
        operand_count: 3,
        writes_result: true,
    },
    OpcodeMetadata {
        opcode: Opcode::Equals,
        code: 8,
        mnemonic: "EQ",
        operand_count: 3,
        writes_result: true,
    },
    OpcodeMetadata {
        opcode: Opcode::AdjustRelativeBase,
        code: 9,
        mnemonic: "ARB",
        operand_count: 1,
        writes_result: false,
    },
    OpcodeMetadata {
        opcode: Opcode::Halt,
        code: 99,
        mnemonic: "HLT",
        operand_count: 0,
        writes_result: false,
    },
];

impl Opcode {
    /// Decodes the opcode of an instruction word (its value modulo 100).
    ///
    /// Returns `None` for unknown opcodes.
    ///
    /// # Examples
    ///
    /// ```
    /// use intcode::Opcode;
    ///
    /// assert_eq!(Opcode::from_word(1002), Some(Opcode::Multiply));
    /// assert_eq!(Opcode::from_word(99), Some(Opcode::Halt));
    /// assert_eq!(Opcode::from_word(98), None);
    /// ```
    pub fn from_word(word: i64) -> Option<Self> {
        Self::from_code(word % 100)
    }

    /// Maps a two-digit code to its opcode.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1..=9 => Some(OPCODE_TABLE[(code - 1) as usize].opcode),
            99 => Some(Opcode::Halt),
            _ => None,
        }
    }

    /// Returns the metadata entry for this opcode.
    pub fn metadata(self) -> &'static OpcodeMetadata {
        let index = match self {
            Opcode::Add => 0,
            Opcode::Multiply => 1,
            Opcode::Input => 2,
            Opcode::Output => 3,
            Opcode::JumpIfTrue => 4,
            Opcode::JumpIfFalse => 5,
            Opcode::LessThan => 6,
            Opcode::Equals => 7,
            Opcode::AdjustRelativeBase => 8,
            Opcode::Halt => 9,
        };
        &OPCODE_TABLE[index]
    }

    /// Instruction mnemonic.
    pub fn mnemonic(self) -> &'static str {
        self.metadata().mnemonic
    }

    /// Number of operands following the instruction word.
    pub fn operand_count(self) -> usize {
        self.metadata().operand_count as usize
    }
}
