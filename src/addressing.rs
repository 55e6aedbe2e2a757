//! # Parameter Modes
//!
//! This module defines the three parameter modes an Intcode operand can use.
//! The mode of each operand is packed into the decimal digits of the
//! instruction word above the two-digit opcode.

/// Intcode parameter mode enumeration.
///
/// For an instruction word such as `1002`, the opcode is `02` and the modes are
/// read right-to-left from the hundreds digit: operand 0 uses `0`, operand 1
/// uses `1`, operand 2 uses `0` (missing digits are position mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
    /// Operand is an address; its value is the word stored there.
    ///
    /// Example: `1,5,6,7` reads addresses 5 and 6
    Position,

    /// Operand is the value itself.
    ///
    /// Example: `1101,5,6,7` adds the literals 5 and 6
    Immediate,

    /// Operand is an offset from the relative base.
    ///
    /// Example: `2201,5,6,7` reads `relative_base + 5` and `relative_base + 6`
    Relative,
}

impl ParameterMode {
    /// Maps a single decimal digit to a mode.
    ///
    /// Returns `None` for digits other than 0, 1 and 2.
    pub fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(ParameterMode::Position),
            1 => Some(ParameterMode::Immediate),
            2 => Some(ParameterMode::Relative),
            _ => None,
        }
    }

    /// Returns the digit that selects this mode.
    pub fn digit(self) -> u8 {
        match self {
            ParameterMode::Position => 0,
            ParameterMode::Immediate => 1,
            ParameterMode::Relative => 2,
        }
    }

    /// Extracts the raw mode digit of operand `index` from an instruction word.
    ///
    /// Index 0 is the hundreds place, index 1 the thousands place, and so on.
    ///
    /// # Examples
    ///
    /// ```
    /// use intcode::ParameterMode;
    ///
    /// assert_eq!(ParameterMode::digit_of(21002, 0), 0);
    /// assert_eq!(ParameterMode::digit_of(21002, 1), 1);
    /// assert_eq!(ParameterMode::digit_of(21002, 2), 2);
    /// assert_eq!(ParameterMode::digit_of(21002, 3), 0);
    /// ```
    pub fn digit_of(word: i64, index: usize) -> i64 {
        let mut rest = word.unsigned_abs() / 100;
        for _ in 0..index {
            rest /= 10;
        }
        (rest % 10) as i64
    }
}

impl std::fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.digit())
    }
}
