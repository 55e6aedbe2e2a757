//! # Instruction Decode
//!
//! An `Instruction` is decoded fresh every cycle from the word at the program
//! counter and the operand words that follow it. It is never stored.

use crate::{ExecutionError, MemoryBus, Opcode, ParameterMode};

/// A raw operand word together with the mode it is resolved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    /// The word as stored in memory.
    pub raw: i64,

    /// How `raw` is interpreted.
    pub mode: ParameterMode,
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.mode {
            ParameterMode::Position => write!(f, "[{}]", self.raw),
            ParameterMode::Immediate => write!(f, "#{}", self.raw),
            ParameterMode::Relative => write!(f, "[rb{:+}]", self.raw),
        }
    }
}

/// A decoded instruction.
///
/// # Examples
///
/// ```
/// use intcode::{Instruction, Memory, Opcode, ParameterMode};
///
/// let memory = Memory::from(vec![1002, 4, 3, 4, 33]);
/// let instr = Instruction::decode(&memory, 0).unwrap();
///
/// assert_eq!(instr.opcode, Opcode::Multiply);
/// assert_eq!(instr.size(), 4);
/// assert_eq!(instr.operands()[0].mode, ParameterMode::Position);
/// assert_eq!(instr.operands()[1].mode, ParameterMode::Immediate);
/// assert_eq!(instr.operands()[1].raw, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Address of the instruction word.
    pub address: usize,

    /// The full instruction word (opcode plus mode digits).
    pub word: i64,

    /// Decoded operation.
    pub opcode: Opcode,

    operands: [Operand; 3],
    operand_count: usize,
}

impl Instruction {
    /// Decodes the instruction at `address`.
    ///
    /// Operand words are read in program order; the operand count comes from the
    /// opcode alone. Fails on unknown opcodes, mode digits outside 0..=2, and
    /// immediate-mode write destinations.
    pub fn decode<M: MemoryBus + ?Sized>(
        memory: &M,
        address: usize,
    ) -> Result<Self, ExecutionError> {
        let word = memory.read(address);
        let opcode = Opcode::from_word(word).ok_or(ExecutionError::UnknownOpcode {
            opcode: word % 100,
            address,
        })?;

        let metadata = opcode.metadata();
        let operand_count = metadata.operand_count as usize;
        let mut operands = [Operand {
            raw: 0,
            mode: ParameterMode::Position,
        }; 3];

        for (index, operand) in operands.iter_mut().enumerate().take(operand_count) {
            let digit = ParameterMode::digit_of(word, index);
            let mode = ParameterMode::from_digit(digit).ok_or(
                ExecutionError::InvalidParameterMode {
                    mode: digit,
                    address,
                },
            )?;
            *operand = Operand {
                raw: memory.read(address + 1 + index),
                mode,
            };
        }

        if metadata.writes_result
            && operands[operand_count - 1].mode == ParameterMode::Immediate
        {
            return Err(ExecutionError::ImmediateDestination { address });
        }

        Ok(Self {
            address,
            word,
            opcode,
            operands,
            operand_count,
        })
    }

    /// Operands in program order.
    pub fn operands(&self) -> &[Operand] {
        &self.operands[..self.operand_count]
    }

    /// Number of words occupied, including the instruction word.
    pub fn size(&self) -> usize {
        1 + self.operand_count
    }

    /// Address of the word following this instruction.
    pub fn next_address(&self) -> usize {
        self.address + self.size()
    }
}
