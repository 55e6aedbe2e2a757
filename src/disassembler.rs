//! Intcode Disassembler Module
//!
//! Converts a program image into a linear listing of instructions. Intcode
//! freely mixes code and data, so words that do not decode as a complete
//! instruction are listed as `.word` data and the sweep continues at the next
//! address.

pub mod formatter;

use crate::{Instruction, Memory};

/// One entry of a listing: a decoded instruction or a data word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Address of the first word
    pub address: usize,

    /// Words covered by this entry (instruction word plus operands, or one data word)
    pub words: Vec<i64>,

    /// Decoded instruction, `None` for data
    pub instruction: Option<Instruction>,
}

impl Listing {
    /// Returns true if this entry is a data word.
    pub fn is_data(&self) -> bool {
        self.instruction.is_none()
    }
}

/// Disassemble an image into listing entries
///
/// # Arguments
///
/// * `image` - The program words to disassemble
///
/// # Returns
///
/// A vector of `Listing` entries covering every word of `image`
///
/// # Examples
///
/// ```
/// use intcode::disassemble;
/// use intcode::disassembler::formatter::format_listing;
///
/// let listing = disassemble(&[1002, 4, 3, 4, 33]);
/// assert_eq!(listing.len(), 2);
/// assert_eq!(format_listing(&listing[0]), "MUL [4], #3, [4]");
/// assert_eq!(format_listing(&listing[1]), ".word 33");
/// ```
pub fn disassemble(image: &[i64]) -> Vec<Listing> {
    let memory = Memory::from(image);
    let mut entries = Vec::new();
    let mut address = 0;

    while address < image.len() {
        match Instruction::decode(&memory, address) {
            Ok(instr) if instr.next_address() <= image.len() => {
                entries.push(Listing {
                    address,
                    words: image[address..instr.next_address()].to_vec(),
                    instruction: Some(instr),
                });
                address = instr.next_address();
            }
            _ => {
                // Not an instruction, or truncated by the end of the image
                entries.push(Listing {
                    address,
                    words: vec![image[address]],
                    instruction: None,
                });
                address += 1;
            }
        }
    }

    entries
}
