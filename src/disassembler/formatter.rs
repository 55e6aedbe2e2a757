//! Formatting functions for listing entries

use crate::disassembler::Listing;

/// Format a single listing entry as assembly text
///
/// Operands render as `[n]` (position), `#n` (immediate) and `[rb+n]` (relative).
pub fn format_listing(entry: &Listing) -> String {
    let instr = match &entry.instruction {
        Some(instr) => instr,
        None => return format!(".word {}", entry.words[0]),
    };

    let operands = instr
        .operands()
        .iter()
        .map(|op| op.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    if operands.is_empty() {
        instr.opcode.mnemonic().to_string()
    } else {
        format!("{} {}", instr.opcode.mnemonic(), operands)
    }
}

/// Format a whole listing with addresses, one entry per line
pub fn format_program(entries: &[Listing]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{:>5}: {}\n", entry.address, format_listing(entry)));
    }
    out
}
