//! # Instruction Trace
//!
//! When a trace destination is configured, the machine appends one
//! `TraceRecord` per executed instruction, in execution order. Without a
//! destination the only cost is an `Option` check per instruction.
//!
//! Rendered lines look like:
//!
//! ```text
//! [0, 0] MUL ([4] mode 0, #3 mode 1, [4] mode 0) => 99 @ 4
//! [4, 0] HLT
//! ```

use crate::{Instruction, Operand};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Observable result of one executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// A word was stored.
    Write { address: usize, value: i64 },
    /// A value was emitted on the output channel.
    Output(i64),
    /// A conditional jump was evaluated.
    Jump { target: i64, taken: bool },
    /// The relative base moved to this value.
    RelativeBase(i64),
    /// The machine stopped.
    Halt,
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Effect::Write { address, value } => write!(f, "=> {} @ {}", value, address),
            Effect::Output(value) => write!(f, "=> output {}", value),
            Effect::Jump { target, taken: true } => write!(f, "jump to {}", target),
            Effect::Jump {
                target,
                taken: false,
            } => write!(f, "no jump to {}", target),
            Effect::RelativeBase(base) => write!(f, "=> relative base {}", base),
            Effect::Halt => Ok(()),
        }
    }
}

/// One executed instruction, as seen by a trace sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// Address the instruction was fetched from.
    pub address: usize,
    /// Relative base before the instruction executed.
    pub relative_base: i64,
    /// Opcode mnemonic.
    pub mnemonic: &'static str,
    /// Operands with their parameter modes.
    pub operands: Vec<Operand>,
    /// What the instruction did.
    pub effect: Effect,
}

impl TraceRecord {
    pub(crate) fn new(instr: &Instruction, relative_base: i64, effect: Effect) -> Self {
        Self {
            address: instr.address,
            relative_base,
            mnemonic: instr.opcode.mnemonic(),
            operands: instr.operands().to_vec(),
            effect,
        }
    }
}

impl std::fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{}, {}] {}", self.address, self.relative_base, self.mnemonic)?;

        if !self.operands.is_empty() {
            write!(f, " (")?;
            for (i, op) in self.operands.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} mode {}", op, op.mode)?;
            }
            write!(f, ")")?;
        }

        if self.effect != Effect::Halt {
            write!(f, " {}", self.effect)?;
        }
        Ok(())
    }
}

/// Destination for instruction trace records.
pub trait TraceSink {
    /// Appends one record. Called once per executed instruction.
    fn record(&mut self, record: &TraceRecord);
}

impl TraceSink for Vec<TraceRecord> {
    fn record(&mut self, record: &TraceRecord) {
        self.push(record.clone());
    }
}

/// Writes each record as a text line.
///
/// The first write failure is logged and disables the sink; tracing never
/// interrupts execution.
pub struct WriterSink<W: Write> {
    writer: W,
    failed: bool,
}

impl<W: Write> WriterSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(mut self) -> W {
        let _ = self.writer.flush();
        self.writer
    }
}

impl WriterSink<BufWriter<File>> {
    /// Opens `path` for appending, creating it if missing.
    pub fn append_to(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TraceSink for WriterSink<W> {
    fn record(&mut self, record: &TraceRecord) {
        if self.failed {
            return;
        }
        if let Err(err) = writeln!(self.writer, "{}", record) {
            tracing::warn!(error = %err, "trace sink write failed, disabling trace");
            self.failed = true;
        }
    }
}

/// Forwards records to the `tracing` facade at TRACE level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&mut self, record: &TraceRecord) {
        tracing::trace!(target: "intcode::trace", "{}", record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Memory, Opcode};

    #[test]
    fn test_record_display() {
        let memory = Memory::from(vec![1002, 4, 3, 4, 33]);
        let instr = Instruction::decode(&memory, 0).unwrap();
        assert_eq!(instr.opcode, Opcode::Multiply);

        let record = TraceRecord::new(
            &instr,
            0,
            Effect::Write {
                address: 4,
                value: 99,
            },
        );
        assert_eq!(
            record.to_string(),
            "[0, 0] MUL ([4] mode 0, #3 mode 1, [4] mode 0) => 99 @ 4"
        );
    }

    #[test]
    fn test_halt_display() {
        let memory = Memory::from(vec![99]);
        let instr = Instruction::decode(&memory, 0).unwrap();
        let record = TraceRecord::new(&instr, 5, Effect::Halt);
        assert_eq!(record.to_string(), "[0, 5] HLT");
    }

    #[test]
    fn test_writer_sink_lines() {
        let memory = Memory::from(vec![104, 7]);
        let instr = Instruction::decode(&memory, 0).unwrap();

        let mut sink = WriterSink::new(Vec::new());
        sink.record(&TraceRecord::new(&instr, 0, Effect::Output(7)));
        sink.record(&TraceRecord::new(&instr, 0, Effect::Output(7)));

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "[0, 0] OUT (#7 mode 1) => output 7\n[0, 0] OUT (#7 mode 1) => output 7\n"
        );
    }
}
