//! # Intcode Machine Emulator
//!
//! An emulator for the Intcode stored-program computer: a ten-opcode instruction set
//! executing over a flat, auto-growing memory of signed integers.
//!
//! This crate provides the machine state and fetch-decode-execute loop, a
//! trait-based memory bus, a table-driven opcode metadata system, and a
//! channel-based driver protocol for running a machine on its own thread.
//!
//! ## Quick Start
//!
//! ```rust
//! use intcode::{Machine, MemoryBus};
//!
//! // 1 + 1, stored at address 0
//! let mut machine = Machine::from_image(vec![1, 0, 0, 0, 99]);
//! machine.run_to_halt(0).unwrap();
//!
//! assert_eq!(machine.memory().read(0), 2);
//! assert!(machine.is_halted());
//! ```
//!
//! ## Running Concurrently
//!
//! ```rust
//! use intcode::{ChannelConfig, Machine, Reply};
//!
//! // Echo one input
//! let machine = Machine::from_source("3,0,4,0,99").unwrap();
//! let driver = machine.start(ChannelConfig::default()).unwrap();
//!
//! driver.write(42).unwrap();
//! assert_eq!(driver.read(), Reply::Output(42));
//! assert_eq!(driver.read(), Reply::Halted);
//! ```
//!
//! ## Modules
//!
//! - `machine` - Machine state and execution logic
//! - `memory` - MemoryBus trait and the growable `Memory`
//! - `opcodes` - Opcode metadata table
//! - `addressing` - Parameter mode enumeration
//! - `instruction` - Per-cycle instruction decode
//! - `io` - Synchronous I/O and the threaded driver protocol
//! - `trace` - Instruction-level trace sinks
//! - `image` - Program image loading
//! - `disassembler` - Static program listings

pub mod addressing;
pub mod disassembler;
pub mod image;
pub mod instruction;
pub mod io;
pub mod machine;
pub mod memory;
pub mod opcodes;
pub mod trace;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export public API
pub use addressing::ParameterMode;
pub use disassembler::{disassemble, Listing};
pub use image::LoadError;
pub use instruction::{Instruction, Operand};
pub use io::{BufferedIo, ChannelConfig, Driver, DriverError, Event, MachineIo, Reply, Signal};
pub use machine::{Machine, StartError, Status, StepOutcome};
pub use memory::{Memory, MemoryBus, MemoryExhausted};
pub use opcodes::{Opcode, OpcodeMetadata, OPCODE_TABLE};
pub use trace::{Effect, TraceRecord, TraceSink};

/// Errors that terminate a machine run.
///
/// Every variant is fatal: the machine moves to `Status::Errored` and never
/// executes again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The low two digits of the instruction word are not a known opcode.
    #[error("unknown opcode {opcode} at address {address}")]
    UnknownOpcode { opcode: i64, address: usize },

    /// A parameter mode digit other than 0, 1 or 2.
    #[error("invalid parameter mode {mode} at address {address}")]
    InvalidParameterMode { mode: i64, address: usize },

    /// A write destination in immediate mode.
    #[error("immediate-mode destination at address {address}")]
    ImmediateDestination { address: usize },

    /// An operand or jump resolved to a negative address.
    #[error("negative address {address} referenced at address {pc}")]
    NegativeAddress { address: i64, pc: usize },

    /// A write landed beyond what the memory could grow to hold.
    #[error("cannot grow memory to address {address} (instruction at {pc})")]
    MemoryExhausted { address: usize, pc: usize },

    /// A synchronous run asked for more input than was supplied.
    #[error("input exhausted at address {address}")]
    InputExhausted { address: usize },

    /// The driver went away while the machine was blocked on it.
    #[error("driver disconnected")]
    Disconnected,

    /// The machine already halted or errored.
    #[error("machine already terminated")]
    AlreadyTerminated,
}
