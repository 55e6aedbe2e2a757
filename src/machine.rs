//! # Machine State and Execution
//!
//! This module contains the `Machine` struct representing Intcode processor state
//! and the fetch-decode-execute loop.
//!
//! ## Machine State
//!
//! The machine maintains:
//! - **Memory**: flat, zero-indexed, auto-growing words (any `MemoryBus`)
//! - **Program counter**: address of the next instruction word
//! - **Relative base**: added to relative-mode operands
//! - **Status**: `Running`, then exactly one of `Halted` or `Errored`
//!
//! ## Execution Model
//!
//! - `step()`: Execute one instruction
//! - `run_with()`: Reset registers and execute until halt or error
//! - `start()`: Run on a dedicated worker thread behind a `Driver`
//!
//! A terminated machine is read-only: further steps fail with
//! `ExecutionError::AlreadyTerminated`. Use `clone()` on a pristine machine to
//! fork independent runs from the same image.

use crate::image::{self, LoadError};
use crate::io::{self, ChannelConfig, Driver, MachineIo};
use crate::trace::{Effect, TraceRecord, TraceSink};
use crate::{
    BufferedIo, ExecutionError, Instruction, Memory, MemoryBus, Opcode, Operand, ParameterMode,
};
use std::path::Path;

/// Lifecycle status of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Executing, or ready to execute.
    Running,
    /// Stopped on a halt instruction.
    Halted,
    /// Stopped on an error.
    Errored,
}

/// Result of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The machine can execute another instruction.
    Continue,
    /// The instruction was a halt.
    Halted,
}

/// Errors from `Machine::start`.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// The machine already halted or errored.
    #[error("machine already terminated")]
    AlreadyTerminated,

    /// The worker thread could not be spawned.
    #[error("failed to spawn machine worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Intcode machine state and execution context.
///
/// Generic over the memory implementation via the `MemoryBus` trait; the default
/// is the growable `Memory`.
///
/// # Examples
///
/// ```
/// use intcode::{Machine, MemoryBus, Status};
///
/// let mut machine = Machine::from_image(vec![1002, 4, 3, 4, 33]);
/// machine.run_to_halt(4).unwrap();
///
/// assert_eq!(machine.get(4), 99);
/// assert_eq!(machine.status(), Status::Halted);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine<M: MemoryBus = Memory> {
    /// Program and data memory
    pub(crate) memory: M,

    /// Address of the next instruction word
    pub(crate) pc: usize,

    /// Offset applied to relative-mode operands
    pub(crate) relative_base: i64,

    /// Lifecycle status
    pub(crate) status: Status,

    /// Error that terminated the machine, if any
    pub(crate) error: Option<ExecutionError>,

    /// Instructions executed since creation
    pub(crate) steps: u64,
}

impl Machine<Memory> {
    /// Creates a machine whose memory is seeded with `image`.
    pub fn from_image(image: impl Into<Memory>) -> Self {
        Self::new(image.into())
    }

    /// Parses a comma-separated program image.
    ///
    /// Load errors are reported here, before the machine can start.
    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        Ok(Self::from_image(image::parse(source)?))
    }

    /// Loads a comma-separated program image from a file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Ok(Self::from_image(image::load_file(path)?))
    }
}

impl<M: MemoryBus> Machine<M> {
    /// Creates a machine over the given memory, with registers zeroed.
    pub fn new(memory: M) -> Self {
        Self {
            memory,
            pc: 0,
            relative_base: 0,
            status: Status::Running,
            error: None,
            steps: 0,
        }
    }

    /// Executes one instruction.
    ///
    /// Fetches the word at the program counter, decodes opcode and parameter
    /// modes, consumes the opcode's fixed operand count, and executes. Any error
    /// is terminal and moves the machine to `Status::Errored`.
    pub fn step<I: MachineIo + ?Sized>(
        &mut self,
        io: &mut I,
    ) -> Result<StepOutcome, ExecutionError> {
        self.step_traced(io, None)
    }

    /// Executes one instruction, appending a record to `trace` if present.
    pub fn step_traced<I: MachineIo + ?Sized>(
        &mut self,
        io: &mut I,
        trace: Option<&mut (dyn TraceSink + '_)>,
    ) -> Result<StepOutcome, ExecutionError> {
        if self.status != Status::Running {
            return Err(ExecutionError::AlreadyTerminated);
        }

        match self.execute_instruction(io, trace) {
            Ok(outcome) => {
                self.steps += 1;
                if outcome == StepOutcome::Halted {
                    self.status = Status::Halted;
                }
                Ok(outcome)
            }
            Err(err) => {
                self.status = Status::Errored;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn execute_instruction<I: MachineIo + ?Sized>(
        &mut self,
        io: &mut I,
        trace: Option<&mut (dyn TraceSink + '_)>,
    ) -> Result<StepOutcome, ExecutionError> {
        let instr = Instruction::decode(&self.memory, self.pc)?;
        let relative_base = self.relative_base;
        self.pc = instr.next_address();

        let ops = instr.operands();
        let effect = match instr.opcode {
            Opcode::Add => {
                let value = self.value(&instr, ops[0])?.wrapping_add(self.value(&instr, ops[1])?);
                self.store(&instr, ops[2], value)?
            }
            Opcode::Multiply => {
                let value = self.value(&instr, ops[0])?.wrapping_mul(self.value(&instr, ops[1])?);
                self.store(&instr, ops[2], value)?
            }
            Opcode::Input => {
                // Destination is resolved before blocking
                let address = self.destination(&instr, ops[0])?;
                let value = io.input()?.ok_or(ExecutionError::InputExhausted {
                    address: instr.address,
                })?;
                self.write_word(&instr, address, value)?;
                Effect::Write { address, value }
            }
            Opcode::Output => {
                let value = self.value(&instr, ops[0])?;
                io.output(value)?;
                Effect::Output(value)
            }
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let condition = self.value(&instr, ops[0])?;
                let target = self.value(&instr, ops[1])?;
                let taken = (condition != 0) == (instr.opcode == Opcode::JumpIfTrue);
                if taken {
                    self.pc = self.address(&instr, target)?;
                }
                Effect::Jump { target, taken }
            }
            Opcode::LessThan => {
                let value = (self.value(&instr, ops[0])? < self.value(&instr, ops[1])?) as i64;
                self.store(&instr, ops[2], value)?
            }
            Opcode::Equals => {
                let value = (self.value(&instr, ops[0])? == self.value(&instr, ops[1])?) as i64;
                self.store(&instr, ops[2], value)?
            }
            Opcode::AdjustRelativeBase => {
                self.relative_base = self.relative_base.wrapping_add(self.value(&instr, ops[0])?);
                Effect::RelativeBase(self.relative_base)
            }
            Opcode::Halt => Effect::Halt,
        };

        if let Some(sink) = trace {
            sink.record(&TraceRecord::new(&instr, relative_base, effect));
        }

        if effect == Effect::Halt {
            Ok(StepOutcome::Halted)
        } else {
            Ok(StepOutcome::Continue)
        }
    }

    /// Converts a resolved value to a memory address.
    fn address(&self, instr: &Instruction, value: i64) -> Result<usize, ExecutionError> {
        usize::try_from(value).map_err(|_| ExecutionError::NegativeAddress {
            address: value,
            pc: instr.address,
        })
    }

    /// Resolves an operand to the value it denotes.
    fn value(&self, instr: &Instruction, op: Operand) -> Result<i64, ExecutionError> {
        match op.mode {
            ParameterMode::Immediate => Ok(op.raw),
            ParameterMode::Position | ParameterMode::Relative => {
                Ok(self.memory.read(self.destination(instr, op)?))
            }
        }
    }

    /// Resolves a write operand to the address it names.
    fn destination(&self, instr: &Instruction, op: Operand) -> Result<usize, ExecutionError> {
        match op.mode {
            ParameterMode::Position => self.address(instr, op.raw),
            ParameterMode::Relative => self.address(instr, self.relative_base.wrapping_add(op.raw)),
            ParameterMode::Immediate => Err(ExecutionError::ImmediateDestination {
                address: instr.address,
            }),
        }
    }

    fn store(&mut self, instr: &Instruction, op: Operand, value: i64) -> Result<Effect, ExecutionError> {
        let address = self.destination(instr, op)?;
        self.write_word(instr, address, value)?;
        Ok(Effect::Write { address, value })
    }

    fn write_word(&mut self, instr: &Instruction, address: usize, value: i64) -> Result<(), ExecutionError> {
        self.memory
            .try_write(address, value)
            .map_err(|_| ExecutionError::MemoryExhausted {
                address,
                pc: instr.address,
            })
    }

    /// Zeroes the program counter and relative base for a fresh run.
    fn reset_registers(&mut self) -> Result<(), ExecutionError> {
        if self.status != Status::Running {
            return Err(ExecutionError::AlreadyTerminated);
        }
        self.pc = 0;
        self.relative_base = 0;
        Ok(())
    }

    /// Runs from address 0 until halt or error.
    pub fn run_with<I: MachineIo + ?Sized>(&mut self, io: &mut I) -> Result<(), ExecutionError> {
        self.reset_registers()?;
        self.resume_with(io, None)
    }

    /// Runs from address 0, tracing every executed instruction into `sink`.
    pub fn run_traced<I: MachineIo + ?Sized>(
        &mut self,
        io: &mut I,
        sink: &mut dyn TraceSink,
    ) -> Result<(), ExecutionError> {
        self.reset_registers()?;
        self.resume_with(io, Some(sink))
    }

    /// Continues from the current program counter until halt or error.
    pub fn resume_with<I: MachineIo + ?Sized>(
        &mut self,
        io: &mut I,
        mut trace: Option<&mut (dyn TraceSink + '_)>,
    ) -> Result<(), ExecutionError> {
        loop {
            if self.step_traced(io, trace.as_deref_mut())? == StepOutcome::Halted {
                return Ok(());
            }
        }
    }

    /// Runs with a fixed input list and returns every output.
    ///
    /// # Examples
    ///
    /// ```
    /// use intcode::Machine;
    ///
    /// // Outputs 1 if the input equals 8
    /// let machine = Machine::from_image(vec![3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8]);
    /// assert_eq!(machine.clone().execute(&[8]).unwrap(), vec![1]);
    /// assert_eq!(machine.clone().execute(&[9]).unwrap(), vec![0]);
    /// ```
    pub fn execute(&mut self, inputs: &[i64]) -> Result<Vec<i64>, ExecutionError> {
        let mut io = BufferedIo::new(inputs.iter().copied());
        self.run_with(&mut io)?;
        Ok(io.into_outputs())
    }

    /// Runs without input and returns the word at `address` after halting.
    pub fn run_to_halt(&mut self, address: usize) -> Result<i64, ExecutionError> {
        self.run_with(&mut BufferedIo::default())?;
        Ok(self.memory.read(address))
    }

    // ========== Memory Access ==========

    /// Returns the word at `addr`; `0` past the current extent.
    pub fn get(&self, addr: usize) -> i64 {
        self.memory.read(addr)
    }

    /// Writes `value` at `addr`, growing memory as needed.
    ///
    /// Used to patch an image before running it. Memory of a halted or errored
    /// machine is read-only, so this fails with `AlreadyTerminated` then.
    pub fn set(&mut self, addr: usize, value: i64) -> Result<(), ExecutionError> {
        if self.status != Status::Running {
            return Err(ExecutionError::AlreadyTerminated);
        }
        self.memory
            .try_write(addr, value)
            .map_err(|_| ExecutionError::MemoryExhausted {
                address: addr,
                pc: self.pc,
            })
    }

    /// Returns the memory bus.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    // ========== Register Getters ==========

    /// Returns the program counter.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Returns the relative base.
    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns true after a halt instruction.
    pub fn is_halted(&self) -> bool {
        self.status == Status::Halted
    }

    /// Returns true after an execution error.
    pub fn is_errored(&self) -> bool {
        self.status == Status::Errored
    }

    /// Returns the error that terminated the machine.
    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    /// Returns the number of instructions executed.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl<M: MemoryBus + Send + 'static> Machine<M> {
    /// Starts the machine on its own worker thread and returns immediately.
    ///
    /// The program counter and relative base are reset to 0. The machine runs
    /// until it halts or errors; the `Driver` supplies input and receives output
    /// and signals.
    pub fn start(mut self, config: ChannelConfig) -> Result<Driver<M>, StartError> {
        if self.reset_registers().is_err() {
            return Err(StartError::AlreadyTerminated);
        }

        let ChannelConfig {
            input_capacity,
            output_capacity,
            name,
            mut trace,
        } = config;
        let (mut port, shared) = io::channel(input_capacity, output_capacity);

        let worker_name = name.clone();
        let handle = std::thread::Builder::new().name(name).spawn(move || {
            tracing::debug!(machine = %worker_name, "machine started");

            let trace_ref = trace.as_deref_mut().map(|sink| sink as &mut dyn TraceSink);
            let result = self.resume_with(&mut port, trace_ref);
            match &result {
                Ok(()) => {
                    tracing::debug!(machine = %worker_name, steps = self.steps, "machine halted")
                }
                Err(err) => {
                    tracing::warn!(machine = %worker_name, error = %err, "machine errored")
                }
            }

            port.finish(&result);
            self
        })?;

        Ok(Driver::new(shared, handle))
    }
}
