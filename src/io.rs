//! # Machine I/O
//!
//! The machine talks to the outside world only through the `MachineIo` trait.
//! Two implementations are provided:
//!
//! - `BufferedIo`: pre-supplied inputs and collected outputs, for synchronous runs
//! - `Port`: the machine side of the channel set used when a machine runs on its
//!   own thread, paired with a `Driver` on the caller's side
//!
//! ## Channel Set
//!
//! A started machine and its driver share four logical channels:
//!
//! | Channel | Direction | Capacity |
//! |---------|-----------|----------|
//! | input | driver → machine | `input_capacity` (0 = hand-off) |
//! | output | machine → driver | `output_capacity` (0 = hand-off) |
//! | signal | machine → driver | unbounded, never blocks the machine |
//! | error detail | machine → driver | one slot, taken once |
//!
//! Outputs and signals travel through one ordered queue, so the driver observes
//! them in exactly the order the machine produced them. The input-needed signal
//! for an input instruction is queued before the machine blocks on that input.
//!
//! ## Suspension Points
//!
//! - Machine: waiting for an input value; waiting for the driver to take outputs
//!   once more than `output_capacity` are pending
//! - Driver: `read()`/`next_event()` with nothing queued; `write()` while the
//!   input queue is full (with capacity 0, until the machine is awaiting input)
//!
//! Dropping the `Driver` closes the port. A machine blocked on it stops with
//! `ExecutionError::Disconnected` rather than waiting forever. In the other
//! direction, a `Port` dropped without a final status (the worker panicked)
//! queues `Errored`, so a waiting driver always wakes up.

use crate::{ExecutionError, Machine, Memory, MemoryBus, TraceSink};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// Input/output seam between the machine and its environment.
pub trait MachineIo {
    /// Supplies the next input value. May block.
    ///
    /// `Ok(None)` means the source has run dry; the machine reports that as
    /// `ExecutionError::InputExhausted` at the input instruction.
    fn input(&mut self) -> Result<Option<i64>, ExecutionError>;

    /// Accepts one output value. May block.
    fn output(&mut self, value: i64) -> Result<(), ExecutionError>;
}

/// Synchronous I/O over a fixed input list.
///
/// # Examples
///
/// ```
/// use intcode::{BufferedIo, Machine};
///
/// let mut machine = Machine::from_image(vec![3, 0, 4, 0, 99]);
/// let mut io = BufferedIo::new([7]);
/// machine.run_with(&mut io).unwrap();
/// assert_eq!(io.outputs(), &[7]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferedIo {
    inputs: VecDeque<i64>,
    outputs: Vec<i64>,
}

impl BufferedIo {
    /// Creates an I/O buffer with the given inputs queued.
    pub fn new(inputs: impl IntoIterator<Item = i64>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: Vec::new(),
        }
    }

    /// Queues another input value.
    pub fn push_input(&mut self, value: i64) {
        self.inputs.push_back(value);
    }

    /// Outputs collected so far.
    pub fn outputs(&self) -> &[i64] {
        &self.outputs
    }

    /// Consumes the buffer, returning collected outputs.
    pub fn into_outputs(self) -> Vec<i64> {
        self.outputs
    }
}

impl MachineIo for BufferedIo {
    fn input(&mut self) -> Result<Option<i64>, ExecutionError> {
        Ok(self.inputs.pop_front())
    }

    fn output(&mut self, value: i64) -> Result<(), ExecutionError> {
        self.outputs.push(value);
        Ok(())
    }
}

/// Out-of-band indicator from the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The machine is about to block on an input instruction.
    InputNeeded,
    /// The machine executed a halt instruction.
    Halted,
    /// The machine stopped on an error; the detail is available once.
    Errored,
}

impl Signal {
    /// Returns true for `Halted` and `Errored`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Signal::Halted | Signal::Errored)
    }
}

/// Anything the machine says to its driver, in production order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// An output value.
    Output(i64),
    /// A signal.
    Signal(Signal),
}

/// Result of `Driver::read`: a value or a terminal signal, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The next output value.
    Output(i64),
    /// The machine halted normally.
    Halted,
    /// The machine stopped on an error; see `Driver::error_detail`.
    Errored,
}

/// Errors reported to the driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The machine already halted or errored and accepts no more input.
    #[error("machine has terminated")]
    Terminated,

    /// The machine stopped on an error.
    #[error("program error: {0}")]
    Errored(String),

    /// The machine's worker thread panicked.
    #[error("machine worker panicked")]
    WorkerPanicked,
}

/// Channel capacities and worker settings for a started machine.
///
/// # Examples
///
/// ```
/// use intcode::ChannelConfig;
///
/// let config = ChannelConfig::default()
///     .input_capacity(4)
///     .output_capacity(16)
///     .name("amp-a");
/// assert_eq!(config.input_capacity, 4);
/// ```
pub struct ChannelConfig {
    /// Input values the driver may queue ahead of the machine. 0 = hand-off.
    pub input_capacity: usize,

    /// Output values the machine may queue ahead of the driver. 0 = hand-off.
    pub output_capacity: usize,

    /// Worker thread name.
    pub name: String,

    /// Optional instruction trace destination.
    pub trace: Option<Box<dyn TraceSink + Send>>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            input_capacity: 0,
            output_capacity: 0,
            name: "intcode".to_string(),
            trace: None,
        }
    }
}

impl ChannelConfig {
    /// Sets the input channel capacity.
    pub fn input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity;
        self
    }

    /// Sets the output channel capacity.
    pub fn output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    /// Sets the worker thread name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables instruction tracing into `sink`.
    pub fn trace(mut self, sink: impl TraceSink + Send + 'static) -> Self {
        self.trace = Some(Box::new(sink));
        self
    }
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("input_capacity", &self.input_capacity)
            .field("output_capacity", &self.output_capacity)
            .field("name", &self.name)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct PortState {
    /// Values written by the driver, not yet taken by the machine.
    inputs: VecDeque<i64>,
    /// Machine is blocked inside an input instruction.
    awaiting_input: bool,
    /// Outputs and signals not yet taken by the driver.
    events: VecDeque<Event>,
    /// Number of `Event::Output` entries in `events`.
    pending_outputs: usize,
    error_detail: Option<String>,
    /// Final signal, set once when the machine stops.
    terminal: Option<Signal>,
    /// The driver has taken the final signal.
    terminal_seen: bool,
    driver_closed: bool,
}

#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<PortState>,
    changed: Condvar,
    input_capacity: usize,
    output_capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PortState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_while<'a>(
        &self,
        guard: MutexGuard<'a, PortState>,
        condition: impl FnMut(&mut PortState) -> bool,
    ) -> MutexGuard<'a, PortState> {
        self.changed
            .wait_while(guard, condition)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Machine side of the channel set.
#[derive(Debug)]
pub struct Port {
    shared: Arc<Shared>,
}

impl Port {
    /// Records the final status and queues the terminal signal.
    ///
    /// Never blocks.
    pub(crate) fn finish(&self, result: &Result<(), ExecutionError>) {
        self.terminate(result.as_ref().err().map(ToString::to_string));
    }

    fn terminate(&self, error_detail: Option<String>) {
        let mut state = self.shared.lock();
        if state.terminal.is_some() {
            return;
        }

        let signal = match error_detail {
            None => Signal::Halted,
            Some(detail) => {
                state.error_detail = Some(detail);
                Signal::Errored
            }
        };
        state.events.push_back(Event::Signal(signal));
        state.terminal = Some(signal);
        state.awaiting_input = false;
        self.shared.changed.notify_all();
    }
}

impl Drop for Port {
    fn drop(&mut self) {
        // Only reached without a final status when the worker unwound
        self.terminate(Some("machine worker panicked".to_string()));
    }
}

impl MachineIo for Port {
    fn input(&mut self) -> Result<Option<i64>, ExecutionError> {
        let shared = &self.shared;
        let mut state = shared.lock();
        if state.driver_closed {
            return Err(ExecutionError::Disconnected);
        }

        state.events.push_back(Event::Signal(Signal::InputNeeded));
        state.awaiting_input = true;
        shared.changed.notify_all();

        let mut state = shared.wait_while(state, |s| s.inputs.is_empty() && !s.driver_closed);
        state.awaiting_input = false;
        let value = state.inputs.pop_front().ok_or(ExecutionError::Disconnected)?;
        shared.changed.notify_all();
        Ok(Some(value))
    }

    fn output(&mut self, value: i64) -> Result<(), ExecutionError> {
        let shared = &self.shared;
        let mut state = shared.lock();
        if state.driver_closed {
            return Err(ExecutionError::Disconnected);
        }

        state.events.push_back(Event::Output(value));
        state.pending_outputs += 1;
        shared.changed.notify_all();

        let capacity = shared.output_capacity;
        let state = shared.wait_while(state, |s| {
            s.pending_outputs > capacity && !s.driver_closed
        });
        if state.pending_outputs > capacity {
            return Err(ExecutionError::Disconnected);
        }
        Ok(())
    }
}

/// Driver side of the channel set, returned by `Machine::start`.
///
/// The driver writes inputs and reads outputs and signals. After a terminal
/// signal, `join` hands back the machine so its memory can be inspected.
#[derive(Debug)]
pub struct Driver<M: MemoryBus = Memory> {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<Machine<M>>>,
}

/// Creates a connected port/driver pair without a worker attached.
pub(crate) fn channel(input_capacity: usize, output_capacity: usize) -> (Port, Arc<Shared>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(PortState::default()),
        changed: Condvar::new(),
        input_capacity,
        output_capacity,
    });
    (
        Port {
            shared: Arc::clone(&shared),
        },
        shared,
    )
}

impl<M: MemoryBus> Driver<M> {
    pub(crate) fn new(shared: Arc<Shared>, handle: JoinHandle<Machine<M>>) -> Self {
        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Delivers one input value.
    ///
    /// Blocks while the input channel is full. With capacity 0 this means until
    /// the machine is blocked on an input instruction with nothing queued.
    /// Fails once the machine has terminated.
    pub fn write(&self, value: i64) -> Result<(), DriverError> {
        let capacity = self.shared.input_capacity;
        let state = self.shared.lock();
        let mut state = self.shared.wait_while(state, |s| {
            s.terminal.is_none()
                && if capacity == 0 {
                    !(s.awaiting_input && s.inputs.is_empty())
                } else {
                    s.inputs.len() >= capacity
                }
        });

        if state.terminal.is_some() {
            return Err(DriverError::Terminated);
        }

        state.inputs.push_back(value);
        tracing::trace!(value, "driver wrote input");
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Returns the next event, including input-needed signals.
    ///
    /// Blocks until the machine has something to say. Once the terminal signal
    /// has been taken, every further call returns it again.
    pub fn next_event(&self) -> Event {
        let state = self.shared.lock();
        let mut state = self
            .shared
            .wait_while(state, |s| s.events.is_empty() && s.terminal.is_none());

        let event = match state.events.pop_front() {
            Some(event) => {
                if let Event::Output(_) = event {
                    state.pending_outputs -= 1;
                    self.shared.changed.notify_all();
                }
                tracing::trace!(?event, "driver received event");
                event
            }
            None => Event::Signal(state.terminal.unwrap_or(Signal::Halted)),
        };
        if let Event::Signal(signal) = event {
            state.terminal_seen |= signal.is_terminal();
        }
        event
    }

    /// Returns the next output value or terminal signal.
    ///
    /// Input-needed signals are skipped; use `next_event` to observe them.
    pub fn read(&self) -> Reply {
        loop {
            match self.next_event() {
                Event::Output(value) => return Reply::Output(value),
                Event::Signal(Signal::Halted) => return Reply::Halted,
                Event::Signal(Signal::Errored) => return Reply::Errored,
                Event::Signal(Signal::InputNeeded) => continue,
            }
        }
    }

    /// Takes the error detail of an errored run.
    ///
    /// Returns `Some` exactly once after the `Errored` signal has been read,
    /// `None` otherwise.
    pub fn error_detail(&self) -> Option<String> {
        let mut state = self.shared.lock();
        if !state.terminal_seen {
            return None;
        }
        state.error_detail.take()
    }

    /// Reads until a terminal signal, collecting every output value.
    pub fn outputs_until_halt(&self) -> Result<Vec<i64>, DriverError> {
        let mut outputs = Vec::new();
        loop {
            match self.read() {
                Reply::Output(value) => outputs.push(value),
                Reply::Halted => return Ok(outputs),
                Reply::Errored => {
                    let detail = self.error_detail().unwrap_or_default();
                    return Err(DriverError::Errored(detail));
                }
            }
        }
    }

    /// Returns true once the machine has stopped.
    pub fn is_terminated(&self) -> bool {
        self.shared.lock().terminal.is_some()
    }

    /// Waits for the worker to finish and returns the machine.
    ///
    /// Call after observing a terminal signal. Calling earlier closes nothing but
    /// blocks until the machine stops on its own.
    pub fn join(mut self) -> Result<Machine<M>, DriverError> {
        let handle = self.handle.take().ok_or(DriverError::WorkerPanicked)?;
        handle.join().map_err(|_| DriverError::WorkerPanicked)
    }
}

impl<M: MemoryBus> Drop for Driver<M> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.driver_closed = true;
        self.shared.changed.notify_all();
    }
}
