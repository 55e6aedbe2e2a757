//! WASM API for the Intcode emulator.
//!
//! Browsers have no threads to spare, so the machine runs synchronously here:
//! inputs are queued ahead of time and each output is delivered to a
//! JavaScript callback as it is produced.

use crate::disassembler::formatter::format_program;
use crate::{disassemble, ExecutionError, Machine, MachineIo, StepOutcome};
use std::collections::VecDeque;
use wasm_bindgen::prelude::*;

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

impl From<ExecutionError> for JsError {
    fn from(err: ExecutionError) -> Self {
        JsError::new(&err.to_string())
    }
}

/// Queued inputs plus an output callback
struct JsIo {
    inputs: VecDeque<i64>,
    on_output: js_sys::Function,
}

impl MachineIo for JsIo {
    fn input(&mut self) -> Result<Option<i64>, ExecutionError> {
        Ok(self.inputs.pop_front())
    }

    fn output(&mut self, value: i64) -> Result<(), ExecutionError> {
        let _ = self.on_output.call1(&JsValue::NULL, &JsValue::from(value));
        Ok(())
    }
}

/// Main emulator interface for JavaScript
#[wasm_bindgen]
pub struct IntcodeEmulator {
    pristine: Machine,
    machine: Machine,
    io: JsIo,
}

#[wasm_bindgen]
impl IntcodeEmulator {
    /// Load a comma-separated program; outputs are passed to `on_output`
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str, on_output: js_sys::Function) -> Result<IntcodeEmulator, JsError> {
        let machine = Machine::from_source(source).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(IntcodeEmulator {
            pristine: machine.clone(),
            machine,
            io: JsIo {
                inputs: VecDeque::new(),
                on_output,
            },
        })
    }

    /// Queue an input value
    pub fn push_input(&mut self, value: i64) {
        self.io.inputs.push_back(value);
    }

    /// Execute a single instruction; returns true on halt
    pub fn step(&mut self) -> Result<bool, JsError> {
        let outcome = self.machine.step(&mut self.io)?;
        Ok(outcome == StepOutcome::Halted)
    }

    /// Run until halt; fails if the program asks for more input than queued
    pub fn run(&mut self) -> Result<(), JsError> {
        self.machine.resume_with(&mut self.io, None)?;
        Ok(())
    }

    /// Restore the program as loaded and drop queued inputs
    pub fn reset(&mut self) {
        self.machine = self.pristine.clone();
        self.io.inputs.clear();
    }

    /// Read a memory word
    pub fn peek(&self, addr: usize) -> i64 {
        self.machine.get(addr)
    }

    /// Write a memory word; fails once the machine has stopped
    pub fn poke(&mut self, addr: usize, value: i64) -> Result<(), JsError> {
        self.machine.set(addr, value)?;
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn pc(&self) -> usize {
        self.machine.pc()
    }

    #[wasm_bindgen(getter)]
    pub fn relative_base(&self) -> i64 {
        self.machine.relative_base()
    }

    #[wasm_bindgen(getter)]
    pub fn halted(&self) -> bool {
        self.machine.is_halted()
    }

    /// Listing of the loaded program, one instruction per line
    pub fn disassemble(&self) -> String {
        format_program(&disassemble(self.pristine.memory().as_slice()))
    }
}
