//! WebAssembly bindings for the Intcode emulator.
//!
//! This module provides JavaScript-callable interfaces to the machine,
//! enabling browser-based execution of Intcode programs.

pub mod api;

pub use api::IntcodeEmulator;
