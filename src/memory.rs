//! # Machine Memory
//!
//! This module provides the `MemoryBus` trait that decouples the machine from its
//! backing store, and `Memory`, the flat growable store every machine uses.
//!
//! ## Design Principles
//!
//! Intcode memory behaves like an unbounded address space:
//! - Reads always succeed
//! - Reads past the current extent return `0` and do not grow the store
//! - Writes past the current extent grow the store with zero fill
//! - Nothing ever shrinks
//!
//! The one limit is the host: a write far enough out that the store cannot be
//! allocated fails with `MemoryExhausted` instead of aborting the process.

/// Memory bus trait for the machine to read/write words.
///
/// # Design
///
/// - `read(&self)`: Immutable reference allows shared reads
/// - `write(&mut self)`: Mutable reference makes side effects explicit
/// - `try_write`: Fallible write used by executing programs
///
/// # Examples
///
/// ```
/// use intcode::{Memory, MemoryBus};
///
/// let mut mem = Memory::new();
/// mem.write(10, 42);
/// assert_eq!(mem.read(10), 42);
/// assert_eq!(mem.read(5), 0);
/// ```
pub trait MemoryBus {
    /// Reads the word at `addr`.
    ///
    /// Must never panic. Addresses that were never written read as `0`.
    fn read(&self, addr: usize) -> i64;

    /// Writes `value` at `addr`.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `addr` cannot be backed. Program-driven
    /// writes go through `try_write`.
    fn write(&mut self, addr: usize, value: i64);

    /// Writes `value` at `addr`, failing instead of panicking when the store
    /// cannot grow that far.
    fn try_write(&mut self, addr: usize, value: i64) -> Result<(), MemoryExhausted> {
        self.write(addr, value);
        Ok(())
    }
}

/// The store could not grow to hold an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot grow memory to address {address}")]
pub struct MemoryExhausted {
    pub address: usize,
}

/// Flat, zero-indexed, auto-growing word store.
///
/// # Examples
///
/// ```
/// use intcode::{Memory, MemoryBus};
///
/// let mut memory = Memory::from(vec![1, 0, 0, 0, 99]);
/// assert_eq!(memory.len(), 5);
///
/// // Reading past the end does not grow
/// assert_eq!(memory.read(100), 0);
/// assert_eq!(memory.len(), 5);
///
/// // Writing past the end grows with zero fill
/// memory.write(9, 7);
/// assert_eq!(memory.len(), 10);
/// assert_eq!(memory.read(7), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    words: Vec<i64>,
}

impl Memory {
    /// Creates an empty memory.
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Returns the current extent (one past the highest address ever written or loaded).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true if nothing has been loaded or written yet.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the stored words as a slice.
    pub fn as_slice(&self) -> &[i64] {
        &self.words
    }
}

impl From<Vec<i64>> for Memory {
    fn from(words: Vec<i64>) -> Self {
        Self { words }
    }
}

impl From<&[i64]> for Memory {
    fn from(words: &[i64]) -> Self {
        Self {
            words: words.to_vec(),
        }
    }
}

impl MemoryBus for Memory {
    fn read(&self, addr: usize) -> i64 {
        self.words.get(addr).copied().unwrap_or(0)
    }

    fn write(&mut self, addr: usize, value: i64) {
        if addr >= self.words.len() {
            self.words.resize(addr + 1, 0);
        }
        self.words[addr] = value;
    }

    fn try_write(&mut self, addr: usize, value: i64) -> Result<(), MemoryExhausted> {
        if addr >= self.words.len() {
            let exhausted = MemoryExhausted { address: addr };
            let extent = addr.checked_add(1).ok_or(exhausted)?;
            self.words
                .try_reserve_exact(extent - self.words.len())
                .map_err(|_| exhausted)?;
            self.words.resize(extent, 0);
        }
        self.words[addr] = value;
        Ok(())
    }
}
