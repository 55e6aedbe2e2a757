//! Fuzz target for machine execution.
//!
//! Runs an arbitrary image with arbitrary inputs for a bounded number of
//! steps to find panics in decode and execution.

#![no_main]

use arbitrary::Arbitrary;
use intcode::{BufferedIo, Machine, StepOutcome};
use libfuzzer_sys::fuzz_target;

/// Words are folded into -LIMIT/2..LIMIT/2 so memory growth stays allocatable
const WORD_LIMIT: i64 = 1 << 16;

/// Words this large are kept as-is: no host can back such an address, so
/// writes there must fail cleanly
const UNBACKABLE: i64 = 1 << 60;

/// Complete fuzz input
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// Program image
    image: Vec<i64>,
    /// Values supplied to input instructions
    inputs: Vec<i64>,
    /// Step budget
    max_steps: u8,
}

fn fold(word: i64) -> i64 {
    if word >= UNBACKABLE {
        return word;
    }
    word.rem_euclid(WORD_LIMIT) - WORD_LIMIT / 2
}

fuzz_target!(|input: FuzzInput| {
    let image: Vec<i64> = input.image.iter().map(|&word| fold(word)).collect();
    let inputs: Vec<i64> = input.inputs.iter().map(|&word| fold(word)).collect();

    let mut machine = Machine::from_image(image);
    let mut io = BufferedIo::new(inputs);

    for _ in 0..input.max_steps {
        match machine.step(&mut io) {
            Ok(StepOutcome::Continue) => {}
            Ok(StepOutcome::Halted) | Err(_) => break,
        }
    }

    // At most one terminal state, and errors are recorded
    assert!(!(machine.is_halted() && machine.is_errored()));
    assert_eq!(machine.is_errored(), machine.error().is_some());
});
