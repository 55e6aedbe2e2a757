//! Fuzz target for program image parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if let Ok(words) = intcode::image::parse(source) {
            assert!(!words.is_empty());
        }
    }
});
