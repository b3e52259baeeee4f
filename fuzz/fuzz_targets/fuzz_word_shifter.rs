//! Fuzz target: `SoftSpi::shift_word`
//!
//! Arbitrary mode, width and word through a loopback wire. Valid widths
//! must return the word masked to the width; invalid widths must fail
//! without panicking.
//!
//! cargo fuzz run fuzz_word_shifter

#![no_main]

use libfuzzer_sys::fuzz_target;
use modbang::adapters::sim::{SimDelay, SimLine};
use modbang::bus::{ClockMode, SoftSpi};

fuzz_target!(|data: &[u8]| {
    let [mode, width, a, b, c, d, ..] = *data else {
        return;
    };
    let mode = [
        ClockMode::MODE_0,
        ClockMode::MODE_1,
        ClockMode::MODE_2,
        ClockMode::MODE_3,
    ][usize::from(mode & 3)];
    let word = u32::from_be_bytes([a, b, c, d]);

    let mosi = SimLine::new("mosi");
    let Ok(mut spi) = SoftSpi::new(SimLine::new("sck"), mosi.clone(), mosi, SimDelay::new(), mode, 0)
    else {
        return;
    };
    match spi.shift_word(word, width) {
        Ok(back) => {
            assert!((1..=32).contains(&width));
            let mask = if width == 32 { u32::MAX } else { (1 << width) - 1 };
            assert_eq!(back, word & mask);
        }
        Err(_) => assert!(width == 0 || width > 32),
    }
});
