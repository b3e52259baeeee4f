//! Fuzz target: stepper `Status` accessors and position encoding.
//!
//! cargo fuzz run fuzz_status_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use modbang::drivers::stepper::{Status, position_from_raw, position_to_raw};

fuzz_target!(|data: &[u8]| {
    let [hi, lo, a, b, c, ..] = *data else {
        return;
    };
    let status = Status::from_raw(u16::from_be_bytes([hi, lo]));
    let _ = status.motor_state();
    let _ = status.direction();
    assert_eq!(status.busy(), status.raw() & 0x0002 == 0);
    let faults = status.raw() & 0x7E00 != 0x7E00;
    assert_eq!(status.has_fault(), faults);

    let raw = u32::from_be_bytes([0, a, b, c]) & 0x3F_FFFF;
    let position = position_from_raw(raw);
    assert_eq!(position_to_raw(position).ok(), Some(raw));
});
