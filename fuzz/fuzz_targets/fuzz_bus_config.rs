//! Fuzz target: `BusConfig::from_bytes`
//!
//! Arbitrary stored bytes must either decode to a profile that passes
//! validation or be rejected; never panic.
//!
//! cargo fuzz run fuzz_bus_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use modbang::BusConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = BusConfig::from_bytes(data) {
        assert!(config.validate().is_ok());
        let bytes = config.to_bytes().expect("valid profile must encode");
        assert_eq!(BusConfig::from_bytes(&bytes).ok(), Some(config));
    }
});
