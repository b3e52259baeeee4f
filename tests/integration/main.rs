//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises drivers end to end
//! against the simulation board. All tests run on the host with no real
//! hardware required.

#![cfg(not(target_os = "espidf"))]

mod bus_tests;
mod device_tests;
mod mock_hw;
mod socket_tests;
