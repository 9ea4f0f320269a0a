//! Hardware-specific tests requiring real serial devices.
//!
//! Set `TEST_PORT` (and optionally `TEST_BAUD`) and run with `--ignored`.
//! The loopback tests additionally need TX wired to RX and `TEST_LOOPBACK=1`.

pub mod loopback_tests;
pub mod utils;
