// lib.rs - Exposes the include link core for benchmarks and integration tests.
//
// The main binary entry point remains in main.rs.

pub mod backend;
pub mod handlers;
pub mod include_link;
pub mod parser_pool;
pub mod state;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod utf16;
