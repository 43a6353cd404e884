//
// test_utils/mod.rs
//
// Shared fixtures for tests and benchmarks
//

pub mod fixture_workspace;
