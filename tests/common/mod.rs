//! Common test utilities for toprated integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod scripted;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use scripted::*;
