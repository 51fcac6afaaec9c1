//! Serialization and logging utilities shared across the workspace.

pub mod logger;
pub mod ser;

#[cfg(any(test, feature = "_test_utils"))]
pub mod test_utils;
