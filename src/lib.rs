//! juliac - build native artifacts from Julia programs
//!
//! This crate drives an installed Julia runtime and a C compiler to turn a
//! Julia program into an object file, a shared library and a standalone
//! executable, then copies the runtime's shared libraries next to them.

pub mod builder;
pub mod core;
pub mod error;
pub mod ops;
pub mod util;

/// Test utilities and mocks for juliac unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted command runner and a fake Julia
/// installation tree.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{resolve, BuildConfig, BuildRequest, Platform, StageSet};
pub use builder::{Pipeline, StageKind};
pub use error::{JuliacError, Result};
