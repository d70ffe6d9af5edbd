//! Core data structures for juliac.
//!
//! - Tuning options and their closed value sets
//! - Platform classification
//! - Build configuration and its resolution

pub mod config;
pub mod options;
pub mod platform;

pub use config::{
    resolve, BuildConfig, BuildRequest, DriverProgram, StageSet, ToolPaths, ToolchainSettings,
    DEFAULT_BUILD_DIR,
};
pub use options::{RawTuning, Scalar, TuningOptions};
pub use platform::{OsFamily, Platform};
