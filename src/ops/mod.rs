//! High-level operations.
//!
//! This module contains the implementation of juliac commands.

pub mod doctor;
pub mod juliac_build;
pub mod sync_libs;

pub use doctor::{doctor, format_report, CheckResult, DoctorOptions, DoctorReport};
pub use juliac_build::{build, build_with, BuildOptions, BuildOutcome};
pub use sync_libs::{sync_libraries, SyncReport};
