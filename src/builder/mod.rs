//! Native build stages.
//!
//! This module turns a resolved build configuration into runtime and C
//! compiler invocations and runs them.

pub mod flags;
pub mod link;
pub mod pipeline;
pub mod stage;
pub mod toolchain;

pub use flags::{FlagProvider, JuliaConfig, PlatformFlags, StaticFlags};
pub use pipeline::Pipeline;
pub use stage::{PipelineState, StageKind, StageResult};
pub use toolchain::{CommandSpec, RuntimeInstall};
