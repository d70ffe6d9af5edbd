//! Stage kinds, results and pipeline progress.

use std::fmt;
use std::path::PathBuf;

use crate::util::shell::Status;

/// One step of the native build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// Compile the program into a native object with the runtime
    Object,
    /// Link the object into a shared library
    Shared,
    /// Link the driver against the shared library
    Executable,
}

impl StageKind {
    /// Shell status shown while the stage runs.
    pub fn status(&self) -> Status {
        match self {
            StageKind::Object => Status::Compiling,
            StageKind::Shared | StageKind::Executable => Status::Linking,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Object => "object",
            StageKind::Shared => "shared library",
            StageKind::Executable => "executable",
        })
    }
}

/// The artifact a finished stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub kind: StageKind,
    pub artifact: PathBuf,
    /// The command line that produced it
    pub command: String,
}

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    NotStarted,
    Running(StageKind),
    Done,
    /// Terminal; no later stage runs.
    Failed(StageKind),
}
