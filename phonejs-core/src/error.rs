//! Typed failures for the build pipeline

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::plan::StepKind;
use crate::runner::RunStatus;

/// Everything that can stop a build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The external program for a step could not be started at all.
    #[error("{} failed: could not start `{program}` for {step}: {source}", .step.phase())]
    Spawn {
        step: StepKind,
        program: String,
        #[source]
        source: io::Error,
    },

    /// The external program ran but reported failure.
    #[error("{} failed: {step} exited with {status}", .step.phase())]
    StepFailed { step: StepKind, status: RunStatus },

    #[error("scratch directory {}: {source}", .path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("output file {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BuildError {
    /// The step that failed, when the failure came from an external command.
    pub fn step(&self) -> Option<StepKind> {
        match self {
            BuildError::Spawn { step, .. } | BuildError::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;
