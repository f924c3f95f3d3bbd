//! Runs the planned steps inside a claimed scratch directory

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{BuildConfig, FailurePolicy};
use crate::error::{BuildError, Result};
use crate::plan::{plan, Step, StepKind};
use crate::runner::{CommandRunner, RunStatus};
use crate::scratch::ScratchDir;

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub kind: StepKind,
    pub program: String,
    /// Absent when the program never started.
    pub status: Option<RunStatus>,
    /// Failure description, for steps tolerated under [`FailurePolicy::Continue`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub steps: Vec<StepOutcome>,
    pub output_file: PathBuf,
    /// Size of the output file after the run; `None` if it was never written.
    pub output_bytes: Option<u64>,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(StepOutcome::succeeded)
    }
}

/// Fetch everything, compile, and clean up.
///
/// The scratch directory is cleared before the first step and after the
/// last one, whether the run succeeds or not. Under [`FailurePolicy::Abort`]
/// the first failing step ends the run with its error; under
/// [`FailurePolicy::Continue`] failures are logged and recorded in the report.
pub fn build(config: &BuildConfig, runner: &mut impl CommandRunner) -> Result<BuildReport> {
    config.validate()?;

    let paths = config.paths();
    let scratch = ScratchDir::claim(&paths.build_dir)?;
    info!(
        scratch = %scratch.path().display(),
        output = %paths.output_file.display(),
        "starting build"
    );

    let mut outcomes = Vec::with_capacity(StepKind::ALL.len());
    for step in plan(config) {
        if step.kind == StepKind::Compile {
            ensure_parent(&paths.output_file)?;
        }

        match run_step(&step, runner) {
            Ok(status) => outcomes.push(StepOutcome {
                kind: step.kind,
                program: step.invocation.program.clone(),
                status: Some(status),
                error: None,
            }),
            Err(err) => {
                if config.policy == FailurePolicy::Abort {
                    if step.kind == StepKind::Compile {
                        discard_output(&paths.output_file);
                    }
                    return Err(err);
                }

                warn!(step = %step.kind, error = %err, "step failed, continuing");
                let status = match &err {
                    BuildError::StepFailed { status, .. } => Some(*status),
                    _ => None,
                };
                outcomes.push(StepOutcome {
                    kind: step.kind,
                    program: step.invocation.program.clone(),
                    status,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    scratch.close()?;

    let output_bytes = match fs::metadata(&paths.output_file) {
        Ok(meta) => Some(meta.len()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(source) => {
            return Err(BuildError::Output {
                path: paths.output_file,
                source,
            })
        }
    };

    info!(output = %paths.output_file.display(), bytes = ?output_bytes, "build finished");

    Ok(BuildReport {
        steps: outcomes,
        output_file: paths.output_file,
        output_bytes,
    })
}

fn run_step(step: &Step, runner: &mut impl CommandRunner) -> Result<RunStatus> {
    let inv = &step.invocation;
    info!(step = %step.kind, command = %inv.command_line(), "running step");

    let status = runner.run(inv).map_err(|source| BuildError::Spawn {
        step: step.kind,
        program: inv.program.clone(),
        source,
    })?;

    if !status.success() {
        return Err(BuildError::StepFailed {
            step: step.kind,
            status,
        });
    }

    info!(step = %step.kind, code = ?status.code, "step finished");
    Ok(status)
}

fn ensure_parent(output: &Path) -> Result<()> {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| BuildError::Output {
                path: output.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn discard_output(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => info!(output = %output.display(), "removed partial output"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(output = %output.display(), error = %err, "could not remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Invocation;

    struct Scripted {
        fail: Option<StepKind>,
        seen: Vec<String>,
    }

    impl CommandRunner for Scripted {
        fn run(&mut self, inv: &Invocation) -> io::Result<RunStatus> {
            self.seen.push(inv.program.clone());
            let kind = StepKind::ALL[self.seen.len() - 1];
            let code = if self.fail == Some(kind) { 1 } else { 0 };
            Ok(RunStatus::from_code(Some(code)))
        }
    }

    #[test]
    fn abort_stops_at_first_failure() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = BuildConfig::new(tmp.path());
        let mut runner = Scripted {
            fail: Some(StepKind::Download),
            seen: Vec::new(),
        };

        let err = build(&config, &mut runner).expect_err("download fails");
        assert_eq!(err.step(), Some(StepKind::Download));
        assert_eq!(runner.seen, vec!["svn", "git", "curl"]);
    }

    #[test]
    fn continue_runs_everything_and_records_failure() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = BuildConfig::new(tmp.path()).with_policy(FailurePolicy::Continue);
        let mut runner = Scripted {
            fail: Some(StepKind::Clone),
            seen: Vec::new(),
        };

        let report = build(&config, &mut runner).expect("continue policy");
        assert_eq!(runner.seen.len(), 5);
        assert!(!report.succeeded());
        let clone = &report.steps[1];
        assert_eq!(clone.kind, StepKind::Clone);
        assert_eq!(clone.status, Some(RunStatus::from_code(Some(1))));
        assert!(clone.error.as_deref().is_some_and(|e| e.starts_with("fetch failed")));
        assert_eq!(report.output_bytes, None);
    }
}
