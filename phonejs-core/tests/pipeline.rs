/// Orchestration checks for the build pipeline
///
/// A recording runner stands in for svn, git, curl, unzip and python. It
/// writes a few files where the real tools would, so cleanup is exercised
/// against a populated scratch directory, and "compiles" by writing canned
/// JavaScript into the redirected stdout file.
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use phonejs_core::config::{BuildConfig, FailurePolicy, LIBRARY_SOURCES};
use phonejs_core::pipeline::build;
use phonejs_core::plan::StepKind;
use phonejs_core::runner::{CommandRunner, Invocation, RunStatus, StdoutTarget};
use phonejs_core::BuildError;

const COMPILED: &str = "var i18n={phonenumbers:{}};\n";

struct Call {
    invocation: Invocation,
    scratch_existed: bool,
}

struct RecordingRunner {
    scratch: PathBuf,
    calls: Vec<Call>,
    exit_codes: Vec<(String, i32)>,
    unspawnable: HashSet<String>,
}

impl RecordingRunner {
    fn new(scratch: &Path) -> Self {
        Self {
            scratch: scratch.to_path_buf(),
            calls: Vec::new(),
            exit_codes: Vec::new(),
            unspawnable: HashSet::new(),
        }
    }

    fn failing(mut self, program: &str, code: i32) -> Self {
        self.exit_codes.push((program.to_string(), code));
        self
    }

    fn programs(&self) -> Vec<&str> {
        self.calls
            .iter()
            .map(|c| c.invocation.program.as_str())
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, inv: &Invocation) -> io::Result<RunStatus> {
        self.calls.push(Call {
            invocation: inv.clone(),
            scratch_existed: self.scratch.exists(),
        });

        if self.unspawnable.contains(&inv.program) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }

        match inv.program.as_str() {
            "svn" | "git" => {
                let target = PathBuf::from(inv.args.last().expect("target arg"));
                fs::create_dir_all(target.join("src"))?;
                fs::write(target.join("src/file.js"), b"// fetched")?;
            }
            "curl" => {
                fs::create_dir_all(&self.scratch)?;
                fs::write(self.scratch.join("compiler-latest.zip"), b"PK")?;
            }
            "python" => {
                if let StdoutTarget::File(path) = &inv.stdout {
                    fs::write(path, COMPILED)?;
                }
            }
            _ => {}
        }

        let code = self
            .exit_codes
            .iter()
            .find(|(p, _)| p == &inv.program)
            .map(|(_, c)| *c)
            .unwrap_or(0);
        Ok(RunStatus::from_code(Some(code)))
    }
}

fn setup() -> (tempfile::TempDir, BuildConfig) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = BuildConfig::new(tmp.path());
    (tmp, config)
}

#[test]
fn scratch_dir_is_gone_after_successful_run() {
    let (_tmp, config) = setup();
    let scratch = config.paths().build_dir;
    let mut runner = RecordingRunner::new(&scratch);

    let report = build(&config, &mut runner).expect("build");

    assert!(report.succeeded());
    assert!(!scratch.exists());
}

#[test]
fn output_holds_exactly_the_compile_stdout() {
    let (_tmp, config) = setup();
    let mut runner = RecordingRunner::new(&config.paths().build_dir);

    let report = build(&config, &mut runner).expect("build");

    assert_eq!(report.output_file, config.output_file);
    let written = fs::read_to_string(&config.output_file).expect("output exists");
    assert_eq!(written, COMPILED);
    assert_eq!(report.output_bytes, Some(COMPILED.len() as u64));
}

#[test]
fn fetches_run_in_fixed_order_before_compile() {
    let (_tmp, config) = setup();
    let mut runner = RecordingRunner::new(&config.paths().build_dir);

    let report = build(&config, &mut runner).expect("build");

    assert_eq!(runner.programs(), vec!["svn", "git", "curl", "unzip", "python"]);
    let kinds: Vec<StepKind> = report.steps.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, StepKind::ALL.to_vec());
}

#[test]
fn leftover_scratch_dir_is_removed_before_first_fetch() {
    let (_tmp, config) = setup();
    let scratch = config.paths().build_dir;
    fs::create_dir_all(scratch.join("libphonenumber/stale")).expect("seed");
    fs::write(scratch.join("compiler.jar"), b"stale").expect("seed jar");

    let mut runner = RecordingRunner::new(&scratch);
    build(&config, &mut runner).expect("build");

    assert!(!runner.calls[0].scratch_existed);
    assert!(!scratch.exists());
}

#[test]
fn compile_lists_the_five_sources_in_order() {
    let (_tmp, config) = setup();
    let mut runner = RecordingRunner::new(&config.paths().build_dir);

    build(&config, &mut runner).expect("build");

    let compile = &runner.calls[4].invocation;
    let sources: Vec<&str> = compile
        .args
        .iter()
        .map(String::as_str)
        .filter(|a| a.ends_with(".js"))
        .collect();
    assert_eq!(sources, LIBRARY_SOURCES.to_vec());
    assert_eq!(&compile.args[compile.args.len() - 5..], &LIBRARY_SOURCES[..]);
}

#[test]
fn only_compile_runs_inside_scratch_dir() {
    let (_tmp, config) = setup();
    let scratch = config.paths().build_dir;
    let before = std::env::current_dir().expect("cwd");
    let mut runner = RecordingRunner::new(&scratch);

    build(&config, &mut runner).expect("build");

    for call in &runner.calls[..4] {
        assert_eq!(call.invocation.cwd, None);
    }
    assert_eq!(runner.calls[4].invocation.cwd.as_deref(), Some(scratch.as_path()));
    assert_eq!(std::env::current_dir().expect("cwd"), before);
}

#[test]
fn failing_fetch_aborts_and_still_cleans_up() {
    let (_tmp, config) = setup();
    let scratch = config.paths().build_dir;
    let mut runner = RecordingRunner::new(&scratch).failing("git", 128);

    let err = build(&config, &mut runner).expect_err("clone fails");

    assert!(matches!(
        err,
        BuildError::StepFailed {
            step: StepKind::Clone,
            ..
        }
    ));
    assert!(err.to_string().starts_with("fetch failed"));
    assert_eq!(runner.programs(), vec!["svn", "git"]);
    assert!(!scratch.exists());
    assert!(!config.output_file.exists());
}

#[test]
fn missing_tool_is_reported_as_spawn_failure() {
    let (_tmp, config) = setup();
    let scratch = config.paths().build_dir;
    let mut runner = RecordingRunner::new(&scratch);
    runner.unspawnable.insert("svn".to_string());

    let err = build(&config, &mut runner).expect_err("svn missing");

    assert!(matches!(
        err,
        BuildError::Spawn {
            step: StepKind::Checkout,
            ..
        }
    ));
    assert_eq!(runner.calls.len(), 1);
    assert!(!scratch.exists());
}

#[test]
fn failing_compile_leaves_no_output() {
    let (_tmp, config) = setup();
    let scratch = config.paths().build_dir;
    let mut runner = RecordingRunner::new(&scratch).failing("python", 1);

    let err = build(&config, &mut runner).expect_err("compile fails");

    assert_eq!(err.step(), Some(StepKind::Compile));
    assert!(err.to_string().starts_with("compile failed"));
    assert!(!config.output_file.exists());
    assert!(!scratch.exists());
}

#[test]
fn continue_policy_invokes_every_step() {
    let (_tmp, config) = setup();
    let config = config.with_policy(FailurePolicy::Continue);
    let scratch = config.paths().build_dir;
    let mut runner = RecordingRunner::new(&scratch)
        .failing("svn", 1)
        .failing("unzip", 9);

    let report = build(&config, &mut runner).expect("continue");

    assert_eq!(runner.calls.len(), 5);
    assert!(!report.succeeded());
    let failed: Vec<StepKind> = report
        .steps
        .iter()
        .filter(|s| !s.succeeded())
        .map(|s| s.kind)
        .collect();
    assert_eq!(failed, vec![StepKind::Checkout, StepKind::Extract]);
    assert_eq!(fs::read_to_string(&config.output_file).expect("output"), COMPILED);
    assert!(!scratch.exists());
}

#[test]
fn output_in_missing_subdirectory_is_created() {
    let (tmp, config) = setup();
    let config = config.with_output("dist/js/libphonenumber.js");
    let mut runner = RecordingRunner::new(&config.paths().build_dir);

    build(&config, &mut runner).expect("build");

    let out = tmp.path().join("dist/js/libphonenumber.js");
    assert_eq!(fs::read_to_string(out).expect("output"), COMPILED);
}

#[test]
fn invalid_config_runs_nothing() {
    let (_tmp, config) = setup();
    let config = config.with_namespaces(["not a namespace"]);
    let mut runner = RecordingRunner::new(&config.paths().build_dir);

    let err = build(&config, &mut runner).expect_err("invalid");

    assert!(matches!(err, BuildError::Config(_)));
    assert!(runner.calls.is_empty());
}

#[test]
fn output_routed_into_scratch_dir_via_dot_dot_is_rejected() {
    let (_tmp, config) = setup();
    let config = config.with_output("x/../libphonenumber_build/out.js");
    let mut runner = RecordingRunner::new(&config.paths().build_dir);

    let err = build(&config, &mut runner).expect_err("output inside scratch dir");

    assert!(matches!(err, BuildError::Config(_)));
    assert!(runner.calls.is_empty());
}
