//! The fixed sequence of external steps

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{BuildConfig, LIBRARY_SOURCES};
use crate::runner::Invocation;

/// Closure builder script, relative to the scratch directory.
pub const CLOSURE_BUILDER: &str = "closure-library/closure/bin/build/closurebuilder.py";
pub const COMPILER_JAR: &str = "compiler.jar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Checkout,
    Clone,
    Download,
    Extract,
    Compile,
}

impl StepKind {
    /// Execution order.
    pub const ALL: [StepKind; 5] = [
        StepKind::Checkout,
        StepKind::Clone,
        StepKind::Download,
        StepKind::Extract,
        StepKind::Compile,
    ];

    pub fn is_fetch(self) -> bool {
        !matches!(self, StepKind::Compile)
    }

    /// "fetch" or "compile"; used as the prefix of error messages.
    pub fn phase(self) -> &'static str {
        if self.is_fetch() {
            "fetch"
        } else {
            "compile"
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Checkout => "checkout",
            StepKind::Clone => "clone",
            StepKind::Download => "download",
            StepKind::Extract => "extract",
            StepKind::Compile => "compile",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub invocation: Invocation,
}

/// Build the five steps in execution order without running anything.
///
/// Fetch steps address the scratch directory by absolute path and inherit the
/// caller's working directory; the compile step runs inside the scratch
/// directory, which is why its arguments are relative.
pub fn plan(config: &BuildConfig) -> Vec<Step> {
    let paths = config.paths();
    let tools = &config.tools;
    let urls = &config.sources;

    let checkout = Invocation::new(&tools.svn)
        .arg("checkout")
        .arg(&urls.libphonenumber)
        .arg(path_arg(&paths.libphonenumber_dir));

    let clone = Invocation::new(&tools.git)
        .arg("clone")
        .arg(&urls.closure_library)
        .arg(path_arg(&paths.closure_library_dir));

    let download = Invocation::new(&tools.curl)
        .args(["-f", "-L", "--create-dirs", "-o"])
        .arg(path_arg(&paths.compiler_zip))
        .arg(&urls.closure_compiler);

    let extract = Invocation::new(&tools.unzip)
        .args(["-o", "-d"])
        .arg(path_arg(&paths.build_dir))
        .arg(path_arg(&paths.compiler_zip))
        .arg(COMPILER_JAR);

    let mut compile = Invocation::new(&tools.python)
        .arg(CLOSURE_BUILDER)
        .arg("--root=closure-library");
    for ns in &config.namespaces {
        compile = compile.arg(format!("--namespace={ns}"));
    }
    let compile = compile
        .arg("--output_mode=compiled")
        .arg(format!("--compiler_jar={COMPILER_JAR}"))
        .args(LIBRARY_SOURCES)
        .current_dir(&paths.build_dir)
        .stdout_to(&paths.output_file);

    vec![
        Step { kind: StepKind::Checkout, invocation: checkout },
        Step { kind: StepKind::Clone, invocation: clone },
        Step { kind: StepKind::Download, invocation: download },
        Step { kind: StepKind::Extract, invocation: extract },
        Step { kind: StepKind::Compile, invocation: compile },
    ]
}

fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}
