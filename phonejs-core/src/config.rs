//! Build configuration and path layout

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

pub const BUILD_DIR_NAME: &str = "libphonenumber_build";
pub const OUTPUT_FILE_NAME: &str = "libphonenumber.js";

pub const LIBPHONENUMBER_URL: &str = "http://libphonenumber.googlecode.com/svn/trunk/";
pub const CLOSURE_LIBRARY_URL: &str = "git://github.com/google/closure-library.git";
pub const CLOSURE_COMPILER_URL: &str = "http://dl.google.com/closure-compiler/compiler-latest.zip";

/// Library sources handed to the Closure builder, in command-line order.
pub const LIBRARY_SOURCES: [&str; 5] = [
    "libphonenumber/javascript/i18n/phonenumbers/metadata.js",
    "libphonenumber/javascript/i18n/phonenumbers/phonemetadata.pb.js",
    "libphonenumber/javascript/i18n/phonenumbers/phonenumber.pb.js",
    "libphonenumber/javascript/i18n/phonenumbers/phonenumberutil.js",
    "libphonenumber/javascript/i18n/phonenumbers/asyoutypeformatter.js",
];

pub const DEFAULT_NAMESPACES: [&str; 2] = [
    "i18n.phonenumbers.PhoneNumberUtil",
    "i18n.phonenumbers.AsYouTypeFormatter",
];

/// What to do when an external step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing step.
    #[default]
    Abort,
    /// Log and carry on with the next step.
    Continue,
}

/// Upstream locations for the three fetched artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUrls {
    pub libphonenumber: String,
    pub closure_library: String,
    pub closure_compiler: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            libphonenumber: LIBPHONENUMBER_URL.to_string(),
            closure_library: CLOSURE_LIBRARY_URL.to_string(),
            closure_compiler: CLOSURE_COMPILER_URL.to_string(),
        }
    }
}

/// Program names (or paths) of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub svn: String,
    pub git: String,
    pub curl: String,
    pub unzip: String,
    pub python: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            svn: "svn".to_string(),
            git: "git".to_string(),
            curl: "curl".to_string(),
            unzip: "unzip".to_string(),
            python: "python".to_string(),
        }
    }
}

/// Everything the pipeline needs to know before it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory the scratch directory and output file are resolved against.
    pub base_dir: PathBuf,
    pub build_dir_name: String,
    pub output_file: PathBuf,
    pub sources: SourceUrls,
    pub tools: Toolchain,
    pub namespaces: Vec<String>,
    pub policy: FailurePolicy,
}

impl BuildConfig {
    /// Defaults rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            output_file: base_dir.join(OUTPUT_FILE_NAME),
            base_dir,
            build_dir_name: BUILD_DIR_NAME.to_string(),
            sources: SourceUrls::default(),
            tools: Toolchain::default(),
            namespaces: DEFAULT_NAMESPACES.iter().map(|s| s.to_string()).collect(),
            policy: FailurePolicy::default(),
        }
    }

    /// Defaults rooted at the process's current working directory.
    pub fn from_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| BuildError::Config(format!("cannot read current directory: {e}")))?;
        Ok(Self::new(cwd))
    }

    /// Relative output paths are taken relative to `base_dir`.
    pub fn with_output(mut self, output: impl AsRef<Path>) -> Self {
        self.output_file = self.base_dir.join(output);
        self
    }

    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn paths(&self) -> BuildPaths {
        BuildPaths::new(self.base_dir.join(&self.build_dir_name), self.output_file.clone())
    }

    /// Reject configurations the pipeline cannot turn into sane command lines.
    pub fn validate(&self) -> Result<()> {
        let mut parts = Path::new(&self.build_dir_name).components();
        let single = matches!(parts.next(), Some(Component::Normal(_))) && parts.next().is_none();
        if !single {
            return Err(BuildError::Config(format!(
                "scratch directory name must be a single path component: {:?}",
                self.build_dir_name
            )));
        }

        if self.namespaces.is_empty() {
            return Err(BuildError::Config("at least one namespace is required".into()));
        }

        for ns in &self.namespaces {
            if !NAMESPACE_PATTERN.is_match(ns) {
                return Err(BuildError::Config(format!("invalid namespace: {ns}")));
            }
        }

        let scratch = lexical_normalize(&self.paths().build_dir);
        if lexical_normalize(&self.output_file).starts_with(&scratch) {
            return Err(BuildError::Config(format!(
                "output file {} lies inside the scratch directory",
                self.output_file.display()
            )));
        }

        Ok(())
    }
}

/// Dotted JavaScript identifier path, e.g. `i18n.phonenumbers.PhoneNumberUtil`.
static NAMESPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
        .expect("namespace pattern is valid")
});

/// Resolve `.` and `..` without touching the filesystem. `..` at the root stays at the root.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Absolute paths of everything the pipeline touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPaths {
    pub build_dir: PathBuf,
    pub output_file: PathBuf,
    pub libphonenumber_dir: PathBuf,
    pub closure_library_dir: PathBuf,
    pub compiler_zip: PathBuf,
}

impl BuildPaths {
    pub fn new(build_dir: PathBuf, output_file: PathBuf) -> Self {
        Self {
            libphonenumber_dir: build_dir.join("libphonenumber"),
            closure_library_dir: build_dir.join("closure-library"),
            compiler_zip: build_dir.join("compiler-latest.zip"),
            build_dir,
            output_file,
        }
    }
}
