//! phonejs-core: turns a pile of upstream checkouts into one `libphonenumber.js`
//!
//! Nothing clever happens in here. Every real piece of work (Subversion
//! checkout, git clone, download, unzip, Closure compilation) is done by an
//! external program; this crate decides the order, where each program runs,
//! and makes sure the scratch directory is gone when it is all over.
//!
//! ## The run, start to finish
//!
//! 1. Clear `libphonenumber_build/` if a previous run left it behind
//! 2. `svn checkout` libphonenumber
//! 3. `git clone` the Closure Library
//! 4. `curl` the Closure Compiler archive
//! 5. `unzip` `compiler.jar` out of it
//! 6. Run `closurebuilder.py` inside the scratch directory, stdout into `libphonenumber.js`
//! 7. Clear `libphonenumber_build/` again
//!
//! Each step's exit status is checked. By default the first failure stops the
//! run; [`config::FailurePolicy::Continue`] logs failures and keeps going.
//!
//! ## Example
//!
//! ```rust,no_run
//! use phonejs_core::config::BuildConfig;
//! use phonejs_core::pipeline::build;
//! use phonejs_core::runner::SystemRunner;
//!
//! let config = BuildConfig::from_current_dir()?;
//! let report = build(&config, &mut SystemRunner)?;
//!
//! println!(
//!     "wrote {} ({} bytes)",
//!     report.output_file.display(),
//!     report.output_bytes.unwrap_or(0)
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Pieces
//!
//! - [`config::BuildConfig`]: URLs, tool names, namespaces, paths
//! - [`plan::plan`]: the five [`plan::Step`]s, in order, as data
//! - [`runner::CommandRunner`]: the seam between the pipeline and real processes
//! - [`scratch::ScratchDir`]: owns the scratch directory and removes it on drop
//! - [`pipeline::build`]: ties it together and returns a [`pipeline::BuildReport`]

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod runner;
pub mod scratch;

pub use error::BuildError;
