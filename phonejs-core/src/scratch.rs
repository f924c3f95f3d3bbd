//! Scratch directory lifecycle for phonejs-core

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{BuildError, Result};

/// Remove `path` recursively if it exists. Returns whether anything was removed.
///
/// A path that is already gone is not an error, including one that vanishes
/// between the existence check and the removal.
pub fn reset_dir(path: &Path) -> Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => return Err(scratch_err(path, source)),
    };

    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match removed {
        Ok(()) => {
            debug!(path = %path.display(), "removed scratch directory");
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(scratch_err(path, source)),
    }
}

fn scratch_err(path: &Path, source: io::Error) -> BuildError {
    BuildError::Scratch {
        path: path.to_path_buf(),
        source,
    }
}

/// Owns the scratch directory for the duration of a build.
///
/// Claiming clears whatever a previous run left behind; dropping clears it
/// again, so every exit path out of the pipeline leaves no scratch directory.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    armed: bool,
}

impl ScratchDir {
    pub fn claim(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if reset_dir(&path)? {
            debug!(path = %path.display(), "cleared leftover scratch directory");
        }
        Ok(Self { path, armed: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now and report failures instead of logging them.
    pub fn close(mut self) -> Result<()> {
        self.armed = false;
        reset_dir(&self.path).map(|_| ())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = reset_dir(&self.path) {
            warn!(error = %err, "scratch directory cleanup failed");
        }
    }
}
