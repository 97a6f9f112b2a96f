//! Scratch files for external conversions
//!
//! Every conversion gets its own directory inside the scratch root, holding
//! the input file, the output the converter is expected to write and a
//! private profile directory for the external program. Directory names are
//!
//! ```text
//! {prefix}-{unix_millis}-{pid}-{random}
//! ```
//!
//! created exclusively by [`tempfile`], so concurrent requests in the same
//! millisecond never share a directory. A [`ScratchResource`] removes its
//! directory when released or dropped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

/// Allocates scratch resources inside one directory
#[derive(Debug, Clone)]
pub struct ScratchManager {
    dir: PathBuf,
}

impl ScratchManager {
    /// Use `dir` for scratch files; it is created on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use the system temporary directory
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Directory holding the scratch files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a private directory with an input file, an output path and a
    /// profile directory path
    ///
    /// Only the directory and the (empty) input file exist afterwards.
    pub fn acquire(
        &self,
        prefix: &str,
        input_ext: &str,
        output_ext: &str,
    ) -> Result<ScratchResource> {
        fs::create_dir_all(&self.dir)?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}-{millis}-{}-", std::process::id()))
            .tempdir_in(&self.dir)?;

        let stem = dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| prefix.to_string());
        let input = dir.path().join(format!("{stem}.{input_ext}"));
        fs::File::create(&input)?;

        let resource = ScratchResource {
            output: dir.path().join(format!("{stem}.{output_ext}")),
            profile_dir: dir.path().join("profile"),
            input,
            stem,
            dir: Some(dir),
        };
        debug!(stem = %resource.stem, "scratch acquired");
        Ok(resource)
    }
}

/// A path that could not be removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub error: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to remove {}: {}", self.path.display(), self.error)
    }
}

/// Scratch directory owned by one in-flight conversion
#[derive(Debug)]
pub struct ScratchResource {
    stem: String,
    input: PathBuf,
    output: PathBuf,
    profile_dir: PathBuf,
    /// `None` once released
    dir: Option<TempDir>,
}

impl ScratchResource {
    /// Unique name of the conversion directory, shared by input and output
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Input file (created empty)
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Where the output is expected
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Private profile directory for the external program (not created)
    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Directory holding input and output
    pub fn dir(&self) -> &Path {
        self.input.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Replace the input file contents
    pub fn write_input(&self, bytes: &[u8]) -> Result<()> {
        fs::write(&self.input, bytes)?;
        Ok(())
    }

    /// Read the output file
    pub fn read_output(&self) -> std::io::Result<Vec<u8>> {
        fs::read(&self.output)
    }

    /// Remove the conversion directory and everything in it
    ///
    /// Failures are logged and returned, never raised. Calling this again is
    /// a no-op.
    pub fn release(&mut self) -> Vec<CleanupWarning> {
        let Some(dir) = self.dir.take() else {
            return Vec::new();
        };

        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => {
                debug!(stem = %self.stem, "scratch released");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
                vec![CleanupWarning {
                    path,
                    error: e.to_string(),
                }]
            }
        }
    }
}

impl Drop for ScratchResource {
    fn drop(&mut self) {
        self.release();
    }
}
