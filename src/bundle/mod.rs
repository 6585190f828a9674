//! Self-extracting bundles.
//!
//! A bundle is a copy of the extractor executable with resource files
//! appended after it, followed by a resource table and a fixed trailer
//! (see [`format`]). The operating system loads the executable part and
//! ignores the rest; at run time the extractor reads its own file back to
//! find the resources.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoContext, Result};

pub mod format;
pub mod reader;
pub mod writer;

pub use reader::BundleReader;
pub use writer::AppendBundler;

/// A file to embed and the name it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub source: PathBuf,
    pub name: String,
}

impl Resource {
    pub fn new(source: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { source: source.into(), name: name.into() }
    }
}

/// What to bundle and where to put it.
#[derive(Debug)]
pub struct BundleSpec<'a> {
    /// The program that runs when the bundle is launched.
    pub entry: &'a Path,

    /// Files embedded after the program, in order.
    pub resources: Vec<Resource>,

    /// Final location of the bundle. Parent directories are created.
    pub output: &'a Path,

    /// Scratch space for intermediate files, owned by the caller.
    pub work_dir: &'a Path,
}

/// Packages an entry program and resource files into one executable.
pub trait Bundler: Send + Sync {
    /// Produces the bundle at `spec.output`.
    ///
    /// On failure nothing is left at `spec.output`.
    fn bundle(&self, spec: &BundleSpec<'_>) -> Result<()>;
}

/// Sets the executable bits on Unix; a no-op elsewhere.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).with_path_context(|| format!("failed to mark {} executable", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        fs::metadata(path).with_path_context(|| format!("failed to stat {}", path.display()))?;
    }

    Ok(())
}
