//! Locating shipped and embedded resource files.
//!
//! A program either runs as a plain build, where its resources sit next to
//! the executable, or as a bundle, where they are embedded in the executable
//! itself and get unpacked into a private temporary directory first.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::bundle::{BundleReader, make_executable};
use crate::config::{ARCHIVER_BINARY, RESOURCE_DIR_PREFIX};
use crate::error::{Error, IoContext, Result};

/// The directory resource names resolve against.
#[derive(Debug)]
pub enum ResourceRoot {
    /// Plain build: the directory holding the executable.
    Source(PathBuf),

    /// Bundle: resources unpacked into a temporary directory, removed when
    /// this value is dropped.
    Bundled(TempDir),
}

impl ResourceRoot {
    /// Resolves the root for the running executable.
    pub fn detect() -> Result<Self> {
        let exe = std::env::current_exe().with_path_context(|| "failed to locate the running executable".to_owned())?;
        Self::for_executable(&exe)
    }

    /// Resolves the root for `exe`, unpacking its resources if it is a bundle.
    pub fn for_executable(exe: &Path) -> Result<Self> {
        let Some(reader) = BundleReader::open(exe)? else {
            let dir = exe.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            debug!(dir = %dir.display(), "running from a plain build");
            return Ok(Self::Source(dir));
        };

        let dir = tempfile::Builder::new().prefix(RESOURCE_DIR_PREFIX).tempdir().with_path_context(|| "failed to create resource directory".to_owned())?;
        reader.unpack(dir.path())?;

        let archiver = dir.path().join(ARCHIVER_BINARY);
        if archiver.is_file() {
            make_executable(&archiver)?;
        }

        info!(dir = %dir.path().display(), resources = reader.entries().len(), "unpacked bundled resources");

        Ok(Self::Bundled(dir))
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        match self {
            Self::Source(dir) => dir,
            Self::Bundled(dir) => dir.path(),
        }
    }

    #[inline]
    pub fn is_bundled(&self) -> bool {
        matches!(self, Self::Bundled(_))
    }

    /// Path `name` would have under this root. No filesystem access.
    #[inline]
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.dir().join(name)
    }

    /// Like [`resolve`](Self::resolve), but the file must exist.
    pub fn require(&self, name: &str) -> Result<PathBuf> {
        let path = self.resolve(name);
        if path.is_file() { Ok(path) } else { Err(Error::MissingResource(path)) }
    }
}
