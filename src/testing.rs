//! In-process stand-ins for the archiver and bundler.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::{NamedTempFile, TempPath};

use crate::archiver::Archiver;
use crate::bundle::{BundleSpec, Bundler};
use crate::error::{Error, IoContext, Result};
use crate::secret::Secret;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeMode {
    /// Archives record the password and the payload name; extraction with
    /// the right password recreates the payload as a small file.
    Honest,

    /// Compression fails like a tool exiting with code 2.
    Broken,

    /// Extraction always reports success but writes nothing.
    Silent,
}

/// An archiver whose "archives" are two-line text files.
pub struct FakeArchiver {
    mode: FakeMode,
    binary: TempPath,
    pub compress_calls: AtomicUsize,
    pub extract_calls: AtomicUsize,
}

impl FakeArchiver {
    pub fn new(mode: FakeMode) -> Self {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"fake archiver").unwrap();

        Self { mode, binary: file.into_temp_path(), compress_calls: AtomicUsize::new(0), extract_calls: AtomicUsize::new(0) }
    }
}

impl Archiver for FakeArchiver {
    fn binary(&self) -> &Path {
        &self.binary
    }

    fn compress(&self, source: &Path, archive: &Path, password: &Secret) -> Result<()> {
        self.compress_calls.fetch_add(1, Ordering::SeqCst);

        if self.mode == FakeMode::Broken {
            return Err(Error::ToolFailed { tool: "fake7z".to_owned(), code: 2, output: "fake archiver refused".to_owned() });
        }

        let name = source.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        fs::write(archive, format!("{}\n{name}\n", password.expose_secret())).with_path_context(|| format!("failed to write {}", archive.display()))
    }

    fn extract(&self, archive: &Path, password: &Secret, dest: &Path) -> Result<bool> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);

        let content = fs::read_to_string(archive).with_path_context(|| format!("failed to read {}", archive.display()))?;
        let mut lines = content.lines();
        let (Some(stored), Some(name)) = (lines.next(), lines.next()) else {
            return Ok(false);
        };

        match self.mode {
            FakeMode::Silent => Ok(true),
            _ if stored != password.expose_secret() => Ok(false),
            _ => {
                fs::write(dest.join(name), format!("payload from {}", archive.display())).with_path_context(|| format!("failed to extract into {}", dest.display()))?;
                Ok(true)
            }
        }
    }
}

/// A bundler that leaves a partial file in the work directory and fails.
pub struct FailingBundler;

impl Bundler for FailingBundler {
    fn bundle(&self, spec: &BundleSpec<'_>) -> Result<()> {
        fs::write(spec.work_dir.join("partial"), b"half a bundle").with_path_context(|| "failed to write partial bundle".to_owned())?;
        Err(Error::io("disk full", std::io::Error::other("no space left on device")))
    }
}
