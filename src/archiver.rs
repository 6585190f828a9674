//! The external archiver seam.
//!
//! Compression, encryption and archive parsing all happen inside 7-Zip.
//! This module only builds its command lines and reads its exit status.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{ARCHIVE_TYPE, ARCHIVER_BINARY};
use crate::error::{Error, Result};
use crate::process::Cmd;
use crate::secret::Secret;

/// Password-protected archive creation and extraction.
pub trait Archiver: Send + Sync {
    /// Path of the executable, embedded into bundles next to the archives.
    fn binary(&self) -> &Path;

    /// Archives `source` (file or folder) into a new `archive`.
    ///
    /// File contents and the header (file names) are both encrypted.
    fn compress(&self, source: &Path, archive: &Path, password: &Secret) -> Result<()>;

    /// Expands `archive` into `dest`, overwriting what is there.
    ///
    /// Returns `Ok(false)` when the tool reported failure. Whether anything
    /// was actually written is for the caller to check.
    fn extract(&self, archive: &Path, password: &Secret, dest: &Path) -> Result<bool>;
}

/// The 7-Zip command line tool.
#[derive(Debug, Clone)]
pub struct SevenZip {
    binary: PathBuf,
}

impl SevenZip {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// Finds a usable 7-Zip executable.
    ///
    /// Order: an explicit path, then `PATH`, then a copy shipped in
    /// `shipped_dir`. Anything else is [`Error::ArchiverNotFound`].
    pub fn locate(explicit: Option<&Path>, shipped_dir: &Path) -> Result<Self> {
        Self::locate_in(explicit, std::env::var_os("PATH").as_deref(), shipped_dir)
    }

    /// Like [`locate`](Self::locate), searching `search_path` instead of
    /// the process `PATH`.
    pub fn locate_in(explicit: Option<&Path>, search_path: Option<&OsStr>, shipped_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if path.is_file() {
                info!(path = %path.display(), "using configured archiver");
                return Ok(Self::new(path));
            }
            warn!(path = %path.display(), "configured archiver does not exist");
            return Err(Error::ArchiverNotFound);
        }

        if let Some(path) = search_path.and_then(|paths| which::which_in(ARCHIVER_BINARY, Some(paths), ".").ok()) {
            info!(path = %path.display(), "using archiver from PATH");
            return Ok(Self::new(path));
        }

        let shipped = shipped_dir.join(ARCHIVER_BINARY);
        if shipped.is_file() {
            info!(path = %shipped.display(), "using shipped archiver");
            return Ok(Self::new(shipped));
        }

        Err(Error::ArchiverNotFound)
    }

    /// `7z a -t7z <archive> ./<name> -p<password> -mhe=on -y`, run from the
    /// source's parent so the archive stores only the source's own name.
    ///
    /// The `./` prefix keeps names such as `-r` or `@list` from being read
    /// as switches or list files.
    pub fn compress_command(&self, source: &Path, archive: &Path, password: &Secret) -> Cmd {
        let (dir, name) = split_source(source);

        let cmd = Cmd::new(&self.binary)
            .arg("a")
            .arg(format!("-t{ARCHIVE_TYPE}"))
            .arg(archive)
            .arg(name)
            .secret_arg("-p", password.expose_secret())
            .arg("-mhe=on")
            .arg("-y");

        match dir {
            Some(dir) => cmd.dir(dir),
            None => cmd,
        }
    }

    /// `7z x <archive> -p<password> -o<dest> -y`
    pub fn extract_command(&self, archive: &Path, password: &Secret, dest: &Path) -> Cmd {
        Cmd::new(&self.binary).arg("x").arg(archive).secret_arg("-p", password.expose_secret()).arg_joined("-o", dest).arg("-y")
    }
}

impl Archiver for SevenZip {
    fn binary(&self) -> &Path {
        &self.binary
    }

    fn compress(&self, source: &Path, archive: &Path, password: &Secret) -> Result<()> {
        self.compress_command(source, archive, password).run()?;

        if !archive.is_file() {
            return Err(Error::ToolFailed { tool: ARCHIVER_BINARY.to_owned(), code: 0, output: format!("no archive was written to {}", archive.display()) });
        }

        Ok(())
    }

    fn extract(&self, archive: &Path, password: &Secret, dest: &Path) -> Result<bool> {
        let result = self.extract_command(archive, password, dest).output()?;

        if !result.success() {
            debug!(code = result.code(), output = %result.combined_output(), "extraction attempt rejected");
        }

        Ok(result.success())
    }
}

/// Splits a payload path into (working directory, name to archive).
///
/// The name is always relative to the working directory and starts with
/// `./`, unless the path has no file name at all.
fn split_source(source: &Path) -> (Option<&Path>, PathBuf) {
    match (source.parent(), source.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => (Some(parent), Path::new(".").join(name)),
        (_, Some(name)) => (None, Path::new(".").join(name)),
        _ => (None, source.to_path_buf()),
    }
}

/// Whether `path` is an interpreter script (`#!`) rather than a binary.
///
/// Distribution packages often install `7z` as a wrapper script that only
/// works where the real binary is installed too.
pub fn is_script(path: &Path) -> bool {
    let mut magic = [0u8; 2];
    File::open(path).and_then(|mut file| file.read_exact(&mut magic)).is_ok() && &magic == b"#!"
}
