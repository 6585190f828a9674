//! Password dispatch for the extractor.
//!
//! One password, two archives. Archive A is tried first, then B; the first
//! one the password opens is expanded into the target directory. Attempts
//! run in a staging directory inside the target so that a failed or
//! rejected attempt leaves the target untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::archiver::{Archiver, SevenZip};
use crate::config::{ARCHIVER_BINARY, STAGING_DIR_PREFIX};
use crate::error::{Error, IoContext, Result};
use crate::resource::ResourceRoot;
use crate::secret::Secret;
use crate::types::Slot;
use crate::worker::Reporter;

/// Result of a successful unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlocked {
    pub slot: Slot,

    /// Top-level names moved into the target, sorted.
    pub entries: Vec<PathBuf>,
}

pub struct Dispatcher {
    archiver: Arc<dyn Archiver>,
    archives: [PathBuf; 2],
}

impl Dispatcher {
    pub fn new(archiver: Arc<dyn Archiver>, archive_a: impl Into<PathBuf>, archive_b: impl Into<PathBuf>) -> Self {
        Self { archiver, archives: [archive_a.into(), archive_b.into()] }
    }

    /// Resolves the archiver and both archives under `root`.
    ///
    /// A bundle always carries its own archiver. A plain build without one
    /// falls back to `PATH`.
    pub fn from_root(root: &ResourceRoot) -> Result<Self> {
        let archive_a = root.require(Slot::A.archive_name())?;
        let archive_b = root.require(Slot::B.archive_name())?;

        let archiver = match root.require(ARCHIVER_BINARY) {
            Ok(path) => SevenZip::new(path),
            Err(_) if !root.is_bundled() => SevenZip::locate(None, root.dir())?,
            Err(e) => return Err(e),
        };

        Ok(Self::new(Arc::new(archiver), archive_a, archive_b))
    }

    #[inline]
    pub fn archive(&self, slot: Slot) -> &Path {
        match slot {
            Slot::A => &self.archives[0],
            Slot::B => &self.archives[1],
        }
    }

    /// Expands the archive `password` opens into `target`.
    ///
    /// Fails with [`Error::NoMatch`] when neither archive opens, and with
    /// [`Error::Collision`] when an extracted name already exists in
    /// `target`. In both cases `target` is left as it was.
    pub fn unlock(&self, password: &Secret, target: &Path, reporter: &mut Reporter) -> Result<Unlocked> {
        for (attempt, slot) in Slot::ORDER.into_iter().enumerate() {
            reporter.status(format!("Trying archive {slot}..."));

            let staging = staging_dir(target)?;
            let opened = self.attempt(slot, password, staging.path())?;
            reporter.progress(u8::try_from((attempt + 1) * 50).unwrap_or(100));

            if !opened {
                debug!(%slot, "password did not open archive");
                continue;
            }

            let entries = move_entries(staging.path(), target)?;
            close(staging);

            info!(%slot, entries = entries.len(), target = %target.display(), "archive unlocked");
            reporter.progress(100);

            return Ok(Unlocked { slot, entries });
        }

        Err(Error::NoMatch)
    }

    /// An attempt succeeds when the archiver exits cleanly and actually
    /// wrote something.
    fn attempt(&self, slot: Slot, password: &Secret, staging: &Path) -> Result<bool> {
        if !self.archiver.extract(self.archive(slot), password, staging)? {
            return Ok(false);
        }

        let empty = fs::read_dir(staging).with_path_context(|| format!("failed to read {}", staging.display()))?.next().is_none();
        if empty {
            warn!(%slot, "archiver reported success but extracted nothing");
        }

        Ok(!empty)
    }
}

fn staging_dir(target: &Path) -> Result<TempDir> {
    tempfile::Builder::new().prefix(STAGING_DIR_PREFIX).tempdir_in(target).with_path_context(|| format!("failed to create staging directory in {}", target.display()))
}

fn close(staging: TempDir) {
    let path = staging.path().to_path_buf();
    if let Err(e) = staging.close() {
        warn!(dir = %path.display(), error = %e, "failed to remove staging directory");
    }
}

/// Moves every top-level entry of `staging` into `target`.
///
/// All names are checked before anything moves.
fn move_entries(staging: &Path, target: &Path) -> Result<Vec<PathBuf>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(staging).with_path_context(|| format!("failed to read {}", staging.display()))? {
        let entry = entry.with_path_context(|| format!("failed to read {}", staging.display()))?;
        names.push(PathBuf::from(entry.file_name()));
    }
    names.sort();

    if let Some(existing) = names.iter().find(|name| target.join(name).symlink_metadata().is_ok()) {
        return Err(Error::Collision(existing.clone()));
    }

    for name in &names {
        let from = staging.join(name);
        let to = target.join(name);
        fs::rename(&from, &to).with_path_context(|| format!("failed to move {} into {}", name.display(), target.display()))?;
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tempfile::tempdir;
    use walkdir::WalkDir;

    use super::*;
    use crate::testing::{FakeArchiver, FakeMode};

    struct Fixture {
        _bundle: TempDir,
        target: TempDir,
        archiver: Arc<FakeArchiver>,
        dispatcher: Dispatcher,
    }

    impl Fixture {
        fn extract_calls(&self) -> usize {
            self.archiver.extract_calls.load(Ordering::SeqCst)
        }
    }

    /// Archive A holds `hello.txt`, archive B holds `data`.
    fn fixture(mode: FakeMode, password_a: &str, password_b: &str) -> Fixture {
        let bundle = tempdir().unwrap();
        let archiver = Arc::new(FakeArchiver::new(mode));

        let archive_a = bundle.path().join("data1.7z");
        let archive_b = bundle.path().join("data2.7z");
        archiver.compress(Path::new("/src/hello.txt"), &archive_a, &Secret::new(password_a)).unwrap();
        archiver.compress(Path::new("/src/data"), &archive_b, &Secret::new(password_b)).unwrap();

        let dispatcher = Dispatcher::new(archiver.clone(), archive_a, archive_b);
        Fixture { _bundle: bundle, target: tempdir().unwrap(), archiver, dispatcher }
    }

    fn snapshot(dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir).sort_by_file_name().into_iter().map(|e| e.unwrap().path().to_path_buf()).collect()
    }

    fn unlock(fx: &Fixture, password: &str) -> Result<Unlocked> {
        let (mut reporter, _events) = Reporter::channel();
        fx.dispatcher.unlock(&Secret::new(password), fx.target.path(), &mut reporter)
    }

    #[test]
    fn test_password_a_unlocks_only_a() {
        let fx = fixture(FakeMode::Honest, "alpha1", "beta2");

        let unlocked = unlock(&fx, "alpha1").unwrap();

        assert_eq!(unlocked, Unlocked { slot: Slot::A, entries: vec![PathBuf::from("hello.txt")] });
        assert!(fx.target.path().join("hello.txt").is_file());
        assert!(!fx.target.path().join("data").exists());
        assert_eq!(fx.extract_calls(), 1);
    }

    #[test]
    fn test_password_b_unlocks_only_b() {
        let fx = fixture(FakeMode::Honest, "alpha1", "beta2");

        let unlocked = unlock(&fx, "beta2").unwrap();

        assert_eq!(unlocked.slot, Slot::B);
        assert_eq!(fx.extract_calls(), 2);
        assert!(fx.target.path().join("data").exists());
        assert!(!fx.target.path().join("hello.txt").exists());
        assert_eq!(snapshot(fx.target.path()).len(), 2);
    }

    #[test]
    fn test_unknown_password_changes_nothing() {
        let fx = fixture(FakeMode::Honest, "alpha1", "beta2");
        fs::write(fx.target.path().join("keep.txt"), b"keep").unwrap();
        let before = snapshot(fx.target.path());

        assert!(matches!(unlock(&fx, "gamma3"), Err(Error::NoMatch)));
        assert_eq!(fx.extract_calls(), 2);
        assert_eq!(snapshot(fx.target.path()), before);
    }

    #[test]
    fn test_shared_password_prefers_a() {
        let fx = fixture(FakeMode::Honest, "same", "same");

        for _ in 0..3 {
            let unlocked = unlock(&fx, "same").unwrap();
            assert_eq!(unlocked.slot, Slot::A);
            fs::remove_file(fx.target.path().join("hello.txt")).unwrap();
        }
        assert_eq!(fx.extract_calls(), 3);
    }

    #[test]
    fn test_clean_exit_without_output_is_a_failed_attempt() {
        let fx = fixture(FakeMode::Silent, "alpha1", "beta2");

        assert!(matches!(unlock(&fx, "alpha1"), Err(Error::NoMatch)));
        assert_eq!(snapshot(fx.target.path()), vec![fx.target.path().to_path_buf()]);
    }

    #[test]
    fn test_collision_is_rejected_without_moving_anything() {
        let fx = fixture(FakeMode::Honest, "alpha1", "beta2");
        let existing = fx.target.path().join("hello.txt");
        fs::write(&existing, b"original").unwrap();

        let err = unlock(&fx, "alpha1").unwrap_err();

        assert!(matches!(err, Error::Collision(ref name) if name == Path::new("hello.txt")));
        assert_eq!(fs::read(&existing).unwrap(), b"original");
        assert_eq!(snapshot(fx.target.path()).len(), 2);
    }

    #[test]
    fn test_progress_reaches_completion_on_success() {
        let fx = fixture(FakeMode::Honest, "alpha1", "beta2");
        let (mut reporter, events) = Reporter::channel();

        fx.dispatcher.unlock(&Secret::new("beta2"), fx.target.path(), &mut reporter).unwrap();

        assert_eq!(reporter.current_progress(), 100);
        drop(reporter);
        assert!(events.iter().any(|e| e == crate::worker::Event::Status("Trying archive B...".to_owned())));
    }

    #[test]
    fn test_from_root_requires_both_archives() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("dualpack-extract");
        fs::write(&exe, b"plain build").unwrap();
        fs::write(dir.path().join("data1.7z"), b"a").unwrap();
        fs::write(dir.path().join(ARCHIVER_BINARY), b"").unwrap();

        let root = ResourceRoot::for_executable(&exe).unwrap();
        assert!(matches!(Dispatcher::from_root(&root), Err(Error::MissingResource(path)) if path.ends_with("data2.7z")));

        fs::write(dir.path().join("data2.7z"), b"b").unwrap();
        let dispatcher = Dispatcher::from_root(&root).unwrap();
        assert_eq!(dispatcher.archive(Slot::B), dir.path().join("data2.7z"));
    }
}
