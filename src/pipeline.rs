//! The packaging pipeline.
//!
//! `Validate → CompressA → CompressB → EmitExtractor → Bundle → Done`
//!
//! Every stage either hands over to the next one or ends the run with a
//! [`StageFailure`] naming the stage. All intermediate files live in one
//! temporary work directory that is removed however the run ends.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::archiver::{Archiver, SevenZip, is_script};
use crate::bundle::{AppendBundler, BundleSpec, Bundler, Resource};
use crate::config::{ARCHIVER_BINARY, EXTRACTOR_BINARY, PACK_DIR_PREFIX};
use crate::error::{Error, IoContext, Result, chain};
use crate::types::{PackagingRequest, Slot, Stage};
use crate::worker::Reporter;

/// A packaging run that stopped at `stage`.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packaged {
    pub output: PathBuf,
    pub archive_sizes: [u64; 2],
    pub bundle_size: u64,
}

/// Where the packager looks for the archiver and the extractor.
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    /// Explicit archiver, skipping the `PATH` lookup.
    pub archiver: Option<PathBuf>,

    /// Explicit extractor executable.
    pub extractor: Option<PathBuf>,

    /// Directory holding files shipped with the packager.
    pub shipped_dir: PathBuf,
}

impl ToolPaths {
    pub fn new(shipped_dir: impl Into<PathBuf>) -> Self {
        Self { archiver: None, extractor: None, shipped_dir: shipped_dir.into() }
    }

    pub fn locate_archiver(&self) -> Result<SevenZip> {
        SevenZip::locate(self.archiver.as_deref(), &self.shipped_dir)
    }

    /// The archiver copy to embed in bundles.
    ///
    /// A copy shipped next to the packager is preferred over `used`, the one
    /// that ran the packager's own compression: a system-wide `7z` is often
    /// a wrapper script around a binary the target machine will not have.
    pub fn embedded_archiver(&self, used: &Path) -> PathBuf {
        let shipped = self.shipped_dir.join(ARCHIVER_BINARY);
        let chosen = if shipped.is_file() { shipped } else { used.to_path_buf() };

        if is_script(&chosen) {
            warn!(path = %chosen.display(), "embedded archiver is a script and may not run on the target machine; ship a standalone 7z build");
        }

        chosen
    }

    pub fn locate_extractor(&self) -> Result<PathBuf> {
        let path = self.extractor.clone().unwrap_or_else(|| self.shipped_dir.join(EXTRACTOR_BINARY));
        if path.is_file() { Ok(path) } else { Err(Error::ExtractorNotFound(path)) }
    }
}

/// Turns a [`PackagingRequest`] into a bundle.
pub struct Packager<B: Bundler = AppendBundler> {
    tools: ToolPaths,
    bundler: B,
    archiver: Option<Arc<dyn Archiver>>,
    temp_root: Option<PathBuf>,
}

impl Packager<AppendBundler> {
    pub fn new(tools: ToolPaths) -> Self {
        Self::with_bundler(tools, AppendBundler::new())
    }
}

impl<B: Bundler> Packager<B> {
    pub fn with_bundler(tools: ToolPaths, bundler: B) -> Self {
        Self { tools, bundler, archiver: None, temp_root: None }
    }

    /// Uses `archiver` instead of locating 7-Zip.
    #[must_use]
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Creates work directories under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// Runs every stage in order, reporting progress through `reporter`.
    pub fn run(&self, request: &PackagingRequest, reporter: &mut Reporter) -> std::result::Result<Packaged, StageFailure> {
        let result = self.run_stages(request, reporter);

        match &result {
            Ok(packaged) => info!(output = %packaged.output.display(), bytes = packaged.bundle_size, "packaging finished"),
            Err(failure) => {
                error!(stage = %failure.stage, error = %chain(&failure.error), "packaging failed");
                if let Some(output) = failure.error.tool_output() {
                    warn!(%output, "tool output");
                }
            }
        }

        result
    }

    fn run_stages(&self, request: &PackagingRequest, reporter: &mut Reporter) -> std::result::Result<Packaged, StageFailure> {
        let (archiver, work) = step(Stage::Validate, reporter, || {
            request.validate()?;
            let archiver = self.archiver()?;
            let work = self.work_dir()?;
            Ok((archiver, work))
        })?;

        let archive_a = step(Stage::CompressA, reporter, || compress(archiver.as_ref(), request, Slot::A, work.path()))?;
        let archive_b = step(Stage::CompressB, reporter, || compress(archiver.as_ref(), request, Slot::B, work.path()))?;
        let extractor = step(Stage::EmitExtractor, reporter, || self.emit_extractor(work.path()))?;

        let bundle_size = step(Stage::Bundle, reporter, || {
            let spec = BundleSpec {
                entry: &extractor,
                resources: vec![Resource::new(&archive_a.0, Slot::A.archive_name()), Resource::new(&archive_b.0, Slot::B.archive_name()), Resource::new(self.tools.embedded_archiver(archiver.binary()), ARCHIVER_BINARY)],
                output: &request.output,
                work_dir: work.path(),
            };
            self.bundler.bundle(&spec)?;
            Ok(fs::metadata(&request.output).with_path_context(|| format!("failed to stat {}", request.output.display()))?.len())
        })?;

        reporter.stage(Stage::Done);
        cleanup(work);

        Ok(Packaged { output: request.output.clone(), archive_sizes: [archive_a.1, archive_b.1], bundle_size })
    }

    fn archiver(&self) -> Result<Arc<dyn Archiver>> {
        match &self.archiver {
            Some(archiver) => Ok(Arc::clone(archiver)),
            None => Ok(Arc::new(self.tools.locate_archiver()?)),
        }
    }

    fn work_dir(&self) -> Result<TempDir> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix(PACK_DIR_PREFIX);
            builder
        };

        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };

        dir.with_path_context(|| "failed to create work directory".to_owned())
    }

    /// Places the prebuilt extractor in the work directory as the bundle's
    /// entry program.
    fn emit_extractor(&self, work: &Path) -> Result<PathBuf> {
        let source = self.tools.locate_extractor()?;
        let target = work.join(EXTRACTOR_BINARY);
        fs::copy(&source, &target).with_path_context(|| format!("failed to copy extractor from {}", source.display()))?;
        Ok(target)
    }
}

/// Runs one stage: announces it, and on success reports its checkpoint.
fn step<T>(stage: Stage, reporter: &mut Reporter, run: impl FnOnce() -> Result<T>) -> std::result::Result<T, StageFailure> {
    reporter.stage(stage);
    reporter.status(format!("{stage}..."));
    info!(%stage, "stage started");

    let value = run().map_err(|error| StageFailure { stage, error })?;

    reporter.progress(stage.checkpoint());
    Ok(value)
}

/// Archives one payload into the work directory. Returns (path, size).
fn compress(archiver: &dyn Archiver, request: &PackagingRequest, slot: Slot, work: &Path) -> Result<(PathBuf, u64)> {
    let payload = request.payload(slot);
    let archive = work.join(slot.archive_name());

    archiver.compress(&payload.path, &archive, &payload.password)?;

    let size = fs::metadata(&archive).with_path_context(|| format!("failed to stat {}", archive.display()))?.len();
    info!(%slot, bytes = size, "payload archived");

    Ok((archive, size))
}

fn cleanup(work: TempDir) {
    let path = work.path().to_path_buf();
    if let Err(e) = work.close() {
        warn!(dir = %path.display(), error = %e, "failed to remove work directory");
    }
}
