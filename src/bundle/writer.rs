use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::bundle::format::{ResourceEntry, Trailer, encode_table, validate_name};
use crate::bundle::{BundleSpec, Bundler, make_executable};
use crate::config::{COPY_BUFFER_SIZE, TRAILER_SIZE};
use crate::error::{Error, IoContext, Result};

/// Builds bundles by appending resources to a copy of the entry executable.
///
/// The bundle is assembled under `work_dir/build`, then copied into a
/// temporary file beside the output and renamed over it, so the output path
/// only ever holds a complete bundle.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppendBundler;

impl AppendBundler {
    pub fn new() -> Self {
        Self
    }

    /// Writes the bundle to `staged` and returns the number of bytes written.
    fn assemble(spec: &BundleSpec<'_>, staged: &Path) -> Result<u64> {
        let file = File::create(staged).with_path_context(|| format!("failed to create {}", staged.display()))?;
        let mut out = BufWriter::with_capacity(COPY_BUFFER_SIZE, file);

        let mut position = append_file(spec.entry, &mut out)?;
        debug!(bytes = position, entry = %spec.entry.display(), "wrote entry executable");

        let mut entries = Vec::with_capacity(spec.resources.len());
        for resource in &spec.resources {
            let length = append_file(&resource.source, &mut out)?;
            debug!(name = %resource.name, bytes = length, "embedded resource");
            entries.push(ResourceEntry { name: resource.name.clone(), offset: position, length });
            position += length;
        }

        let table = encode_table(&entries)?;
        let trailer = Trailer { table_offset: position, table_length: table.len() as u64 };

        out.write_all(&table).and_then(|()| out.write_all(&trailer.encode())).and_then(|()| out.flush()).with_path_context(|| format!("failed to write resource table to {}", staged.display()))?;

        Ok(position + table.len() as u64 + TRAILER_SIZE as u64)
    }

    /// Copies `staged` next to `output` and renames it into place.
    fn install(staged: &Path, output: &Path) -> Result<()> {
        let parent = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        fs::create_dir_all(parent).with_path_context(|| format!("failed to create directory {}", parent.display()))?;

        let mut temp = NamedTempFile::new_in(parent).with_path_context(|| format!("failed to create a temporary file in {}", parent.display()))?;
        let mut source = File::open(staged).with_path_context(|| format!("failed to open {}", staged.display()))?;
        io::copy(&mut source, temp.as_file_mut()).and_then(|_| temp.as_file().sync_all()).with_path_context(|| format!("failed to copy bundle into {}", parent.display()))?;

        make_executable(temp.path())?;

        temp.persist(output).map_err(|e| Error::io(format!("failed to write {}", output.display()), e.error))?;

        Ok(())
    }
}

impl Bundler for AppendBundler {
    fn bundle(&self, spec: &BundleSpec<'_>) -> Result<()> {
        for resource in &spec.resources {
            validate_name(&resource.name)?;
        }

        let build_dir = spec.work_dir.join("build");
        fs::create_dir_all(&build_dir).with_path_context(|| format!("failed to create {}", build_dir.display()))?;

        let staged: PathBuf = build_dir.join(spec.output.file_name().unwrap_or(OsStr::new("bundle")));
        let size = Self::assemble(spec, &staged)?;

        Self::install(&staged, spec.output)?;
        info!(output = %spec.output.display(), bytes = size, "bundle written");

        Ok(())
    }
}

fn append_file<W: Write>(path: &Path, out: &mut W) -> Result<u64> {
    let file = File::open(path).with_path_context(|| format!("failed to open {}", path.display()))?;
    io::copy(&mut BufReader::with_capacity(COPY_BUFFER_SIZE, file), out).with_path_context(|| format!("failed to embed {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::bundle::{BundleReader, Resource};

    #[test]
    fn test_bundle_starts_with_entry_and_lists_resources() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("entry");
        let first = dir.path().join("one");
        let second = dir.path().join("two");
        fs::write(&entry, b"#!entry program").unwrap();
        fs::write(&first, b"first resource").unwrap();
        fs::write(&second, b"2").unwrap();

        let work = dir.path().join("work");
        let output = dir.path().join("out").join("bundle");
        let spec = BundleSpec { entry: &entry, resources: vec![Resource::new(&first, "data1.7z"), Resource::new(&second, "data2.7z")], output: &output, work_dir: &work };

        AppendBundler::new().bundle(&spec).unwrap();

        let bytes = fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"#!entry program"));

        let reader = BundleReader::open(&output).unwrap().expect("output should be a bundle");
        let names: Vec<&str> = reader.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["data1.7z", "data2.7z"]);
        assert_eq!(reader.entries()[0].offset, 15);
        assert_eq!(reader.entries()[1].length, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_bundle_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let entry = dir.path().join("entry");
        fs::write(&entry, b"exe").unwrap();
        let output = dir.path().join("bundle");

        AppendBundler::new().bundle(&BundleSpec { entry: &entry, resources: Vec::new(), output: &output, work_dir: dir.path() }).unwrap();

        let mode = fs::metadata(&output).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_failed_bundle_leaves_no_output() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("entry");
        fs::write(&entry, b"exe").unwrap();
        let output = dir.path().join("bundle");

        let spec = BundleSpec { entry: &entry, resources: vec![Resource::new(dir.path().join("missing.7z"), "data1.7z")], output: &output, work_dir: dir.path() };
        let err = AppendBundler::new().bundle(&spec).unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_invalid_resource_name_is_rejected_before_writing() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("entry");
        fs::write(&entry, b"exe").unwrap();
        let output = dir.path().join("bundle");

        let spec = BundleSpec { entry: &entry, resources: vec![Resource::new(&entry, "../escape")], output: &output, work_dir: dir.path() };

        assert!(matches!(AppendBundler::new().bundle(&spec), Err(Error::InvalidBundle(_))));
        assert!(!dir.path().join("build").exists());
    }
}
