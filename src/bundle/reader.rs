use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bundle::format::{ResourceEntry, Trailer, decode_table};
use crate::config::{COPY_BUFFER_SIZE, TRAILER_SIZE};
use crate::error::{Error, IoContext, Result};

/// Read access to the resources embedded in a bundle.
#[derive(Debug)]
pub struct BundleReader {
    path: PathBuf,
    entries: Vec<ResourceEntry>,
}

impl BundleReader {
    /// Opens `path` as a bundle.
    ///
    /// Returns `Ok(None)` for files that carry no bundle trailer, such as a
    /// plain build of the extractor. A trailer pointing at an inconsistent
    /// table is an [`Error::InvalidBundle`].
    pub fn open(path: &Path) -> Result<Option<Self>> {
        let mut file = File::open(path).with_path_context(|| format!("failed to open {}", path.display()))?;
        let file_len = file.metadata().with_path_context(|| format!("failed to stat {}", path.display()))?.len();

        if file_len < TRAILER_SIZE as u64 {
            return Ok(None);
        }

        let mut raw = [0u8; TRAILER_SIZE];
        file.seek(SeekFrom::End(-(TRAILER_SIZE as i64))).and_then(|_| file.read_exact(&mut raw)).with_path_context(|| format!("failed to read trailer of {}", path.display()))?;

        let Some(trailer) = Trailer::decode(&raw) else {
            return Ok(None);
        };

        let table_end = trailer.table_offset.checked_add(trailer.table_length);
        if table_end != Some(file_len - TRAILER_SIZE as u64) {
            return Err(Error::InvalidBundle(format!("resource table does not end at the trailer of {}", path.display())));
        }

        let table_len = usize::try_from(trailer.table_length).map_err(|_| Error::InvalidBundle("resource table is too large".to_owned()))?;
        let mut table = vec![0u8; table_len];
        file.seek(SeekFrom::Start(trailer.table_offset)).and_then(|_| file.read_exact(&mut table)).with_path_context(|| format!("failed to read resource table of {}", path.display()))?;

        let entries = decode_table(&table)?;
        for entry in &entries {
            if entry.offset.checked_add(entry.length).is_none_or(|end| end > trailer.table_offset) {
                return Err(Error::InvalidBundle(format!("resource {} lies outside the bundle", entry.name)));
            }
        }

        debug!(path = %path.display(), resources = entries.len(), "opened bundle");

        Ok(Some(Self { path: path.to_path_buf(), entries }))
    }

    #[inline]
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    /// Writes every resource into `dest`, one file per entry name.
    pub fn unpack(&self, dest: &Path) -> Result<()> {
        let mut file = File::open(&self.path).with_path_context(|| format!("failed to open {}", self.path.display()))?;

        for entry in &self.entries {
            let target = dest.join(&entry.name);
            let out = File::create(&target).with_path_context(|| format!("failed to create {}", target.display()))?;
            let mut out = BufWriter::with_capacity(COPY_BUFFER_SIZE, out);

            file.seek(SeekFrom::Start(entry.offset)).with_path_context(|| format!("failed to seek to {}", entry.name))?;
            let copied = io::copy(&mut (&mut file).take(entry.length), &mut out).and_then(|n| out.flush().map(|()| n)).with_path_context(|| format!("failed to unpack {}", entry.name))?;

            if copied != entry.length {
                return Err(Error::InvalidBundle(format!("resource {} is truncated", entry.name)));
            }

            debug!(name = %entry.name, bytes = copied, "unpacked resource");
        }

        Ok(())
    }
}
