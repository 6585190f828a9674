//! Resource table and trailer encoding.
//!
//! ```text
//! [entry executable][resource 0][resource 1]...[table][trailer]
//!
//! table:   count u32 | { name_len u16 | name | offset u64 | length u64 } * count
//! trailer: table_offset u64 | table_length u64 | magic [8]
//! ```
//!
//! All integers are little-endian. Offsets are absolute positions in the
//! bundle file.

use crate::config::{BUNDLE_MAGIC, MAX_RESOURCES, TRAILER_SIZE};
use crate::error::{Error, Result};

/// One embedded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

/// Location of the resource table, stored in the last bytes of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub table_offset: u64,
    pub table_length: u64,
}

impl Trailer {
    pub fn encode(&self) -> [u8; TRAILER_SIZE] {
        let mut out = [0u8; TRAILER_SIZE];
        out[..8].copy_from_slice(&self.table_offset.to_le_bytes());
        out[8..16].copy_from_slice(&self.table_length.to_le_bytes());
        out[16..].copy_from_slice(&BUNDLE_MAGIC);
        out
    }

    /// Returns `None` when the bytes do not end with the bundle magic.
    pub fn decode(bytes: &[u8; TRAILER_SIZE]) -> Option<Self> {
        if bytes[16..] != BUNDLE_MAGIC {
            return None;
        }

        let table_offset = u64::from_le_bytes(bytes[..8].try_into().ok()?);
        let table_length = u64::from_le_bytes(bytes[8..16].try_into().ok()?);

        Some(Self { table_offset, table_length })
    }
}

/// Checks that a resource name is a plain file name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) || name.len() > usize::from(u16::MAX) {
        return Err(Error::InvalidBundle(format!("invalid resource name: {name:?}")));
    }
    Ok(())
}

pub fn encode_table(entries: &[ResourceEntry]) -> Result<Vec<u8>> {
    let count = u32::try_from(entries.len()).ok().filter(|&n| n <= MAX_RESOURCES).ok_or_else(|| Error::InvalidBundle(format!("too many resources: {}", entries.len())))?;

    let mut out = Vec::with_capacity(4 + entries.iter().map(|e| 2 + e.name.len() + 16).sum::<usize>());
    out.extend_from_slice(&count.to_le_bytes());

    for entry in entries {
        validate_name(&entry.name)?;
        let name_len = u16::try_from(entry.name.len()).map_err(|_| Error::InvalidBundle(format!("resource name too long: {}", entry.name)))?;

        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&entry.offset.to_le_bytes());
        out.extend_from_slice(&entry.length.to_le_bytes());
    }

    Ok(out)
}

pub fn decode_table(bytes: &[u8]) -> Result<Vec<ResourceEntry>> {
    let mut cursor = Cursor { bytes, pos: 0 };

    let count = u32::from_le_bytes(cursor.take_array()?);
    if count > MAX_RESOURCES {
        return Err(Error::InvalidBundle(format!("resource count {count} exceeds limit")));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_len = u16::from_le_bytes(cursor.take_array()?);
        let name = std::str::from_utf8(cursor.take(usize::from(name_len))?).map_err(|_| Error::InvalidBundle("resource name is not UTF-8".to_owned()))?.to_owned();
        validate_name(&name)?;

        let offset = u64::from_le_bytes(cursor.take_array()?);
        let length = u64::from_le_bytes(cursor.take_array()?);

        entries.push(ResourceEntry { name, offset, length });
    }

    if cursor.pos != bytes.len() {
        return Err(Error::InvalidBundle("trailing bytes after resource table".to_owned()));
    }

    Ok(entries)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.bytes.len()).ok_or_else(|| Error::InvalidBundle("resource table is truncated".to_owned()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.take(N)?;
        slice.try_into().map_err(|_| Error::InvalidBundle("resource table is truncated".to_owned()))
    }
}
