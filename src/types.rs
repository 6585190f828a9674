//! Common type definitions for dualpack.
//!
//! Provides the values carried between the front ends and the two
//! long-running operations.
//!
//! # Overview
//!
//! - [`Slot`]: which of the two payloads (A or B) something belongs to
//! - [`Stage`]: the linear packaging state machine
//! - [`Payload`]: one (path, password) pair
//! - [`PackagingRequest`]: the immutable snapshot handed to the packager

use std::path::{Path, PathBuf};

use strum::{Display, EnumIter};

use crate::config::{ARCHIVE_A_NAME, ARCHIVE_B_NAME, PROGRESS_ARCHIVE_A, PROGRESS_ARCHIVE_B, PROGRESS_DONE, PROGRESS_EXTRACTOR, PROGRESS_START};
use crate::error::{Error, Result};
use crate::secret::Secret;

/// One of the two payload positions.
///
/// The pairing is positional: archive `data1.7z` is always A and
/// `data2.7z` is always B, and extraction always tries A first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Trial order used by the extractor.
    pub const ORDER: [Self; 2] = [Self::A, Self::B];

    /// Name of this slot's archive inside a bundle.
    #[inline]
    pub fn archive_name(self) -> &'static str {
        match self {
            Self::A => ARCHIVE_A_NAME,
            Self::B => ARCHIVE_B_NAME,
        }
    }
}

/// Stages of a packaging run, in execution order.
///
/// Each stage either completes and hands over to [`Stage::next`], or fails
/// the whole run. There are no branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Stage {
    #[strum(to_string = "Validating request")]
    Validate,

    #[strum(to_string = "Compressing payload A")]
    CompressA,

    #[strum(to_string = "Compressing payload B")]
    CompressB,

    #[strum(to_string = "Preparing extractor")]
    EmitExtractor,

    #[strum(to_string = "Bundling executable")]
    Bundle,

    #[strum(to_string = "Done")]
    Done,
}

impl Stage {
    /// The stage that follows this one, `None` once done.
    #[inline]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Validate => Some(Self::CompressA),
            Self::CompressA => Some(Self::CompressB),
            Self::CompressB => Some(Self::EmitExtractor),
            Self::EmitExtractor => Some(Self::Bundle),
            Self::Bundle => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Progress percentage reached when this stage completes.
    #[inline]
    pub fn checkpoint(self) -> u8 {
        match self {
            Self::Validate => PROGRESS_START,
            Self::CompressA => PROGRESS_ARCHIVE_A,
            Self::CompressB => PROGRESS_ARCHIVE_B,
            Self::EmitExtractor => PROGRESS_EXTRACTOR,
            Self::Bundle | Self::Done => PROGRESS_DONE,
        }
    }
}

/// A file or folder to protect, with its own password.
#[derive(Debug)]
pub struct Payload {
    pub path: PathBuf,
    pub password: Secret,
}

impl Payload {
    pub fn new(path: impl Into<PathBuf>, password: Secret) -> Self {
        Self { path: path.into(), password }
    }
}

/// Everything one packaging run needs, captured once from user input.
///
/// The request is moved into the worker by value; nothing reads the front
/// end's state after submission.
#[derive(Debug)]
pub struct PackagingRequest {
    pub payload_a: Payload,
    pub payload_b: Payload,
    pub output: PathBuf,
}

impl PackagingRequest {
    /// Builds a request, trimming surrounding whitespace from the paths.
    ///
    /// Passwords are kept exactly as typed.
    pub fn new(path_a: &str, password_a: Secret, path_b: &str, password_b: Secret, output: &str) -> Self {
        Self { payload_a: Payload::new(path_a.trim(), password_a), payload_b: Payload::new(path_b.trim(), password_b), output: PathBuf::from(output.trim()) }
    }

    #[inline]
    pub fn payload(&self, slot: Slot) -> &Payload {
        match slot {
            Slot::A => &self.payload_a,
            Slot::B => &self.payload_b,
        }
    }

    /// Checks that every field is filled in and both payloads exist.
    ///
    /// Runs before any directory is created or any process is spawned.
    pub fn validate(&self) -> Result<()> {
        let fields: [(&'static str, bool); 5] = [
            ("path A", is_blank(&self.payload_a.path)),
            ("password A", self.payload_a.password.is_empty()),
            ("path B", is_blank(&self.payload_b.path)),
            ("password B", self.payload_b.password.is_empty()),
            ("output path", is_blank(&self.output)),
        ];

        if let Some((name, _)) = fields.into_iter().find(|(_, missing)| *missing) {
            return Err(Error::MissingField(name));
        }

        for payload in [&self.payload_a, &self.payload_b] {
            if !payload.path.exists() {
                return Err(Error::SourceNotFound(payload.path.clone()));
            }
        }

        Ok(())
    }
}

#[inline]
fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty()
}
