//! Global Configuration Constants
//!
//! This module contains the fixed parameters shared by the packager and the
//! extractor: external tool names, the names resources carry inside a bundle,
//! temporary directory prefixes, progress checkpoints, and the bundle trailer
//! layout.
//!
//! Runtime overrides (an explicit archiver or extractor path) come from the
//! command line or from the environment variables declared at the bottom of
//! this module; everything else is fixed at compile time.

/// Application name used in user interfaces.
pub const APP_NAME: &str = "dualpack";

// === External Archiver ===

/// File name of the 7-Zip command line executable on this platform.
///
/// The packager looks this name up on `PATH` first and falls back to a copy
/// shipped next to the running executable. Inside a bundle the archiver is
/// always stored under this name.
#[cfg(windows)]
pub const ARCHIVER_BINARY: &str = "7z.exe";

/// File name of the 7-Zip command line executable on this platform.
#[cfg(not(windows))]
pub const ARCHIVER_BINARY: &str = "7z";

/// Archive type passed to the archiver with `-t`.
pub const ARCHIVE_TYPE: &str = "7z";

// === Extractor ===

/// File name of the prebuilt extractor executable, expected next to the
/// packager executable.
#[cfg(windows)]
pub const EXTRACTOR_BINARY: &str = "dualpack-extract.exe";

/// File name of the prebuilt extractor executable, expected next to the
/// packager executable.
#[cfg(not(windows))]
pub const EXTRACTOR_BINARY: &str = "dualpack-extract";

/// Default output file name offered by the interactive wizard.
#[cfg(windows)]
pub const DEFAULT_OUTPUT_NAME: &str = "output.exe";

/// Default output file name offered by the interactive wizard.
#[cfg(not(windows))]
pub const DEFAULT_OUTPUT_NAME: &str = "output";

// === Bundle Resources ===

/// Resource name of the archive built from payload A.
pub const ARCHIVE_A_NAME: &str = "data1.7z";

/// Resource name of the archive built from payload B.
pub const ARCHIVE_B_NAME: &str = "data2.7z";

/// Magic bytes closing every bundle.
///
/// The last 24 bytes of a bundle are the trailer: table offset (u64 LE),
/// table length (u64 LE), and these 8 bytes. A file that does not end with
/// them is not a bundle.
pub const BUNDLE_MAGIC: [u8; 8] = *b"DPAKSFX1";

/// Size of the fixed trailer at the end of a bundle.
pub const TRAILER_SIZE: usize = 8 + 8 + BUNDLE_MAGIC.len();

/// Upper bound on the number of resources a bundle table may declare.
///
/// A bundle carries three resources; the bound only guards the reader
/// against allocating for a corrupted count.
pub const MAX_RESOURCES: u32 = 64;

/// Copy buffer size used while assembling and unpacking bundles.
pub const COPY_BUFFER_SIZE: usize = 256 * 1024;

// === Temporary Directories ===

/// Prefix of the packager's per-run work directory.
pub const PACK_DIR_PREFIX: &str = "dualpack-pack-";

/// Prefix of the directory a bundle unpacks its resources into.
pub const RESOURCE_DIR_PREFIX: &str = "dualpack-res-";

/// Prefix of the staging directory an extraction attempt writes into.
///
/// The staging directory is created inside the extraction target so the
/// final move is a rename on the same filesystem.
pub const STAGING_DIR_PREFIX: &str = ".dualpack-extract-";

// === Progress Checkpoints ===
// Percentages reported by the packager. They never decrease.

/// Reported when the pipeline starts compressing payload A.
pub const PROGRESS_START: u8 = 5;

/// Reported once archive A is written.
pub const PROGRESS_ARCHIVE_A: u8 = 30;

/// Reported once archive B is written.
pub const PROGRESS_ARCHIVE_B: u8 = 55;

/// Reported once the extractor artifact is in the work directory.
pub const PROGRESS_EXTRACTOR: u8 = 70;

/// Reported once the bundle is installed at the output path.
pub const PROGRESS_DONE: u8 = 100;

// === Prompts ===

/// Minimum password length accepted by the interactive wizard.
///
/// The command line accepts any non-empty password, matching what the
/// archiver itself accepts.
pub const PASSWORD_MIN_LENGTH: usize = 4;

// === Environment Overrides ===

/// Environment variable naming an explicit archiver executable.
pub const ARCHIVER_ENV: &str = "DUALPACK_ARCHIVER";

/// Environment variable naming an explicit extractor executable.
pub const EXTRACTOR_ENV: &str = "DUALPACK_EXTRACTOR";
