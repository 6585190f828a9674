//! Error types for packaging and extraction.
//!
//! Library code returns [`Result<T>`] with the [`Error`] enum below. The
//! binaries wrap these in `anyhow` with step context before reporting them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the packager and extractor can report.
#[derive(Debug, Error)]
pub enum Error {
    /// A required request field was left empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A payload path does not exist.
    #[error("file or folder does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// No 7-Zip executable on `PATH` and none shipped with the program.
    #[error("7z not found: install 7-Zip and add it to PATH, or place the 7z executable next to this program")]
    ArchiverNotFound,

    /// The prebuilt extractor executable could not be located.
    #[error("extractor executable not found: {}", .0.display())]
    ExtractorNotFound(PathBuf),

    /// An external tool exited unsuccessfully.
    ///
    /// `output` holds the tool's captured stdout and stderr.
    #[error("{tool} failed (exit code {code})")]
    ToolFailed { tool: String, code: i32, output: String },

    /// A filesystem operation failed.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The bundle trailer or resource table is malformed.
    #[error("invalid bundle: {0}")]
    InvalidBundle(String),

    /// A resource the program needs is missing from its resource root.
    #[error("missing resource: {}", .0.display())]
    MissingResource(PathBuf),

    /// The password opened neither archive.
    ///
    /// Wrong password and corrupted archive are deliberately not told apart.
    #[error("wrong password or corrupted archive, nothing was extracted")]
    NoMatch,

    /// An extracted entry already exists in the target directory.
    #[error("{} already exists in the target directory, nothing was extracted", .0.display())]
    Collision(PathBuf),

    /// A job was started while another one is still running.
    #[error("another operation is already in progress")]
    Busy,

    /// The worker thread panicked.
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
}

impl Error {
    /// Wraps an I/O error with a description of what was being done.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Captured tool output, if this error came from an external process.
    #[inline]
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::ToolFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Renders `error` followed by each of its sources, joined by `: `.
pub fn chain(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Attaches a context message to `io::Result` values.
pub trait IoContext<T> {
    fn with_path_context<F: FnOnce() -> String>(self, context: F) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn with_path_context<F: FnOnce() -> String>(self, context: F) -> Result<T> {
        self.map_err(|source| Error::io(context(), source))
    }
}
