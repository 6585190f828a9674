//! dualpack - two passwords, two payloads, one self-extracting executable.
//!
//! The packager archives two files or folders with 7-Zip, each under its own
//! password with encrypted headers, and appends both archives and the
//! archiver to a prebuilt extractor. The extractor tries the password it is
//! given against archive A, then archive B, and expands the first one that
//! opens.
//!
//! - [`pipeline`]: the packaging stage machine
//! - [`dispatch`]: password dispatch on the extractor side
//! - [`bundle`]: the self-extracting bundle format
//! - [`archiver`]: the 7-Zip command line seam

mod allocator;

pub mod app;
pub mod archiver;
pub mod bundle;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod pipeline;
pub mod process;
pub mod resource;
pub mod secret;
pub mod types;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
