//! User interface components for terminal interaction.
//!
//! # Modules
//!
//! - [`display`]: Banner, request summary table, result and error lines
//! - [`progress`]: Progress bar and spinner fed by worker events
//! - [`prompt`]: Interactive path, password and confirmation dialogs

pub mod display;
pub mod progress;
pub mod prompt;

pub use display::{clear_screen, print_banner, show_failure, show_packaged, show_request, show_tool_output, show_unlocked};
pub use progress::{Bar, Spinner};
pub use prompt::Prompt;
