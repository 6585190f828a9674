use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset, quiet enough to leave the terminal
/// UI readable.
const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs the global subscriber: stderr, with source locations, filtered
/// by `RUST_LOG`.
pub fn init() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_file(true).with_line_number(true).finish();

    tracing::subscriber::set_global_default(subscriber)
}
