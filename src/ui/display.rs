//! Display utilities.

use std::path::Path;

use anyhow::Result;
use bytesize::ByteSize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use console::{Term, style};
use figlet_rs::FIGfont;
use strum::IntoEnumIterator;
use walkdir::WalkDir;

use crate::config::APP_NAME;
use crate::dispatch::Unlocked;
use crate::pipeline::Packaged;
use crate::types::{PackagingRequest, Slot};

/// Total size in bytes of a file, or of every file under a folder.
///
/// Unreadable entries count as zero.
pub fn payload_size(path: &Path) -> u64 {
    WalkDir::new(path).into_iter().filter_map(std::result::Result::ok).filter(|e| e.file_type().is_file()).filter_map(|e| e.metadata().ok()).map(|m| m.len()).sum()
}

fn payload_kind(path: &Path) -> &'static str {
    if path.is_dir() { "folder" } else { "file" }
}

/// Builds the summary table shown before packaging starts.
pub fn request_table(request: &PackagingRequest) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic).set_header(vec!["Payload", "Kind", "Size", "Path"]);

    for slot in Slot::iter() {
        let payload = request.payload(slot);
        table.add_row(vec![slot.to_string(), payload_kind(&payload.path).to_owned(), ByteSize::b(payload_size(&payload.path)).to_string(), payload.path.display().to_string()]);
    }

    table
}

/// Prints the two payloads and the output path.
pub fn show_request(request: &PackagingRequest) {
    println!();
    println!("{}", request_table(request));
    println!("{} {}", style("Output:").bold(), request.output.display());
    println!();
}

pub fn show_packaged(packaged: &Packaged) {
    println!();
    println!("{} {}", style("✓").green(), style(format!("Executable created: {}", packaged.output.display())).bold());
    println!(
        "  {} {}  {} {}  {} {}",
        style("archive A").dim(),
        ByteSize::b(packaged.archive_sizes[0]),
        style("archive B").dim(),
        ByteSize::b(packaged.archive_sizes[1]),
        style("bundle").dim(),
        ByteSize::b(packaged.bundle_size)
    );
}

pub fn show_unlocked(unlocked: &Unlocked, target: &Path) {
    println!();
    println!("{} {}", style("✓").green(), style(format!("Payload {} unlocked into {}", unlocked.slot, target.display())).bold());
    for entry in &unlocked.entries {
        println!("  {}", entry.display());
    }
}

/// Prints an error with its cause chain.
pub fn show_failure(error: &anyhow::Error) {
    eprintln!();
    eprintln!("{} {}", style("✗").red(), style(error).red().bold());
    for cause in error.chain().skip(1) {
        eprintln!("  {} {cause}", style("caused by:").dim());
    }
}

/// Prints the captured output of a failed external tool.
pub fn show_tool_output(output: &str) {
    let output = output.trim();
    if output.is_empty() {
        return;
    }

    eprintln!();
    eprintln!("{}", style("Tool output:").yellow().bold());
    for line in output.lines() {
        eprintln!("  {line}");
    }
}

pub fn clear_screen() -> Result<()> {
    Term::stdout().clear_screen().map_err(|e| anyhow::anyhow!("failed to clear screen: {e}"))
}

/// Prints the application banner, falling back to plain text when the
/// built-in font cannot be loaded.
pub fn print_banner() {
    let banner = FIGfont::standard().ok().and_then(|font| font.convert(APP_NAME).map(|figure| figure.to_string())).unwrap_or_else(|| APP_NAME.to_owned());
    println!("{}", style(banner).green().bold());
}
