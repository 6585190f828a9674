//! The packager front end.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::config::{ARCHIVER_ENV, DEFAULT_OUTPUT_NAME, EXTRACTOR_ENV, PASSWORD_MIN_LENGTH};
use crate::pipeline::{Packager, ToolPaths};
use crate::resource::ResourceRoot;
use crate::secret::Secret;
use crate::types::{PackagingRequest, Payload, Slot};
use crate::ui::{self, Bar, Prompt};
use crate::worker::Worker;

#[derive(Subcommand)]
pub enum Commands {
    /// Package two payloads into one self-extracting executable.
    Pack {
        /// File or folder unlocked by password A.
        #[arg(long)]
        path_a: String,

        /// Password for payload A (prompted if omitted).
        #[arg(long)]
        password_a: Option<String>,

        /// File or folder unlocked by password B.
        #[arg(long)]
        path_b: String,

        /// Password for payload B (prompted if omitted).
        #[arg(long)]
        password_b: Option<String>,

        /// Where to write the executable.
        #[arg(short, long)]
        output: String,
    },

    /// Start the interactive wizard.
    Interactive,
}

#[derive(Parser)]
#[command(name = "dualpack", version, about = "Pack two password-protected payloads into one self-extracting executable. Run without arguments for the interactive wizard.")]
pub struct App {
    /// 7-Zip executable to use instead of searching PATH.
    #[arg(long, global = true, env = ARCHIVER_ENV)]
    archiver: Option<PathBuf>,

    /// Prebuilt extractor to embed instead of the one next to this program.
    #[arg(long, global = true, env = EXTRACTOR_ENV)]
    extractor: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl App {
    pub fn init() -> Result<Self> {
        crate::logging::init()?;
        Ok(Self::parse())
    }

    pub fn execute(self) -> Result<()> {
        let prompt = Prompt::new(PASSWORD_MIN_LENGTH);
        let root = ResourceRoot::detect().context("failed to resolve resource directory")?;
        let tools = ToolPaths { archiver: self.archiver, extractor: self.extractor, shipped_dir: root.dir().to_path_buf() };

        match self.command {
            Some(Commands::Pack { path_a, password_a, path_b, password_b, output }) => {
                let password_a = Self::password(password_a, Slot::A, &prompt)?;
                let password_b = Self::password(password_b, Slot::B, &prompt)?;
                Self::package(tools, PackagingRequest::new(&path_a, password_a, &path_b, password_b, &output))
            }
            Some(Commands::Interactive) | None => Self::run_interactive(tools, &prompt),
        }
    }

    fn run_interactive(tools: ToolPaths, prompt: &Prompt) -> Result<()> {
        ui::clear_screen()?;
        ui::print_banner();

        let path_a = prompt.payload_path("Payload A:")?;
        let password_a = prompt.new_password("Password for payload A:")?;
        let path_b = prompt.payload_path("Payload B:")?;
        let password_b = prompt.new_password("Password for payload B:")?;

        if password_a.same_as(&password_b) {
            tracing::warn!("both payloads share a password; extraction will always unlock payload A");
            println!("{}", console::style("Both payloads use the same password: payload B will never be unlocked.").yellow());
        }

        let output = prompt.output_path(&Path::new(".").join(DEFAULT_OUTPUT_NAME).display().to_string())?;
        if output.exists() && !prompt.confirm_overwrite(&output)? {
            bail!("operation canceled");
        }

        let request = PackagingRequest {
            payload_a: Payload::new(path_a, password_a),
            payload_b: Payload::new(path_b, password_b),
            output,
        };

        Self::package(tools, request)
    }

    /// Validates `request`, then runs the pipeline on a worker thread while
    /// this thread renders its progress.
    fn package(tools: ToolPaths, request: PackagingRequest) -> Result<()> {
        request.validate().context("invalid packaging request")?;
        ui::show_request(&request);

        let packager = Packager::new(tools);
        let worker = Worker::new();
        let bar = Bar::new("Starting");

        let job = worker.spawn("dualpack-packager", move |mut reporter| packager.run(&request, &mut reporter))?;
        let outcome = job.drain(|event| bar.handle(event)).context("packaging worker failed")?;

        match outcome {
            Ok(packaged) => {
                bar.finish();
                ui::show_packaged(&packaged);
                Ok(())
            }
            Err(failure) => {
                bar.abandon("Failed");
                if let Some(output) = failure.error.tool_output() {
                    ui::show_tool_output(output);
                }
                Err(failure).context("packaging failed")
            }
        }
    }

    fn password(given: Option<String>, slot: Slot, prompt: &Prompt) -> Result<Secret> {
        match given {
            Some(password) => Ok(Secret::from(password)),
            None => prompt.new_password(&format!("Password for payload {slot}:")),
        }
    }
}
