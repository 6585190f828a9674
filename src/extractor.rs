//! The extractor front end, the program every bundle runs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use crate::config::PASSWORD_MIN_LENGTH;
use crate::dispatch::Dispatcher;
use crate::error::chain;
use crate::resource::ResourceRoot;
use crate::secret::Secret;
use crate::ui::{self, Prompt, Spinner};
use crate::worker::Worker;

#[derive(Parser)]
#[command(name = "dualpack-extract", version, about = "Unlock the payload your password opens into the current directory.")]
pub struct ExtractApp {
    /// Password to try (prompted if omitted).
    #[arg(short, long)]
    password: Option<String>,

    /// Directory to extract into.
    #[arg(short, long, default_value = ".")]
    target: PathBuf,
}

impl ExtractApp {
    pub fn init() -> Result<Self> {
        crate::logging::init()?;
        Ok(Self::parse())
    }

    pub fn execute(self) -> Result<()> {
        let root = ResourceRoot::detect().context("failed to load bundled resources")?;
        let dispatcher = Dispatcher::from_root(&root).context("failed to locate the bundled archives")?;
        info!(bundled = root.is_bundled(), dir = %root.dir().display(), "resources ready");

        let password = match self.password {
            Some(password) => Secret::from(password),
            None => Prompt::new(PASSWORD_MIN_LENGTH).unlock_password()?,
        };

        let target = self.target;
        let spinner = Spinner::new("Extracting...");
        let worker = Worker::new();

        let job_target = target.clone();
        let job = worker.spawn("dualpack-extractor", move |mut reporter| dispatcher.unlock(&password, &job_target, &mut reporter))?;
        let outcome = job.drain(|event| spinner.handle(event)).context("extraction worker failed")?;
        spinner.finish();

        if let Err(e) = &outcome {
            error!(target = %target.display(), error = %chain(e), "extraction failed");
        }

        let unlocked = outcome.context("extraction failed")?;
        ui::show_unlocked(&unlocked, &target);

        // Removes the unpacked resources before the process exits.
        drop(root);

        Ok(())
    }
}
