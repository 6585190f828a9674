//! Interactive prompts for wizard mode.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use inquire::validator::Validation;
use inquire::{Confirm, Password, PasswordDisplayMode, Text};

use crate::secret::Secret;

/// Prompt handler for the wizard and for extractor password entry.
pub struct Prompt {
    password_min_length: usize,
}

impl Prompt {
    pub fn new(password_min_length: usize) -> Self {
        Self { password_min_length }
    }

    /// Asks for an existing file or folder.
    pub fn payload_path(&self, label: &str) -> Result<PathBuf> {
        let path = Text::new(label)
            .with_help_message("file or folder")
            .with_validator(|input: &str| {
                let trimmed = input.trim();
                Ok(if trimmed.is_empty() {
                    Validation::Invalid("path cannot be empty".into())
                } else if !Path::new(trimmed).exists() {
                    Validation::Invalid("file or folder does not exist".into())
                } else {
                    Validation::Valid
                })
            })
            .prompt()
            .context("path input failed")?;

        Ok(PathBuf::from(path.trim()))
    }

    /// Asks for the output executable path, offering `default`.
    pub fn output_path(&self, default: &str) -> Result<PathBuf> {
        let path = Text::new("Save executable as")
            .with_default(default)
            .with_validator(|input: &str| Ok(if input.trim().is_empty() { Validation::Invalid("output path cannot be empty".into()) } else { Validation::Valid }))
            .prompt()
            .context("output path input failed")?;

        Ok(PathBuf::from(path.trim()))
    }

    /// Asks for a new password twice.
    pub fn new_password(&self, label: &str) -> Result<Secret> {
        let min_length = self.password_min_length;

        Password::new(label)
            .with_display_mode(PasswordDisplayMode::Masked)
            .with_custom_confirmation_message("Confirm password:")
            .with_custom_confirmation_error_message("passwords do not match")
            .with_validator(move |input: &str| {
                Ok(if input.trim().is_empty() {
                    Validation::Invalid("password cannot be empty or whitespace only".into())
                } else if input.chars().count() < min_length {
                    Validation::Invalid(format!("password must be at least {min_length} characters long").into())
                } else {
                    Validation::Valid
                })
            })
            .prompt()
            .map(Secret::from)
            .context("password input failed")
    }

    /// Asks once for a password to try; any non-empty input is accepted.
    pub fn unlock_password(&self) -> Result<Secret> {
        Password::new("Password:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .with_validator(|input: &str| Ok(if input.is_empty() { Validation::Invalid("password cannot be empty".into()) } else { Validation::Valid }))
            .prompt()
            .map(Secret::from)
            .context("password input failed")
    }

    pub fn confirm_overwrite(&self, path: &Path) -> Result<bool> {
        let name = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        Confirm::new(&format!("{name} already exists. Overwrite?")).with_default(false).prompt().context("confirmation failed")
    }
}
