use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::worker::Event;

/// Percentage bar for a packaging run.
pub struct Bar {
    bar: ProgressBar,
}

impl Bar {
    pub fn new(description: &str) -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{msg:28} [{bar:40.cyan/blue}] {pos:>3}%").unwrap_or_else(|_| ProgressStyle::default_bar()).progress_chars("●○ ");

        bar.set_style(style);
        bar.set_message(description.to_owned());

        Self { bar }
    }

    /// Applies one worker event.
    pub fn handle(&self, event: Event) {
        match event {
            Event::Stage(stage) => self.bar.set_message(stage.to_string()),
            Event::Status(message) => self.bar.set_message(message),
            Event::Progress(percent) => self.bar.set_position(u64::from(percent)),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Done");
    }

    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_owned());
    }
}

impl Drop for Bar {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish();
        }
    }
}

/// Spinner for work without meaningful percentages.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
        bar.set_message(message.to_owned());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn handle(&self, event: Event) {
        if let Event::Status(message) = event {
            self.bar.set_message(message);
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
