use std::process::ExitCode;

use dualpack::extractor::ExtractApp;
use dualpack::ui;

fn main() -> ExitCode {
    match ExtractApp::init().and_then(ExtractApp::execute) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            ui::show_failure(&error);
            ExitCode::FAILURE
        }
    }
}
