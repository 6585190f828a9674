use std::process::ExitCode;

use dualpack::app::App;
use dualpack::ui;

fn main() -> ExitCode {
    match App::init().and_then(App::execute) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            ui::show_failure(&error);
            ExitCode::FAILURE
        }
    }
}
