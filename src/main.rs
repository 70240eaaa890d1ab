use std::process::ExitCode;

use changelog_ci::ui::output;

fn main() -> ExitCode {
    match changelog_ci::cli::run() {
        Ok(code) => code,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
