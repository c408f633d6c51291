mod infra;
mod runtime;

use std::process::ExitCode;

fn main() -> ExitCode {
    match runtime::run_from_args() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "laundry-server exited with an error");
            eprintln!("laundry-server: {e}");
            ExitCode::FAILURE
        }
    }
}
