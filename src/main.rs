//! Binary entrypoint for the `campus-sync` CLI.

use std::process::ExitCode;

use env_logger::Env;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    // Recording is handled in commands::dispatch via CAMPUS_SYNC_RECORD=<dir>.
    match campus_sync::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
