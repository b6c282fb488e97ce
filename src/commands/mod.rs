//! Command dispatch and handlers.

pub mod merge_confirmations;
pub mod publish;
pub mod sync_users;
pub mod validate_sheet;

use std::env;
use std::path::PathBuf;

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::Settings;
use crate::context::ServiceContext;

/// Environment variable naming a directory to record port interactions into.
pub const RECORD_ENV: &str = "CAMPUS_SYNC_RECORD";

/// Dispatch a parsed command to its handler.
///
/// When `CAMPUS_SYNC_RECORD` is set to a directory path, all port
/// interactions are recorded to per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if settings cannot be loaded or the selected
/// command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let settings = Settings::load().map_err(|e| e.to_string())?;
    let (ctx, session) = if let Ok(path) = env::var(RECORD_ENV) {
        let (ctx, session) = ServiceContext::recording_at(PathBuf::from(path), &settings)?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(&settings)?, None)
    };

    let result = dispatch_with_context(command, &ctx, &settings);

    // Recorders are shared with the adapters until the context is gone.
    if let Some(session) = session {
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
fn dispatch_with_context(command: &Command, ctx: &ServiceContext, settings: &Settings) -> Result<(), String> {
    match command {
        Command::SyncUsers { uids, cached, dry_run } => {
            sync_users::run(ctx, &settings.sync, uids, *cached, *dry_run)
        }
        Command::MergeConfirmations { term, confirmations, imports, depts, out } => {
            let args = merge_confirmations::Args { term, confirmations, imports, depts, out: out.as_deref() };
            merge_confirmations::run(ctx, &settings.oec, &args)
        }
        Command::Publish { term, merged, supervisors, previous } => {
            publish::run(ctx, &settings.oec, term, merged, supervisors, previous.as_deref())
        }
        Command::ValidateSheet { kind, path } => validate_sheet::run(ctx, *kind, path),
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
