//! `campus-sync publish` command.

use std::path::Path;

use crate::config::OecSettings;
use crate::context::ServiceContext;
use crate::oec::{self, PublishRequest};

/// Execute the `publish` command.
///
/// Validation failures are printed but do not fail the command.
///
/// # Errors
///
/// Returns an error string if inputs cannot be read or sheets written.
pub fn run(
    ctx: &ServiceContext,
    settings: &OecSettings,
    term: &str,
    merged: &Path,
    supervisors: &Path,
    previous: Option<&Path>,
) -> Result<(), String> {
    let request = PublishRequest {
        term: term.to_string(),
        merged: merged.to_path_buf(),
        supervisors: supervisors.to_path_buf(),
        previous: previous.map(Path::to_path_buf),
    };
    let summary = oec::publish(ctx, settings, &request).map_err(|e| e.to_string())?;
    println!("Published {} sheets to {}", summary.files.len(), summary.dir.display());
    if !summary.integrity.is_empty() {
        println!("Validation failed!");
        for message in &summary.integrity {
            println!("  {message}");
        }
    }
    Ok(())
}
