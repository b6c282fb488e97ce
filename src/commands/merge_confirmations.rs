//! `campus-sync merge-confirmations` command.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::OecSettings;
use crate::context::ServiceContext;
use crate::oec::{self, MergeRequest};

/// Borrowed command-line arguments.
#[derive(Debug)]
pub struct Args<'a> {
    /// Term code.
    pub term: &'a str,
    /// Confirmation sheet folder.
    pub confirmations: &'a Path,
    /// SIS import sheet folder.
    pub imports: &'a Path,
    /// Department filter; empty means all.
    pub depts: &'a [String],
    /// Output file.
    pub out: Option<&'a Path>,
}

/// Execute the `merge-confirmations` command.
///
/// # Errors
///
/// Returns an error string if inputs cannot be read or the output written.
pub fn run(ctx: &ServiceContext, settings: &OecSettings, args: &Args<'_>) -> Result<(), String> {
    let request = MergeRequest {
        term: args.term.to_string(),
        confirmations_dir: args.confirmations.to_path_buf(),
        imports_dir: args.imports.to_path_buf(),
        depts: (!args.depts.is_empty()).then(|| args.depts.iter().cloned().collect::<HashSet<_>>()),
        out: args.out.map(PathBuf::from),
    };
    let summary = oec::merge_confirmations(ctx, settings, &request).map_err(|e| e.to_string())?;
    println!("Merged {} rows into {}", summary.rows, summary.path.display());
    if !summary.log.is_empty() {
        print!("{}", summary.log.report());
    }
    Ok(())
}
