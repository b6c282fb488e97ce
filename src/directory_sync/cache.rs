//! Reuse of stashed users reports and earlier update sheets.
//!
//! Stashed files carry a `%Y-%m-%d-%H-%M` timestamp in their names.
//! Update sheets newer than the chosen report describe changes already
//! submitted, so their IDs seed the run state and are not redone.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use super::engine::SyncRunState;
use super::login::sanitize_login_id;
use crate::error::{Error, Result};
use crate::ports::FileSystem;
use crate::worksheet::directory::{SisIdChanges, SisIdChangesColumn, UserImport, UserImportColumn};
use crate::worksheet::Worksheet;

/// `strftime` pattern embedded in stashed file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M";

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}-\d{2}-\d{2}").expect("valid regex"));

/// Name of the stashed users report for a timestamp.
#[must_use]
pub fn users_report_name(timestamp: &str) -> String {
    format!("provisioned-users-{timestamp}.csv")
}

/// Name of the account update sheet for a timestamp.
#[must_use]
pub fn user_updates_name(timestamp: &str) -> String {
    format!("canvas-{timestamp}-users-maintain.csv")
}

/// Name of the SIS ID change sheet for a timestamp.
#[must_use]
pub fn sis_id_updates_name(timestamp: &str) -> String {
    format!("canvas-{timestamp}-sis-ids.csv")
}

/// Timestamp embedded in a stashed file name.
#[must_use]
pub fn timestamp_from_file_name(name: &str) -> Option<&str> {
    TIMESTAMP.find(name).map(|m| m.as_str())
}

fn is_users_report(name: &str) -> bool {
    name.starts_with("provisioned-users-") && name.ends_with(".csv")
}

fn is_user_updates(name: &str) -> bool {
    name.starts_with("canvas") && name.contains("-users-") && name.ends_with(".csv")
}

fn is_sis_id_updates(name: &str) -> bool {
    name.starts_with("canvas") && name.ends_with("-sis-ids.csv")
}

/// A stashed report chosen for reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedReport {
    /// Where it was read from.
    pub path: PathBuf,
    /// Report contents.
    pub text: String,
}

/// Loads the newest stashed users report and seeds `state` from update
/// sheets written after it.
///
/// # Errors
///
/// Returns [`Error::FatalSetup`] when the directory cannot be listed or
/// holds no users report.
pub fn load_cached_report(
    fs: &dyn FileSystem,
    export_dir: &Path,
    state: &mut SyncRunState,
) -> Result<CachedReport> {
    let mut names = fs
        .list_dir(export_dir)
        .map_err(|e| Error::fatal(format!("cannot list {}: {e}", export_dir.display())))?;
    names.sort();
    let report_name = names
        .iter()
        .filter(|n| is_users_report(n))
        .next_back()
        .ok_or_else(|| Error::fatal(format!("no cached users report in {}", export_dir.display())))?;
    let path = export_dir.join(report_name);
    debug!("Loading cached user report from {}", path.display());
    let text = fs
        .read_to_string(&path)
        .map_err(|e| Error::fatal(format!("cannot read {}: {e}", path.display())))?;

    let Some(report_time) = timestamp_from_file_name(report_name) else {
        return Ok(CachedReport { path, text });
    };
    let newer = |name: &&String| timestamp_from_file_name(name).is_some_and(|t| t > report_time);

    for name in names.iter().filter(|n| is_user_updates(n)).filter(newer) {
        debug!("Loading user update CSV from {name}");
        match read_sheet::<UserImport>(fs, &export_dir.join(name)) {
            Ok(sheet) => {
                for row in sheet.iter() {
                    let uid = sanitize_login_id(row.get(UserImportColumn::LoginId));
                    state.known_users.insert(uid.to_string(), row.get(UserImportColumn::UserId).to_string());
                }
            }
            Err(e) => warn!("Skipping {name}: {e}"),
        }
    }
    for name in names.iter().filter(|n| is_sis_id_updates(n)).filter(newer) {
        debug!("Loading SIS id update CSV from {name}");
        match read_sheet::<SisIdChanges>(fs, &export_dir.join(name)) {
            Ok(sheet) => {
                for row in sheet.iter() {
                    state.known_sis_id_updates.insert(
                        row.get(SisIdChangesColumn::OldId).to_string(),
                        row.get(SisIdChangesColumn::NewId).to_string(),
                    );
                }
            }
            Err(e) => warn!("Skipping {name}: {e}"),
        }
    }
    Ok(CachedReport { path, text })
}

fn read_sheet<S: crate::worksheet::Schema>(fs: &dyn FileSystem, path: &Path) -> Result<Worksheet<S>> {
    let text = fs
        .read_to_string(path)
        .map_err(|e| Error::external(format!("read {}", path.display()), e))?;
    Worksheet::from_csv(&text)
}
