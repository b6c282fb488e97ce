//! Keeps the remote account directory in step with the campus feed.
//!
//! A run downloads (or reuses) the provisioned users report, reconciles it
//! in batches with [`DirectorySyncEngine`], then applies the resulting
//! SIS ID renames, account updates and email purges.

pub mod apply;
pub mod cache;
pub mod change_set;
pub mod engine;
pub mod login;

use std::collections::HashSet;
use std::fmt::Write;
use std::path::Path;

use log::{error, info, warn};

pub use change_set::{ChangeSet, SisIdChange};
pub use engine::{DirectorySyncEngine, SyncOptions, SyncOutcome, SyncRunState};

use self::apply::ApplyCounts;
use self::cache::TIMESTAMP_FORMAT;
use crate::config::SyncSettings;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::worksheet::directory::{ProvisionedUsers, ProvisionedUsersColumn, UserImport};
use crate::worksheet::{Row, Schema, Worksheet};

/// Per-invocation choices layered over the settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only accounts whose login names one of these IDs.
    pub uid_filter: Option<HashSet<String>>,
    /// Reuse the newest stashed report instead of downloading one.
    pub cached: bool,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Run identifier used in logs.
    pub run_id: String,
    /// Accounts compared against the campus feed.
    pub accounts_examined: usize,
    /// Batches skipped because the campus lookup failed.
    pub batches_skipped: usize,
    /// Account rows submitted for update.
    pub users_updated: usize,
    /// Account rows whose import upload failed.
    pub user_update_failures: usize,
    /// SIS ID renames decided.
    pub sis_id_changes: usize,
    /// Renames that could not be applied.
    pub sis_id_failures: usize,
    /// Users flagged for email purging.
    pub email_deletions: usize,
    /// Nothing was sent to the directory.
    pub dry_run: bool,
}

impl SyncReport {
    /// Human-readable summary.
    #[must_use]
    pub fn format(&self) -> String {
        let mut out = String::new();
        let mode = if self.dry_run { " (dry run)" } else { "" };
        let _ = writeln!(out, "Directory sync {}{mode}", self.run_id);
        let _ = writeln!(out, "  accounts examined: {}", self.accounts_examined);
        if self.batches_skipped > 0 {
            let _ = writeln!(out, "  batches skipped:   {}", self.batches_skipped);
        }
        let _ = writeln!(
            out,
            "  accounts updated:  {} ({} failed)",
            self.users_updated, self.user_update_failures
        );
        let _ = writeln!(
            out,
            "  SIS ID changes:    {} ({} failed)",
            self.sis_id_changes, self.sis_id_failures
        );
        let _ = write!(out, "  email purges:      {}", self.email_deletions);
        out
    }
}

/// Runs a full directory sync.
///
/// # Errors
///
/// Returns [`Error::FatalSetup`] when no users report can be obtained and
/// [`Error::SchemaMismatch`] when the report has unexpected columns.
/// Failures of individual lookups and updates are logged, not returned.
pub fn run(ctx: &ServiceContext, settings: &SyncSettings, options: &RunOptions) -> Result<SyncReport> {
    let run_id = ctx.id_gen.generate_id();
    let timestamp = ctx.clock.now().format(TIMESTAMP_FORMAT).to_string();
    let export_dir = settings.export_dir.as_path();
    info!("Starting directory sync {run_id}");

    let mut state = SyncRunState::default();
    let report_text = if options.cached {
        cache::load_cached_report(ctx.fs.as_ref(), export_dir, &mut state)?.text
    } else {
        let text = ctx.directory.users_report().map_err(|e| Error::fatal(format!("cannot fetch users report: {e}")))?;
        write_export(ctx, &export_dir.join(cache::users_report_name(&timestamp)), &text);
        text
    };
    let report = Worksheet::<ProvisionedUsers>::from_csv(&report_text)?;

    let accounts: Vec<Row<ProvisionedUsersColumn>> = report
        .iter()
        .filter(|account| {
            options.uid_filter.as_ref().is_none_or(|uids| {
                uids.contains(login::sanitize_login_id(account.get(ProvisionedUsersColumn::LoginId)))
            })
        })
        .cloned()
        .collect();

    let mut engine = DirectorySyncEngine::new(SyncOptions::from(settings), state);
    let mut batches_skipped = 0;
    for batch in accounts.chunks(settings.batch_size.max(1)) {
        if let Err(e) = engine.reconcile_batch(batch, ctx.campus.as_ref()) {
            error!("Skipping batch of {} accounts: {e}", batch.len());
            batches_skipped += 1;
        }
    }
    let outcome = engine.finish();

    // Renames must land before the account import refers to the new IDs.
    let renames = apply_sis_id_changes(ctx, settings, &outcome.changes, &timestamp);
    let updates = submit_user_import(ctx, settings, &outcome, &timestamp);
    apply::apply_email_deletions(
        ctx.directory.as_ref(),
        &outcome.changes,
        settings.delete_bad_emails,
        settings.dry_run,
    );

    let report = SyncReport {
        run_id,
        accounts_examined: accounts.len(),
        batches_skipped,
        users_updated: updates.applied,
        user_update_failures: updates.failed,
        sis_id_changes: outcome.changes.sis_id_changes.len(),
        sis_id_failures: renames.failed,
        email_deletions: outcome.changes.email_deletions.len(),
        dry_run: settings.dry_run,
    };
    info!("Finished directory sync {}", report.run_id);
    Ok(report)
}

fn apply_sis_id_changes(
    ctx: &ServiceContext,
    settings: &SyncSettings,
    changes: &ChangeSet,
    timestamp: &str,
) -> ApplyCounts {
    if !settings.import_via_csv {
        return apply::change_sis_user_ids_by_api(ctx.directory.as_ref(), &changes.sis_id_changes, settings.dry_run);
    }
    let mut counts = ApplyCounts::default();
    if changes.sis_id_changes.is_empty() {
        return counts;
    }
    warn!("About to add {} SIS user ID changes to CSV", changes.sis_id_changes.len());
    let sheet = changes.to_sheet();
    let Some(csv) = sheet_csv(&sheet) else {
        counts.failed = changes.sis_id_changes.len();
        return counts;
    };
    write_export(ctx, &settings.export_dir.join(cache::sis_id_updates_name(timestamp)), &csv);
    if submit(ctx, settings.dry_run, "SIS ID change", &csv) {
        counts.applied = changes.sis_id_changes.len();
    } else if !settings.dry_run {
        counts.failed = changes.sis_id_changes.len();
    }
    counts
}

fn submit_user_import(
    ctx: &ServiceContext,
    settings: &SyncSettings,
    outcome: &SyncOutcome,
    timestamp: &str,
) -> ApplyCounts {
    let sheet = &outcome.user_import;
    let mut counts = ApplyCounts::default();
    if sheet.is_empty() {
        info!("No account updates to submit");
        return counts;
    }
    for (key, row) in sheet.entries() {
        for message in Worksheet::<UserImport>::errors_for_row(row) {
            warn!("Account update for {key}: {message}");
        }
    }
    let Some(csv) = sheet_csv(sheet) else {
        counts.failed = sheet.len();
        return counts;
    };
    write_export(ctx, &settings.export_dir.join(cache::user_updates_name(timestamp)), &csv);
    if submit(ctx, settings.dry_run, "account update", &csv) {
        counts.applied = sheet.len();
    } else if !settings.dry_run {
        counts.failed = sheet.len();
    }
    counts
}

fn sheet_csv<S: Schema>(sheet: &Worksheet<S>) -> Option<String> {
    sheet
        .to_csv_string()
        .map_err(|e| error!("Cannot serialize {}: {e}", sheet.export_name()))
        .ok()
}

/// Uploads an import sheet unless in dry-run mode. Returns whether it was sent.
fn submit(ctx: &ServiceContext, dry_run: bool, what: &str, csv: &str) -> bool {
    let rows = csv.lines().count().saturating_sub(1);
    if dry_run {
        warn!("DRY RUN MODE: Would submit {what} import of {rows} rows");
        return false;
    }
    match ctx.directory.sis_import(csv) {
        Ok(()) => {
            info!("Submitted {what} import of {rows} rows");
            true
        }
        Err(e) => {
            error!("{}", Error::external(format!("{what} import"), e));
            false
        }
    }
}

fn write_export(ctx: &ServiceContext, path: &Path, contents: &str) {
    if let Err(e) = ctx.fs.write(path, contents) {
        error!("{}", Error::external(format!("write {}", path.display()), e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{CampusPerson, Login};
    use crate::testing::{context, FakeCampus, FakeDirectory, MemoryFs};

    const REPORT: &str = "canvas_user_id,user_id,login_id,first_name,last_name,full_name,email,status\n\
        77,2345678,12345,Ann,Aaa,Ann Aaa,ann@example.edu,active\n\
        81,UID:4242,4242,Bo,Bbb,Bo Bbb,bo@example.edu,active\n\
        90,service,admin,Ad,Min,Ad Min,,active\n";

    fn settings() -> SyncSettings {
        SyncSettings {
            inactivate_expired_users: true,
            delete_bad_emails: true,
            export_dir: "/stash".into(),
            ..SyncSettings::default()
        }
    }

    fn campus() -> FakeCampus {
        FakeCampus::new(vec![CampusPerson {
            ldap_uid: "4242".into(),
            first_name: "Bo".into(),
            last_name: "Bbb".into(),
            email: Some("bo@example.edu".into()),
            ..CampusPerson::default()
        }])
    }

    fn directory() -> FakeDirectory {
        FakeDirectory::default()
            .with_report(REPORT)
            .with_logins("sis_login_id:12345", vec![Login { id: 5, unique_id: "12345".into(), sis_user_id: None }])
            .with_channels(
                "77",
                vec![crate::ports::CommunicationChannel {
                    id: 3,
                    channel_type: "email".into(),
                    address: "ann@example.edu".into(),
                }],
            )
    }

    #[test]
    fn full_run_renames_updates_and_purges() {
        let (fs, directory, campus) = (MemoryFs::default(), directory(), campus());
        let ctx = context(&fs, &directory, &campus);
        let report = run(&ctx, &settings(), &RunOptions::default()).unwrap();

        assert_eq!(report.run_id, "run-1");
        assert_eq!(report.accounts_examined, 3);
        assert_eq!(report.users_updated, 1);
        assert_eq!(report.sis_id_changes, 1);
        assert_eq!(report.email_deletions, 1);
        assert_eq!(
            directory.calls(),
            vec![
                "change_login_sis_id 5 UID:12345",
                "sis_import user_id,login_id,first_name,last_name,email,status",
                "delete_communication_channel 77 3",
            ]
        );
        assert_eq!(fs.file("/stash/provisioned-users-2015-03-09-08-00.csv").unwrap(), REPORT);
        let updates = fs.file("/stash/canvas-2015-03-09-08-00-users-maintain.csv").unwrap();
        assert!(updates.contains("UID:12345,inactive-12345,Ann,Aaa,,active"));
        assert_eq!(campus.requested_uids(), vec!["12345", "4242", "admin"]);
    }

    #[test]
    fn dry_run_writes_files_but_sends_nothing() {
        let (fs, directory, campus) = (MemoryFs::default(), directory(), campus());
        let ctx = context(&fs, &directory, &campus);
        let settings = SyncSettings { dry_run: true, import_via_csv: true, ..settings() };
        let report = run(&ctx, &settings, &RunOptions::default()).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.users_updated, 0);
        assert_eq!(report.user_update_failures, 0);
        assert!(directory.calls().is_empty());
        assert!(fs.file("/stash/canvas-2015-03-09-08-00-sis-ids.csv").is_some());
        assert!(fs.file("/stash/canvas-2015-03-09-08-00-users-maintain.csv").is_some());
    }

    #[test]
    fn rejected_account_import_counts_as_failed() {
        let (fs, campus) = (MemoryFs::default(), campus());
        let directory = directory().rejecting_imports("500 import queue unavailable");
        let ctx = context(&fs, &directory, &campus);
        let report = run(&ctx, &settings(), &RunOptions::default()).unwrap();
        assert_eq!(report.users_updated, 0);
        assert_eq!(report.user_update_failures, 1);
        assert_eq!(report.sis_id_changes, 1);
        assert!(report.format().contains("accounts updated:  0 (1 failed)"));
        assert!(fs.file("/stash/canvas-2015-03-09-08-00-users-maintain.csv").is_some());
    }

    #[test]
    fn uid_filter_limits_the_accounts_examined() {
        let (fs, directory, campus) = (MemoryFs::default(), directory(), campus());
        let ctx = context(&fs, &directory, &campus);
        let options = RunOptions { uid_filter: Some(HashSet::from(["4242".to_string()])), cached: false };
        let report = run(&ctx, &settings(), &options).unwrap();
        assert_eq!(report.accounts_examined, 1);
        assert_eq!(report.users_updated, 0);
        assert!(directory.calls().is_empty());
    }

    #[test]
    fn campus_outage_skips_batches_without_aborting() {
        let (fs, directory) = (MemoryFs::default(), directory());
        let campus = FakeCampus::failing("ORA-12541: no listener");
        let ctx = context(&fs, &directory, &campus);
        let settings = SyncSettings { batch_size: 2, ..settings() };
        let report = run(&ctx, &settings, &RunOptions::default()).unwrap();
        assert_eq!(report.batches_skipped, 2);
        assert_eq!(report.users_updated, 0);
    }

    #[test]
    fn unreachable_directory_is_fatal() {
        let (fs, campus) = (MemoryFs::default(), campus());
        let ctx = context(&fs, &FakeDirectory::default(), &campus);
        let err = run(&ctx, &settings(), &RunOptions::default()).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("401 Unauthorized"));
    }

    #[test]
    fn cached_run_skips_accounts_already_updated() {
        let fs = MemoryFs::default()
            .with_file("/stash/provisioned-users-2015-03-08-08-00.csv", REPORT)
            .with_file(
                "/stash/canvas-2015-03-08-09-00-users-maintain.csv",
                "user_id,login_id,first_name,last_name,email,status\nUID:12345,inactive-12345,Ann,Aaa,,active\n",
            );
        let (directory, campus) = (directory(), campus());
        let ctx = context(&fs, &directory, &campus);
        let options = RunOptions { cached: true, ..RunOptions::default() };
        let report = run(&ctx, &settings(), &options).unwrap();
        assert_eq!(report.users_updated, 0);
        assert_eq!(report.sis_id_changes, 0);
        assert!(directory.calls().is_empty());
    }

    #[test]
    fn report_formats_counts() {
        let report = SyncReport { run_id: "run-1".into(), accounts_examined: 3, dry_run: true, ..SyncReport::default() };
        let text = report.format();
        assert!(text.starts_with("Directory sync run-1 (dry run)"));
        assert!(text.contains("accounts examined: 3"));
    }
}
