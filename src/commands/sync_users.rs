//! `campus-sync sync-users` command.

use std::collections::HashSet;

use crate::config::SyncSettings;
use crate::context::ServiceContext;
use crate::directory_sync::{self, RunOptions};

/// Execute the `sync-users` command.
///
/// `dry_run` turns dry-run mode on regardless of the settings.
///
/// # Errors
///
/// Returns an error string if the users report cannot be obtained or parsed.
pub fn run(
    ctx: &ServiceContext,
    settings: &SyncSettings,
    uids: &[String],
    cached: bool,
    dry_run: bool,
) -> Result<(), String> {
    let settings = SyncSettings { dry_run: settings.dry_run || dry_run, ..settings.clone() };
    let options = RunOptions {
        uid_filter: (!uids.is_empty()).then(|| uids.iter().cloned().collect::<HashSet<_>>()),
        cached,
    };
    let report = directory_sync::run(ctx, &settings, &options).map_err(|e| e.to_string())?;
    println!("{}", report.format());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::config::SyncSettings;
    use crate::testing::{context, FakeCampus, FakeDirectory, MemoryFs};

    const REPORT: &str = "canvas_user_id,user_id,login_id,first_name,last_name,full_name,email,status\n\
        81,UID:4242,4242,Bo,Bbb,Bo Bbb,bo@example.edu,active\n";

    #[test]
    fn dry_run_flag_overrides_settings() {
        let (fs, campus) = (MemoryFs::default(), FakeCampus::default());
        let directory = FakeDirectory::default().with_report(REPORT);
        let ctx = context(&fs, &directory, &campus);
        let settings = SyncSettings { inactivate_expired_users: true, export_dir: "/stash".into(), ..SyncSettings::default() };
        assert!(run(&ctx, &settings, &[], false, true).is_ok());
        assert!(directory.calls().is_empty());
    }

    #[test]
    fn unreachable_directory_fails() {
        let (fs, directory, campus) = (MemoryFs::default(), FakeDirectory::default(), FakeCampus::default());
        let ctx = context(&fs, &directory, &campus);
        let err = run(&ctx, &SyncSettings::default(), &["4242".into()], false, false).unwrap_err();
        assert!(err.contains("Fatal setup error"), "{err}");
    }
}
