//! Applying a change set to the directory.
//!
//! Every call is independent: a failure is logged and the next item is
//! attempted. Nothing is retried within a run.

use log::{debug, error, warn};

use super::change_set::{ChangeSet, SisIdChange};
use super::login::parse_login_id;
use crate::error::{Error, Result};
use crate::ports::DirectoryApi;

/// Counts of what an apply step achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyCounts {
    /// Items applied.
    pub applied: usize,
    /// Items that failed or were skipped.
    pub failed: usize,
}

/// Sets a user's SIS ID through its single numeric login.
///
/// Returns `Ok(false)` when the user has no numeric login or more than one.
///
/// # Errors
///
/// Returns [`Error::ExternalCall`] when listing or updating logins fails.
pub fn change_sis_user_id(directory: &dyn DirectoryApi, user_ref: &str, new_id: &str) -> Result<bool> {
    let mut logins = directory
        .list_logins(user_ref)
        .map_err(|e| Error::external(format!("list logins of {user_ref}"), e))?;
    logins.retain(|login| parse_login_id(&login.unique_id).is_some());
    match logins.as_slice() {
        [login] => {
            debug!("Changing SIS ID for user {user_ref} to {new_id}");
            directory
                .change_login_sis_id(login.id, new_id)
                .map_err(|e| Error::external(format!("change SIS ID of login {}", login.id), e))?;
            Ok(true)
        }
        [] => {
            warn!("No LDAP UID login found for user {user_ref}; will skip");
            Ok(false)
        }
        _ => {
            error!("Multiple numeric logins found for user {user_ref}; will skip");
            Ok(false)
        }
    }
}

/// Applies SIS ID renames one API call pair at a time.
pub fn change_sis_user_ids_by_api(
    directory: &dyn DirectoryApi,
    changes: &[SisIdChange],
    dry_run: bool,
) -> ApplyCounts {
    let mut counts = ApplyCounts::default();
    if changes.is_empty() {
        return counts;
    }
    if dry_run {
        warn!("DRY RUN MODE: Would change {} SIS user IDs {changes:?}", changes.len());
        return counts;
    }
    warn!("About to change {} SIS user IDs", changes.len());
    for change in changes {
        match change_sis_user_id(directory, &change.user_ref, &change.new_id) {
            Ok(true) => counts.applied += 1,
            outcome => {
                if let Err(e) = outcome {
                    error!("{e}");
                }
                error!(
                    "User {} did not successfully have its SIS ID changed to {}! Check for duplicated LDAP UIDs in the directory.",
                    change.user_ref, change.new_id
                );
                counts.failed += 1;
            }
        }
    }
    counts
}

/// Deletes the email channels of departing users.
///
/// Only channels of type `email` are touched.
pub fn handle_email_deletions(
    directory: &dyn DirectoryApi,
    user_ids: &[String],
    dry_run: bool,
) -> ApplyCounts {
    warn!("About to delete email addresses for {} inactive users: {user_ids:?}", user_ids.len());
    let mut counts = ApplyCounts::default();
    for user_id in user_ids {
        let channels = match directory.list_communication_channels(user_id) {
            Ok(channels) => channels,
            Err(e) => {
                error!("{}", Error::external(format!("list communication channels of {user_id}"), e));
                counts.failed += 1;
                continue;
            }
        };
        for channel in channels.iter().filter(|c| c.channel_type == "email") {
            if dry_run {
                warn!("DRY RUN MODE: Would delete communication channel {channel:?}");
                continue;
            }
            warn!("Deleting communication channel {channel:?}");
            match directory.delete_communication_channel(user_id, channel.id) {
                Ok(()) => counts.applied += 1,
                Err(e) => {
                    error!("{}", Error::external(format!("delete communication channel {}", channel.id), e));
                    counts.failed += 1;
                }
            }
        }
    }
    counts
}

/// Deletes email channels when allowed, otherwise only reports them.
pub fn apply_email_deletions(
    directory: &dyn DirectoryApi,
    changes: &ChangeSet,
    delete_bad_emails: bool,
    dry_run: bool,
) -> ApplyCounts {
    if changes.email_deletions.is_empty() {
        return ApplyCounts::default();
    }
    if delete_bad_emails {
        handle_email_deletions(directory, &changes.email_deletions, dry_run)
    } else {
        warn!(
            "EMAIL DELETION BLOCKED: Would delete email addresses for {} inactive users: {:?}",
            changes.email_deletions.len(),
            changes.email_deletions
        );
        ApplyCounts::default()
    }
}
