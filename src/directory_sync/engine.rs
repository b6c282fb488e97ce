//! Per-account reconciliation against the campus feed.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use super::change_set::{ChangeSet, SisIdChange};
use super::login::{parse_login_id, sanitize_login_id, ParsedLogin};
use crate::config::SyncSettings;
use crate::error::{Error, Result};
use crate::ports::{CampusData, CampusPerson};
use crate::worksheet::directory::{ProvisionedUsersColumn, UserImport, UserImportColumn};
use crate::worksheet::{Row, Worksheet};

/// Decision knobs for one run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Inactivate accounts whose owner left the campus feed.
    pub inactivate_expired_users: bool,
    /// Compare display names as well as logins and emails.
    pub maintain_user_names: bool,
    /// Prefer a person's alternate email when present.
    pub prefer_alternate_email: bool,
    /// Campus IDs never inactivated.
    pub whitelist: HashSet<String>,
}

impl From<&SyncSettings> for SyncOptions {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            inactivate_expired_users: settings.inactivate_expired_users,
            maintain_user_names: settings.maintain_user_names,
            prefer_alternate_email: settings.prefer_alternate_email,
            whitelist: settings.whitelist.iter().cloned().collect(),
        }
    }
}

/// What one run has already handled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRunState {
    /// Campus ID to the SIS user ID it was last given.
    pub known_users: HashMap<String, String>,
    /// Old SIS user ID to the new one, for renames already submitted.
    pub known_sis_id_updates: HashMap<String, String>,
}

impl SyncRunState {
    fn is_known_user(&self, uid: &str) -> bool {
        self.known_users.get(uid).is_some_and(|id| !id.is_empty())
    }

    fn is_known_rename(&self, old_id: &str) -> bool {
        self.known_sis_id_updates.get(old_id).is_some_and(|id| !id.is_empty())
    }
}

/// Everything a finished reconciliation produced.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Accounts whose directory record must be updated.
    pub user_import: Worksheet<UserImport>,
    /// Renames and email purges.
    pub changes: ChangeSet,
    /// Processed IDs, for chaining further runs.
    pub state: SyncRunState,
}

/// Reconciles directory accounts against the campus feed, one batch at a
/// time, remembering what it has processed.
#[derive(Debug)]
pub struct DirectorySyncEngine {
    options: SyncOptions,
    state: SyncRunState,
    changes: ChangeSet,
    user_import: Worksheet<UserImport>,
}

impl DirectorySyncEngine {
    /// Starts a run from previously known state.
    #[must_use]
    pub fn new(options: SyncOptions, state: SyncRunState) -> Self {
        Self { options, state, changes: ChangeSet::default(), user_import: Worksheet::new() }
    }

    /// Looks up the batch's owners in one campus query and categorizes
    /// every account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalCall`] if the campus query fails; no account
    /// of the batch is touched in that case.
    pub fn reconcile_batch(
        &mut self,
        accounts: &[Row<ProvisionedUsersColumn>],
        campus: &dyn CampusData,
    ) -> Result<()> {
        let uids: Vec<String> = accounts
            .iter()
            .map(|a| sanitize_login_id(a.get(ProvisionedUsersColumn::LoginId)).to_string())
            .collect();
        let people = campus
            .attributes_for_uids(&uids)
            .map_err(|e| Error::external("campus attributes lookup", e))?;
        for account in accounts {
            self.categorize(account, &people);
        }
        Ok(())
    }

    /// Decides what should happen to one account.
    pub fn categorize(&mut self, account: &Row<ProvisionedUsersColumn>, people: &[CampusPerson]) {
        let Some(ParsedLogin { uid, inactive }) =
            parse_login_id(account.get(ProvisionedUsersColumn::LoginId))
        else {
            return;
        };
        if self.state.is_known_user(&uid) {
            debug!("User account for UID {uid} already processed, will not attempt to re-process.");
            return;
        }

        let whitelisted = self.options.whitelist.contains(&uid);
        let mut target = Row::<UserImportColumn>::from_provisioned(account);
        match people.iter().find(|p| p.ldap_uid.trim() == uid) {
            Some(person) if !person.expired || whitelisted => {
                if inactive {
                    warn!("Reactivating account for LDAP UID {uid}");
                }
                target = self.account_from_person(person);
            }
            _ if whitelisted => {
                if inactive {
                    warn!("Reactivating account for unknown LDAP UID {uid}");
                    target.set(UserImportColumn::LoginId, uid.as_str());
                }
            }
            _ => {
                if !account.is_blank(ProvisionedUsersColumn::Email)
                    && (inactive || self.options.inactivate_expired_users)
                {
                    self.changes.flag_email_deletion(account.get(ProvisionedUsersColumn::CanvasUserId));
                }
                if self.options.inactivate_expired_users {
                    if !inactive {
                        warn!("Inactivating account for LDAP UID {uid}");
                    }
                    target.set(UserImportColumn::LoginId, format!("inactive-{uid}"));
                    target.set(UserImportColumn::UserId, format!("UID:{uid}"));
                    target.set(UserImportColumn::Email, "");
                }
            }
        }

        self.record_rename(account, &target);
        self.state.known_users.insert(uid.clone(), target.get(UserImportColumn::UserId).to_string());
        if !account_unchanged(account, &target, self.options.maintain_user_names) {
            self.user_import.insert(uid, target);
        }
    }

    fn record_rename(&mut self, account: &Row<ProvisionedUsersColumn>, target: &Row<UserImportColumn>) {
        let old_id = account.get(ProvisionedUsersColumn::UserId);
        let new_id = target.get(UserImportColumn::UserId);
        if old_id == new_id {
            return;
        }
        if self.state.is_known_rename(old_id) {
            debug!("SIS ID change from {old_id} to {new_id} already processed, will not attempt to re-process.");
            return;
        }
        let user_ref = format!("sis_login_id:{}", account.get(ProvisionedUsersColumn::LoginId));
        warn!("Will change SIS ID for user {user_ref} from {old_id} to {new_id}");
        self.changes.record_sis_id_change(SisIdChange {
            user_ref,
            old_id: old_id.to_string(),
            new_id: new_id.to_string(),
        });
    }

    fn account_from_person(&self, person: &CampusPerson) -> Row<UserImportColumn> {
        let alternate = person.alternate_email.as_deref().filter(|_| self.options.prefer_alternate_email);
        let email = alternate.or(person.email.as_deref()).unwrap_or_default();
        Row::from_pairs([
            (UserImportColumn::UserId, person.sis_user_id()),
            (UserImportColumn::LoginId, person.ldap_uid.trim().to_string()),
            (UserImportColumn::FirstName, person.first_name.clone()),
            (UserImportColumn::LastName, person.last_name.clone()),
            (UserImportColumn::Email, email.to_string()),
            (UserImportColumn::Status, "active".to_string()),
        ])
    }

    /// Changes decided so far.
    #[must_use]
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Hands over the accumulated changes, leaving an empty set behind.
    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.changes)
    }

    /// Accounts queued for update so far.
    #[must_use]
    pub fn user_import(&self) -> &Worksheet<UserImport> {
        &self.user_import
    }

    /// Ends the run.
    #[must_use]
    pub fn finish(self) -> SyncOutcome {
        SyncOutcome { user_import: self.user_import, changes: self.changes, state: self.state }
    }
}

/// Whether submitting `target` would leave `account` as it is.
///
/// A blank target email means "leave the email alone".
fn account_unchanged(
    account: &Row<ProvisionedUsersColumn>,
    target: &Row<UserImportColumn>,
    maintain_user_names: bool,
) -> bool {
    let email = target.get(UserImportColumn::Email);
    let matched = account.get(ProvisionedUsersColumn::LoginId) == target.get(UserImportColumn::LoginId)
        && (email.trim().is_empty() || account.get(ProvisionedUsersColumn::Email) == email);
    if matched && maintain_user_names {
        let full_name = format!(
            "{} {}",
            target.get(UserImportColumn::FirstName),
            target.get(UserImportColumn::LastName)
        );
        return account.get(ProvisionedUsersColumn::FullName) == full_name;
    }
    matched
}
