//! Changes computed by one reconciliation pass.

use crate::worksheet::directory::{SisIdChanges, SisIdChangesColumn};
use crate::worksheet::{Row, Worksheet};

/// One SIS user ID rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SisIdChange {
    /// Directory user reference, `sis_login_id:<old login>`.
    pub user_ref: String,
    /// Current SIS user ID.
    pub old_id: String,
    /// SIS user ID to assign.
    pub new_id: String,
}

/// SIS ID renames and email purges accumulated during a run.
///
/// Consumed once by the apply step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Renames in the order they were decided.
    pub sis_id_changes: Vec<SisIdChange>,
    /// Directory user IDs whose email channels should be purged.
    pub email_deletions: Vec<String>,
}

impl ChangeSet {
    /// Whether nothing needs to be applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sis_id_changes.is_empty() && self.email_deletions.is_empty()
    }

    /// Records a rename, replacing an earlier one for the same user.
    pub fn record_sis_id_change(&mut self, change: SisIdChange) {
        match self.sis_id_changes.iter_mut().find(|c| c.user_ref == change.user_ref) {
            Some(existing) => *existing = change,
            None => self.sis_id_changes.push(change),
        }
    }

    /// Flags a directory user for email purging.
    pub fn flag_email_deletion(&mut self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        if !self.email_deletions.contains(&user_id) {
            self.email_deletions.push(user_id);
        }
    }

    /// The renames as a bulk import sheet.
    #[must_use]
    pub fn to_sheet(&self) -> Worksheet<SisIdChanges> {
        let mut sheet = Worksheet::new();
        for change in &self.sis_id_changes {
            sheet.insert(
                change.user_ref.clone(),
                Row::from_pairs([
                    (SisIdChangesColumn::OldId, change.old_id.as_str()),
                    (SisIdChangesColumn::NewId, change.new_id.as_str()),
                    (SisIdChangesColumn::Type, "user"),
                ]),
            );
        }
        sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(user_ref: &str, old_id: &str, new_id: &str) -> SisIdChange {
        SisIdChange { user_ref: user_ref.into(), old_id: old_id.into(), new_id: new_id.into() }
    }

    #[test]
    fn later_rename_for_same_user_replaces_earlier() {
        let mut changes = ChangeSet::default();
        changes.record_sis_id_change(change("sis_login_id:1", "a", "b"));
        changes.record_sis_id_change(change("sis_login_id:2", "c", "d"));
        changes.record_sis_id_change(change("sis_login_id:1", "a", "e"));
        assert_eq!(changes.sis_id_changes.len(), 2);
        assert_eq!(changes.sis_id_changes[0].new_id, "e");
    }

    #[test]
    fn sheet_uses_user_type_and_blank_integration_ids() {
        let mut changes = ChangeSet::default();
        changes.record_sis_id_change(change("sis_login_id:12345", "UID:12345", "2345678"));
        assert_eq!(
            changes.to_sheet().to_csv_string().unwrap(),
            "old_id,new_id,old_integration_id,new_integration_id,type\nUID:12345,2345678,,,user\n"
        );
    }

    #[test]
    fn email_deletions_are_unique() {
        let mut changes = ChangeSet::default();
        changes.flag_email_deletion("77");
        changes.flag_email_deletion("77");
        assert_eq!(changes.email_deletions, vec!["77"]);
        assert!(!changes.is_empty());
    }
}
