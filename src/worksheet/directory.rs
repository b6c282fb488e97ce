//! Directory account sheets.
//!
//! These feed or mirror the directory's own SIS import format, so values
//! are written verbatim.

use super::{Row, Schema, Validation};
use crate::columns;

columns! {
    /// Columns of the directory's provisioned users report.
    pub enum ProvisionedUsersColumn {
        CanvasUserId => "canvas_user_id",
        UserId => "user_id",
        LoginId => "login_id",
        FirstName => "first_name",
        LastName => "last_name",
        FullName => "full_name",
        Email => "email",
        Status => "status",
    }
}

/// Snapshot of existing directory accounts.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionedUsers;

impl Schema for ProvisionedUsers {
    type Column = ProvisionedUsersColumn;
    const EXPORT_NAME: &'static str = "provisioned-users";
    const SPREADSHEET_TEXT: bool = false;
}

columns! {
    /// Columns of a user import batch.
    pub enum UserImportColumn {
        UserId => "user_id",
        LoginId => "login_id",
        FirstName => "first_name",
        LastName => "last_name",
        Email => "email",
        Status => "status",
    }
}

/// Account updates to submit to the directory.
#[derive(Debug, Clone, Copy)]
pub struct UserImport;

static USER_IMPORT_VALIDATIONS: [Validation<UserImportColumn>; 3] = [
    Validation::present(UserImportColumn::UserId),
    Validation::present(UserImportColumn::LoginId),
    Validation::with(UserImportColumn::Status, |row| {
        (!matches!(row.get(UserImportColumn::Status), "active" | "deleted")).then_some("Unexpected")
    }),
];

impl Schema for UserImport {
    type Column = UserImportColumn;
    const EXPORT_NAME: &'static str = "user-provision";
    const SPREADSHEET_TEXT: bool = false;

    fn validations() -> &'static [Validation<UserImportColumn>] {
        &USER_IMPORT_VALIDATIONS
    }
}

impl Row<UserImportColumn> {
    /// Builds an import row from a provisioned account, keeping its status.
    #[must_use]
    pub fn from_provisioned(account: &Row<ProvisionedUsersColumn>) -> Self {
        account.project()
    }
}

columns! {
    /// Columns of a SIS ID change batch.
    pub enum SisIdChangesColumn {
        OldId => "old_id",
        NewId => "new_id",
        OldIntegrationId => "old_integration_id",
        NewIntegrationId => "new_integration_id",
        Type => "type",
    }
}

/// SIS ID changes submitted through the directory's bulk import.
#[derive(Debug, Clone, Copy)]
pub struct SisIdChanges;

impl Schema for SisIdChanges {
    type Column = SisIdChangesColumn;
    const EXPORT_NAME: &'static str = "sis-id-changes";
    const SPREADSHEET_TEXT: bool = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worksheet::Worksheet;

    #[test]
    fn provisioned_rows_project_onto_imports() {
        let account = Row::from_pairs([
            (ProvisionedUsersColumn::CanvasUserId, "77"),
            (ProvisionedUsersColumn::UserId, "UID:1001"),
            (ProvisionedUsersColumn::LoginId, "1001"),
            (ProvisionedUsersColumn::FullName, "Ann Aaa"),
            (ProvisionedUsersColumn::Status, "active"),
        ]);
        let import = Row::<UserImportColumn>::from_provisioned(&account);
        assert_eq!(&import[UserImportColumn::UserId], "UID:1001");
        assert_eq!(&import[UserImportColumn::Status], "active");
        assert!(Worksheet::<UserImport>::errors_for_row(&import).is_empty());
    }

    #[test]
    fn directory_sheets_write_digits_verbatim() {
        let mut sheet = Worksheet::<UserImport>::new();
        sheet.insert(
            "1001",
            Row::from_pairs([
                (UserImportColumn::UserId, "2001"),
                (UserImportColumn::LoginId, "1001"),
                (UserImportColumn::Status, "active"),
            ]),
        );
        assert_eq!(
            sheet.to_csv_string().unwrap(),
            "user_id,login_id,first_name,last_name,email,status\n2001,1001,,,,active\n"
        );
    }
}
