//! `campus-sync validate-sheet` command.

use std::path::Path;

use crate::cli::SheetKind;
use crate::context::ServiceContext;
use crate::worksheet::directory::UserImport;
use crate::worksheet::oec::{
    CourseConfirmation, CourseInstructors, CourseStudents, CourseSupervisors, Courses, Instructors, SisImport,
    Students, Supervisors,
};
use crate::worksheet::{string_coords, Column, Schema, Worksheet};

/// Validation errors of a sheet, each prefixed with its cell in `A1`
/// notation. The header is taken to be the first line.
///
/// # Errors
///
/// Returns an error string if the text is not a sheet of kind `S`.
pub fn sheet_errors<S: Schema>(text: &str) -> Result<Vec<String>, String> {
    let (sheet, date_errors) = Worksheet::<S>::from_csv_lenient(text).map_err(|e| e.to_string())?;
    let mut lines: Vec<String> = date_errors.into_iter().map(|(key, err)| format!("row {key}: {err}")).collect();
    for (index, row) in sheet.iter().enumerate() {
        for (column, message) in Worksheet::<S>::validation_failures(row) {
            lines.push(format!("{}: {message}", string_coords(index + 2, column.index() + 1)));
        }
    }
    Ok(lines)
}

/// Execute the `validate-sheet` command.
///
/// # Errors
///
/// Returns an error string if the file cannot be read or has the wrong columns.
pub fn run(ctx: &ServiceContext, kind: SheetKind, path: &Path) -> Result<(), String> {
    let text = ctx.fs.read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let errors = match kind {
        SheetKind::SisImport => sheet_errors::<SisImport>(&text),
        SheetKind::CourseConfirmations => sheet_errors::<CourseConfirmation>(&text),
        SheetKind::Courses => sheet_errors::<Courses>(&text),
        SheetKind::Instructors => sheet_errors::<Instructors>(&text),
        SheetKind::Students => sheet_errors::<Students>(&text),
        SheetKind::CourseInstructors => sheet_errors::<CourseInstructors>(&text),
        SheetKind::CourseStudents => sheet_errors::<CourseStudents>(&text),
        SheetKind::Supervisors => sheet_errors::<Supervisors>(&text),
        SheetKind::CourseSupervisors => sheet_errors::<CourseSupervisors>(&text),
        SheetKind::UserImport => sheet_errors::<UserImport>(&text),
    }?;
    if errors.is_empty() {
        println!("{}: no errors", path.display());
    } else {
        println!("{}: {} errors", path.display(), errors.len());
        for line in errors {
            println!("  {line}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, FakeCampus, FakeDirectory, MemoryFs};

    #[test]
    fn errors_name_their_cells() {
        let text = "LDAP_UID,SIS_ID,FIRST_NAME,LAST_NAME,EMAIL_ADDRESS,BLUE_ROLE\n\
                    100,UID:100,Ann,Aaa,ann@example.edu,23\n\
                    abc,UID:101,Bo,Bbb,,23\n";
        assert_eq!(
            sheet_errors::<Instructors>(text).unwrap(),
            vec!["A3: Non-numeric LDAP_UID abc", "B3: Unexpected SIS_ID UID:101", "E3: Blank EMAIL_ADDRESS"]
        );
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let err = sheet_errors::<Students>("COURSE_ID,LDAP_UID\n2015-B-1,100\n").unwrap_err();
        assert!(err.starts_with("Header mismatch"), "{err}");
    }

    #[test]
    fn missing_file_is_an_error() {
        let (fs, directory, campus) = (MemoryFs::default(), FakeDirectory::default(), FakeCampus::default());
        let ctx = context(&fs, &directory, &campus);
        assert!(run(&ctx, SheetKind::Courses, Path::new("/none.csv")).is_err());
    }
}
