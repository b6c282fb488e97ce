//! Course evaluation sheet kinds.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{Row, Schema, Validation, Worksheet};
use crate::columns;

static COURSE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A\d{4}-[A-Z]-\d+(_[A-Z0-9]+)?\z").expect("valid regex"));

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Replaces characters that evaluation scripts cannot handle in a department form.
#[must_use]
pub fn dept_form_from_name(dept_name: &str) -> String {
    dept_name.replace(',', "_")
}

/// Splits a course ID into its term prefix (`2015-B`) and section CCN,
/// dropping any `_SUFFIX`.
#[must_use]
pub fn split_course_id(course_id: &str) -> Option<(&str, &str)> {
    let (term, rest) = course_id.rsplit_once('-')?;
    let ccn = rest.split('_').next()?;
    Some((term, ccn))
}

columns! {
    /// Columns of the SIS import and merged confirmation sheets.
    pub enum SisImportColumn {
        CourseId => "COURSE_ID",
        CourseId2 => "COURSE_ID_2",
        CourseName => "COURSE_NAME",
        CrossListedFlag => "CROSS_LISTED_FLAG",
        CrossListedName => "CROSS_LISTED_NAME",
        DeptName => "DEPT_NAME",
        CatalogId => "CATALOG_ID",
        InstructionFormat => "INSTRUCTION_FORMAT",
        SectionNum => "SECTION_NUM",
        PrimarySecondaryCd => "PRIMARY_SECONDARY_CD",
        LdapUid => "LDAP_UID",
        SisId => "SIS_ID",
        FirstName => "FIRST_NAME",
        LastName => "LAST_NAME",
        EmailAddress => "EMAIL_ADDRESS",
        InstructorFunc => "INSTRUCTOR_FUNC",
        Evaluate => "EVALUATE",
        DeptForm => "DEPT_FORM",
        EvaluationType => "EVALUATION_TYPE",
        ModularCourse => "MODULAR_COURSE",
        StartDate => "START_DATE",
        EndDate => "END_DATE",
        CanvasCourseId => "CANVAS_COURSE_ID",
    }
}

fn course_id_check(value: &str) -> Option<&'static str> {
    (!COURSE_ID.is_match(value)).then_some("Invalid")
}

fn evaluate_flag(value: &str) -> Option<&'static str> {
    (!matches!(value, "" | "Y" | "N")).then_some("Unexpected")
}

/// Authoritative section/instructor data, one sheet per department; also
/// the layout of the merged confirmation sheet.
#[derive(Debug, Clone, Copy)]
pub struct SisImport;

static SIS_IMPORT_VALIDATIONS: [Validation<SisImportColumn>; 4] = [
    Validation::with(SisImportColumn::CourseId, |row| {
        course_id_check(row.get(SisImportColumn::CourseId))
    }),
    Validation::present(SisImportColumn::CourseName),
    Validation::present(SisImportColumn::StartDate),
    Validation::present(SisImportColumn::EndDate),
];

impl Schema for SisImport {
    type Column = SisImportColumn;
    const EXPORT_NAME: &'static str = "sis_import";

    fn validations() -> &'static [Validation<SisImportColumn>] {
        &SIS_IMPORT_VALIDATIONS
    }

    /// Groups cross-listed sections together.
    fn sort_rows(rows: &mut [&Row<SisImportColumn>]) {
        rows.sort_by(|a, b| {
            (a.get(SisImportColumn::CrossListedName), a.get(SisImportColumn::CourseId))
                .cmp(&(b.get(SisImportColumn::CrossListedName), b.get(SisImportColumn::CourseId)))
        });
    }
}

impl Worksheet<SisImport> {
    /// Natural key of a row: course ID and instructor ID.
    #[must_use]
    pub fn row_key(row: &Row<SisImportColumn>) -> String {
        format!("{}-{}", row.get(SisImportColumn::CourseId), row.get(SisImportColumn::LdapUid))
    }

    /// Rows indexed by [`Self::row_key`]. The first row for a key wins.
    #[must_use]
    pub fn sections(&self) -> HashMap<String, &Row<SisImportColumn>> {
        let mut index = HashMap::with_capacity(self.len());
        for row in self.iter() {
            index.entry(Self::row_key(row)).or_insert(row);
        }
        index
    }
}

columns! {
    /// Columns of a department's confirmation sheet.
    pub enum CourseConfirmationColumn {
        CourseId => "COURSE_ID",
        CourseName => "COURSE_NAME",
        CrossListedFlag => "CROSS_LISTED_FLAG",
        CrossListedName => "CROSS_LISTED_NAME",
        LdapUid => "LDAP_UID",
        FirstName => "FIRST_NAME",
        LastName => "LAST_NAME",
        EmailAddress => "EMAIL_ADDRESS",
        Evaluate => "EVALUATE",
        DeptForm => "DEPT_FORM",
        EvaluationType => "EVALUATION_TYPE",
        StartDate => "START_DATE",
        EndDate => "END_DATE",
    }
}

/// A department's confirmation of which sections to evaluate.
#[derive(Debug, Clone, Copy)]
pub struct CourseConfirmation;

static COURSE_CONFIRMATION_VALIDATIONS: [Validation<CourseConfirmationColumn>; 2] = [
    Validation::with(CourseConfirmationColumn::CourseId, |row| {
        course_id_check(row.get(CourseConfirmationColumn::CourseId))
    }),
    Validation::with(CourseConfirmationColumn::Evaluate, |row| {
        evaluate_flag(row.get(CourseConfirmationColumn::Evaluate))
    }),
];

impl Schema for CourseConfirmation {
    type Column = CourseConfirmationColumn;
    const EXPORT_NAME: &'static str = "course_confirmations";

    fn validations() -> &'static [Validation<CourseConfirmationColumn>] {
        &COURSE_CONFIRMATION_VALIDATIONS
    }
}

columns! {
    /// Columns of the published courses sheet.
    pub enum CoursesColumn {
        CourseId => "COURSE_ID",
        CourseId2 => "COURSE_ID_2",
        CourseName => "COURSE_NAME",
        CrossListedFlag => "CROSS_LISTED_FLAG",
        CrossListedName => "CROSS_LISTED_NAME",
        DeptName => "DEPT_NAME",
        CatalogId => "CATALOG_ID",
        InstructionFormat => "INSTRUCTION_FORMAT",
        SectionNum => "SECTION_NUM",
        PrimarySecondaryCd => "PRIMARY_SECONDARY_CD",
        Evaluate => "EVALUATE",
        DeptForm => "DEPT_FORM",
        EvaluationType => "EVALUATION_TYPE",
        ModularCourse => "MODULAR_COURSE",
        StartDate => "START_DATE",
        EndDate => "END_DATE",
        CanvasCourseId => "CANVAS_COURSE_ID",
        QbMapping => "QB_MAPPING",
    }
    transient { SectionId => "SECTION_ID" }
}

/// One row per evaluated course.
#[derive(Debug, Clone, Copy)]
pub struct Courses;

static COURSES_VALIDATIONS: [Validation<CoursesColumn>; 7] = [
    Validation::with(CoursesColumn::CourseId, |row| {
        course_id_check(row.get(CoursesColumn::CourseId))
    }),
    Validation::with(CoursesColumn::CourseId2, |row| {
        (row.get(CoursesColumn::CourseId2) != row.get(CoursesColumn::CourseId))
            .then_some("Mismatched")
    }),
    Validation::present(CoursesColumn::CourseName),
    Validation::present(CoursesColumn::DeptForm),
    Validation::present(CoursesColumn::EvaluationType),
    Validation::present(CoursesColumn::StartDate),
    Validation::present(CoursesColumn::EndDate),
];

impl Schema for Courses {
    type Column = CoursesColumn;
    const EXPORT_NAME: &'static str = "courses";

    fn validations() -> &'static [Validation<CoursesColumn>] {
        &COURSES_VALIDATIONS
    }

    fn sort_rows(rows: &mut [&Row<CoursesColumn>]) {
        rows.sort_by(|a, b| {
            (a.get(CoursesColumn::CrossListedName), a.get(CoursesColumn::CourseId))
                .cmp(&(b.get(CoursesColumn::CrossListedName), b.get(CoursesColumn::CourseId)))
        });
    }
}

fn uid_check(value: &str) -> Option<&'static str> {
    (!is_numeric(value)).then_some("Non-numeric")
}

fn sis_id_check(sis_id: &str, ldap_uid: &str) -> Option<&'static str> {
    let uid_form = sis_id.strip_prefix("UID:").is_some_and(|uid| uid == ldap_uid);
    (!uid_form && !is_numeric(sis_id)).then_some("Unexpected")
}

columns! {
    /// Columns of the published instructors sheet.
    pub enum InstructorsColumn {
        LdapUid => "LDAP_UID",
        SisId => "SIS_ID",
        FirstName => "FIRST_NAME",
        LastName => "LAST_NAME",
        EmailAddress => "EMAIL_ADDRESS",
        BlueRole => "BLUE_ROLE",
    }
}

/// One row per instructor.
#[derive(Debug, Clone, Copy)]
pub struct Instructors;

static INSTRUCTORS_VALIDATIONS: [Validation<InstructorsColumn>; 6] = [
    Validation::with(InstructorsColumn::LdapUid, |row| {
        uid_check(row.get(InstructorsColumn::LdapUid))
    }),
    Validation::with(InstructorsColumn::SisId, |row| {
        sis_id_check(row.get(InstructorsColumn::SisId), row.get(InstructorsColumn::LdapUid))
    }),
    Validation::present(InstructorsColumn::FirstName),
    Validation::present(InstructorsColumn::LastName),
    Validation::present(InstructorsColumn::EmailAddress),
    Validation::present(InstructorsColumn::BlueRole),
];

impl Schema for Instructors {
    type Column = InstructorsColumn;
    const EXPORT_NAME: &'static str = "instructors";

    fn validations() -> &'static [Validation<InstructorsColumn>] {
        &INSTRUCTORS_VALIDATIONS
    }
}

columns! {
    /// Columns of the published students sheet.
    pub enum StudentsColumn {
        LdapUid => "LDAP_UID",
        SisId => "SIS_ID",
        FirstName => "FIRST_NAME",
        LastName => "LAST_NAME",
        EmailAddress => "EMAIL_ADDRESS",
    }
}

/// One row per enrolled student.
#[derive(Debug, Clone, Copy)]
pub struct Students;

static STUDENTS_VALIDATIONS: [Validation<StudentsColumn>; 5] = [
    Validation::with(StudentsColumn::LdapUid, |row| uid_check(row.get(StudentsColumn::LdapUid))),
    Validation::with(StudentsColumn::SisId, |row| {
        sis_id_check(row.get(StudentsColumn::SisId), row.get(StudentsColumn::LdapUid))
    }),
    Validation::present(StudentsColumn::FirstName),
    Validation::present(StudentsColumn::LastName),
    Validation::present(StudentsColumn::EmailAddress),
];

impl Schema for Students {
    type Column = StudentsColumn;
    const EXPORT_NAME: &'static str = "students";

    fn validations() -> &'static [Validation<StudentsColumn>] {
        &STUDENTS_VALIDATIONS
    }
}

columns! {
    /// Columns of a course-to-person junction sheet.
    pub enum CoursePersonColumn {
        CourseId => "COURSE_ID",
        LdapUid => "LDAP_UID",
    }
}

static COURSE_PERSON_VALIDATIONS: [Validation<CoursePersonColumn>; 2] = [
    Validation::with(CoursePersonColumn::CourseId, |row| {
        course_id_check(row.get(CoursePersonColumn::CourseId))
    }),
    Validation::with(CoursePersonColumn::LdapUid, |row| {
        uid_check(row.get(CoursePersonColumn::LdapUid))
    }),
];

/// Course-instructor pairings.
#[derive(Debug, Clone, Copy)]
pub struct CourseInstructors;

impl Schema for CourseInstructors {
    type Column = CoursePersonColumn;
    const EXPORT_NAME: &'static str = "course_instructors";

    fn validations() -> &'static [Validation<CoursePersonColumn>] {
        &COURSE_PERSON_VALIDATIONS
    }
}

/// Course-student pairings.
#[derive(Debug, Clone, Copy)]
pub struct CourseStudents;

impl Schema for CourseStudents {
    type Column = CoursePersonColumn;
    const EXPORT_NAME: &'static str = "course_students";

    fn validations() -> &'static [Validation<CoursePersonColumn>] {
        &COURSE_PERSON_VALIDATIONS
    }
}

columns! {
    /// Columns of the supervisors sheet.
    pub enum SupervisorsColumn {
        LdapUid => "LDAP_UID",
        SisId => "SIS_ID",
        FirstName => "FIRST_NAME",
        LastName => "LAST_NAME",
        EmailAddress => "EMAIL_ADDRESS",
        SupervisorGroup => "SUPERVISOR_GROUP",
        PrimaryAdmin => "PRIMARY_ADMIN",
        SecondaryAdmin => "SECONDARY_ADMIN",
        DeptName1 => "DEPT_NAME_1",
        DeptName2 => "DEPT_NAME_2",
        DeptName3 => "DEPT_NAME_3",
        DeptName4 => "DEPT_NAME_4",
        DeptName5 => "DEPT_NAME_5",
        DeptName6 => "DEPT_NAME_6",
        DeptName7 => "DEPT_NAME_7",
        DeptName8 => "DEPT_NAME_8",
        DeptName9 => "DEPT_NAME_9",
        DeptName10 => "DEPT_NAME_10",
    }
}

/// The ten department columns of a supervisor row.
pub const SUPERVISOR_DEPT_COLUMNS: [SupervisorsColumn; 10] = [
    SupervisorsColumn::DeptName1,
    SupervisorsColumn::DeptName2,
    SupervisorsColumn::DeptName3,
    SupervisorsColumn::DeptName4,
    SupervisorsColumn::DeptName5,
    SupervisorsColumn::DeptName6,
    SupervisorsColumn::DeptName7,
    SupervisorsColumn::DeptName8,
    SupervisorsColumn::DeptName9,
    SupervisorsColumn::DeptName10,
];

/// Department supervisors and the departments each one oversees.
#[derive(Debug, Clone, Copy)]
pub struct Supervisors;

static SUPERVISORS_VALIDATIONS: [Validation<SupervisorsColumn>; 2] = [
    Validation::with(SupervisorsColumn::LdapUid, |row| {
        uid_check(row.get(SupervisorsColumn::LdapUid))
    }),
    Validation::with(SupervisorsColumn::SisId, |row| {
        sis_id_check(row.get(SupervisorsColumn::SisId), row.get(SupervisorsColumn::LdapUid))
    }),
];

impl Schema for Supervisors {
    type Column = SupervisorsColumn;
    const EXPORT_NAME: &'static str = "supervisors";

    fn validations() -> &'static [Validation<SupervisorsColumn>] {
        &SUPERVISORS_VALIDATIONS
    }
}

/// Non-blank department names of a supervisor row.
pub fn supervisor_dept_names(row: &Row<SupervisorsColumn>) -> impl Iterator<Item = &str> {
    SUPERVISOR_DEPT_COLUMNS.iter().map(move |&c| row.get(c)).filter(|name| !name.trim().is_empty())
}

impl Worksheet<Supervisors> {
    /// Supervisors overseeing a department form.
    #[must_use]
    pub fn matching_dept_form(&self, dept_form: &str) -> Vec<&Row<SupervisorsColumn>> {
        if dept_form.trim().is_empty() {
            return Vec::new();
        }
        self.iter()
            .filter(|row| supervisor_dept_names(row).any(|name| dept_form_from_name(name) == dept_form))
            .collect()
    }

    /// Supervisors overseeing a department name.
    #[must_use]
    pub fn matching_dept_name(&self, dept_name: &str) -> Vec<&Row<SupervisorsColumn>> {
        if dept_name.trim().is_empty() {
            return Vec::new();
        }
        self.iter().filter(|row| supervisor_dept_names(row).any(|name| name == dept_name)).collect()
    }
}

columns! {
    /// Columns of the course-supervisor sheet.
    pub enum CourseSupervisorsColumn {
        CourseId => "COURSE_ID",
        LdapUid => "LDAP_UID",
        DeptName => "DEPT_NAME",
    }
}

/// Course-supervisor pairings by department form.
#[derive(Debug, Clone, Copy)]
pub struct CourseSupervisors;

static COURSE_SUPERVISORS_VALIDATIONS: [Validation<CourseSupervisorsColumn>; 3] = [
    Validation::with(CourseSupervisorsColumn::CourseId, |row| {
        course_id_check(row.get(CourseSupervisorsColumn::CourseId))
    }),
    Validation::with(CourseSupervisorsColumn::LdapUid, |row| {
        uid_check(row.get(CourseSupervisorsColumn::LdapUid))
    }),
    Validation::present(CourseSupervisorsColumn::DeptName),
];

impl Schema for CourseSupervisors {
    type Column = CourseSupervisorsColumn;
    const EXPORT_NAME: &'static str = "course_supervisors";

    fn validations() -> &'static [Validation<CourseSupervisorsColumn>] {
        &COURSE_SUPERVISORS_VALIDATIONS
    }
}

columns! {
    /// Columns of the department hierarchy sheet.
    pub enum DepartmentHierarchyColumn {
        NodeId => "NODE_ID",
        NodeCaption => "NODE_CAPTION",
        ParentNodeId => "PARENT_NODE_ID",
        ParentNodeCaption => "PARENT_NODE_CAPTION",
        Level => "LEVEL",
    }
}

/// Two-level department tree under the campus root node.
#[derive(Debug, Clone, Copy)]
pub struct DepartmentHierarchy;

impl Schema for DepartmentHierarchy {
    type Column = DepartmentHierarchyColumn;
    const EXPORT_NAME: &'static str = "department_hierarchy";
}

columns! {
    /// Columns of the report viewer hierarchy sheet.
    pub enum ReportViewerHierarchyColumn {
        Source => "SOURCE",
        Target => "TARGET",
        RoleId => "ROLE_ID",
    }
}

/// Which supervisors may view reports for which department forms.
#[derive(Debug, Clone, Copy)]
pub struct ReportViewerHierarchy;

impl Schema for ReportViewerHierarchy {
    type Column = ReportViewerHierarchyColumn;
    const EXPORT_NAME: &'static str = "report_viewer_hierarchy";
}
