//! Deriving the evaluation upload sheets from a merged confirmation sheet.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::{error, info};

use super::errors::ValidationLog;
use crate::error::{Error, Result};
use crate::ports::{CampusData, FileSystem};
use crate::worksheet::oec::{
    dept_form_from_name, split_course_id, supervisor_dept_names, CourseInstructors, CoursePersonColumn,
    CourseStudents, CourseSupervisors, CourseSupervisorsColumn, Courses, CoursesColumn, DepartmentHierarchy,
    DepartmentHierarchyColumn, Instructors, InstructorsColumn, ReportViewerHierarchy, ReportViewerHierarchyColumn,
    SisImport, SisImportColumn, Students, StudentsColumn, Supervisors, SupervisorsColumn,
};
use crate::worksheet::{Column, Row, Schema, Worksheet};

/// Term and naming choices for one publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// Term code, e.g. `2015-B`.
    pub term: String,
    /// Caption of the hierarchy root node.
    pub hierarchy_root: String,
    /// `BLUE_ROLE` given to instructors.
    pub instructor_role: String,
}

/// Sheets published for the term before this one.
#[derive(Debug, Clone, Default)]
pub struct PreviousTerm {
    /// Prior course-instructor pairings.
    pub course_instructors: Worksheet<CourseInstructors>,
    /// Prior instructor records.
    pub instructors: Worksheet<Instructors>,
}

/// The full set of upload sheets.
#[derive(Debug, Clone, Default)]
pub struct PublishSheets {
    /// One row per evaluated course ID.
    pub courses: Worksheet<Courses>,
    /// Current and carried-over instructor pairings.
    pub course_instructors: Worksheet<CourseInstructors>,
    /// One row per instructor.
    pub instructors: Worksheet<Instructors>,
    /// Enrollments of evaluated courses.
    pub course_students: Worksheet<CourseStudents>,
    /// One row per enrolled student.
    pub students: Worksheet<Students>,
    /// Supervisors of each course's department form.
    pub course_supervisors: Worksheet<CourseSupervisors>,
    /// Supervisors, re-exported as given.
    pub supervisors: Worksheet<Supervisors>,
    /// Root plus one node per supervised department.
    pub department_hierarchy: Worksheet<DepartmentHierarchy>,
    /// Report access per department form.
    pub report_viewer_hierarchy: Worksheet<ReportViewerHierarchy>,
}

fn is_evaluated(row: &Row<SisImportColumn>) -> bool {
    row.get(SisImportColumn::Evaluate).trim().eq_ignore_ascii_case("Y")
}

fn pair_key(course_id: &str, ldap_uid: &str) -> String {
    format!("{course_id}-{ldap_uid}")
}

/// Copies every non-blank value of `source` into the blank columns of `target`.
fn fill_blanks<C: Column>(target: &mut Row<C>, source: &Row<C>) {
    for &column in C::ALL {
        if target.is_blank(column) && !source.is_blank(column) {
            target.set(column, source.get(column));
        }
    }
}

impl PublishSheets {
    /// Builds every sheet. A failed enrollment lookup is logged and leaves
    /// the student sheets empty.
    #[must_use]
    pub fn build(
        merged: &Worksheet<SisImport>,
        supervisors: &Worksheet<Supervisors>,
        previous: Option<&PreviousTerm>,
        campus: &dyn CampusData,
        options: &PublishOptions,
    ) -> Self {
        let evaluated: Vec<&Row<SisImportColumn>> = merged.sorted_rows().into_iter().filter(|r| is_evaluated(r)).collect();
        let mut sheets = Self { supervisors: supervisors.clone(), ..Self::default() };
        sheets.add_courses(&evaluated);
        sheets.add_instructors(&evaluated, &options.instructor_role);
        if let Some(previous) = previous {
            sheets.carry_over(previous);
        }
        sheets.add_students(campus, &options.term);
        sheets.add_supervision(&evaluated, &options.hierarchy_root);
        info!(
            "Built {} courses, {} instructors, {} students",
            sheets.courses.len(),
            sheets.instructors.len(),
            sheets.students.len()
        );
        sheets
    }

    fn add_courses(&mut self, evaluated: &[&Row<SisImportColumn>]) {
        for row in evaluated {
            let course_id = row.get(SisImportColumn::CourseId);
            if self.courses.contains_key(course_id) {
                continue;
            }
            let mut course: Row<CoursesColumn> = row.project();
            course.set(CoursesColumn::CourseId2, course_id);
            course.set(
                CoursesColumn::QbMapping,
                format!("{}-{}", row.get(SisImportColumn::DeptForm), row.get(SisImportColumn::EvaluationType)),
            );
            if let Some((_, ccn)) = split_course_id(course_id) {
                course.set(CoursesColumn::SectionId, ccn);
            }
            self.courses.insert(course_id, course);
        }
    }

    fn add_instructors(&mut self, evaluated: &[&Row<SisImportColumn>], role: &str) {
        for row in evaluated.iter().filter(|r| !r.is_blank(SisImportColumn::LdapUid)) {
            let course_id = row.get(SisImportColumn::CourseId);
            let uid = row.get(SisImportColumn::LdapUid).trim();
            self.course_instructors.insert(
                pair_key(course_id, uid),
                Row::from_pairs([(CoursePersonColumn::CourseId, course_id), (CoursePersonColumn::LdapUid, uid)]),
            );
            let mut instructor: Row<InstructorsColumn> = row.project();
            instructor.set(InstructorsColumn::LdapUid, uid);
            instructor.set(InstructorsColumn::BlueRole, role);
            match self.instructors.get_mut(uid) {
                Some(existing) => fill_blanks(existing, &instructor),
                None => self.instructors.insert(uid, instructor),
            }
        }
    }

    /// Keeps prior pairings and fills instructor gaps from prior records
    /// without overwriting anything present this term.
    fn carry_over(&mut self, previous: &PreviousTerm) {
        let mut carried = 0;
        for row in previous.course_instructors.iter() {
            let key = pair_key(row.get(CoursePersonColumn::CourseId), row.get(CoursePersonColumn::LdapUid));
            if !self.course_instructors.contains_key(&key) {
                self.course_instructors.insert(key, row.clone());
                carried += 1;
            }
        }
        let referenced: BTreeSet<String> = self
            .course_instructors
            .iter()
            .map(|row| row.get(CoursePersonColumn::LdapUid).to_string())
            .collect();
        for uid in &referenced {
            let Some(prior) = previous.instructors.matching(InstructorsColumn::LdapUid, uid).next() else { continue };
            match self.instructors.get_mut(uid) {
                Some(current) => fill_blanks(current, prior),
                None => self.instructors.insert(uid.as_str(), prior.clone()),
            }
        }
        info!("Carried over {carried} course instructor pairings from the previous term");
    }

    fn add_students(&mut self, campus: &dyn CampusData, term: &str) {
        let mut courses_by_ccn: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for course in self.courses.iter().filter(|c| !c.is_blank(CoursesColumn::SectionId)) {
            courses_by_ccn
                .entry(course.get(CoursesColumn::SectionId).to_string())
                .or_default()
                .push(course.get(CoursesColumn::CourseId).to_string());
        }
        if courses_by_ccn.is_empty() {
            return;
        }
        let ccns: Vec<String> = courses_by_ccn.keys().cloned().collect();
        let enrollments = match campus.enrollments(term, &ccns) {
            Ok(enrollments) => enrollments,
            Err(e) => {
                error!("{}", Error::external("enrollment lookup", e));
                return;
            }
        };
        for enrollment in enrollments {
            let Some(course_ids) = courses_by_ccn.get(&enrollment.section_id) else { continue };
            for course_id in course_ids {
                self.course_students.insert(
                    pair_key(course_id, &enrollment.ldap_uid),
                    Row::from_pairs([
                        (CoursePersonColumn::CourseId, course_id.as_str()),
                        (CoursePersonColumn::LdapUid, enrollment.ldap_uid.as_str()),
                    ]),
                );
            }
            if !self.students.contains_key(&enrollment.ldap_uid) {
                let student = Row::from_pairs([
                    (StudentsColumn::LdapUid, enrollment.ldap_uid.as_str()),
                    (StudentsColumn::SisId, enrollment.sis_id.as_str()),
                    (StudentsColumn::FirstName, enrollment.first_name.as_str()),
                    (StudentsColumn::LastName, enrollment.last_name.as_str()),
                    (StudentsColumn::EmailAddress, enrollment.email.as_str()),
                ]);
                self.students.insert(enrollment.ldap_uid.as_str(), student);
            }
        }
    }

    fn add_supervision(&mut self, evaluated: &[&Row<SisImportColumn>], root: &str) {
        for row in evaluated {
            let course_id = row.get(SisImportColumn::CourseId);
            let dept_form = row.get(SisImportColumn::DeptForm);
            for supervisor in self.supervisors.matching_dept_form(dept_form) {
                let uid = supervisor.get(SupervisorsColumn::LdapUid);
                self.course_supervisors.insert(
                    pair_key(course_id, uid),
                    Row::from_pairs([
                        (CourseSupervisorsColumn::CourseId, course_id),
                        (CourseSupervisorsColumn::LdapUid, uid),
                        (CourseSupervisorsColumn::DeptName, dept_form),
                    ]),
                );
            }
        }

        self.department_hierarchy.insert(
            root,
            Row::from_pairs([
                (DepartmentHierarchyColumn::NodeId, root),
                (DepartmentHierarchyColumn::NodeCaption, root),
                (DepartmentHierarchyColumn::Level, "1"),
            ]),
        );
        for supervisor in self.supervisors.iter() {
            let uid = supervisor.get(SupervisorsColumn::LdapUid);
            for name in supervisor_dept_names(supervisor) {
                let form = dept_form_from_name(name);
                if !self.department_hierarchy.contains_key(&form) {
                    let node = Row::from_pairs([
                        (DepartmentHierarchyColumn::NodeId, form.as_str()),
                        (DepartmentHierarchyColumn::NodeCaption, name),
                        (DepartmentHierarchyColumn::ParentNodeId, root),
                        (DepartmentHierarchyColumn::ParentNodeCaption, root),
                        (DepartmentHierarchyColumn::Level, "2"),
                    ]);
                    self.department_hierarchy.insert(form.as_str(), node);
                }
                self.report_viewer_hierarchy.insert(
                    pair_key(&form, uid),
                    Row::from_pairs([
                        (ReportViewerHierarchyColumn::Source, form.as_str()),
                        (ReportViewerHierarchyColumn::Target, uid),
                        (ReportViewerHierarchyColumn::RoleId, supervisor.get(SupervisorsColumn::SupervisorGroup)),
                    ]),
                );
            }
        }
    }

    /// Records row validation errors of every sheet under its export name.
    pub fn validate(&self, log: &mut ValidationLog) {
        validate_rows(&self.courses, log);
        validate_rows(&self.course_instructors, log);
        validate_rows(&self.instructors, log);
        validate_rows(&self.course_students, log);
        validate_rows(&self.students, log);
        validate_rows(&self.course_supervisors, log);
        validate_rows(&self.supervisors, log);
        validate_rows(&self.department_hierarchy, log);
        validate_rows(&self.report_viewer_hierarchy, log);
    }

    /// Writes every sheet into `dir`, returning the written paths.
    ///
    /// # Errors
    ///
    /// Returns the first serialization or write failure.
    pub fn write(&self, fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(vec![
            write_sheet(fs, dir, &self.courses)?,
            write_sheet(fs, dir, &self.course_instructors)?,
            write_sheet(fs, dir, &self.instructors)?,
            write_sheet(fs, dir, &self.course_students)?,
            write_sheet(fs, dir, &self.students)?,
            write_sheet(fs, dir, &self.course_supervisors)?,
            write_sheet(fs, dir, &self.supervisors)?,
            write_sheet(fs, dir, &self.department_hierarchy)?,
            write_sheet(fs, dir, &self.report_viewer_hierarchy)?,
        ])
    }
}

fn validate_rows<S: Schema>(sheet: &Worksheet<S>, log: &mut ValidationLog) {
    for (key, row) in sheet.entries() {
        for message in Worksheet::<S>::errors_for_row(row) {
            log.record(sheet.export_name(), key, message);
        }
    }
}

fn write_sheet<S: Schema>(fs: &dyn FileSystem, dir: &Path, sheet: &Worksheet<S>) -> Result<PathBuf> {
    let path = dir.join(sheet.file_name());
    let csv = sheet.to_export_csv()?;
    fs.write(&path, &csv).map_err(|e| Error::external(format!("write {}", path.display()), e))?;
    info!("Exported {} rows to {}", sheet.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Enrollment;
    use crate::testing::{FakeCampus, MemoryFs};

    fn merged() -> Worksheet<SisImport> {
        let rows = [
            ("2015-B-34821", "GWS 165 LEC 001", "100", "Y", "GWS", "F", "Ann", ""),
            ("2015-B-34821_GSI", "GWS 165 LEC 001", "300", "Y", "GWS", "G", "Gus", "gus@example.edu"),
            ("2015-B-55555", "LGBT 20 LEC 001", "200", "N", "LGBT", "F", "Bo", "bo@example.edu"),
        ];
        let mut sheet = Worksheet::new();
        for (id, name, uid, evaluate, form, eval_type, first, email) in rows {
            let mut row = Row::from_pairs([
                (SisImportColumn::CourseId, id),
                (SisImportColumn::CourseId2, id),
                (SisImportColumn::CourseName, name),
                (SisImportColumn::LdapUid, uid),
                (SisImportColumn::FirstName, first),
                (SisImportColumn::LastName, "Zed"),
                (SisImportColumn::EmailAddress, email),
                (SisImportColumn::Evaluate, evaluate),
                (SisImportColumn::DeptForm, form),
                (SisImportColumn::EvaluationType, eval_type),
                (SisImportColumn::StartDate, "01-20-2015"),
                (SisImportColumn::EndDate, "05-08-2015"),
            ]);
            row.set(SisImportColumn::SisId, format!("UID:{uid}"));
            sheet.insert(format!("{id}-{uid}"), row);
        }
        sheet
    }

    const SUPERVISORS_CSV: &str = "LDAP_UID,SIS_ID,FIRST_NAME,LAST_NAME,EMAIL_ADDRESS,SUPERVISOR_GROUP,PRIMARY_ADMIN,SECONDARY_ADMIN,DEPT_NAME_1,DEPT_NAME_2,DEPT_NAME_3,DEPT_NAME_4,DEPT_NAME_5,DEPT_NAME_6,DEPT_NAME_7,DEPT_NAME_8,DEPT_NAME_9,DEPT_NAME_10\n\
        900,UID:900,Sue,Sss,sue@example.edu,DEPT_ADMIN,Y,,GWS,LGBT,,,,,,,,\n";

    fn supervisors() -> Worksheet<Supervisors> {
        Worksheet::from_csv(SUPERVISORS_CSV).unwrap()
    }

    fn options() -> PublishOptions {
        PublishOptions { term: "2015-B".into(), hierarchy_root: "UC Berkeley".into(), instructor_role: "23".into() }
    }

    fn campus() -> FakeCampus {
        let enrollment = |uid: &str| Enrollment {
            section_id: "34821".into(),
            ldap_uid: uid.into(),
            sis_id: format!("2{uid}"),
            first_name: "Stu".into(),
            last_name: "Dent".into(),
            email: format!("{uid}@example.edu"),
        };
        FakeCampus::default().with_enrollments(vec![enrollment("501"), enrollment("502")])
    }

    fn previous() -> PreviousTerm {
        let course_instructors = Worksheet::<CourseInstructors>::from_csv("COURSE_ID,LDAP_UID\n2014-D-11111,400\n2015-B-34821,100\n").unwrap();
        let instructors = Worksheet::<Instructors>::from_csv(
            "LDAP_UID,SIS_ID,FIRST_NAME,LAST_NAME,EMAIL_ADDRESS,BLUE_ROLE\n\
             400,UID:400,Old,Timer,old@example.edu,23\n\
             100,UID:100,Annie,Prior,ann@example.edu,23\n",
        )
        .unwrap();
        let mut previous = PreviousTerm::default();
        for (i, row) in course_instructors.iter().enumerate() {
            previous.course_instructors.insert(i.to_string(), row.clone());
        }
        for row in instructors.iter() {
            previous.instructors.insert(row.get(InstructorsColumn::LdapUid), row.clone());
        }
        previous
    }

    #[test]
    fn courses_come_from_evaluated_rows_only() {
        let sheets = PublishSheets::build(&merged(), &supervisors(), None, &campus(), &options());
        let ids: Vec<&str> = sheets.courses.iter().map(|c| c.get(CoursesColumn::CourseId)).collect();
        assert_eq!(ids, vec!["2015-B-34821", "2015-B-34821_GSI"]);
        let gsi = sheets.courses.get("2015-B-34821_GSI").unwrap();
        assert_eq!(&gsi[CoursesColumn::CourseId2], "2015-B-34821_GSI");
        assert_eq!(&gsi[CoursesColumn::QbMapping], "GWS-G");
        assert_eq!(&gsi[CoursesColumn::SectionId], "34821");
    }

    #[test]
    fn suffixed_courses_share_enrollments() {
        let sheets = PublishSheets::build(&merged(), &supervisors(), None, &campus(), &options());
        assert_eq!(sheets.students.len(), 2);
        assert_eq!(sheets.course_students.len(), 4);
        assert!(sheets.course_students.contains_key("2015-B-34821_GSI-502"));
        assert_eq!(&sheets.students.get("501").unwrap()[StudentsColumn::SisId], "2501");
    }

    #[test]
    fn enrollment_outage_leaves_students_empty() {
        let sheets = PublishSheets::build(&merged(), &supervisors(), None, &FakeCampus::failing("timeout"), &options());
        assert!(sheets.students.is_empty());
        assert!(sheets.course_students.is_empty());
        assert_eq!(sheets.courses.len(), 2);
    }

    #[test]
    fn instructors_get_the_configured_role() {
        let sheets = PublishSheets::build(&merged(), &supervisors(), None, &campus(), &options());
        assert_eq!(sheets.course_instructors.len(), 2);
        assert!(!sheets.instructors.contains_key("200"));
        assert_eq!(&sheets.instructors.get("300").unwrap()[InstructorsColumn::BlueRole], "23");
    }

    #[test]
    fn previous_term_fills_gaps_without_overwriting() {
        let sheets = PublishSheets::build(&merged(), &supervisors(), Some(&previous()), &campus(), &options());
        assert!(sheets.course_instructors.contains_key("2014-D-11111-400"));
        assert_eq!(sheets.course_instructors.len(), 3);
        let ann = sheets.instructors.get("100").unwrap();
        assert_eq!(&ann[InstructorsColumn::FirstName], "Ann");
        assert_eq!(&ann[InstructorsColumn::LastName], "Zed");
        assert_eq!(&ann[InstructorsColumn::EmailAddress], "ann@example.edu");
        assert_eq!(&sheets.instructors.get("400").unwrap()[InstructorsColumn::FirstName], "Old");
    }

    #[test]
    fn supervisors_build_both_hierarchies() {
        let sheets = PublishSheets::build(&merged(), &supervisors(), None, &campus(), &options());
        assert_eq!(sheets.course_supervisors.len(), 2);
        assert_eq!(&sheets.course_supervisors.get("2015-B-34821-900").unwrap()[CourseSupervisorsColumn::DeptName], "GWS");

        let nodes: Vec<(&str, &str)> = sheets
            .department_hierarchy
            .iter()
            .map(|n| (n.get(DepartmentHierarchyColumn::NodeId), n.get(DepartmentHierarchyColumn::Level)))
            .collect();
        assert_eq!(nodes, vec![("UC Berkeley", "1"), ("GWS", "2"), ("LGBT", "2")]);
        assert_eq!(&sheets.department_hierarchy.get("GWS").unwrap()[DepartmentHierarchyColumn::ParentNodeId], "UC Berkeley");

        let viewers: Vec<&str> = sheets.report_viewer_hierarchy.iter().map(|r| r.get(ReportViewerHierarchyColumn::RoleId)).collect();
        assert_eq!(viewers, vec!["DEPT_ADMIN", "DEPT_ADMIN"]);
    }

    #[test]
    fn row_errors_are_logged_per_sheet() {
        let sheets = PublishSheets::build(&merged(), &supervisors(), None, &campus(), &options());
        let mut log = ValidationLog::default();
        sheets.validate(&mut log);
        assert_eq!(log.messages("instructors", "100"), vec!["Blank EMAIL_ADDRESS"]);
        assert_eq!(log.keys("courses"), Vec::<&str>::new());
    }

    #[test]
    fn writes_every_sheet() {
        let fs = MemoryFs::default();
        let sheets = PublishSheets::build(&merged(), &supervisors(), None, &campus(), &options());
        let dir = Path::new("out/2015-B/publish_20150309_080000");
        let paths = sheets.write(&fs, dir).unwrap();
        assert_eq!(paths.len(), 9);
        let courses = fs.file(dir.join("courses.csv")).unwrap();
        assert!(courses.starts_with("COURSE_ID,COURSE_ID_2,COURSE_NAME"));
        assert!(fs.file(dir.join("report_viewer_hierarchy.csv")).is_some());
    }

    #[test]
    fn written_files_keep_plain_values() {
        let fs = MemoryFs::default();
        let sheets = PublishSheets::build(&merged(), &supervisors(), None, &campus(), &options());
        let dir = Path::new("out");
        sheets.write(&fs, dir).unwrap();

        let instructors = fs.file(dir.join("instructors.csv")).unwrap();
        assert!(instructors.contains("\n100,UID:100,Ann,Zed,,23\n"));
        assert!(instructors.contains("\n300,UID:300,Gus,Zed,gus@example.edu,23\n"));
        assert!(!instructors.contains('\''));
        assert_eq!(fs.file(dir.join("supervisors.csv")).unwrap(), SUPERVISORS_CSV);
    }
}
