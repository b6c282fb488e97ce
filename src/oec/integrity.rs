//! Cross-sheet consistency checks run before upload.

use std::collections::HashSet;

use log::{info, warn};

use super::publish::PublishSheets;
use crate::worksheet::oec::{
    split_course_id, CoursePersonColumn, CourseSupervisorsColumn, CoursesColumn, InstructorsColumn, StudentsColumn,
    SupervisorsColumn,
};

/// Every mismatch between junction sheets and the sheets they refer to.
///
/// Course references are checked only for course IDs of `term`, since
/// carried-over pairings point at courses published in earlier terms.
#[must_use]
pub fn check(sheets: &PublishSheets, term: &str) -> Vec<String> {
    let courses: HashSet<&str> = sheets.courses.iter().map(|r| r.get(CoursesColumn::CourseId)).collect();
    let instructors: HashSet<&str> = sheets.instructors.iter().map(|r| r.get(InstructorsColumn::LdapUid)).collect();
    let students: HashSet<&str> = sheets.students.iter().map(|r| r.get(StudentsColumn::LdapUid)).collect();
    let supervisors: HashSet<&str> = sheets.supervisors.iter().map(|r| r.get(SupervisorsColumn::LdapUid)).collect();
    let in_term = |course_id: &str| split_course_id(course_id).is_some_and(|(prefix, _)| prefix == term);

    let mut messages = Vec::new();
    let mut seen = HashSet::new();
    let mut report = |message: String| {
        if seen.insert(message.clone()) {
            messages.push(message);
        }
    };

    let mut taught_by = HashSet::new();
    let mut taught = HashSet::new();
    for row in sheets.course_instructors.iter() {
        let (course_id, uid) = (row.get(CoursePersonColumn::CourseId), row.get(CoursePersonColumn::LdapUid));
        taught_by.insert(uid);
        taught.insert(course_id);
        if in_term(course_id) && !courses.contains(course_id) {
            report(format!("COURSE_ID {course_id} found in course_instructors but not courses"));
        }
        if !instructors.contains(uid) {
            report(format!("LDAP_UID {uid} found in course_instructors but not instructors"));
        }
    }
    for course_id in sheets.courses.iter().map(|r| r.get(CoursesColumn::CourseId)) {
        if in_term(course_id) && !taught.contains(course_id) {
            report(format!("COURSE_ID {course_id} found in courses but not course_instructors"));
        }
    }
    for uid in sheets.instructors.iter().map(|r| r.get(InstructorsColumn::LdapUid)) {
        if !taught_by.contains(uid) {
            report(format!("LDAP_UID {uid} found in instructors but not course_instructors"));
        }
    }

    let mut enrolled = HashSet::new();
    for row in sheets.course_students.iter() {
        let (course_id, uid) = (row.get(CoursePersonColumn::CourseId), row.get(CoursePersonColumn::LdapUid));
        enrolled.insert(uid);
        if in_term(course_id) && !courses.contains(course_id) {
            report(format!("COURSE_ID {course_id} found in course_students but not courses"));
        }
        if !students.contains(uid) {
            report(format!("LDAP_UID {uid} found in course_students but not students"));
        }
    }
    for uid in sheets.students.iter().map(|r| r.get(StudentsColumn::LdapUid)) {
        if !enrolled.contains(uid) {
            report(format!("LDAP_UID {uid} found in students but not course_students"));
        }
    }

    for row in sheets.course_supervisors.iter() {
        let (course_id, uid) = (row.get(CourseSupervisorsColumn::CourseId), row.get(CourseSupervisorsColumn::LdapUid));
        if in_term(course_id) && !courses.contains(course_id) {
            report(format!("COURSE_ID {course_id} found in course_supervisors but not courses"));
        }
        if !supervisors.contains(uid) {
            report(format!("LDAP_UID {uid} found in course_supervisors but not supervisors"));
        }
    }
    messages
}

/// Logs the outcome of [`check`]. Returns whether the sheets agree.
pub fn report(messages: &[String]) -> bool {
    if messages.is_empty() {
        info!("Cross-sheet validation passed");
        return true;
    }
    warn!("Validation failed!");
    for message in messages {
        warn!("  {message}");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worksheet::Row;

    fn pair(course_id: &str, uid: &str) -> Row<CoursePersonColumn> {
        Row::from_pairs([(CoursePersonColumn::CourseId, course_id), (CoursePersonColumn::LdapUid, uid)])
    }

    fn consistent() -> PublishSheets {
        let mut sheets = PublishSheets::default();
        sheets.courses.insert("2015-B-1", Row::from_pairs([(CoursesColumn::CourseId, "2015-B-1")]));
        sheets.course_instructors.insert("2015-B-1-100", pair("2015-B-1", "100"));
        sheets.instructors.insert("100", Row::from_pairs([(InstructorsColumn::LdapUid, "100")]));
        sheets.course_students.insert("2015-B-1-500", pair("2015-B-1", "500"));
        sheets.students.insert("500", Row::from_pairs([(StudentsColumn::LdapUid, "500")]));
        sheets
    }

    #[test]
    fn consistent_sheets_pass() {
        assert!(check(&consistent(), "2015-B").is_empty());
        assert!(report(&check(&consistent(), "2015-B")));
    }

    #[test]
    fn one_missing_student_is_exactly_one_error() {
        let mut sheets = consistent();
        sheets.course_students.insert("2015-B-1-501", pair("2015-B-1", "501"));
        assert_eq!(check(&sheets, "2015-B"), vec!["LDAP_UID 501 found in course_students but not students"]);
    }

    #[test]
    fn orphans_are_reported_in_both_directions() {
        let mut sheets = consistent();
        sheets.instructors.insert("101", Row::from_pairs([(InstructorsColumn::LdapUid, "101")]));
        sheets.course_instructors.insert("2015-B-2-100", pair("2015-B-2", "100"));
        assert_eq!(
            check(&sheets, "2015-B"),
            vec![
                "COURSE_ID 2015-B-2 found in course_instructors but not courses",
                "LDAP_UID 101 found in instructors but not course_instructors",
            ]
        );
        assert!(!report(&check(&sheets, "2015-B")));
    }

    #[test]
    fn courses_without_instructors_are_reported() {
        let mut sheets = consistent();
        sheets.courses.insert("2015-B-3", Row::from_pairs([(CoursesColumn::CourseId, "2015-B-3")]));
        sheets.courses.insert("2014-D-4", Row::from_pairs([(CoursesColumn::CourseId, "2014-D-4")]));
        assert_eq!(check(&sheets, "2015-B"), vec!["COURSE_ID 2015-B-3 found in courses but not course_instructors"]);
    }

    #[test]
    fn earlier_term_courses_are_not_checked() {
        let mut sheets = consistent();
        sheets.course_instructors.insert("2014-D-9-100", pair("2014-D-9", "100"));
        assert!(check(&sheets, "2015-B").is_empty());
    }

    #[test]
    fn repeated_mismatches_are_reported_once() {
        let mut sheets = consistent();
        sheets.course_instructors.insert("2015-B-1-102", pair("2015-B-1", "102"));
        sheets.course_instructors.insert("2015-B-1-102 (2)", pair("2015-B-1", "102"));
        assert_eq!(check(&sheets, "2015-B"), vec!["LDAP_UID 102 found in course_instructors but not instructors"]);
    }

    #[test]
    fn supervisors_must_exist() {
        let mut sheets = consistent();
        sheets.course_supervisors.insert(
            "2015-B-1-900",
            Row::from_pairs([
                (CourseSupervisorsColumn::CourseId, "2015-B-1"),
                (CourseSupervisorsColumn::LdapUid, "900"),
                (CourseSupervisorsColumn::DeptName, "GWS"),
            ]),
        );
        assert_eq!(check(&sheets, "2015-B"), vec!["LDAP_UID 900 found in course_supervisors but not supervisors"]);
    }
}
