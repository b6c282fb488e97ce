//! Live adapter for the `CampusData` port backed by nightly campus exports.
//!
//! The data warehouse drops two delimited files into a directory:
//! `people.csv` and `enrollments.csv`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BoxError;
use crate::ports::{CampusData, CampusPerson, Enrollment};

/// Reads people and enrollments from warehouse export files.
pub struct LiveCampusData {
    export_dir: PathBuf,
}

#[derive(Deserialize)]
struct PersonRecord {
    ldap_uid: String,
    #[serde(default)]
    student_id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    alternate_email: String,
    #[serde(default)]
    expired: String,
    #[serde(default)]
    student: String,
}

#[derive(Deserialize)]
struct EnrollmentRecord {
    term: String,
    section_id: String,
    ldap_uid: String,
    #[serde(default)]
    sis_id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "true" | "1")
}

impl From<PersonRecord> for CampusPerson {
    fn from(r: PersonRecord) -> Self {
        Self {
            ldap_uid: r.ldap_uid,
            student_id: non_blank(r.student_id),
            first_name: r.first_name,
            last_name: r.last_name,
            email: non_blank(r.email),
            alternate_email: non_blank(r.alternate_email),
            expired: flag(&r.expired),
            student: flag(&r.student),
        }
    }
}

impl LiveCampusData {
    /// Creates an adapter reading from `export_dir`.
    #[must_use]
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self { export_dir: export_dir.into() }
    }

    fn reader(&self, name: &str) -> Result<csv::Reader<std::fs::File>, BoxError> {
        let path: &Path = &self.export_dir.join(name);
        csv::Reader::from_path(path).map_err(|e| format!("cannot open {}: {e}", path.display()).into())
    }
}

impl CampusData for LiveCampusData {
    fn attributes_for_uids(&self, uids: &[String]) -> Result<Vec<CampusPerson>, BoxError> {
        let wanted: HashSet<&str> = uids.iter().map(String::as_str).collect();
        let mut people = Vec::new();
        for record in self.reader("people.csv")?.deserialize::<PersonRecord>() {
            let record = record?;
            if wanted.contains(record.ldap_uid.as_str()) {
                people.push(record.into());
            }
        }
        Ok(people)
    }

    fn enrollments(&self, term: &str, section_ids: &[String]) -> Result<Vec<Enrollment>, BoxError> {
        let wanted: HashSet<&str> = section_ids.iter().map(String::as_str).collect();
        let mut enrollments = Vec::new();
        for record in self.reader("enrollments.csv")?.deserialize::<EnrollmentRecord>() {
            let r = record?;
            if r.term == term && wanted.contains(r.section_id.as_str()) {
                enrollments.push(Enrollment {
                    section_id: r.section_id,
                    ldap_uid: r.ldap_uid,
                    sis_id: r.sis_id,
                    first_name: r.first_name,
                    last_name: r.last_name,
                    email: r.email,
                });
            }
        }
        Ok(enrollments)
    }
}
