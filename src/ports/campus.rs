//! Authoritative campus data port.

use serde::{Deserialize, Serialize};

use crate::error::BoxError;

/// Basic attributes of one person in the campus feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusPerson {
    /// Numeric campus ID.
    pub ldap_uid: String,
    /// Student ID, when the person has one.
    #[serde(default)]
    pub student_id: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Official email.
    #[serde(default)]
    pub email: Option<String>,
    /// Alternate email.
    #[serde(default)]
    pub alternate_email: Option<String>,
    /// Account has expired.
    #[serde(default)]
    pub expired: bool,
    /// Currently a student.
    #[serde(default)]
    pub student: bool,
}

impl CampusPerson {
    /// SIS user ID for this person: the student ID for students who have
    /// one, `UID:<ldap_uid>` otherwise.
    #[must_use]
    pub fn sis_user_id(&self) -> String {
        match self.student_id.as_deref().map(str::trim) {
            Some(id) if self.student && !id.is_empty() => id.to_string(),
            _ => format!("UID:{}", self.ldap_uid),
        }
    }
}

/// One student enrolled in one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Section CCN.
    pub section_id: String,
    /// Student campus ID.
    pub ldap_uid: String,
    /// Student SIS ID.
    #[serde(default)]
    pub sis_id: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Email.
    #[serde(default)]
    pub email: String,
}

/// Source of record for people and enrollments.
pub trait CampusData: Send + Sync {
    /// Basic attributes for the given campus IDs. Unknown IDs are omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be queried.
    fn attributes_for_uids(&self, uids: &[String]) -> Result<Vec<CampusPerson>, BoxError>;

    /// Enrollments of a term restricted to the given section CCNs.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be queried.
    fn enrollments(&self, term: &str, section_ids: &[String]) -> Result<Vec<Enrollment>, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn students_use_their_student_id() {
        let person = CampusPerson {
            ldap_uid: "100008".into(),
            student_id: Some("2345678".into()),
            student: true,
            ..CampusPerson::default()
        };
        assert_eq!(person.sis_user_id(), "2345678");
    }

    #[test]
    fn others_use_uid_reference() {
        let person = CampusPerson {
            ldap_uid: "100008".into(),
            student_id: Some("2345678".into()),
            ..CampusPerson::default()
        };
        assert_eq!(person.sis_user_id(), "UID:100008");
    }
}
