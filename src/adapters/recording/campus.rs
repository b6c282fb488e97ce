//! Recording adapter for the `CampusData` port.

use serde::Serialize;

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::error::BoxError;
use crate::ports::{CampusData, CampusPerson, Enrollment};

/// Records every campus lookup.
pub struct RecordingCampusData {
    inner: Box<dyn CampusData>,
    recorder: SharedRecorder,
}

impl RecordingCampusData {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn CampusData>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct UidsInput<'a> {
    uids: &'a [String],
}

#[derive(Serialize)]
struct EnrollmentsInput<'a> {
    term: &'a str,
    section_ids: &'a [String],
}

impl CampusData for RecordingCampusData {
    fn attributes_for_uids(&self, uids: &[String]) -> Result<Vec<CampusPerson>, BoxError> {
        let result = self.inner.attributes_for_uids(uids);
        record_result(&self.recorder, "campus", "attributes_for_uids", &UidsInput { uids }, &result);
        result
    }

    fn enrollments(&self, term: &str, section_ids: &[String]) -> Result<Vec<Enrollment>, BoxError> {
        let result = self.inner.enrollments(term, section_ids);
        let input = EnrollmentsInput { term, section_ids };
        record_result(&self.recorder, "campus", "enrollments", &input, &result);
        result
    }
}
