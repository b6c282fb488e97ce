//! Replaying adapter for the `CampusData` port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::BoxError;
use crate::ports::{CampusData, CampusPerson, Enrollment};

/// Serves recorded campus lookups.
pub struct ReplayingCampusData {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingCampusData {
    /// Creates a campus source backed by `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl CampusData for ReplayingCampusData {
    fn attributes_for_uids(&self, _uids: &[String]) -> Result<Vec<CampusPerson>, BoxError> {
        replay_result(
            next_output(&self.replayer, "campus", "attributes_for_uids"),
            "campus::attributes_for_uids",
        )
    }

    fn enrollments(&self, _term: &str, _section_ids: &[String]) -> Result<Vec<Enrollment>, BoxError> {
        replay_result(next_output(&self.replayer, "campus", "enrollments"), "campus::enrollments")
    }
}
