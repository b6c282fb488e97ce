//! Replaying adapter for the `DirectoryApi` port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::BoxError;
use crate::ports::{CommunicationChannel, DirectoryApi, Login};

/// Serves recorded directory responses.
pub struct ReplayingDirectoryApi {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingDirectoryApi {
    /// Creates a directory backed by `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn replay<T: serde::de::DeserializeOwned>(&self, method: &str) -> Result<T, BoxError> {
        replay_result(next_output(&self.replayer, "directory", method), method)
    }
}

impl DirectoryApi for ReplayingDirectoryApi {
    fn users_report(&self) -> Result<String, BoxError> {
        self.replay("users_report")
    }

    fn list_logins(&self, _user_ref: &str) -> Result<Vec<Login>, BoxError> {
        self.replay("list_logins")
    }

    fn change_login_sis_id(&self, _login_id: u64, _sis_user_id: &str) -> Result<(), BoxError> {
        self.replay("change_login_sis_id")
    }

    fn list_communication_channels(
        &self,
        _user_ref: &str,
    ) -> Result<Vec<CommunicationChannel>, BoxError> {
        self.replay("list_communication_channels")
    }

    fn delete_communication_channel(&self, _user_ref: &str, _channel_id: u64) -> Result<(), BoxError> {
        self.replay("delete_communication_channel")
    }

    fn sis_import(&self, _csv: &str) -> Result<(), BoxError> {
        self.replay("sis_import")
    }
}
