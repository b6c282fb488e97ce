//! Recording adapter for the `DirectoryApi` port.

use serde::Serialize;

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::error::BoxError;
use crate::ports::{CommunicationChannel, DirectoryApi, Login};

/// Records every directory call and its outcome.
pub struct RecordingDirectoryApi {
    inner: Box<dyn DirectoryApi>,
    recorder: SharedRecorder,
}

impl RecordingDirectoryApi {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn DirectoryApi>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct UserInput<'a> {
    user_ref: &'a str,
}

#[derive(Serialize)]
struct ChangeSisIdInput<'a> {
    login_id: u64,
    sis_user_id: &'a str,
}

#[derive(Serialize)]
struct DeleteChannelInput<'a> {
    user_ref: &'a str,
    channel_id: u64,
}

#[derive(Serialize)]
struct ImportInput<'a> {
    csv: &'a str,
}

impl DirectoryApi for RecordingDirectoryApi {
    fn users_report(&self) -> Result<String, BoxError> {
        let result = self.inner.users_report();
        record_result(&self.recorder, "directory", "users_report", &(), &result);
        result
    }

    fn list_logins(&self, user_ref: &str) -> Result<Vec<Login>, BoxError> {
        let result = self.inner.list_logins(user_ref);
        record_result(&self.recorder, "directory", "list_logins", &UserInput { user_ref }, &result);
        result
    }

    fn change_login_sis_id(&self, login_id: u64, sis_user_id: &str) -> Result<(), BoxError> {
        let result = self.inner.change_login_sis_id(login_id, sis_user_id);
        let input = ChangeSisIdInput { login_id, sis_user_id };
        record_result(&self.recorder, "directory", "change_login_sis_id", &input, &result);
        result
    }

    fn list_communication_channels(
        &self,
        user_ref: &str,
    ) -> Result<Vec<CommunicationChannel>, BoxError> {
        let result = self.inner.list_communication_channels(user_ref);
        let input = UserInput { user_ref };
        record_result(&self.recorder, "directory", "list_communication_channels", &input, &result);
        result
    }

    fn delete_communication_channel(&self, user_ref: &str, channel_id: u64) -> Result<(), BoxError> {
        let result = self.inner.delete_communication_channel(user_ref, channel_id);
        let input = DeleteChannelInput { user_ref, channel_id };
        record_result(&self.recorder, "directory", "delete_communication_channel", &input, &result);
        result
    }

    fn sis_import(&self, csv: &str) -> Result<(), BoxError> {
        let result = self.inner.sis_import(csv);
        record_result(&self.recorder, "directory", "sis_import", &ImportInput { csv }, &result);
        result
    }
}
