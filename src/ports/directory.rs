//! Remote account directory port.
//!
//! Users are addressed by a `user_ref`, either a numeric directory ID or a
//! `sis_login_id:<login>` reference.

use serde::{Deserialize, Serialize};

use crate::error::BoxError;

/// One login object attached to a directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    /// Login object ID.
    pub id: u64,
    /// Login identifier, e.g. `12345` or `inactive-12345`.
    pub unique_id: String,
    /// SIS user ID currently attached to the login.
    #[serde(default)]
    pub sis_user_id: Option<String>,
}

/// A contact method stored for a directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationChannel {
    /// Channel ID.
    pub id: u64,
    /// Channel kind: `email`, `sms`, `push`, ...
    #[serde(rename = "type")]
    pub channel_type: String,
    /// Address or number.
    pub address: String,
}

/// The account directory kept in sync with campus data.
pub trait DirectoryApi: Send + Sync {
    /// Downloads the provisioned users report as delimited text.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be requested or fetched.
    fn users_report(&self) -> Result<String, BoxError>;

    /// Lists the login objects of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn list_logins(&self, user_ref: &str) -> Result<Vec<Login>, BoxError>;

    /// Sets the SIS user ID of a login object.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    fn change_login_sis_id(&self, login_id: u64, sis_user_id: &str) -> Result<(), BoxError>;

    /// Lists the communication channels of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn list_communication_channels(
        &self,
        user_ref: &str,
    ) -> Result<Vec<CommunicationChannel>, BoxError>;

    /// Deletes one communication channel of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    fn delete_communication_channel(&self, user_ref: &str, channel_id: u64) -> Result<(), BoxError>;

    /// Submits an import sheet (users or SIS ID changes).
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected.
    fn sis_import(&self, csv: &str) -> Result<(), BoxError>;
}
