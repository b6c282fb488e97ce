//! Live adapter for the `DirectoryApi` port using the Canvas REST API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::runtime::Runtime;

use crate::config::DirectorySettings;
use crate::error::BoxError;
use crate::ports::{CommunicationChannel, DirectoryApi, Login};

/// Status polls before a users report is abandoned.
const MAX_REPORT_POLLS: u32 = 120;

/// Directory client that calls the Canvas API.
///
/// Calls are blocking from the caller's point of view; each one runs to
/// completion on a private single-threaded runtime.
pub struct LiveDirectoryApi {
    client: Client,
    runtime: Runtime,
    base_url: String,
    account_id: String,
    api_token: Option<String>,
    poll_interval: Duration,
}

/// Provisioning report status returned by the reports endpoint.
#[derive(Deserialize)]
struct ReportStatus {
    id: u64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    attachment: Option<ReportAttachment>,
}

#[derive(Deserialize)]
struct ReportAttachment {
    url: String,
}

/// Error body returned by the API.
#[derive(Deserialize)]
struct ApiErrors {
    errors: Vec<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl LiveDirectoryApi {
    /// Creates a client for the configured directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be built.
    pub fn new(settings: &DirectorySettings) -> Result<Self, BoxError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            client: Client::new(),
            runtime,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            account_id: settings.account_id.clone(),
            api_token: settings.api_token.clone(),
            poll_interval: Duration::from_secs(settings.report_poll_seconds),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, BoxError> {
        let token = self
            .api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or("no directory API token configured (set CANVAS_API_TOKEN)")?;
        Ok(request.bearer_auth(token))
    }

    async fn send_text(&self, request: RequestBuilder, operation: &str) -> Result<String, BoxError> {
        let response = self
            .authorized(request)?
            .send()
            .await
            .map_err(|e| -> BoxError { format!("{operation} request failed: {e}").into() })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| -> BoxError { format!("{operation}: failed to read response: {e}").into() })?;
        if !status.is_success() {
            let msg = serde_json::from_str::<ApiErrors>(&body)
                .ok()
                .and_then(|e| e.errors.into_iter().next())
                .map_or(body, |e| e.message);
            return Err(format!("{operation} failed ({}): {msg}", status.as_u16()).into());
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<T, BoxError> {
        let body = self.send_text(request, operation).await?;
        serde_json::from_str(&body)
            .map_err(|e| format!("{operation}: failed to parse response: {e}").into())
    }

    async fn fetch_users_report(&self) -> Result<String, BoxError> {
        let reports = format!("accounts/{}/reports/provisioning_csv", self.account_id);
        let mut report: ReportStatus = self
            .send_json(
                self.client.post(self.url(&reports)).form(&[("parameters[users]", "true")]),
                "start users report",
            )
            .await?;
        log::info!("Requested users report {}", report.id);

        for _ in 0..MAX_REPORT_POLLS {
            match report.status.as_str() {
                "complete" => {
                    let attachment =
                        report.attachment.ok_or("users report completed without attachment")?;
                    return self
                        .send_text(self.client.get(&attachment.url), "download users report")
                        .await;
                }
                "error" | "deleted" => {
                    return Err(format!("users report {} ended with {}", report.id, report.status).into());
                }
                _ => {}
            }
            tokio::time::sleep(self.poll_interval).await;
            let status_path = format!("{reports}/{}", report.id);
            report = self
                .send_json(self.client.get(self.url(&status_path)), "poll users report")
                .await?;
        }
        Err(format!("users report {} did not complete", report.id).into())
    }
}

impl DirectoryApi for LiveDirectoryApi {
    fn users_report(&self) -> Result<String, BoxError> {
        self.runtime.block_on(self.fetch_users_report())
    }

    fn list_logins(&self, user_ref: &str) -> Result<Vec<Login>, BoxError> {
        let request = self.client.get(self.url(&format!("users/{user_ref}/logins")));
        self.runtime.block_on(self.send_json(request, "list logins"))
    }

    fn change_login_sis_id(&self, login_id: u64, sis_user_id: &str) -> Result<(), BoxError> {
        let path = format!("accounts/{}/logins/{login_id}", self.account_id);
        let request =
            self.client.put(self.url(&path)).form(&[("login[sis_user_id]", sis_user_id)]);
        self.runtime.block_on(self.send_text(request, "change login SIS ID")).map(|_| ())
    }

    fn list_communication_channels(
        &self,
        user_ref: &str,
    ) -> Result<Vec<CommunicationChannel>, BoxError> {
        let request = self.client.get(self.url(&format!("users/{user_ref}/communication_channels")));
        self.runtime.block_on(self.send_json(request, "list communication channels"))
    }

    fn delete_communication_channel(&self, user_ref: &str, channel_id: u64) -> Result<(), BoxError> {
        let path = format!("users/{user_ref}/communication_channels/{channel_id}");
        let request = self.client.delete(self.url(&path));
        self.runtime.block_on(self.send_text(request, "delete communication channel")).map(|_| ())
    }

    fn sis_import(&self, csv: &str) -> Result<(), BoxError> {
        let path = format!("accounts/{}/sis_imports", self.account_id);
        let request = self
            .client
            .post(self.url(&path))
            .query(&[("import_type", "instructure_csv"), ("extension", "csv")])
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(csv.to_string());
        self.runtime.block_on(self.send_text(request, "SIS import")).map(|_| ())
    }
}
