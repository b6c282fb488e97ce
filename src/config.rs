//! Run settings loaded from YAML with environment overrides.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "CAMPUS_SYNC_CONFIG";
/// Settings file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "campus-sync.yaml";

/// All settings for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remote account directory.
    pub directory: DirectorySettings,
    /// Account reconciliation knobs.
    pub sync: SyncSettings,
    /// Authoritative campus exports.
    pub campus: CampusSettings,
    /// Course evaluation pipeline.
    pub oec: OecSettings,
}

/// Connection settings for the account directory API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    /// API root, e.g. `https://bcourses.example.edu`.
    pub base_url: String,
    /// Root account holding provisioned users.
    pub account_id: String,
    /// Bearer token. Usually supplied through `CANVAS_API_TOKEN`.
    pub api_token: Option<String>,
    /// Delay between users report status polls.
    pub report_poll_seconds: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            account_id: "1".into(),
            api_token: None,
            report_poll_seconds: 10,
        }
    }
}

/// Reconciliation behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Compute changes but never apply them.
    pub dry_run: bool,
    /// Delete stale email channels of departing users.
    pub delete_bad_emails: bool,
    /// Inactivate accounts whose owner left the campus feed.
    pub inactivate_expired_users: bool,
    /// Treat display-name differences as changes.
    pub maintain_user_names: bool,
    /// Submit SIS ID changes as an import sheet instead of API calls.
    pub import_via_csv: bool,
    /// Use a person's alternate email when present.
    pub prefer_alternate_email: bool,
    /// Accounts compared per campus lookup.
    pub batch_size: usize,
    /// IDs never inactivated.
    pub whitelist: Vec<String>,
    /// Where users reports and import sheets are stashed.
    pub export_dir: PathBuf,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            delete_bad_emails: false,
            inactivate_expired_users: false,
            maintain_user_names: false,
            import_via_csv: false,
            prefer_alternate_email: false,
            batch_size: 1000,
            whitelist: Vec::new(),
            export_dir: PathBuf::from("tmp/canvas"),
        }
    }
}

/// Location of the campus data exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampusSettings {
    /// Directory holding `people.csv` and `enrollments.csv`.
    pub export_dir: PathBuf,
}

impl Default for CampusSettings {
    fn default() -> Self {
        Self { export_dir: PathBuf::from("tmp/campus") }
    }
}

/// Course evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OecSettings {
    /// Root of per-term output folders.
    pub export_dir: PathBuf,
    /// Default evaluation window start, `MM-DD-YYYY`.
    pub term_start: Option<String>,
    /// Default evaluation window end, `MM-DD-YYYY`.
    pub term_end: Option<String>,
    /// Largest gap in days between two date ranges of one instructor that
    /// still counts as a single meeting period.
    pub adjacency_days: i64,
    /// Caption of the department hierarchy root node.
    pub hierarchy_root: String,
    /// `BLUE_ROLE` assigned to instructors.
    pub instructor_role: String,
    /// IDs looked up per campus query during back-fill.
    pub batch_size: usize,
}

impl Default for OecSettings {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("tmp/oec"),
            term_start: None,
            term_end: None,
            adjacency_days: 1,
            hierarchy_root: "UC Berkeley".into(),
            instructor_role: "23".into(),
            batch_size: 1000,
        }
    }
}

impl Settings {
    /// Loads settings from `$CAMPUS_SYNC_CONFIG` (or `campus-sync.yaml`),
    /// falling back to defaults when the file is absent, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_ENV).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let mut settings = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| Error::Config {
                message: format!("cannot read {}: {e}", path.display()),
            })?;
            Self::from_yaml(&text)?
        } else {
            log::debug!("No settings file at {}; using defaults", path.display());
            Self::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Parses settings from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed YAML or unknown value types.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| Error::Config { message: e.to_string() })
    }

    fn apply_env(&mut self) {
        if let Ok(token) = env::var("CANVAS_API_TOKEN") {
            self.directory.api_token = Some(token);
        }
        if let Ok(url) = env::var("CANVAS_BASE_URL") {
            self.directory.base_url = url;
        }
    }
}
