//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::adapters::live::campus::LiveCampusData;
use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::directory::LiveDirectoryApi;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::recording::{
    RecordingCampusData, RecordingClock, RecordingDirectoryApi, RecordingFileSystem,
    RecordingIdGenerator,
};
use crate::adapters::replaying::{
    ReplayingCampusData, ReplayingClock, ReplayingDirectoryApi, ReplayingFileSystem,
    ReplayingIdGenerator,
};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::config::Settings;
use crate::error::BoxError;
use crate::ports::{
    CampusData, CampusPerson, Clock, CommunicationChannel, DirectoryApi, Enrollment, FileSystem,
    IdGenerator, Login,
};

/// Bundles all port trait objects into a single context.
///
/// Pipelines receive one of these and never construct adapters themselves.
pub struct ServiceContext {
    /// Clock for timestamps in file names and output folders.
    pub clock: Box<dyn Clock>,
    /// Filesystem for reading inputs and writing sheets.
    pub fs: Box<dyn FileSystem>,
    /// Remote account directory.
    pub directory: Box<dyn DirectoryApi>,
    /// Authoritative campus data.
    pub campus: Box<dyn CampusData>,
    /// Run ID generator.
    pub id_gen: Box<dyn IdGenerator>,
}

fn live_directory(settings: &Settings) -> Result<LiveDirectoryApi, String> {
    LiveDirectoryApi::new(&settings.directory)
        .map_err(|e| format!("Failed to start directory client: {e}"))
}

impl ServiceContext {
    /// Creates a context with live adapters for every port.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory client cannot be started.
    pub fn live(settings: &Settings) -> Result<Self, String> {
        Ok(Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            directory: Box::new(live_directory(settings)?),
            campus: Box::new(LiveCampusData::new(&settings.campus.export_dir)),
            id_gen: Box::new(LiveIdGenerator),
        })
    }

    /// Creates a live context whose ports record to per-port cassettes
    /// under `<base_dir>/<timestamp>/`.
    ///
    /// The returned session must be finished after the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory or directory client
    /// cannot be created.
    pub fn recording_at(
        base_dir: PathBuf,
        settings: &Settings,
    ) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(&base_dir)?;
        let ctx = Self {
            clock: Box::new(RecordingClock::new(Box::new(LiveClock), Arc::clone(&session.clock))),
            fs: Box::new(RecordingFileSystem::new(
                Box::new(LiveFileSystem),
                Arc::clone(&session.fs),
            )),
            directory: Box::new(RecordingDirectoryApi::new(
                Box::new(live_directory(settings)?),
                Arc::clone(&session.directory),
            )),
            campus: Box::new(RecordingCampusData::new(
                Box::new(LiveCampusData::new(&settings.campus.export_dir)),
                Arc::clone(&session.campus),
            )),
            id_gen: Box::new(RecordingIdGenerator::new(
                Box::new(LiveIdGenerator),
                Arc::clone(&session.id_gen),
            )),
        };
        Ok((ctx, session))
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a cassette use an adapter that panics with a clear
    /// message when called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;
        Ok(Self {
            clock: match replayers.clock {
                Some(r) => Box::new(ReplayingClock::new(r)),
                None => Box::new(PanickingClock),
            },
            fs: match replayers.fs {
                Some(r) => Box::new(ReplayingFileSystem::new(r)),
                None => Box::new(PanickingFileSystem),
            },
            directory: match replayers.directory {
                Some(r) => Box::new(ReplayingDirectoryApi::new(r)),
                None => Box::new(PanickingDirectoryApi),
            },
            campus: match replayers.campus {
                Some(r) => Box::new(ReplayingCampusData::new(r)),
                None => Box::new(PanickingCampusData),
            },
            id_gen: match replayers.id_gen {
                Some(r) => Box::new(ReplayingIdGenerator::new(r)),
                None => Box::new(PanickingIdGenerator),
            },
        })
    }

    /// Replays a directory written by [`ServiceContext::recording_at`].
    ///
    /// # Errors
    ///
    /// Returns an error if a cassette in `dir` cannot be read or parsed.
    pub fn replaying_dir(dir: &Path) -> Result<Self, String> {
        Self::replaying_from(&CassetteConfig::from_dir(dir))
    }
}

// Panicking adapters for ports without a cassette.

fn unconfigured(port: &str) -> ! {
    panic!("{port} port not configured in CassetteConfig: no cassette loaded for it");
}

struct PanickingClock;
impl Clock for PanickingClock {
    fn now(&self) -> DateTime<Utc> {
        unconfigured("clock")
    }
}

struct PanickingFileSystem;
impl FileSystem for PanickingFileSystem {
    fn read_to_string(&self, _path: &Path) -> Result<String, BoxError> {
        unconfigured("fs")
    }
    fn write(&self, _path: &Path, _contents: &str) -> Result<(), BoxError> {
        unconfigured("fs")
    }
    fn exists(&self, _path: &Path) -> bool {
        unconfigured("fs")
    }
    fn list_dir(&self, _path: &Path) -> Result<Vec<String>, BoxError> {
        unconfigured("fs")
    }
}

struct PanickingDirectoryApi;
impl DirectoryApi for PanickingDirectoryApi {
    fn users_report(&self) -> Result<String, BoxError> {
        unconfigured("directory")
    }
    fn list_logins(&self, _user_ref: &str) -> Result<Vec<Login>, BoxError> {
        unconfigured("directory")
    }
    fn change_login_sis_id(&self, _login_id: u64, _sis_user_id: &str) -> Result<(), BoxError> {
        unconfigured("directory")
    }
    fn list_communication_channels(
        &self,
        _user_ref: &str,
    ) -> Result<Vec<CommunicationChannel>, BoxError> {
        unconfigured("directory")
    }
    fn delete_communication_channel(&self, _user_ref: &str, _channel_id: u64) -> Result<(), BoxError> {
        unconfigured("directory")
    }
    fn sis_import(&self, _csv: &str) -> Result<(), BoxError> {
        unconfigured("directory")
    }
}

struct PanickingCampusData;
impl CampusData for PanickingCampusData {
    fn attributes_for_uids(&self, _uids: &[String]) -> Result<Vec<CampusPerson>, BoxError> {
        unconfigured("campus")
    }
    fn enrollments(&self, _term: &str, _section_ids: &[String]) -> Result<Vec<Enrollment>, BoxError> {
        unconfigured("campus")
    }
}

struct PanickingIdGenerator;
impl IdGenerator for PanickingIdGenerator {
    fn generate_id(&self) -> String {
        unconfigured("id_gen")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use serde_json::json;

    fn write_cassette(path: &Path, port: &str, method: &str, output: serde_json::Value) {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            recorded_with: "0.1.0".into(),
            interactions: vec![Interaction {
                seq: 0,
                port: port.into(),
                method: method.into(),
                input: json!({}),
                output,
            }],
        };
        std::fs::write(path, serde_yaml::to_string(&cassette).unwrap()).unwrap();
    }

    #[test]
    fn replays_a_recording_directory() {
        let dir = std::env::temp_dir().join("campus_sync_ctx_replay_dir");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        write_cassette(&dir.join("clock.cassette.yaml"), "clock", "now", json!("2015-03-09T08:00:00Z"));
        write_cassette(&dir.join("id_gen.cassette.yaml"), "id_gen", "generate_id", json!("run-1"));

        let ctx = ServiceContext::replaying_dir(&dir).unwrap();
        assert_eq!(ctx.clock.now().to_rfc3339(), "2015-03-09T08:00:00+00:00");
        assert_eq!(ctx.id_gen.generate_id(), "run-1");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[should_panic(expected = "not configured in CassetteConfig")]
    fn unconfigured_port_panics_with_clear_message() {
        let ctx = ServiceContext::replaying_from(&CassetteConfig::default()).unwrap();
        let _ = ctx.directory.users_report();
    }
}
