//! In-memory port fakes for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::context::ServiceContext;
use crate::error::BoxError;
use crate::ports::{
    CampusData, CampusPerson, Clock, CommunicationChannel, DirectoryApi, Enrollment, FileSystem,
    IdGenerator, Login,
};

/// Files kept in a shared map; clones see the same files.
#[derive(Clone, Default)]
pub struct MemoryFs {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
}

impl MemoryFs {
    pub fn with_file(self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.files.lock().unwrap().insert(path.into(), contents.to_string());
        self
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> Result<String, BoxError> {
        self.file(path).ok_or_else(|| format!("cannot read {}: not found", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), BoxError> {
        self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().keys().any(|p| p.starts_with(path))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, BoxError> {
        let names: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        if names.is_empty() {
            return Err(format!("cannot list {}: not found", path.display()).into());
        }
        Ok(names)
    }
}

/// Campus feed served from memory, remembering which IDs were asked for.
#[derive(Clone, Default)]
pub struct FakeCampus {
    people: Vec<CampusPerson>,
    enrollments: Vec<Enrollment>,
    failure: Option<String>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeCampus {
    pub fn new(people: Vec<CampusPerson>) -> Self {
        Self { people, ..Self::default() }
    }

    pub fn failing(message: &str) -> Self {
        Self { failure: Some(message.to_string()), ..Self::default() }
    }

    pub fn with_enrollments(mut self, enrollments: Vec<Enrollment>) -> Self {
        self.enrollments = enrollments;
        self
    }

    pub fn requested_uids(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl CampusData for FakeCampus {
    fn attributes_for_uids(&self, uids: &[String]) -> Result<Vec<CampusPerson>, BoxError> {
        self.requests.lock().unwrap().extend(uids.iter().cloned());
        if let Some(message) = &self.failure {
            return Err(message.clone().into());
        }
        Ok(self.people.iter().filter(|p| uids.contains(&p.ldap_uid)).cloned().collect())
    }

    fn enrollments(&self, _term: &str, section_ids: &[String]) -> Result<Vec<Enrollment>, BoxError> {
        if let Some(message) = &self.failure {
            return Err(message.clone().into());
        }
        Ok(self.enrollments.iter().filter(|e| section_ids.contains(&e.section_id)).cloned().collect())
    }
}

/// Directory served from memory; every mutating call is logged.
#[derive(Clone, Default)]
pub struct FakeDirectory {
    report: Option<String>,
    logins: HashMap<String, Vec<Login>>,
    channels: HashMap<String, Vec<CommunicationChannel>>,
    rejected_logins: Vec<u64>,
    import_failure: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeDirectory {
    pub fn with_report(mut self, report: &str) -> Self {
        self.report = Some(report.to_string());
        self
    }

    pub fn with_logins(mut self, user_ref: &str, logins: Vec<Login>) -> Self {
        self.logins.insert(user_ref.to_string(), logins);
        self
    }

    pub fn with_channels(mut self, user_ref: &str, channels: Vec<CommunicationChannel>) -> Self {
        self.channels.insert(user_ref.to_string(), channels);
        self
    }

    pub fn rejecting_login(mut self, login_id: u64) -> Self {
        self.rejected_logins.push(login_id);
        self
    }

    pub fn rejecting_imports(mut self, message: &str) -> Self {
        self.import_failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DirectoryApi for FakeDirectory {
    fn users_report(&self) -> Result<String, BoxError> {
        self.report.clone().ok_or_else(|| "401 Unauthorized".into())
    }

    fn list_logins(&self, user_ref: &str) -> Result<Vec<Login>, BoxError> {
        self.logins.get(user_ref).cloned().ok_or_else(|| format!("404 no user {user_ref}").into())
    }

    fn change_login_sis_id(&self, login_id: u64, sis_user_id: &str) -> Result<(), BoxError> {
        if self.rejected_logins.contains(&login_id) {
            return Err("400 sis_user_id already in use".into());
        }
        self.log(format!("change_login_sis_id {login_id} {sis_user_id}"));
        Ok(())
    }

    fn list_communication_channels(
        &self,
        user_ref: &str,
    ) -> Result<Vec<CommunicationChannel>, BoxError> {
        self.channels.get(user_ref).cloned().ok_or_else(|| format!("404 no user {user_ref}").into())
    }

    fn delete_communication_channel(&self, user_ref: &str, channel_id: u64) -> Result<(), BoxError> {
        self.log(format!("delete_communication_channel {user_ref} {channel_id}"));
        Ok(())
    }

    fn sis_import(&self, csv: &str) -> Result<(), BoxError> {
        if let Some(message) = &self.import_failure {
            return Err(message.clone().into());
        }
        self.log(format!("sis_import {}", csv.lines().next().unwrap_or_default()));
        Ok(())
    }
}

/// Clock stuck at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Numbered run IDs.
#[derive(Default)]
pub struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn generate_id(&self) -> String {
        format!("run-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// 2015-03-09 08:00 UTC.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 3, 9, 8, 0, 0).unwrap()
}

pub fn context(fs: &MemoryFs, directory: &FakeDirectory, campus: &FakeCampus) -> ServiceContext {
    ServiceContext {
        clock: Box::new(FixedClock(fixed_time())),
        fs: Box::new(fs.clone()),
        directory: Box::new(directory.clone()),
        campus: Box::new(campus.clone()),
        id_gen: Box::new(SequentialIds::default()),
    }
}
