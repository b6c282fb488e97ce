//! A recording session: one recorder per port under a timestamped directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Shared recorder handle held by a recording adapter.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

/// Recorders for every port of one run.
pub struct RecordingSession {
    /// Clock recorder.
    pub clock: SharedRecorder,
    /// Filesystem recorder.
    pub fs: SharedRecorder,
    /// Account directory recorder.
    pub directory: SharedRecorder,
    /// Campus data recorder.
    pub campus: SharedRecorder,
    /// Run ID recorder.
    pub id_gen: SharedRecorder,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Starts a session writing to `<base_dir>/<timestamp>/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory already exists or cannot be created.
    pub fn new(base_dir: &Path) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = base_dir.join(&timestamp);
        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let recorder = |port: &str| -> SharedRecorder {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            Arc::new(Mutex::new(CassetteRecorder::new(path, format!("{timestamp}-{port}"))))
        };
        Ok(Self {
            clock: recorder("clock"),
            fs: recorder("fs"),
            directory: recorder("directory"),
            campus: recorder("campus"),
            id_gen: recorder("id_gen"),
            output_dir,
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every cassette. Adapters holding a recorder must be dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorder is still shared or a file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        let recorders = [
            ("clock", self.clock),
            ("fs", self.fs),
            ("directory", self.directory),
            ("campus", self.campus),
            ("id_gen", self.id_gen),
        ];
        for (port, shared) in recorders {
            let recorder = Arc::try_unwrap(shared)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
        }
        Ok(self.output_dir)
    }
}
