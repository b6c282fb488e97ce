//! Replaying adapter for the `FileSystem` port.

use std::path::Path;
use std::sync::Mutex;

use super::{next_output, replay_result, replay_value};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::BoxError;
use crate::ports::FileSystem;

/// Serves recorded filesystem results. Writes are not performed.
pub struct ReplayingFileSystem {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingFileSystem {
    /// Creates a filesystem backed by `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl FileSystem for ReplayingFileSystem {
    fn read_to_string(&self, _path: &Path) -> Result<String, BoxError> {
        replay_result(next_output(&self.replayer, "fs", "read_to_string"), "fs::read_to_string")
    }

    fn write(&self, _path: &Path, _contents: &str) -> Result<(), BoxError> {
        replay_result(next_output(&self.replayer, "fs", "write"), "fs::write")
    }

    fn exists(&self, _path: &Path) -> bool {
        replay_value(next_output(&self.replayer, "fs", "exists"), "fs::exists")
    }

    fn list_dir(&self, _path: &Path) -> Result<Vec<String>, BoxError> {
        replay_result(next_output(&self.replayer, "fs", "list_dir"), "fs::list_dir")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::replayer_with;
    use serde_json::json;

    #[test]
    fn replays_reads_writes_and_errors() {
        let fs = ReplayingFileSystem::new(replayer_with(vec![
            ("fs", "read_to_string", json!({"Ok": "COURSE_ID\n"})),
            ("fs", "read_to_string", json!({"Err": "cannot read /x: not found"})),
            ("fs", "write", json!({"Ok": null})),
            ("fs", "exists", json!(false)),
        ]));
        assert_eq!(fs.read_to_string(Path::new("/a")).unwrap(), "COURSE_ID\n");
        assert!(fs.read_to_string(Path::new("/x")).unwrap_err().to_string().contains("not found"));
        assert!(fs.write(Path::new("/b"), "x").is_ok());
        assert!(!fs.exists(Path::new("/c")));
    }
}
