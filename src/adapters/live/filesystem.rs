//! Live filesystem adapter using `std::fs`.

use std::path::Path;

use crate::error::BoxError;
use crate::ports::FileSystem;

/// Filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, BoxError> {
        std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), BoxError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, contents)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, BoxError> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            if let Some(name) = entry?.file_name().to_str() {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_new_directories_and_lists_sorted() {
        let dir = std::env::temp_dir().join("campus_sync_live_fs_test");
        let _ = std::fs::remove_dir_all(&dir);
        let fs = LiveFileSystem;
        fs.write(&dir.join("b.csv"), "b").unwrap();
        fs.write(&dir.join("a.csv"), "a").unwrap();

        assert_eq!(fs.list_dir(&dir).unwrap(), vec!["a.csv", "b.csv"]);
        assert_eq!(fs.read_to_string(&dir.join("b.csv")).unwrap(), "b");
        assert!(fs.read_to_string(&dir.join("missing.csv")).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
