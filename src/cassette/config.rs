//! Per-port cassette selection for replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Cassette file for each port. Ports left `None` panic when called
/// during replay.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Clock cassette.
    pub clock: Option<PathBuf>,
    /// Filesystem cassette.
    pub fs: Option<PathBuf>,
    /// Account directory cassette.
    pub directory: Option<PathBuf>,
    /// Campus data cassette.
    pub campus: Option<PathBuf>,
    /// Run ID cassette.
    pub id_gen: Option<PathBuf>,
}

/// Loaded replayers, one per configured port.
#[derive(Debug, Default)]
pub struct PortReplayers {
    /// Clock replayer.
    pub clock: Option<CassetteReplayer>,
    /// Filesystem replayer.
    pub fs: Option<CassetteReplayer>,
    /// Account directory replayer.
    pub directory: Option<CassetteReplayer>,
    /// Campus data replayer.
    pub campus: Option<CassetteReplayer>,
    /// Run ID replayer.
    pub id_gen: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Picks up `<port>.cassette.yaml` files present in a recording directory.
    #[must_use]
    pub fn from_dir(dir: &Path) -> Self {
        let find = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            path.exists().then_some(path)
        };
        Self {
            clock: find("clock"),
            fs: find("fs"),
            directory: find("directory"),
            campus: find("campus"),
            id_gen: find("id_gen"),
        }
    }

    /// Reads and parses one cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cassette(path: &Path) -> Result<Cassette, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
    }

    fn load_replayer(path: &Path) -> Result<CassetteReplayer, String> {
        Self::load_cassette(path).map(|cassette| CassetteReplayer::new(&cassette))
    }

    /// Loads every configured cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        let load = |path: &Option<PathBuf>| path.as_deref().map(Self::load_replayer).transpose();
        Ok(PortReplayers {
            clock: load(&self.clock)?,
            fs: load(&self.fs)?,
            directory: load(&self.directory)?,
            campus: load(&self.campus)?,
            id_gen: load(&self.id_gen)?,
        })
    }
}
