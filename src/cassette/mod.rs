//! YAML cassettes of port interactions for record and replay.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;

/// Ports that can be recorded, in cassette file order.
pub const PORTS: [&str; 5] = ["clock", "fs", "directory", "campus", "id_gen"];
