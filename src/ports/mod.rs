//! Port traits defining external boundaries.
//!
//! Each trait is one system the pipelines talk to: the clock, the local
//! filesystem, the remote account directory, the authoritative campus data
//! source, and run ID generation. Implementations live in `src/adapters/`.

pub mod campus;
pub mod clock;
pub mod directory;
pub mod filesystem;
pub mod id_gen;

pub use campus::{CampusData, CampusPerson, Enrollment};
pub use clock::Clock;
pub use directory::{CommunicationChannel, DirectoryApi, Login};
pub use filesystem::FileSystem;
pub use id_gen::IdGenerator;
