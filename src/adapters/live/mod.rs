//! Live adapters for real external interactions.

pub mod campus;
pub mod clock;
pub mod directory;
pub mod filesystem;
pub mod id_gen;
