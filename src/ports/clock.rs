//! Wall-clock access.
//!
//! Stashed users reports, import sheets and publish folders are all named
//! after the moment they were produced, so tests pin this port to a fixed
//! instant.

use chrono::{DateTime, Utc};

/// Source of export timestamps.
pub trait Clock: Send + Sync {
    /// Now, in UTC.
    fn now(&self) -> DateTime<Utc>;
}
