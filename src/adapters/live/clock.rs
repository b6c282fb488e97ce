//! System time for export stamps.

use chrono::{DateTime, Utc};

use crate::ports::Clock;

/// Reads the host clock.
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory_sync::cache::TIMESTAMP_FORMAT;

    #[test]
    fn stamps_fit_stash_names() {
        let stamp = LiveClock.now().format(TIMESTAMP_FORMAT).to_string();
        let name = crate::directory_sync::cache::users_report_name(&stamp);
        assert!(name.contains(&stamp));
        assert_eq!(stamp.len(), "2015-03-09-08-00".len());
    }
}
