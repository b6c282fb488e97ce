//! Recording adapter for the `Clock` port.

use chrono::{DateTime, Utc};

use super::record_interaction;
use crate::cassette::session::SharedRecorder;
use crate::ports::Clock;

/// Records every clock reading.
pub struct RecordingClock {
    inner: Box<dyn Clock>,
    recorder: SharedRecorder,
}

impl RecordingClock {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn Clock>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        let now = self.inner.now();
        record_interaction(&self.recorder, "clock", "now", &(), &now);
        now
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::live::clock::LiveClock;
    use crate::adapters::recording::{finish_recorder, test_recorder};

    #[test]
    fn records_now() {
        let (recorder, dir) = test_recorder("campus_sync_rec_clock_test");
        {
            let clock = RecordingClock::new(Box::new(LiveClock), Arc::clone(&recorder));
            let _ = clock.now();
        }
        let yaml = finish_recorder(recorder);
        assert!(yaml.contains("port: clock"));
        assert!(yaml.contains("method: now"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
