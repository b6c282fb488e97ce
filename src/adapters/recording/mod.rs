//! Recording adapters: delegate to an inner port and capture each call.

pub mod campus;
pub mod clock;
pub mod directory;
pub mod filesystem;
pub mod id_gen;

pub use campus::RecordingCampusData;
pub use clock::RecordingClock;
pub use directory::RecordingDirectoryApi;
pub use filesystem::RecordingFileSystem;
pub use id_gen::RecordingIdGenerator;

use std::sync::PoisonError;

use serde::Serialize;

use crate::cassette::session::SharedRecorder;

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| serde_json::json!({ "unserializable": e.to_string() }))
}

/// Records a call with a plain return value.
pub(crate) fn record_interaction<I, O>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
    guard.record(port, method, to_json(input), to_json(output));
}

/// Records a fallible call as `{"Ok": v}` or `{"Err": message}`.
pub(crate) fn record_result<T, E, I>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let output = match result {
        Ok(v) => serde_json::json!({ "Ok": to_json(v) }),
        Err(e) => serde_json::json!({ "Err": e.to_string() }),
    };
    let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
    guard.record(port, method, to_json(input), output);
}

#[cfg(test)]
pub(crate) fn test_recorder(name: &str) -> (SharedRecorder, std::path::PathBuf) {
    use std::sync::{Arc, Mutex};

    use crate::cassette::recorder::CassetteRecorder;

    let dir = std::env::temp_dir().join(name);
    let path = dir.join("port.cassette.yaml");
    (Arc::new(Mutex::new(CassetteRecorder::new(path, name))), dir)
}

#[cfg(test)]
pub(crate) fn finish_recorder(recorder: SharedRecorder) -> String {
    let recorder = std::sync::Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
    let path = recorder.finish().unwrap();
    std::fs::read_to_string(path).unwrap()
}
