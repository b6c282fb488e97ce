//! Replaying adapters: serve recorded outputs instead of calling out.
//!
//! Fallible methods turn a missing or malformed recording into an error;
//! infallible ones (`now`, `exists`, `generate_id`) panic, since they have
//! no way to report it.

pub mod campus;
pub mod clock;
pub mod directory;
pub mod filesystem;
pub mod id_gen;

pub use campus::ReplayingCampusData;
pub use clock::ReplayingClock;
pub use directory::ReplayingDirectoryApi;
pub use filesystem::ReplayingFileSystem;
pub use id_gen::ReplayingIdGenerator;

use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;
use crate::error::BoxError;

/// Takes the next recorded output for `port::method`.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> Result<serde_json::Value, String> {
    replayer.lock().unwrap_or_else(PoisonError::into_inner).next_output(port, method)
}

/// Decodes a `{"Ok": v}` / `{"Err": msg}` envelope.
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: Result<serde_json::Value, String>,
    context: &str,
) -> Result<T, BoxError> {
    let output = output?;
    if let Some(err) = output.get("Err") {
        return Err(err.as_str().unwrap_or("unknown error").to_string().into());
    }
    let value = output.get("Ok").cloned().ok_or_else(|| format!("{context}: no Ok/Err envelope"))?;
    serde_json::from_value(value).map_err(|e| format!("{context}: failed to deserialize: {e}").into())
}

/// Decodes a plain recorded value.
///
/// # Panics
///
/// Panics when the cassette has no matching interaction or the value does
/// not decode.
pub(crate) fn replay_value<T: DeserializeOwned>(
    output: Result<serde_json::Value, String>,
    context: &str,
) -> T {
    let value = output.unwrap_or_else(|e| panic!("{e}"));
    serde_json::from_value(value).unwrap_or_else(|e| panic!("{context}: failed to deserialize: {e}"))
}

#[cfg(test)]
pub(crate) fn replayer_with(
    interactions: Vec<(&str, &str, serde_json::Value)>,
) -> CassetteReplayer {
    use crate::cassette::format::{Cassette, Interaction};

    let cassette = Cassette {
        name: "test".into(),
        recorded_at: chrono::Utc::now(),
        recorded_with: "0.1.0".into(),
        interactions: interactions
            .into_iter()
            .enumerate()
            .map(|(seq, (port, method, output))| Interaction {
                seq: seq as u64,
                port: port.into(),
                method: method.into(),
                input: serde_json::json!({}),
                output,
            })
            .collect(),
    };
    CassetteReplayer::new(&cassette)
}
