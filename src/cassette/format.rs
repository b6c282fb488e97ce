//! Cassette file layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One call made through a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the recording.
    pub seq: u64,
    /// Port name (`directory`, `campus`, `fs`, ...).
    pub port: String,
    /// Method invoked on the port.
    pub method: String,
    /// Arguments as JSON.
    pub input: serde_json::Value,
    /// Return value as JSON; fallible methods use `{"Ok": v}` / `{"Err": msg}`.
    pub output: serde_json::Value,
}

/// A recorded session of one port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Session and port name.
    pub name: String,
    /// When recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Crate version that made the recording.
    pub recorded_with: String,
    /// Calls in the order they were made.
    pub interactions: Vec<Interaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cassette_yaml_keeps_result_envelopes() {
        let cassette = Cassette {
            name: "2015-03-09-directory".into(),
            recorded_at: Utc::now(),
            recorded_with: "0.1.0".into(),
            interactions: vec![Interaction {
                seq: 0,
                port: "directory".into(),
                method: "list_logins".into(),
                input: json!({"user_ref": "sis_login_id:1001"}),
                output: json!({"Err": "404 Not Found"}),
            }],
        };
        let yaml = serde_yaml::to_string(&cassette).unwrap();
        assert!(yaml.contains("Err: 404 Not Found"));
        let back: Cassette = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, cassette);
    }
}
