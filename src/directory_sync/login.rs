//! Login identifier parsing.

use std::sync::LazyLock;

use regex::Regex;

static LOGIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(inactive-)?([0-9]+)$").expect("valid regex"));

/// A login identifier that names a campus person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLogin {
    /// Numeric campus ID.
    pub uid: String,
    /// Login carries the `inactive-` prefix.
    pub inactive: bool,
}

/// Parses `12345` or `inactive-12345`. Anything else is a service or
/// guest login and yields `None`.
#[must_use]
pub fn parse_login_id(login_id: &str) -> Option<ParsedLogin> {
    let captures = LOGIN_ID.captures(login_id)?;
    Some(ParsedLogin { uid: captures[2].to_string(), inactive: captures.get(1).is_some() })
}

/// Strips a leading `inactive-` so filters can be matched against bare IDs.
#[must_use]
pub fn sanitize_login_id(login_id: &str) -> &str {
    login_id.strip_prefix("inactive-").unwrap_or(login_id)
}
