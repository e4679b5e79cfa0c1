//! API key redaction for URLs, headers and error messages.

use std::{fmt::Display, sync::LazyLock};

use regex::Regex;

/// Marker substituted for every redacted secret.
pub const REDACTED: &str = "***REDACTED***";

static API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"akm-[0-9A-Fa-f-]+").expect("api key pattern is valid")
});

static API_KEY_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([?&]apiKey=)[^&#\s]+").expect("apiKey parameter pattern is valid")
});

/// Replace every API key (`akm-` followed by hex and dashes) with [`REDACTED`].
///
/// All other content is left untouched. Applying it twice yields the same string.
#[must_use]
pub fn sanitize_string(input: &str) -> String {
    API_KEY.replace_all(input, REDACTED).into_owned()
}

/// Redact the value of any `apiKey` query parameter, then any remaining API key.
///
/// Other query parameters, the path and the fragment are preserved.
#[must_use]
pub fn sanitize_url(url: &str) -> String {
    let redacted = API_KEY_PARAM.replace_all(url, format!("${{1}}{REDACTED}"));
    sanitize_string(&redacted)
}

/// Render an error and redact any API key in its message.
#[must_use]
pub fn sanitize_error(err: &dyn Display) -> String {
    sanitize_string(&err.to_string())
}
