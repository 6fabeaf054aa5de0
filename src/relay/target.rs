//! Target resolution.
//!
//! The target comes from the `url` query parameter. It is normalized to carry
//! a scheme, parsed, and has the inbound query re-attached.

use url::Url;

use crate::error::{RelayError, RelayResult};

/// Query parameter naming the target.
pub const TARGET_PARAM: &str = "url";

const DEFAULT_SCHEME_PREFIX: &str = "https://";

/// Pick the target out of the decoded inbound query.
///
/// The first `url` pair wins. An empty value counts as missing.
pub fn resolve_target(query: &[(String, String)]) -> RelayResult<&str> {
    query
        .iter()
        .find(|(key, _)| key == TARGET_PARAM)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
        .ok_or(RelayError::MissingTargetUrl)
}

/// Prefix `https://` unless the target already starts with `http://` or
/// `https://`. The check is a literal, case-sensitive prefix match.
pub fn normalize_scheme(target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("{DEFAULT_SCHEME_PREFIX}{target}")
    }
}

/// Parse the normalized target and append the forwarded query pairs after any
/// query it already carries.
pub fn build_target_url(target: &str, query: &[(String, String)]) -> RelayResult<Url> {
    let mut url = Url::parse(target).map_err(|source| RelayError::InvalidTarget {
        target: target.to_string(),
        source,
    })?;

    // query_pairs_mut leaves a dangling '?' when nothing is appended.
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    Ok(url)
}

/// Query pairs to forward: everything, or everything except `url`.
pub fn forwarded_query(query: &[(String, String)], strip_target: bool) -> Vec<(String, String)> {
    query
        .iter()
        .filter(|(key, _)| !(strip_target && key == TARGET_PARAM))
        .cloned()
        .collect()
}
