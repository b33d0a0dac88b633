//! Key expressions for request/response bridges.
//!
//! A bridge owns a key prefix (for example `zensight/ethernetip`) and exchanges
//! messages underneath it:
//!
//! ```text
//! <prefix>/<category>            requests  (read, write, ...)
//! <prefix>/<category>/response   responses
//! <prefix>/@/status              bridge status
//! ```

/// Default key expression prefix for all ZenSight traffic.
pub const KEY_PREFIX: &str = "zensight";

/// Trailing segment appended to a request key to form its response key.
pub const RESPONSE_SEGMENT: &str = "response";

/// Build the key on which responses for a request category are published.
///
/// # Example
/// ```
/// use zensight_common::keyexpr::response_key;
///
/// assert_eq!(
///     response_key("zensight/ethernetip", "write"),
///     "zensight/ethernetip/write/response"
/// );
/// ```
pub fn response_key(prefix: &str, category: &str) -> String {
    format!("{}/{}/{}", prefix, category, RESPONSE_SEGMENT)
}

/// Wildcard covering every request and response under a prefix.
///
/// # Example
/// ```
/// use zensight_common::keyexpr::request_wildcard;
///
/// assert_eq!(request_wildcard("zensight/ethernetip"), "zensight/ethernetip/**");
/// ```
pub fn request_wildcard(prefix: &str) -> String {
    format!("{}/**", prefix)
}

/// Key expression for bridge status.
pub fn status_key(prefix: &str) -> String {
    format!("{}/@/status", prefix)
}

/// Return the part of `key` below `prefix`.
///
/// Keys outside the prefix are returned unchanged.
pub fn relative_key<'a>(prefix: &str, key: &'a str) -> &'a str {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(key)
}
