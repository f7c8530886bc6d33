//! Endpoint resolution for the session transport.
//!
//! Host routing is a pure function of the client's origin: the known
//! production host maps to the fixed remote API origin, local-development
//! hosts map to a fixed local port, and anything else passes through
//! same-origin with the scheme swapped to websocket.

use crate::config::EndpointConfig;
use crate::session::SessionId;

/// Resolve the websocket origin for a given page origin.
pub fn resolve_ws_origin(origin: &str, config: &EndpointConfig) -> String {
    let (scheme, rest) = split_scheme(origin);
    let host = rest.split([':', '/']).next().unwrap_or(rest);

    if host == config.production_host {
        return config.remote_api_origin.clone();
    }

    if config.local_dev_hosts.iter().any(|h| h == host) {
        return format!("ws://{host}:{port}", port = config.local_dev_port);
    }

    // Same-origin passthrough with the scheme swapped to websocket.
    let ws_scheme = if scheme == "https" { "wss" } else { "ws" };
    format!("{ws_scheme}://{rest}")
}

/// Build the transport URL for a session:
/// `<ws-origin>/ws/terminal/<sessionId>?working_dir=<urlencoded-path>`.
pub fn session_url(
    ws_origin: &str,
    session_id: &SessionId,
    working_dir: Option<&str>,
) -> String {
    let mut url = format!(
        "{origin}/ws/terminal/{session_id}",
        origin = ws_origin.trim_end_matches('/')
    );
    if let Some(dir) = working_dir {
        url.push_str("?working_dir=");
        url.push_str(&percent_encode(dir));
    }
    url
}

fn split_scheme(origin: &str) -> (&str, &str) {
    match origin.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", origin),
    }
}

/// Percent-encode a query parameter value (RFC 3986 unreserved set).
fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
