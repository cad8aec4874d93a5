//! WebSocket HTTP upgrade handling for the subscription endpoint.
//!
//! Validates the RFC 6455 handshake on the GraphQL base path and builds
//! the `101 Switching Protocols` response, echoing the subscription
//! subprotocol when the client offered it.

use base64::Engine;
use bytes::Bytes;
use http::{header, Request, Response, StatusCode};
use http_body_util::Full;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{WsError, WsResult};

/// The WebSocket magic GUID used in the handshake.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The subscription subprotocol served on the GraphQL path.
pub const SUBPROTOCOL: &str = "graphql-transport-ws";

/// Check whether a request asks for a WebSocket upgrade.
///
/// A valid upgrade request carries `Connection: Upgrade`,
/// `Upgrade: websocket`, a `Sec-WebSocket-Key`, and version 13.
pub fn is_upgrade_request<B>(request: &Request<B>) -> bool {
    has_upgrade_connection(request) && has_websocket_upgrade(request)
}

fn has_upgrade_connection<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase().contains("upgrade"))
        .unwrap_or(false)
}

fn has_websocket_upgrade<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

fn websocket_key<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get("sec-websocket-key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn has_websocket_version<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get("sec-websocket-version")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "13")
        .unwrap_or(false)
}

/// Requested subprotocols, in client preference order.
fn requested_protocols<B>(request: &Request<B>) -> Vec<String> {
    request
        .headers()
        .get_all("sec-websocket-protocol")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(',').map(str::trim))
        .map(String::from)
        .collect()
}

/// Compute the `Sec-WebSocket-Accept` value from the client key.
fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Validate an upgrade request, returning the accept key.
pub fn validate_upgrade_request<B>(request: &Request<B>) -> WsResult<String> {
    if !has_upgrade_connection(request) {
        return Err(WsError::NotUpgrade(
            "missing Connection: Upgrade header".to_string(),
        ));
    }
    if !has_websocket_upgrade(request) {
        return Err(WsError::NotUpgrade(
            "missing Upgrade: websocket header".to_string(),
        ));
    }
    let key = websocket_key(request).ok_or_else(|| {
        WsError::NotUpgrade("missing Sec-WebSocket-Key header".to_string())
    })?;
    if !has_websocket_version(request) {
        return Err(WsError::NotUpgrade(
            "missing or invalid Sec-WebSocket-Version header (must be 13)".to_string(),
        ));
    }
    Ok(compute_accept_key(key))
}

/// Validate the handshake and build the `101 Switching Protocols` response.
///
/// The subscription subprotocol is echoed when the client offered it;
/// clients that offer none still get a plain upgrade.
pub fn prepare_upgrade<B>(request: &Request<B>) -> WsResult<Response<Full<Bytes>>> {
    let accept_key = validate_upgrade_request(request)?;

    let echo_protocol = requested_protocols(request)
        .iter()
        .any(|p| p.eq_ignore_ascii_case(SUBPROTOCOL));

    debug!(echo_protocol, "accepting websocket upgrade");

    let mut builder = Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::CONNECTION, "Upgrade")
        .header(header::UPGRADE, "websocket")
        .header("Sec-WebSocket-Accept", accept_key);

    if echo_protocol {
        builder = builder.header("Sec-WebSocket-Protocol", SUBPROTOCOL);
    }

    builder
        .body(Full::new(Bytes::new()))
        .map_err(|e| WsError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_upgrade_request() -> Request<()> {
        Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_is_upgrade_request() {
        assert!(is_upgrade_request(&make_upgrade_request()));
        assert!(!is_upgrade_request(&Request::builder().body(()).unwrap()));
    }

    #[test]
    fn test_accept_key_rfc_example() {
        // RFC 6455 section 1.3 example
        assert_eq!(
            compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_validate_rejects_wrong_version() {
        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "key")
            .header("Sec-WebSocket-Version", "12")
            .body(())
            .unwrap();
        assert!(validate_upgrade_request(&request).is_err());
    }

    #[test]
    fn test_prepare_upgrade_echoes_subprotocol() {
        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Protocol", SUBPROTOCOL)
            .body(())
            .unwrap();

        let response = prepare_upgrade(&request).unwrap();
        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(
            response
                .headers()
                .get("Sec-WebSocket-Protocol")
                .unwrap()
                .to_str()
                .unwrap(),
            SUBPROTOCOL
        );
    }

    #[test]
    fn test_prepare_upgrade_without_subprotocol() {
        let response = prepare_upgrade(&make_upgrade_request()).unwrap();
        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert!(response.headers().get("Sec-WebSocket-Protocol").is_none());
    }

    #[test]
    fn test_prepare_upgrade_invalid_request() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(
            prepare_upgrade(&request),
            Err(WsError::NotUpgrade(_))
        ));
    }
}
