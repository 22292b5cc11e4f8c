//! WebSocket upgrade handler.
//!
//! Checks the `Origin` header and resolves the client's identity before
//! handing the socket to a connection actor.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    extract::{ConnectInfo, Query, State, ws::WebSocketUpgrade},
    http::{HeaderMap, StatusCode, Uri, header},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    domain::Ident,
    ui::{connection, error::ConnectionError, state::AppState},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Session token of a logged-in user
    pub session: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    if let Err(e) = check_origin(&headers, &state.config.allowed_origin) {
        tracing::warn!("Rejecting connection from {}: {}", addr, e);
        return Err(StatusCode::FORBIDDEN);
    }

    let ip = resolve_ip(&headers, addr, state.config.trust_proxy);
    let ident = Ident::new(ip, query.session.filter(|s| !s.is_empty()));
    Ok(ws.on_upgrade(move |socket| connection::serve(socket, state, ident)))
}

/// Accept a missing origin, or one whose host matches `allowed`.
/// An empty `allowed` accepts everything.
fn check_origin(headers: &HeaderMap, allowed: &str) -> Result<(), ConnectionError> {
    if allowed.is_empty() {
        return Ok(());
    }
    let Some(origin) = headers.get(header::ORIGIN) else {
        return Ok(());
    };
    let origin = origin
        .to_str()
        .map_err(|_| ConnectionError::OriginRejected("non-ASCII origin".to_string()))?;
    if origin.is_empty() {
        return Ok(());
    }

    let host = origin
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.authority().map(|a| a.as_str().to_string()));
    match host {
        Some(host) if host.eq_ignore_ascii_case(allowed) => Ok(()),
        _ => Err(ConnectionError::OriginRejected(origin.to_string())),
    }
}

/// Client IP. `X-Forwarded-For` is only honoured behind a trusted proxy.
fn resolve_ip(headers: &HeaderMap, addr: SocketAddr, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    addr.ip()
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use axum::http::HeaderValue;

    use super::*;

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 1], 4000))
    }

    #[test]
    fn test_origin_matching_host_is_accepted() {
        // テスト項目: 許可されたホストの Origin は受け入れられる
        // given (前提条件):
        let headers = headers("origin", "https://kakiko.example:8443");

        // when (操作):
        let result = check_origin(&headers, "kakiko.example:8443");

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[test]
    fn test_origin_mismatch_is_rejected() {
        // テスト項目: 異なるホストの Origin は OriginRejected
        // given (前提条件):
        let headers = headers("origin", "https://evil.example");

        // when (操作):
        let result = check_origin(&headers, "kakiko.example");

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectionError::OriginRejected(_))));
    }

    #[test]
    fn test_missing_origin_is_accepted() {
        // テスト項目: Origin ヘッダが無い、または空の場合は受け入れられる
        // given (前提条件):
        let missing = HeaderMap::new();
        let empty = headers("origin", "");

        // when (操作):
        let results = (
            check_origin(&missing, "kakiko.example"),
            check_origin(&empty, "kakiko.example"),
        );

        // then (期待する結果):
        assert!(results.0.is_ok());
        assert!(results.1.is_ok());
    }

    #[test]
    fn test_empty_allowed_origin_disables_check() {
        // テスト項目: 許可オリジンが未設定なら検査しない
        // given (前提条件):
        let headers = headers("origin", "https://anything.example");

        // when (操作):
        let result = check_origin(&headers, "");

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[test]
    fn test_forwarded_for_only_behind_trusted_proxy() {
        // テスト項目: X-Forwarded-For はプロキシを信頼する設定の時だけ使われる
        // given (前提条件):
        let headers = headers("x-forwarded-for", "203.0.113.7, 10.0.0.2");

        // when (操作):
        let trusted = resolve_ip(&headers, peer(), true);
        let untrusted = resolve_ip(&headers, peer(), false);

        // then (期待する結果):
        assert_eq!(trusted, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)));
        assert_eq!(untrusted, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_unparsable_forwarded_for_falls_back_to_peer() {
        // テスト項目: 不正な X-Forwarded-For は接続元アドレスにフォールバックする
        // given (前提条件):
        let headers = headers("x-forwarded-for", "not-an-ip");

        // when (操作):
        let ip = resolve_ip(&headers, peer(), true);

        // then (期待する結果):
        assert_eq!(ip, peer().ip());
    }
}
