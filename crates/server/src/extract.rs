use std::net::{IpAddr, SocketAddr};

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use service::admin::AdminAuthError;
use service::chakra::service as chakras;
use service::chakra::{Caller, ChakraAuthError};

use crate::errors::JsonApiError;
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
pub const ADMIN_TOKEN_COOKIE: &str = "admin_token";
pub const CHAKRA_TOKEN_HEADER: &str = "x-auth-token";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

/// Client address as seen behind the reverse proxy. Header values that are not
/// an IP address are ignored, so the result always fits the 64-char columns.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let from_headers = header_str(headers, "x-real-ip").and_then(parse_ip).or_else(|| {
        ["x-original-forwarded-for", "x-forwarded-for"]
            .into_iter()
            .find_map(|name| header_str(headers, name).and_then(|v| v.split(',').next()).and_then(parse_ip))
    });
    if let Some(ip) = from_headers {
        return ip.to_string();
    }
    peer.map(|a| a.ip().to_string()).unwrap_or_else(|| "unknown".into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
        Ok(ClientIp(client_ip(&parts.headers, peer)))
    }
}

/// Header first, then the session cookie.
pub fn admin_token(headers: &HeaderMap) -> Option<String> {
    if let Some(t) = header_str(headers, ADMIN_TOKEN_HEADER) {
        return Some(t.to_string());
    }
    CookieJar::from_headers(headers)
        .get(ADMIN_TOKEN_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Middleware for `/api/admin/*`: a live session or the static token is required.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, JsonApiError> {
    let Some(token) = admin_token(req.headers()) else {
        warn!(path = %req.uri().path(), "admin request without token");
        return Err(AdminAuthError::MissingToken.into());
    };
    if !state.admin.verify(&token) {
        warn!(path = %req.uri().path(), "admin request with invalid token");
        return Err(JsonApiError::unauthorized("Invalid or expired admin token"));
    }
    Ok(next.run(req).await)
}

/// Verified chakra explorer user, from `X-Auth-Token` or `Authorization: Bearer`.
#[derive(Debug, Clone)]
pub struct ChakraCaller(pub Caller);

fn bearer(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, header::AUTHORIZATION.as_str()).and_then(|h| h.strip_prefix("Bearer ")).map(str::trim)
}

#[async_trait]
impl FromRequestParts<AppState> for ChakraCaller {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = header_str(&parts.headers, CHAKRA_TOKEN_HEADER)
            .or_else(|| bearer(&parts.headers))
            .ok_or(ChakraAuthError::MissingToken)?;
        let claimed = state.chakra_auth.verify(token)?;
        Ok(ChakraCaller(chakras::resolve_caller(&state.db, &claimed).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_static(*v));
        }
        h
    }

    #[test]
    fn real_ip_wins() {
        let h = headers(&[("x-real-ip", "1.1.1.1"), ("x-forwarded-for", "2.2.2.2")]);
        assert_eq!(client_ip(&h, None), "1.1.1.1");
    }

    #[test]
    fn forwarded_chain_uses_first_hop() {
        let h = headers(&[("x-original-forwarded-for", "3.3.3.3, 10.0.0.1"), ("x-forwarded-for", "2.2.2.2")]);
        assert_eq!(client_ip(&h, None), "3.3.3.3");
        let h = headers(&[("x-forwarded-for", "2.2.2.2, 10.0.0.1")]);
        assert_eq!(client_ip(&h, None), "2.2.2.2");
    }

    #[test]
    fn garbage_headers_fall_through() {
        let long = "9".repeat(200);
        let mut h = HeaderMap::new();
        h.insert("x-real-ip", HeaderValue::from_str(&long).expect("header"));
        h.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip, 2.2.2.2"));
        let peer: SocketAddr = "[2001:db8::1]:443".parse().expect("addr");
        assert_eq!(client_ip(&h, Some(peer)), "2001:db8::1");

        h.insert("x-original-forwarded-for", HeaderValue::from_static(" 2001:db8::7 , 10.0.0.1"));
        assert_eq!(client_ip(&h, Some(peer)), "2001:db8::7");
    }

    #[test]
    fn falls_back_to_peer_then_unknown() {
        let peer: SocketAddr = "192.168.1.5:40000".parse().expect("addr");
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.168.1.5");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn admin_token_from_header_or_cookie() {
        assert_eq!(admin_token(&headers(&[("x-admin-token", "abc")])).as_deref(), Some("abc"));
        assert_eq!(admin_token(&headers(&[("cookie", "theme=dark; admin_token=xyz")])).as_deref(), Some("xyz"));
        assert_eq!(admin_token(&HeaderMap::new()), None);
    }
}
