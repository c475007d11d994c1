//! Admin gate for the results and reset pages.
//!
//! The shared secret is accepted from an `X-Admin-Password` header or as the
//! password half of HTTP Basic credentials (any user name), so a browser
//! can reach the pages through its native login prompt.
//!
//! Browsers replay cached Basic credentials on any request, including an
//! `<img>` on a foreign site, so [`ResetAccess`] only honours them when the
//! request shows it came from this origin.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use crate::AppState;
use crate::views::notice;

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";
pub const REALM: &str = r#"Basic realm="bookvote admin""#;
pub const SEC_FETCH_SITE: &str = "sec-fetch-site";

/// Where the presented secret came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Header(String),
    Basic(String),
}

impl Credential {
    pub fn secret(&self) -> &str {
        match self {
            Credential::Header(s) | Credential::Basic(s) => s,
        }
    }
}

/// Proof that the request carried the admin secret.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match presented_credential(&parts.headers) {
            Some(credential) if state.admin.verify(credential.secret()) => Ok(AdminAccess),
            presented => {
                warn!(uri = %parts.uri, presented = presented.is_some(), "admin access denied");
                Err(unauthorized())
            }
        }
    }
}

/// Admin access for state-changing GET routes.
///
/// The header secret always works; Basic credentials only on same-origin
/// requests.
#[derive(Debug, Clone, Copy)]
pub struct ResetAccess;

impl FromRequestParts<AppState> for ResetAccess {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        AdminAccess::from_request_parts(parts, state).await?;
        match presented_credential(&parts.headers) {
            Some(Credential::Basic(_)) if !is_same_origin(&parts.headers) => {
                warn!(uri = %parts.uri, "admin action refused: cross-site request");
                Err(forbidden())
            }
            _ => Ok(ResetAccess),
        }
    }
}

/// The credential the client presented, if any.
pub fn presented_credential(headers: &HeaderMap) -> Option<Credential> {
    if let Some(value) = headers.get(ADMIN_PASSWORD_HEADER) {
        return value.to_str().ok().map(|s| Credential::Header(s.to_string()));
    }

    let encoded = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (_, password) = decoded.split_once(':')?;
    Some(Credential::Basic(password.to_string()))
}

/// Whether the request positively comes from this site: `Sec-Fetch-Site`
/// says so, or the `Origin`/`Referer` authority matches `Host`. A request
/// with no such signal is not same-origin.
pub fn is_same_origin(headers: &HeaderMap) -> bool {
    if let Some(site) = header(headers, SEC_FETCH_SITE) {
        return matches!(site, "same-origin" | "none");
    }
    let Some(host) = header(headers, "host") else {
        return false;
    };
    header(headers, "origin")
        .or_else(|| header(headers, "referer"))
        .and_then(authority)
        .is_some_and(|a| a.eq_ignore_ascii_case(host))
}

fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `host[:port]` of an absolute URL.
fn authority(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    rest.split(['/', '?', '#']).next().filter(|a| !a.is_empty())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, REALM)],
        notice("Admin password required."),
    )
        .into_response()
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        notice("Open this page from the admin console."),
    )
        .into_response()
}
