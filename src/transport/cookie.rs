// src/transport/cookie.rs

//! Session-cookie extraction from login response headers.
//!
//! The service authenticates follow-up calls with the cookie it sets on a
//! successful login. Only the cookie pair itself is replayed; attributes
//! like `Path` or `HttpOnly` describe browser behavior and are stripped.

use http::header::SET_COOKIE;
use http::HeaderMap;
use std::fmt;

/// Opaque session credential derived from login response headers. Authorizes
/// subsequent operations without re-sending credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
  pub(crate) fn new(raw: impl Into<String>) -> Self {
    Self(raw.into())
  }

  /// The cookie pair as sent back to the service (`name=value`).
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SessionToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Derives a reusable session token from the `Set-Cookie` response headers
/// of a successful login. The first well-formed cookie pair wins; `None`
/// means the login response carried no usable session cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<SessionToken> {
  for value in headers.get_all(SET_COOKIE).iter() {
    let text = match value.to_str() {
      Ok(text) => text,
      Err(_) => continue, // non-ASCII header value, not a cookie we can replay
    };
    let pair = match text.split(';').next() {
      Some(pair) => pair.trim(),
      None => continue,
    };
    // A bare flag without '=' is not a cookie pair.
    match pair.split_once('=') {
      Some((name, _)) if !name.is_empty() => return Some(SessionToken::new(pair)),
      _ => continue,
    }
  }
  None
}
