//! Request authentication.
//!
//! The session token is read from `Authorization: Bearer <token>` or, when
//! that header is absent, from the `session` cookie.

use crate::server::AppState;
use axum::{
	extract::FromRequestParts,
	http::{header, request::Parts, HeaderMap},
};
use cafe_types::{Credentials, Identity};
use std::convert::Infallible;

const SESSION_COOKIE: &str = "session";

/// Extracts the session token from request headers.
pub fn credentials_from_headers(headers: &HeaderMap) -> Credentials {
	let bearer = headers
		.get(header::AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.strip_prefix("Bearer "))
		.map(str::trim)
		.filter(|token| !token.is_empty());
	if let Some(token) = bearer {
		return Credentials::bearer(token);
	}

	let cookie = headers
		.get_all(header::COOKIE)
		.iter()
		.filter_map(|v| v.to_str().ok())
		.flat_map(|v| v.split(';'))
		.filter_map(|pair| pair.trim().split_once('='))
		.find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
		.map(|(_, value)| value);

	match cookie {
		Some(token) => Credentials::bearer(token),
		None => Credentials::anonymous(),
	}
}

/// The authenticated caller, or `None` for anonymous requests.
///
/// Never rejects; operations decide whether an identity is required.
pub struct Caller(pub Option<Identity>);

impl Caller {
	pub fn identity(&self) -> Option<&Identity> {
		self.0.as_ref()
	}
}

impl FromRequestParts<AppState> for Caller {
	type Rejection = Infallible;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let credentials = credentials_from_headers(&parts.headers);
		Ok(Caller(state.engine.authenticate(&credentials).await))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::HeaderValue;

	fn token(headers: &HeaderMap) -> Option<String> {
		credentials_from_headers(headers)
			.token
			.map(|t| t.expose_secret().to_string())
	}

	#[test]
	fn test_bearer_header() {
		let mut headers = HeaderMap::new();
		headers.insert(
			header::AUTHORIZATION,
			HeaderValue::from_static("Bearer budi-session"),
		);
		assert_eq!(token(&headers).as_deref(), Some("budi-session"));
	}

	#[test]
	fn test_session_cookie() {
		let mut headers = HeaderMap::new();
		headers.insert(
			header::COOKIE,
			HeaderValue::from_static("theme=dark; session=ani-session; lang=id"),
		);
		assert_eq!(token(&headers).as_deref(), Some("ani-session"));
	}

	#[test]
	fn test_bearer_takes_precedence() {
		let mut headers = HeaderMap::new();
		headers.insert(
			header::AUTHORIZATION,
			HeaderValue::from_static("Bearer from-header"),
		);
		headers.insert(header::COOKIE, HeaderValue::from_static("session=from-cookie"));
		assert_eq!(token(&headers).as_deref(), Some("from-header"));
	}

	#[test]
	fn test_anonymous() {
		let mut headers = HeaderMap::new();
		assert_eq!(token(&headers), None);

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
		headers.insert(header::COOKIE, HeaderValue::from_static("session="));
		assert_eq!(token(&headers), None);
	}
}
