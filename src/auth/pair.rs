//! Wire bodies for the login and refresh endpoints.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Token type reported when the backend omits `token_type`.
pub const DEFAULT_TOKEN_TYPE: &str = "bearer";

/// Access/refresh pair returned by `POST /api/v1/auth/login` and `POST /api/v1/auth/refresh`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Short-lived bearer credential.
	pub access_token: TokenSecret,
	/// Credential exchanged for the next pair once the access token expires.
	pub refresh_token: TokenSecret,
	/// Scheme reported by the backend, normally `bearer`.
	#[serde(default = "default_token_type")]
	pub token_type: String,
}
impl TokenPair {
	/// Creates a bearer pair.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
			token_type: default_token_type(),
		}
	}

	/// Whether the backend issued a bearer token (case-insensitive).
	pub fn is_bearer(&self) -> bool {
		self.token_type.eq_ignore_ascii_case(DEFAULT_TOKEN_TYPE)
	}
}

/// Body sent to the refresh endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
	/// Refresh token read from session storage.
	pub refresh_token: TokenSecret,
}

/// Username/password pair posted to the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
	/// Account name.
	pub username: String,
	/// Account password; redacted in debug output.
	pub password: TokenSecret,
}
impl LoginCredentials {
	/// Creates a credential pair.
	pub fn new(username: impl Into<String>, password: impl Into<TokenSecret>) -> Self {
		Self { username: username.into(), password: password.into() }
	}
}

fn default_token_type() -> String {
	DEFAULT_TOKEN_TYPE.into()
}
