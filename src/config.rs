//! Validated client configuration: backend location, API prefix, and auth routes.

// self
use crate::{_prelude::*, api};

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ClientConfigError {
	/// Only `http` and `https` backends are supported.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// `data:`/`mailto:`-style URLs cannot carry API paths.
	#[error("The base URL cannot be used as a base for API paths: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// A configured route is not an absolute path.
	#[error("The {field} must be an absolute path without query or fragment: {path}.")]
	InvalidPath {
		/// Which setting failed validation.
		field: &'static str,
		/// Offending value.
		path: String,
	},
	/// Zero timeouts would fail every request.
	#[error("The request timeout must be greater than zero.")]
	ZeroTimeout,
}

/// Immutable configuration shared by every request a client issues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Backend origin (plus optional mount path), e.g. `https://bi.example.com`.
	pub base_url: Url,
	/// Prefix prepended to relative API paths.
	pub api_prefix: String,
	/// Refresh endpoint, relative to the prefix.
	pub refresh_path: String,
	/// Login endpoint, relative to the prefix.
	pub login_path: String,
	/// Route the navigator is sent to on forced logout.
	pub login_route: String,
	/// Per-request timeout for the default transport.
	pub timeout: Option<std::time::Duration>,
}
impl ClientConfig {
	/// Default API prefix used by the dashboard backend.
	pub const DEFAULT_API_PREFIX: &'static str = "/api/v1";
	/// Default login route.
	pub const DEFAULT_LOGIN_ROUTE: &'static str = "/login";

	/// Creates a new builder for the provided backend URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves `path` to a full URL.
	///
	/// Paths already starting with the API prefix are used as-is; any other path is mounted below
	/// the prefix. A `?query` suffix on `path` is preserved.
	pub fn endpoint(&self, path: &str) -> Url {
		let (path, query) = match path.split_once('?') {
			Some((path, query)) => (path, Some(query)),
			None => (path, None),
		};
		let mut url = self.base_url.clone();
		let mount = url.path().trim_end_matches('/').to_owned();

		url.set_path(&format!("{mount}{}", self.api_path(path)));
		url.set_query(query.filter(|q| !q.is_empty()));
		url.set_fragment(None);

		url
	}

	/// Full URL of the refresh endpoint.
	pub fn refresh_endpoint(&self) -> Url {
		self.endpoint(&self.refresh_path)
	}

	/// Full URL of the login endpoint.
	pub fn login_endpoint(&self) -> Url {
		self.endpoint(&self.login_path)
	}

	/// Whether `location` (a browser path, optionally with a query) is the login route.
	pub fn is_login_route(&self, location: &str) -> bool {
		let path = location.split(['?', '#']).next().unwrap_or_default();

		path.trim_end_matches('/') == self.login_route.trim_end_matches('/')
	}

	fn api_path(&self, path: &str) -> String {
		let relative = path.trim_start_matches('/');
		let prefix = self.api_prefix.trim_matches('/');

		if prefix.is_empty()
			|| relative == prefix
			|| relative.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
		{
			format!("/{relative}")
		} else {
			format!("/{prefix}/{relative}")
		}
	}

	fn validate(&self) -> Result<(), ClientConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ClientConfigError::CannotBeABase { url: self.base_url.to_string() });
		}
		if !self.api_prefix.is_empty() {
			validate_path("api_prefix", &self.api_prefix)?;
		}

		validate_path("refresh_path", &self.refresh_path)?;
		validate_path("login_path", &self.login_path)?;
		validate_path("login_route", &self.login_route)?;

		if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(ClientConfigError::ZeroTimeout);
		}

		Ok(())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	base_url: Url,
	api_prefix: String,
	refresh_path: String,
	login_path: String,
	login_route: String,
	timeout: Option<std::time::Duration>,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with the dashboard defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			api_prefix: ClientConfig::DEFAULT_API_PREFIX.into(),
			refresh_path: api::AUTH_REFRESH.into(),
			login_path: api::AUTH_LOGIN.into(),
			login_route: ClientConfig::DEFAULT_LOGIN_ROUTE.into(),
			timeout: None,
		}
	}

	/// Overrides the API prefix; an empty prefix mounts paths directly on the base URL.
	pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.api_prefix = prefix.into();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the route used on forced logout.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.login_route = route.into();

		self
	}

	/// Sets a per-request timeout for the default transport.
	pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			api_prefix: self.api_prefix,
			refresh_path: self.refresh_path,
			login_path: self.login_path,
			login_route: self.login_route,
			timeout: self.timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_path(field: &'static str, path: &str) -> Result<(), ClientConfigError> {
	if !path.starts_with('/') || path.contains(['?', '#']) || path.chars().any(char::is_whitespace)
	{
		Err(ClientConfigError::InvalidPath { field, path: path.into() })
	} else {
		Ok(())
	}
}
