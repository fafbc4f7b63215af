//! Client-level error types shared across transport, session recovery, and storage.

// self
use crate::{_prelude::*, config::ClientConfigError, store::StoreError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The session could not be recovered after an expired access token.
	#[error(transparent)]
	Session(#[from] SessionError),

	/// Backend answered with a non-success status.
	#[error("API request failed with HTTP {status}: {message}.")]
	Api {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Backend-supplied detail or a preview of the body.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Backend responded with JSON that does not match the expected shape.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure naming the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Encode(#[source] serde_json::Error),
}
impl Error {
	/// HTTP status associated with the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api { status, .. } => Some(*status),
			Self::Decode { status, .. } => *status,
			Self::Session(SessionError::Rejected { status, .. }) => Some(*status),
			_ => None,
		}
	}

	/// Whether the caller has to re-authenticate before retrying.
	pub fn requires_login(&self) -> bool {
		matches!(self, Self::Session(_) | Self::Api { status: 401, .. })
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Client configuration failed validation.
	#[error(transparent)]
	InvalidClientConfig(#[from] ClientConfigError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// A header value cannot be represented on the wire.
	#[error("Header `{name}` contains characters that are not allowed in HTTP headers.")]
	InvalidHeader {
		/// Header name that failed validation.
		name: &'static str,
	},
	/// Background work was requested outside a Tokio runtime.
	#[error("A Tokio runtime is required to start background polling.")]
	MissingRuntime,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Outcome of a failed refresh exchange, shared verbatim with every queued request.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionError {
	/// No refresh token is stored, so the exchange was never attempted.
	#[error("No refresh token is stored for the current session.")]
	MissingRefreshToken,
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the session with HTTP {status}: {message}.")]
	Rejected {
		/// HTTP status returned by the refresh endpoint.
		status: u16,
		/// Backend-supplied detail or a preview of the body.
		message: String,
	},
	/// Refresh request could not be built or sent.
	#[error("Refresh request failed before a response arrived: {message}.")]
	Transport {
		/// Rendered transport failure.
		message: String,
	},
	/// Refresh endpoint answered with a body that is not a token pair.
	#[error("Refresh response could not be decoded: {message}.")]
	Decode {
		/// Rendered decoding failure, including the JSON path.
		message: String,
	},
	/// Rotated tokens could not be read or persisted.
	#[error("Session storage failed during refresh: {0}")]
	Storage(StoreError),
	/// The task driving the refresh was dropped before the exchange settled.
	#[error("The in-flight refresh was dropped before it settled.")]
	Abandoned,
}
