//! Transport primitives for backend calls.
//!
//! [`ApiTransport`] is the client's only dependency on an HTTP stack: it executes a fully
//! resolved [`HttpRequest`] and hands back the raw [`HttpResponse`]. The client layers bearer
//! injection and session recovery on top, so transports stay oblivious to authentication and
//! tests can script responses without a network.

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	error::{ConfigError, TransportError},
};

/// Request shape handed to transports.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Response shape returned by transports.
pub type HttpResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`ApiTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

const MESSAGE_PREVIEW_LEN: usize = 256;

/// Abstraction over HTTP stacks capable of executing backend calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by every
/// clone of a client, and the returned future must be `Send` so client futures can hop executors.
/// Non-2xx statuses are responses, not errors; only failures to obtain a response belong in
/// [`TransportError`].
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and resolves with the backend's response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Replayable description of a backend call.
///
/// Unlike [`HttpRequest`] this type is `Clone`, so the client can replay it after a session
/// refresh with a new `Authorization` header.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the API prefix (or already prefixed).
	pub path: String,
	/// Query parameters appended on dispatch.
	pub query: Vec<(String, String)>,
	/// Extra headers; `Authorization` is managed by the client.
	pub headers: HeaderMap,
	/// Serialized JSON body, if any.
	pub body: Option<Vec<u8>>,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request for an arbitrary method.
	pub fn new(method: Method, path: impl Display) -> Self {
		Self {
			method,
			path: path.to_string(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
			retried: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Display) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Display) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Display) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Display) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Display) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Sets a header, replacing any previous value.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(Error::Encode)?);

		Ok(self)
	}

	/// Opts this request out of session recovery: a 401 is returned to the caller untouched.
	pub fn without_session_recovery(mut self) -> Self {
		self.retried = true;

		self
	}

	/// Whether the request already went through (or opted out of) session recovery.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}

	/// Replaces the `Authorization` header with a bearer credential.
	pub fn set_bearer(&mut self, token: &TokenSecret) -> Result<(), ConfigError> {
		let mut value = HeaderValue::from_str(&token.bearer())
			.map_err(|_| ConfigError::InvalidHeader { name: "authorization" })?;

		value.set_sensitive(true);
		self.headers.insert(AUTHORIZATION, value);

		Ok(())
	}

	/// Resolves the request against `config` into the shape transports execute.
	pub fn to_http(&self, config: &ClientConfig) -> Result<HttpRequest, ConfigError> {
		let mut url = config.endpoint(&self.path);

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		let mut request = ::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;
		let headers = request.headers_mut();

		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		if self.body.is_some() {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		}
		for (name, value) in &self.headers {
			headers.insert(name.clone(), value.clone());
		}

		Ok(request)
	}
}

/// Buffered backend response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Whether the status is 2xx.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Whether the status is 401, the trigger for session recovery.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Retry-After hint expressed as a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(&self.headers)
	}

	/// Decodes the body as JSON; an empty body decodes as `null`.
	pub fn json<R>(&self) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let bytes: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: Some(self.status.as_u16()) })
	}

	/// Body rendered as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Human-readable failure detail: the JSON `detail`/`message`/`error` field when present,
	/// otherwise a bounded preview of the body.
	pub fn error_message(&self) -> String {
		if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.body) {
			for field in ["detail", "message", "error"] {
				match value.get(field) {
					Some(serde_json::Value::String(text)) => return text.clone(),
					Some(other) if !other.is_null() => return other.to_string(),
					_ => {},
				}
			}
		}

		let text = self.text();
		let trimmed = text.trim();

		if trimmed.is_empty() {
			return self.status.canonical_reason().unwrap_or("no response body").to_owned();
		}

		trimmed.chars().take(MESSAGE_PREVIEW_LEN).collect()
	}

	/// Converts a non-2xx response into [`Error::Api`]; 2xx responses pass through.
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(self.into_api_error())
		}
	}

	/// Builds the [`Error::Api`] describing this response.
	pub fn into_api_error(self) -> Error {
		Error::Api {
			status: self.status.as_u16(),
			message: self.error_message(),
			retry_after: self.retry_after(),
		}
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring the configured timeout.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self(builder.build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return i64::try_from(secs).ok().map(Duration::seconds);
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
