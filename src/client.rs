//! Authenticated API client for the dashboard backend.
//!
//! [`ApiClient`] attaches the stored access token to every request and transparently recovers
//! from access-token expiry: the first request to receive a 401 exchanges the refresh token while
//! any other request that hits a 401 in the meantime waits for that single exchange, then every
//! waiter replays with the rotated token. A failed exchange ends the session for everyone at once.

mod metrics;
mod queue;
mod refresh;

pub use metrics::RefreshMetrics;
pub use queue::Queued;

// self
use crate::{
	_prelude::*,
	api,
	auth::{LoginCredentials, TokenPair},
	client::queue::RefreshCoordinator,
	config::ClientConfig,
	http::{ApiRequest, ApiResponse, ApiTransport},
	nav::{Navigator, NoopNavigator},
	obs::{SessionOp, SessionOutcome, SessionSpan},
	store::{MemorySessionStore, SessionKey, SessionStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Session-aware client shared by every screen of the dashboard.
///
/// Construct one per process and clone it freely: clones share the transport, the session
/// store, and the refresh coordinator, so the single-flight guarantee holds across all of them.
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Session storage holding the access/refresh pair.
	pub store: Arc<dyn SessionStore>,
	/// Host hook used to redirect on forced logout.
	pub navigator: Arc<dyn Navigator>,
	/// Backend location and auth routes.
	pub config: Arc<ClientConfig>,
	refresh: Arc<RefreshCoordinator>,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client over `transport` with in-memory session storage and no navigation.
	pub fn with_transport(config: ClientConfig, transport: impl Into<Arc<T>>) -> Self {
		Self {
			transport: transport.into(),
			store: Arc::new(MemorySessionStore::default()),
			navigator: Arc::new(NoopNavigator),
			config: Arc::new(config),
			refresh: Default::default(),
			refresh_metrics: Default::default(),
		}
	}

	/// Replaces the session store.
	pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
		self.store = store;

		self
	}

	/// Replaces the navigator used on forced logout.
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = navigator;

		self
	}

	/// Counters describing refresh activity so far.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	/// Whether a refresh exchange is running right now.
	pub fn is_refreshing(&self) -> bool {
		self.refresh.is_refreshing()
	}

	/// Whether session storage currently holds an access token.
	pub fn is_authenticated(&self) -> Result<bool> {
		Ok(self.store.get(SessionKey::AccessToken)?.is_some())
	}

	/// Sends `request` with the stored bearer token, recovering once from an expired session.
	///
	/// Every response is returned as-is, including non-2xx statuses, except a 401 on a request
	/// that has not been through recovery yet: that one triggers (or waits for) a refresh and is
	/// replayed with the new token. A replay that is rejected again comes back unchanged.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let mut request = request;

		if let Some(token) = self.store.get(SessionKey::AccessToken)? {
			request.set_bearer(&token)?;
		}

		let response = self.dispatch(&request).await?;

		if !response.is_unauthorized() || request.is_retried() {
			return Ok(response);
		}

		request.mark_retried();

		let token = self.recover_session().await?;

		request.set_bearer(&token)?;

		self.replay(&request).await
	}

	/// Sends `request` and decodes a 2xx JSON body; other statuses become [`Error::Api`].
	pub async fn fetch_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send(request).await?.error_for_status()?.json()
	}

	/// `GET path` decoded as JSON.
	pub async fn get_json<R>(&self, path: impl Display) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.fetch_json(ApiRequest::get(path)).await
	}

	/// `POST path` with a JSON body, decoded as JSON.
	pub async fn post_json<B, R>(&self, path: impl Display, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.fetch_json(ApiRequest::post(path).json(body)?).await
	}

	/// `PUT path` with a JSON body, decoded as JSON.
	pub async fn put_json<B, R>(&self, path: impl Display, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.fetch_json(ApiRequest::put(path).json(body)?).await
	}

	/// `DELETE path`, discarding the body of a 2xx response.
	pub async fn delete(&self, path: impl Display) -> Result<()> {
		self.send(ApiRequest::delete(path)).await?.error_for_status()?;

		Ok(())
	}

	/// Profile of the signed-in user.
	pub async fn current_user<R>(&self) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.get_json(api::AUTH_ME).await
	}

	/// Exchanges username/password for a token pair and stores it.
	///
	/// Login bypasses bearer injection and session recovery: a 401 here means bad credentials.
	pub async fn login(&self, credentials: &LoginCredentials) -> Result<TokenPair> {
		const OP: SessionOp = SessionOp::Login;

		let span = SessionSpan::new(OP, "login");

		span.record(SessionOutcome::Attempt);

		let result: Result<TokenPair> = span
			.instrument(async {
				let request = ApiRequest::post(&self.config.login_path).json(credentials)?;
				let pair: TokenPair = self.dispatch(&request).await?.error_for_status()?.json()?;

				self.store.save_pair(&pair)?;

				Ok(pair)
			})
			.await;

		match &result {
			Ok(_) => span.record(SessionOutcome::Success),
			Err(_) => span.record(SessionOutcome::Failure),
		}

		result
	}

	/// Clears both tokens and sends the host to the login route unless it is already there.
	///
	/// Navigation happens even when clearing storage fails; the storage error is still returned.
	pub fn logout(&self) -> Result<()> {
		const OP: SessionOp = SessionOp::Logout;

		let span = SessionSpan::new(OP, "logout");

		span.record(SessionOutcome::Attempt);

		let cleared = span.in_scope(|| self.store.clear());

		if !self.config.is_login_route(&self.navigator.current_path()) {
			self.navigator.navigate(&self.config.login_route);
		}

		match cleared {
			Ok(()) => {
				span.record(SessionOutcome::Success);

				Ok(())
			},
			Err(err) => {
				span.record(SessionOutcome::Failure);

				Err(err.into())
			},
		}
	}

	/// Resolves `request` and hands it to the transport without any session handling.
	pub(crate) async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let request = request.to_http(&self.config)?;

		Ok(self.transport.execute(request).await?.into())
	}

	async fn replay(&self, request: &ApiRequest) -> Result<ApiResponse> {
		const OP: SessionOp = SessionOp::Replay;

		let span = SessionSpan::new(OP, "send");

		span.record(SessionOutcome::Attempt);

		let result = span.instrument(self.dispatch(request)).await;

		match &result {
			Ok(response) if response.is_success() =>
				span.record(SessionOutcome::Success),
			_ => span.record(SessionOutcome::Failure),
		}

		result
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by its own reqwest transport, in-memory session storage, and no
	/// navigation.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, transport))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			navigator: self.navigator.clone(),
			config: self.config.clone(),
			refresh: self.refresh.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refreshing", &self.is_refreshing())
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
