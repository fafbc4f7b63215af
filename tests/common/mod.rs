//! Shared fixtures: a scripted in-memory transport and a navigator that never moves.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Notify;
// self
use retail_bi_client::{
	client::ApiClient,
	config::ClientConfig,
	http::{ApiTransport, HttpRequest, HttpResponse, TransportFuture},
	http_types::{StatusCode, header::AUTHORIZATION},
	nav::Navigator,
	store::{MemorySessionStore, SessionKey, SessionStore},
	url::Url,
};

pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";
pub const SERVER_ERROR_PATH: &str = "/api/v1/diagnostics/server-error";

/// How the fake refresh endpoint answers.
#[derive(Clone, Debug)]
pub enum RefreshScript {
	/// Issue a new pair and start accepting `access`.
	Rotate { access: String, refresh: String },
	/// Fail with `status`.
	Reject { status: u16 },
}
impl RefreshScript {
	pub fn rotate(access: &str, refresh: &str) -> Self {
		Self::Rotate { access: access.into(), refresh: refresh.into() }
	}
}

/// One request as the fake transport saw it.
#[derive(Clone, Debug)]
pub struct Recorded {
	pub path: String,
	pub authorization: Option<String>,
	pub stored_access: Option<String>,
	pub body: Vec<u8>,
}

/// Transport that accepts exactly one bearer token and scripts the refresh endpoint.
///
/// With `hold_refresh_until(n)` the refresh response is withheld until `n` requests have been
/// answered with 401, which pins every one of them inside the same refresh window.
pub struct ScriptedTransport {
	accepted: Mutex<String>,
	always_unauthorized: bool,
	refresh: RefreshScript,
	hold_refresh_until: usize,
	unauthorized: AtomicUsize,
	refresh_calls: AtomicUsize,
	release: Notify,
	log: Mutex<Vec<Recorded>>,
	store: Mutex<Option<Arc<dyn SessionStore>>>,
}
impl ScriptedTransport {
	pub fn new(accepted: &str, refresh: RefreshScript) -> Self {
		Self {
			accepted: Mutex::new(accepted.into()),
			always_unauthorized: false,
			refresh,
			hold_refresh_until: 0,
			unauthorized: AtomicUsize::new(0),
			refresh_calls: AtomicUsize::new(0),
			release: Notify::new(),
			log: Mutex::new(Vec::new()),
			store: Mutex::new(None),
		}
	}

	pub fn hold_refresh_until(mut self, unauthorized: usize) -> Self {
		self.hold_refresh_until = unauthorized;

		self
	}

	pub fn always_unauthorized(mut self) -> Self {
		self.always_unauthorized = true;

		self
	}

	/// Records the stored access token alongside every request.
	pub fn observe_store(&self, store: Arc<dyn SessionStore>) {
		*self.store.lock() = Some(store);
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn requests(&self) -> Vec<Recorded> {
		self.log.lock().clone()
	}

	pub fn protected_requests(&self) -> Vec<Recorded> {
		self.requests().into_iter().filter(|record| record.path != REFRESH_PATH).collect()
	}

	async fn answer_refresh(&self) -> HttpResponse {
		self.refresh_calls.fetch_add(1, Ordering::SeqCst);

		if self.hold_refresh_until > 0 {
			self.release.notified().await;
		}

		match &self.refresh {
			RefreshScript::Rotate { access, refresh } => {
				*self.accepted.lock() = access.clone();

				json_response(
					200,
					serde_json::json!({
						"access_token": access,
						"refresh_token": refresh,
						"token_type": "bearer",
					})
					.to_string(),
				)
			},
			RefreshScript::Reject { status } =>
				json_response(*status, r#"{"detail":"Refresh token revoked"}"#),
		}
	}
}
impl ApiTransport for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let path = request.uri().path().to_owned();
			let authorization = request
				.headers()
				.get(AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned);
			let stored_access = self
				.store
				.lock()
				.as_ref()
				.and_then(|store| store.get(SessionKey::AccessToken).ok().flatten())
				.map(|token| token.expose().to_owned());

			self.log.lock().push(Recorded {
				path: path.clone(),
				authorization: authorization.clone(),
				stored_access,
				body: request.body().clone(),
			});

			if path == REFRESH_PATH {
				return Ok(self.answer_refresh().await);
			}
			if path == SERVER_ERROR_PATH {
				return Ok(json_response(500, r#"{"detail":"Parquet sync failed"}"#));
			}

			let accepted = format!("Bearer {}", self.accepted.lock());

			if !self.always_unauthorized && authorization.as_deref() == Some(accepted.as_str()) {
				return Ok(json_response(200, serde_json::json!({ "path": path }).to_string()));
			}

			let seen = self.unauthorized.fetch_add(1, Ordering::SeqCst) + 1;

			if seen == self.hold_refresh_until {
				self.release.notify_one();
			}

			Ok(json_response(401, r#"{"detail":"Token expired"}"#))
		})
	}
}

/// Navigator parked on one route; records navigations without moving.
#[derive(Debug, Default)]
pub struct PinnedNavigator {
	location: String,
	navigations: Mutex<Vec<String>>,
}
impl PinnedNavigator {
	pub fn at(location: &str) -> Self {
		Self { location: location.into(), navigations: Mutex::new(Vec::new()) }
	}

	pub fn navigations(&self) -> Vec<String> {
		self.navigations.lock().clone()
	}
}
impl Navigator for PinnedNavigator {
	fn current_path(&self) -> String {
		self.location.clone()
	}

	fn navigate(&self, path: &str) {
		self.navigations.lock().push(path.to_owned());
	}
}

pub fn json_response(status: u16, body: impl Into<String>) -> HttpResponse {
	let mut response = HttpResponse::new(body.into().into_bytes());

	*response.status_mut() = StatusCode::from_u16(status).expect("Status fixture should be valid.");

	response
}

pub fn config(base: &str) -> ClientConfig {
	ClientConfig::builder(Url::parse(base).expect("Failed to parse test base URL."))
		.build()
		.expect("Test client config should be valid.")
}

pub fn scripted_client(
	transport: &Arc<ScriptedTransport>,
	store: &MemorySessionStore,
	navigator: &Arc<PinnedNavigator>,
) -> ApiClient<ScriptedTransport> {
	let store: Arc<dyn SessionStore> = Arc::new(store.clone());
	let navigator: Arc<dyn Navigator> = navigator.clone();

	ApiClient::with_transport(config("https://bi.example.com"), transport.clone())
		.with_store(store)
		.with_navigator(navigator)
}
