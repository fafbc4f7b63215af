//! Session recovery: single-flight refresh-token exchange, queue settlement, forced logout.

// self
use crate::{
	_prelude::*,
	auth::{RefreshRequest, TokenPair, TokenSecret},
	client::{
		ApiClient,
		queue::{RefreshLease, RefreshTicket},
	},
	error::SessionError,
	http::{ApiRequest, ApiResponse, ApiTransport},
	obs::{self, SessionOp, SessionOutcome, SessionSpan},
	store::SessionKey,
};

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Obtains a fresh access token after a 401.
	///
	/// Only one exchange runs at a time. Callers arriving while it runs are queued and receive
	/// the same outcome, so a failed exchange logs the session out once rather than per caller.
	/// The exchange runs on its own task, so dropping the caller that started it affects nobody
	/// else.
	pub(crate) async fn recover_session(&self) -> Result<TokenSecret, SessionError> {
		let RefreshTicket { waiter, lease } = self.refresh.join();
		let span = SessionSpan::new(SessionOp::Refresh, "await_refresh");

		match lease {
			Some(lease) => match tokio::runtime::Handle::try_current() {
				Ok(runtime) => {
					let client = self.clone();

					runtime.spawn(async move { client.lead_refresh(lease).await });
				},
				// Without a Tokio runtime the exchange is tied to this caller.
				Err(_) => self.lead_refresh(lease).await,
			},
			None => {
				span.record(SessionOutcome::Queued);
				self.refresh_metrics.record(SessionOutcome::Queued);
			},
		}

		span.instrument(waiter.wait()).await
	}

	/// Runs the exchange, ends the session on failure, then settles every parked request.
	async fn lead_refresh(&self, lease: RefreshLease) {
		let outcome = self.exchange_refresh_token().await;

		if let Err(err) = &outcome {
			self.force_logout(err);
		}

		obs::record_refresh_waiters(lease.settle(&outcome));
	}

	/// Calls the refresh endpoint and persists the rotated pair before anyone replays.
	async fn exchange_refresh_token(&self) -> Result<TokenSecret, SessionError> {
		const OP: SessionOp = SessionOp::Refresh;

		let span = SessionSpan::new(OP, "exchange_refresh_token");

		span.record(SessionOutcome::Attempt);
		self.refresh_metrics.record(SessionOutcome::Attempt);

		let result: Result<TokenSecret, SessionError> = span
			.instrument(async {
				let refresh_token = self
					.store
					.get(SessionKey::RefreshToken)
					.map_err(SessionError::Storage)?
					.ok_or(SessionError::MissingRefreshToken)?;
				let request = ApiRequest::post(&self.config.refresh_path)
					.json(&RefreshRequest { refresh_token })
					.and_then(|request| Ok(request.to_http(&self.config)?))
					.map_err(|err| SessionError::Transport { message: render_chain(&err) })?;
				let response = self
					.transport
					.execute(request)
					.await
					.map(ApiResponse::from)
					.map_err(|err| SessionError::Transport { message: render_chain(&err) })?;

				if !response.is_success() {
					return Err(SessionError::Rejected {
						status: response.status.as_u16(),
						message: response.error_message(),
					});
				}

				let pair: TokenPair = response.json().map_err(|err| SessionError::Decode {
					message: match err {
						Error::Decode { source, .. } => source.to_string(),
						other => render_chain(&other),
					},
				})?;

				self.store.save_pair(&pair).map_err(SessionError::Storage)?;

				Ok(pair.access_token)
			})
			.await;

		let outcome =
			if result.is_ok() { SessionOutcome::Success } else { SessionOutcome::Failure };

		self.refresh_metrics.record(outcome);
		span.record(outcome);

		result
	}

	fn force_logout(&self, cause: &SessionError) {
		obs::record_warning(SessionOp::Refresh, "Session refresh failed; logging out.", cause);

		if let Err(err) = self.logout() {
			obs::record_warning(SessionOp::Logout, "Session storage could not be cleared.", &err);
		}
	}
}

/// Renders an error and its sources as `outer: inner: root`.
fn render_chain(err: &(dyn StdError + 'static)) -> String {
	let mut rendered = err.to_string();
	let mut source = err.source();

	while let Some(cause) = source {
		rendered.push_str(": ");
		rendered.push_str(&cause.to_string());
		source = cause.source();
	}

	rendered
}
