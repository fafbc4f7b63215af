//! Fixed-interval dashboard polling with manual start/stop.
//!
//! A [`Poller`] owns one request and re-issues it through an [`ApiClient`] every period,
//! publishing the latest [`PollState`] on a watch channel. Polls go through the regular client, so
//! an expired session is refreshed exactly like any other request.

// crates.io
use tokio::{
	sync::watch,
	task::JoinHandle,
	time::{self, MissedTickBehavior},
};
// self
use crate::{
	_prelude::*,
	client::ApiClient,
	error::ConfigError,
	http::{ApiRequest, ApiTransport},
	obs::{SessionOp, SessionOutcome, SessionSpan},
};

/// Latest view of a polled resource.
#[derive(Clone, Debug, PartialEq)]
pub struct PollState<R> {
	/// Last successfully decoded payload; kept when a later poll fails.
	pub data: Option<R>,
	/// Rendered error of the most recent poll, cleared by the next success.
	pub last_error: Option<String>,
	/// When `data` was fetched.
	pub fetched_at: Option<OffsetDateTime>,
	/// Whether a poll is currently in flight.
	pub loading: bool,
}
impl<R> Default for PollState<R> {
	fn default() -> Self {
		Self { data: None, last_error: None, fetched_at: None, loading: false }
	}
}

/// Re-fetches one JSON resource on a fixed interval.
pub struct Poller<T, R>
where
	T: ?Sized + ApiTransport,
{
	client: ApiClient<T>,
	request: ApiRequest,
	period: std::time::Duration,
	state: Arc<watch::Sender<PollState<R>>>,
	task: Mutex<Option<JoinHandle<()>>>,
}
impl<T, R> Poller<T, R>
where
	T: ?Sized + ApiTransport,
	R: 'static + DeserializeOwned + Send + Sync,
{
	/// Creates a stopped poller; `period` is clamped to at least one millisecond.
	pub fn new(client: ApiClient<T>, request: ApiRequest, period: std::time::Duration) -> Self {
		let (state, _) = watch::channel(PollState::default());

		Self {
			client,
			request,
			period: period.max(std::time::Duration::from_millis(1)),
			state: Arc::new(state),
			task: Mutex::new(None),
		}
	}

	/// Polling period.
	pub fn period(&self) -> std::time::Duration {
		self.period
	}

	/// Receiver that observes every state change.
	pub fn subscribe(&self) -> watch::Receiver<PollState<R>> {
		self.state.subscribe()
	}

	/// Copy of the current state.
	pub fn snapshot(&self) -> PollState<R>
	where
		R: Clone,
	{
		self.state.borrow().clone()
	}

	/// Starts the loop on the current Tokio runtime; the first poll fires immediately.
	///
	/// The loop ends by itself when a poll fails with [`Error::Session`], since the session has
	/// been logged out by then; call `start` again after logging back in. Returns `false` when the
	/// loop was already running.
	pub fn start(&self) -> Result<bool> {
		let mut task = self.task.lock();

		if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
			return Ok(false);
		}

		let runtime =
			tokio::runtime::Handle::try_current().map_err(|_| ConfigError::MissingRuntime)?;

		*task = Some(runtime.spawn(poll_loop(
			self.client.clone(),
			self.request.clone(),
			self.period,
			self.state.clone(),
		)));

		Ok(true)
	}

	/// Stops the loop. Returns `false` when it was not running.
	pub fn stop(&self) -> bool {
		let Some(handle) = self.task.lock().take() else {
			return false;
		};
		let was_running = !handle.is_finished();

		handle.abort();
		self.state.send_modify(|state| state.loading = false);

		was_running
	}

	/// Whether the loop is running.
	pub fn is_running(&self) -> bool {
		self.task.lock().as_ref().is_some_and(|handle| !handle.is_finished())
	}

	/// Polls once right now, independently of the loop.
	pub async fn refresh_now(&self) -> Result<()> {
		poll_once(&self.client, &self.request, &self.state).await
	}
}
impl<T, R> Drop for Poller<T, R>
where
	T: ?Sized + ApiTransport,
{
	fn drop(&mut self) {
		if let Some(handle) = self.task.get_mut().take() {
			handle.abort();
		}
	}
}
impl<T, R> Debug for Poller<T, R>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Poller")
			.field("method", &self.request.method)
			.field("path", &self.request.path)
			.field("period", &self.period)
			.finish()
	}
}

async fn poll_loop<T, R>(
	client: ApiClient<T>,
	request: ApiRequest,
	period: std::time::Duration,
	state: Arc<watch::Sender<PollState<R>>>,
) where
	T: ?Sized + ApiTransport,
	R: DeserializeOwned,
{
	let mut ticker = time::interval(period);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		// Failures are published on the watch channel; a lost session ends the loop.
		if let Err(Error::Session(_)) = poll_once(&client, &request, &state).await {
			break;
		}
	}
}

async fn poll_once<T, R>(
	client: &ApiClient<T>,
	request: &ApiRequest,
	state: &watch::Sender<PollState<R>>,
) -> Result<()>
where
	T: ?Sized + ApiTransport,
	R: DeserializeOwned,
{
	const OP: SessionOp = SessionOp::Poll;

	let span = SessionSpan::new(OP, "poll_once");

	span.record(SessionOutcome::Attempt);
	state.send_modify(|state| state.loading = true);

	match span.instrument(client.fetch_json::<R>(request.clone())).await {
		Ok(data) => {
			state.send_modify(|state| {
				state.data = Some(data);
				state.last_error = None;
				state.fetched_at = Some(OffsetDateTime::now_utc());
				state.loading = false;
			});
			span.record(SessionOutcome::Success);

			Ok(())
		},
		Err(err) => {
			let message = err.to_string();

			state.send_modify(|state| {
				state.last_error = Some(message);
				state.loading = false;
			});
			span.record(SessionOutcome::Failure);

			Err(err)
		},
	}
}
