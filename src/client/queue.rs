//! Single-flight bookkeeping for refresh exchanges.
//!
//! Every request that observes a 401 parks a [`Queued`] continuation. The first one to do so
//! while no refresh is running also receives the [`RefreshLease`] and starts the exchange. When
//! the lease settles, the in-flight flag is cleared and the queue drained under one lock, then
//! the continuations are settled in the order they were parked.

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret, error::SessionError};

type RefreshOutcome = Result<TokenSecret, SessionError>;

/// Request continuation parked behind the in-flight refresh.
#[derive(Debug)]
pub struct Queued {
	ticket: u64,
	sender: oneshot::Sender<RefreshOutcome>,
}
impl Queued {
	/// Position of this continuation in the order requests joined refreshes.
	pub fn ticket(&self) -> u64 {
		self.ticket
	}

	/// Hands the rotated access token to the parked request so it can replay.
	pub fn resolve(self, token: TokenSecret) {
		// The receiver is gone when the parked request was dropped; nothing to replay.
		let _ = self.sender.send(Ok(token));
	}

	/// Fails the parked request with the refresh error.
	pub fn reject(self, error: SessionError) {
		let _ = self.sender.send(Err(error));
	}
}

/// Outcome of joining the refresh: a place in the queue, plus the lease for the first joiner.
#[derive(Debug)]
pub(crate) struct RefreshTicket {
	pub(crate) waiter: RefreshWaiter,
	/// Present when no refresh was running; the holder must start the exchange.
	pub(crate) lease: Option<RefreshLease>,
}

#[derive(Debug, Default)]
struct RefreshState {
	in_flight: bool,
	next_ticket: u64,
	queue: Vec<Queued>,
}

/// In-flight flag plus the ordered queue of waiting requests.
#[derive(Debug, Default)]
pub(crate) struct RefreshCoordinator {
	state: Mutex<RefreshState>,
}
impl RefreshCoordinator {
	/// Parks the caller and claims the refresh if none is running. Check-and-set happens under
	/// one lock.
	pub(crate) fn join(self: &Arc<Self>) -> RefreshTicket {
		let mut state = self.state.lock();
		let (sender, receiver) = oneshot::channel();
		let ticket = state.next_ticket;

		state.next_ticket += 1;
		state.queue.push(Queued { ticket, sender });

		let lease = if state.in_flight {
			None
		} else {
			state.in_flight = true;

			Some(RefreshLease { coordinator: self.clone(), settled: false })
		};

		RefreshTicket { waiter: RefreshWaiter { ticket, receiver }, lease }
	}

	/// Whether a refresh exchange is currently running.
	pub(crate) fn is_refreshing(&self) -> bool {
		self.state.lock().in_flight
	}

	fn finish(&self) -> Vec<Queued> {
		let mut state = self.state.lock();

		state.in_flight = false;

		mem::take(&mut state.queue)
	}
}

/// Exclusive right to run the current refresh exchange.
///
/// Dropping an unsettled lease (the exchange task panicked or was aborted) clears the flag and
/// rejects the queue with [`SessionError::Abandoned`].
#[derive(Debug)]
pub(crate) struct RefreshLease {
	coordinator: Arc<RefreshCoordinator>,
	settled: bool,
}
impl RefreshLease {
	/// Releases the flag and settles every parked request with `outcome`, in enqueue order.
	/// Returns how many requests were settled.
	pub(crate) fn settle(mut self, outcome: &RefreshOutcome) -> usize {
		self.settled = true;

		let waiters = self.coordinator.finish();
		let count = waiters.len();

		for waiter in waiters {
			match outcome {
				Ok(token) => waiter.resolve(token.clone()),
				Err(err) => waiter.reject(err.clone()),
			}
		}

		count
	}
}
impl Drop for RefreshLease {
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		for waiter in self.coordinator.finish() {
			waiter.reject(SessionError::Abandoned);
		}
	}
}

/// Receiving half of a [`Queued`] continuation.
#[derive(Debug)]
pub(crate) struct RefreshWaiter {
	ticket: u64,
	receiver: oneshot::Receiver<RefreshOutcome>,
}
impl RefreshWaiter {
	#[cfg(test)]
	fn ticket(&self) -> u64 {
		self.ticket
	}

	pub(crate) async fn wait(self) -> RefreshOutcome {
		match self.receiver.await {
			Ok(outcome) => outcome,
			Err(_) => Err(SessionError::Abandoned),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn leader(coordinator: &Arc<RefreshCoordinator>) -> (RefreshLease, RefreshWaiter) {
		let RefreshTicket { waiter, lease } = coordinator.join();

		(lease.expect("Expected the first joiner to lead."), waiter)
	}

	fn follower(coordinator: &Arc<RefreshCoordinator>) -> RefreshWaiter {
		let RefreshTicket { waiter, lease } = coordinator.join();

		assert!(lease.is_none(), "Expected a follower ticket.");

		waiter
	}

	#[tokio::test]
	async fn only_first_join_leads_and_everyone_shares_the_token() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let (lease, own) = leader(&coordinator);
		let first = follower(&coordinator);
		let second = follower(&coordinator);

		assert!(coordinator.is_refreshing());
		assert_eq!(lease.settle(&Ok(TokenSecret::new("t2"))), 3);
		assert!(!coordinator.is_refreshing());

		for waiter in [own, first, second] {
			assert_eq!(waiter.wait().await, Ok(TokenSecret::new("t2")));
		}

		let _next = leader(&coordinator);
	}

	#[tokio::test]
	async fn failures_reach_every_waiter() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let (lease, own) = leader(&coordinator);
		let waiter = follower(&coordinator);
		let error = SessionError::Rejected { status: 401, message: "expired".into() };

		lease.settle(&Err(error.clone()));

		assert_eq!(own.wait().await, Err(error.clone()));
		assert_eq!(waiter.wait().await, Err(error));
	}

	#[tokio::test]
	async fn dropped_lease_releases_flag_and_rejects_queue() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let (lease, _own) = leader(&coordinator);
		let waiter = follower(&coordinator);

		drop(lease);

		assert!(!coordinator.is_refreshing());
		assert_eq!(waiter.wait().await, Err(SessionError::Abandoned));
	}

	#[test]
	fn queue_drains_in_join_order() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let (lease, own) = leader(&coordinator);
		let mut joined = vec![own.ticket()];

		for _ in 0..4 {
			joined.push(follower(&coordinator).ticket());
		}

		let drained = coordinator.finish().iter().map(Queued::ticket).collect::<Vec<_>>();

		assert_eq!(drained, joined);
		assert!(drained.windows(2).all(|pair| pair[0] < pair[1]));
		// Already drained; settling finds nobody left.
		assert_eq!(lease.settle(&Ok(TokenSecret::new("t2"))), 0);
	}
}
