// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::SessionOutcome;

/// Per-client refresh counters, indexed by [`SessionOutcome`].
///
/// `Attempt` counts exchanges started, `Success` exchanges that produced a new pair, `Failure`
/// exchanges that ended the session, and `Queued` requests that waited on someone else's
/// exchange.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	counts: [AtomicU64; 4],
}
impl RefreshMetrics {
	/// Count recorded for `outcome`.
	pub fn count(&self, outcome: SessionOutcome) -> u64 {
		self.counts[slot(outcome)].load(Ordering::Relaxed)
	}

	/// Refresh exchanges started.
	pub fn attempts(&self) -> u64 {
		self.count(SessionOutcome::Attempt)
	}

	/// Refresh exchanges that produced a new pair.
	pub fn successes(&self) -> u64 {
		self.count(SessionOutcome::Success)
	}

	/// Refresh exchanges that ended the session.
	pub fn failures(&self) -> u64 {
		self.count(SessionOutcome::Failure)
	}

	/// Requests that waited on another request's refresh.
	pub fn queued(&self) -> u64 {
		self.count(SessionOutcome::Queued)
	}

	pub(crate) fn record(&self, outcome: SessionOutcome) {
		self.counts[slot(outcome)].fetch_add(1, Ordering::Relaxed);
	}
}

fn slot(outcome: SessionOutcome) -> usize {
	match outcome {
		SessionOutcome::Attempt => 0,
		SessionOutcome::Success => 1,
		SessionOutcome::Failure => 2,
		SessionOutcome::Queued => 3,
	}
}
