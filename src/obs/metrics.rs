// self
use crate::obs::{SessionOp, SessionOutcome};

/// Increments `retail_bi_client_session_total{op, outcome}` when the `metrics` feature is on.
pub fn record_session_outcome(op: SessionOp, outcome: SessionOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"retail_bi_client_session_total",
		"op" => op.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (op, outcome);
}

/// Samples how many requests received the outcome of one refresh exchange.
pub fn record_refresh_waiters(waiters: usize) {
	#[cfg(feature = "metrics")]
	metrics::histogram!("retail_bi_client_refresh_waiters").record(waiters as f64);
	#[cfg(not(feature = "metrics"))]
	let _ = waiters;
}
