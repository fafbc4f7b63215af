//! Span plumbing for session operations; without the `tracing` feature every item is inert.

// self
use crate::{
	_prelude::*,
	obs::{self, SessionOp, SessionOutcome},
};

#[cfg(feature = "tracing")]
type SpanHandle = tracing::Span;
#[cfg(not(feature = "tracing"))]
type SpanHandle = ();

#[cfg(feature = "tracing")]
/// Future returned by [`SessionSpan::instrument`].
pub type InstrumentedSession<F> = tracing::instrument::Instrumented<F>;
#[cfg(not(feature = "tracing"))]
/// Future returned by [`SessionSpan::instrument`].
pub type InstrumentedSession<F> = F;

/// Span covering one login, refresh, replay, logout, or poll.
///
/// Outcomes recorded through [`SessionSpan::record`] land both on the span's `outcome` field and
/// in the `retail_bi_client_session_total` counter.
#[derive(Clone, Debug)]
pub struct SessionSpan {
	op: SessionOp,
	handle: SpanHandle,
}
impl SessionSpan {
	/// Opens a `retail_bi_client.session` span for `op` at call site `stage`.
	pub fn new(op: SessionOp, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		let handle = tracing::info_span!(
			"retail_bi_client.session",
			op = op.as_str(),
			stage,
			outcome = tracing::field::Empty,
		);
		#[cfg(not(feature = "tracing"))]
		let handle = {
			let _ = stage;
		};

		Self { op, handle }
	}

	/// Operation this span belongs to.
	pub fn op(&self) -> SessionOp {
		self.op
	}

	/// Records `outcome`; the last recorded outcome wins on the span.
	pub fn record(&self, outcome: SessionOutcome) {
		#[cfg(feature = "tracing")]
		self.handle.record("outcome", outcome.as_str());

		obs::record_session_outcome(self.op, outcome);
	}

	/// Runs `f` inside the span.
	pub fn in_scope<F, R>(&self, f: F) -> R
	where
		F: FnOnce() -> R,
	{
		#[cfg(feature = "tracing")]
		{
			self.handle.in_scope(f)
		}
		#[cfg(not(feature = "tracing"))]
		{
			f()
		}
	}

	/// Attaches the span to `fut`.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedSession<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.handle.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning event when tracing is enabled.
pub(crate) fn record_warning(op: SessionOp, message: &str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(op = op.as_str(), error = %error, "{message}");
	#[cfg(not(feature = "tracing"))]
	let _ = (op, message, error);
}
