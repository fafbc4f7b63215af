//! Optional observability helpers for session handling.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `retail_bi_client.session` carrying `op`, `stage`, and
//!   the last recorded `outcome`, plus warning events when a refresh ends the session.
//! - Enable `metrics` to increment the `retail_bi_client_session_total` counter, labeled by `op`
//!   and `outcome`, and to sample the `retail_bi_client_refresh_waiters` histogram each time a
//!   refresh settles its queue.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Session operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionOp {
	/// Username/password login.
	Login,
	/// Refresh-token exchange after a 401.
	Refresh,
	/// Replay of a request that hit a 401.
	Replay,
	/// Credential wipe plus redirect.
	Logout,
	/// One dashboard poll.
	Poll,
}
impl SessionOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionOp::Login => "login",
			SessionOp::Refresh => "refresh",
			SessionOp::Replay => "replay",
			SessionOp::Logout => "logout",
			SessionOp::Poll => "poll",
		}
	}
}
impl Display for SessionOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionOutcome {
	/// Entry to a client helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Parked behind a refresh that another request started.
	Queued,
}
impl SessionOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionOutcome::Attempt => "attempt",
			SessionOutcome::Success => "success",
			SessionOutcome::Failure => "failure",
			SessionOutcome::Queued => "queued",
		}
	}
}
impl Display for SessionOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
