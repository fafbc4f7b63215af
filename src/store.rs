//! Session storage contracts and built-in store implementations for the credential pair.

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
};

/// Storage backend contract for session credentials.
///
/// Mirrors the browser's session storage: synchronous, string-valued, and keyed by
/// [`SessionKey`]. A missing key means the session is unauthenticated.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if present.
	fn get(&self, key: SessionKey) -> Result<Option<TokenSecret>, StoreError>;

	/// Stores or replaces the value under `key`.
	fn set(&self, key: SessionKey, value: TokenSecret) -> Result<(), StoreError>;

	/// Removes the value under `key`; removing a missing key is not an error.
	fn remove(&self, key: SessionKey) -> Result<(), StoreError>;

	/// Persists both halves of a freshly issued pair.
	fn save_pair(&self, pair: &TokenPair) -> Result<(), StoreError> {
		self.set(SessionKey::AccessToken, pair.access_token.clone())?;
		self.set(SessionKey::RefreshToken, pair.refresh_token.clone())
	}

	/// Drops both credentials.
	fn clear(&self) -> Result<(), StoreError> {
		self.remove(SessionKey::AccessToken)?;
		self.remove(SessionKey::RefreshToken)
	}
}

/// Storage keys used for the session credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionKey {
	/// Access token, stored as `token`.
	AccessToken,
	/// Refresh token, stored as `refresh_token`.
	RefreshToken,
}
impl SessionKey {
	/// Every key managed by the client.
	pub const ALL: [SessionKey; 2] = [SessionKey::AccessToken, SessionKey::RefreshToken];

	/// Returns the storage key name.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionKey::AccessToken => "token",
			SessionKey::RefreshToken => "refresh_token",
		}
	}
}
impl Display for SessionKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
