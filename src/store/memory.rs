//! Process-scoped [`SessionStore`] whose contents vanish with the process.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{SessionKey, SessionStore, StoreError},
};

/// Thread-safe session storage kept in-process, the default for every client.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore(Arc<RwLock<HashMap<SessionKey, TokenSecret>>>);
impl MemorySessionStore {
	/// Creates a store seeded with an existing access/refresh pair.
	pub fn with_tokens(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		let store = Self::default();
		{
			let mut map = store.0.write();

			map.insert(SessionKey::AccessToken, access.into());
			map.insert(SessionKey::RefreshToken, refresh.into());
		}

		store
	}
}
impl SessionStore for MemorySessionStore {
	fn get(&self, key: SessionKey) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.0.read().get(&key).cloned())
	}

	fn set(&self, key: SessionKey, value: TokenSecret) -> Result<(), StoreError> {
		self.0.write().insert(key, value);

		Ok(())
	}

	fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
		self.0.write().remove(&key);

		Ok(())
	}
}
