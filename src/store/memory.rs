//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenGrant},
	store::{self, CompareAndSwapOutcome, StoreFuture, TokenStore},
};

type Slot = Arc<RwLock<Option<Credentials>>>;

/// Storage backend that keeps the credential set in-process.
///
/// Clones share the same slot, so a test can keep one handle for assertions while the client
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store seeded with `credentials`.
	pub fn with_credentials(credentials: Credentials) -> Self {
		Self(Arc::new(RwLock::new(Some(credentials))))
	}

	/// Returns the current snapshot without going through the async contract.
	pub fn snapshot(&self) -> Option<Credentials> {
		self.0.read().clone()
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<Credentials>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, credentials: Credentials) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(credentials);

			Ok(())
		})
	}

	fn rotate<'a>(
		&'a self,
		expected_refresh: &'a str,
		grant: TokenGrant,
		expires_at: OffsetDateTime,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let slot = self.0.clone();

		Box::pin(async move {
			Ok(store::rotate_in_place(&mut slot.write(), expected_refresh, &grant, expires_at))
		})
	}

	fn clear(&self) -> StoreFuture<'_, Option<Credentials>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.write().take()) })
	}
}
