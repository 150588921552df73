//! Storage contracts and built-in credential store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenGrant},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Owner of the single credential set used by the request pipeline.
///
/// Readers always receive a full snapshot, and [`rotate`](TokenStore::rotate) replaces the
/// access token, refresh token, and expiry together so no reader ever observes a new refresh
/// token paired with a stale access token.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the current credential snapshot, if any.
	fn load(&self) -> StoreFuture<'_, Option<Credentials>>;

	/// Persists or replaces the credential set.
	fn save(&self, credentials: Credentials) -> StoreFuture<'_, ()>;

	/// Applies `grant` with expiry `expires_at` if the stored refresh token still equals
	/// `expected_refresh`.
	fn rotate<'a>(
		&'a self,
		expected_refresh: &'a str,
		grant: TokenGrant,
		expires_at: OffsetDateTime,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Removes the stored credentials, returning the previous snapshot.
	fn clear(&self) -> StoreFuture<'_, Option<Credentials>>;
}

/// Result of a refresh-token compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh secret matched the expected value and the record was updated.
	Updated,
	/// Credentials exist but the expected refresh secret did not match.
	RefreshMismatch,
	/// No credentials are stored.
	Missing,
}

/// Error type produced by [`TokenStore`] implementations.
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

/// Compare-and-swap core shared by the built-in stores.
fn rotate_in_place(
	slot: &mut Option<Credentials>,
	expected_refresh: &str,
	grant: &TokenGrant,
	expires_at: OffsetDateTime,
) -> CompareAndSwapOutcome {
	match slot {
		Some(current) if current.refresh_token.expose() == expected_refresh => {
			*current = current.rotated(grant, expires_at);

			CompareAndSwapOutcome::Updated
		},
		Some(_) => CompareAndSwapOutcome::RefreshMismatch,
		None => CompareAndSwapOutcome::Missing,
	}
}
