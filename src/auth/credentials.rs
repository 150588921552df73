//! Client credentials and the current token pair owned by a
//! [`TokenStore`](crate::store::TokenStore).

// self
use crate::{
	_prelude::*,
	auth::{TokenGrant, TokenSecret},
};

/// Client identity plus the current access/refresh token pair.
///
/// Values are snapshots: the pipeline reads a fresh copy from the store for every dispatch
/// and never keeps one across calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Bearer token attached to API calls.
	pub access_token: TokenSecret,
	/// Long-lived token exchanged for new access tokens.
	pub refresh_token: TokenSecret,
	/// Instant after which the access token is no longer valid.
	pub expires_at: OffsetDateTime,
}
impl Credentials {
	/// Creates a credential set.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			expires_at,
		}
	}

	/// Returns `true` if the access token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the access token expires within `window` of `instant`.
	pub fn expires_within(&self, instant: OffsetDateTime, window: Duration) -> bool {
		let window = if window.is_negative() { Duration::ZERO } else { window };

		self.expires_at - instant <= window
	}

	/// Produces the credential set that results from applying `grant`, expiring at `expires_at`.
	///
	/// Client identity is carried over; both tokens come from the grant. Use
	/// [`TokenGrant::expires_at`] to derive `expires_at` from the exchange instant.
	pub fn rotated(&self, grant: &TokenGrant, expires_at: OffsetDateTime) -> Self {
		Self {
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
			access_token: grant.access_token.clone(),
			refresh_token: grant.refresh_token.clone(),
			expires_at,
		}
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
