//! Parsed refresh-token exchange results.

// self
use crate::{_prelude::*, api::Payload, auth::TokenSecret, error::ConfigError};

/// Token material returned by a successful `refresh_token` exchange.
///
/// All three fields are mandatory; a response missing any of them never reaches the store.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token.
	pub refresh_token: TokenSecret,
	/// Lifetime of the access token relative to the exchange.
	pub expires_in: Duration,
}
impl TokenGrant {
	/// Extracts `access_token`, `refresh_token`, and `expires_in` from a refresh response.
	///
	/// `expires_in` is accepted both as a JSON number and as a decimal string, since the API
	/// has been observed to send either.
	pub fn from_payload(payload: &Payload) -> Result<Self, ConfigError> {
		let access_token = required_text(payload, "access_token")?;
		let refresh_token = required_text(payload, "refresh_token")?;
		let raw_expires_in = required_text(payload, "expires_in")?;
		let seconds = raw_expires_in
			.trim()
			.parse::<i64>()
			.map_err(|_| ConfigError::InvalidExpiresIn { value: raw_expires_in.clone() })?;

		if seconds <= 0 {
			return Err(ConfigError::NonPositiveExpiresIn);
		}

		Ok(Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			expires_in: Duration::seconds(seconds),
		})
	}

	/// Absolute expiry of the granted access token when exchanged at `issued_at`.
	///
	/// Fails with [`ConfigError::ExpiresInOutOfRange`] when the sum is not a representable
	/// date, so a hostile or broken `expires_in` never reaches the store.
	pub fn expires_at(&self, issued_at: OffsetDateTime) -> Result<OffsetDateTime, ConfigError> {
		issued_at.checked_add(self.expires_in).ok_or(ConfigError::ExpiresInOutOfRange)
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

fn required_text(payload: &Payload, field: &'static str) -> Result<String, ConfigError> {
	payload
		.text(field)
		.filter(|value| !value.is_empty())
		.map(|value| value.into_owned())
		.ok_or(ConfigError::MissingGrantField { field })
}
