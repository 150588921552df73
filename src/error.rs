//! Crate-level error types shared by the request pipeline, refresher, and stores.

// self
use crate::{_prelude::*, api::Payload};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure or non-success HTTP status.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be parsed as a JSON document.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponse),

	/// The refresh endpoint answered with an `error` field.
	#[error("Refresh token exchange was rejected: {reason}.")]
	RefreshRejected {
		/// Value of the `error` field.
		reason: String,
		/// Full response document as returned by the API.
		payload: Payload,
	},
}
impl Error {
	/// Returns the HTTP status attached to the failure, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Transport(TransportError::Status { status, .. }) => Some(*status),
			Self::MalformedResponse(err) => err.status,
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// An endpoint URL could not be derived from the descriptor.
	#[error("Endpoint `{path}` cannot be joined onto the API base URL.")]
	InvalidEndpoint {
		/// Endpoint path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},

	/// No credentials are available in the token store.
	#[error("No stored credentials are available.")]
	MissingCredentials,
	/// Refresh response omitted one of the mandatory fields.
	#[error("Refresh response is missing the `{field}` field.")]
	MissingGrantField {
		/// Name of the absent field.
		field: &'static str,
	},
	/// Refresh response carried an `expires_in` that is not an integer.
	#[error("The expires_in value `{value}` is not a whole number of seconds.")]
	InvalidExpiresIn {
		/// Raw value as returned by the API.
		value: String,
	},
	/// Refresh response carried a non-positive `expires_in`.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Refresh response carried an `expires_in` too large to produce a valid expiry instant.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Poll schedule would never tick.
	#[error("Poll interval and maximum wait must both be positive.")]
	InvalidPollSchedule,
}

/// Transport-level failures: network errors and non-success HTTP statuses.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// API answered with a non-success HTTP status.
	#[error("API responded with HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Parsed JSON error body, when the response carried one.
		payload: Option<Payload>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns the parsed error body of a non-success response.
	pub fn payload(&self) -> Option<&Payload> {
		match self {
			Self::Status { payload, .. } => payload.as_ref(),
			_ => None,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Response body that could not be parsed as a JSON object.
#[derive(Debug, ThisError)]
#[error("API returned a malformed response body.")]
pub struct MalformedResponse {
	/// HTTP status code of the response.
	pub status: Option<u16>,
	/// Structured parsing failure.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
	/// Transport failure the body belonged to (non-success responses only).
	pub transport: Option<TransportError>,
}
