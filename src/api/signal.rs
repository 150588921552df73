//! Classification of the `error` field carried by API responses.

// self
use crate::_prelude::*;

/// Classification of the `error` field carried by an API response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorSignal {
	/// No (or an empty) `error` field.
	Absent,
	/// `invalid_token` or `expired_token`, compared case-insensitively.
	TokenExpired(String),
	/// Any other error value.
	Other(String),
}
impl ErrorSignal {
	/// Classifies a raw `error` value.
	pub fn classify(value: Option<&str>) -> Self {
		match value {
			None => Self::Absent,
			Some(value) if value.is_empty() => Self::Absent,
			Some(value)
				if value.eq_ignore_ascii_case("invalid_token")
					|| value.eq_ignore_ascii_case("expired_token") =>
				Self::TokenExpired(value.to_owned()),
			Some(value) => Self::Other(value.to_owned()),
		}
	}

	/// Returns `true` when the signal asks for a token refresh.
	pub fn is_token_expired(&self) -> bool {
		matches!(self, Self::TokenExpired(_))
	}

	/// Returns the raw error value, if any.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Absent => None,
			Self::TokenExpired(value) | Self::Other(value) => Some(value),
		}
	}
}
impl Display for ErrorSignal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str().unwrap_or("none"))
	}
}
