//! API server descriptor shared by the request pipeline and the token refresher.
//!
//! The descriptor pins the HTTPS API server, the base path every endpoint lives under
//! (`/oauth2` by default), and the refresh-token endpoint (`/oauth2/accessToken`).

/// Builder API for assembling API descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Immutable, validated description of the remote API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// API server root (scheme + host, optionally a path prefix).
	pub api_server: Url,
	/// Base URL every endpoint path is resolved against; always ends with `/`.
	pub base: Url,
	/// Refresh-token exchange endpoint.
	pub token_endpoint: Url,
}
impl ApiDescriptor {
	/// Creates a new builder for the provided API server.
	pub fn builder(api_server: Url) -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new(api_server)
	}

	/// Resolves an endpoint path (with or without a leading `/`) against the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.base
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })
	}
}
