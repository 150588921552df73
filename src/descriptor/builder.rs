// self
use crate::{_prelude::*, descriptor::ApiDescriptor};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ApiDescriptorError {
	/// API server must use HTTPS.
	#[error("The API server must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// URL that failed validation.
		url: String,
	},
	/// API server URL must not carry a query or fragment.
	#[error("The API server URL must not carry a query or fragment: {url}.")]
	UnexpectedQuery {
		/// URL that failed validation.
		url: String,
	},
	/// A configured path could not be joined onto the server URL.
	#[error("The `{path}` path cannot be joined onto the API server URL.")]
	InvalidPath {
		/// Path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug)]
pub struct ApiDescriptorBuilder {
	/// API server root.
	pub api_server: Url,
	/// Path every endpoint lives under.
	pub base_path: String,
	/// Refresh endpoint path relative to `base_path`.
	pub token_path: String,
}
impl ApiDescriptorBuilder {
	const DEFAULT_BASE_PATH: &'static str = "oauth2";
	const DEFAULT_TOKEN_PATH: &'static str = "accessToken";

	/// Creates a new builder seeded with the API server root.
	pub fn new(api_server: Url) -> Self {
		Self {
			api_server,
			base_path: Self::DEFAULT_BASE_PATH.into(),
			token_path: Self::DEFAULT_TOKEN_PATH.into(),
		}
	}

	/// Overrides the base path (defaults to `oauth2`).
	pub fn base_path(mut self, path: impl Into<String>) -> Self {
		self.base_path = path.into();

		self
	}

	/// Overrides the refresh endpoint path (defaults to `accessToken`).
	pub fn token_path(mut self, path: impl Into<String>) -> Self {
		self.token_path = path.into();

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let mut api_server = self.api_server;

		if api_server.scheme() != "https" {
			return Err(ApiDescriptorError::InsecureEndpoint { url: api_server.to_string() });
		}
		if api_server.query().is_some() || api_server.fragment().is_some() {
			return Err(ApiDescriptorError::UnexpectedQuery { url: api_server.to_string() });
		}
		if !api_server.path().ends_with('/') {
			let path = format!("{}/", api_server.path());

			api_server.set_path(&path);
		}

		let base_path = format!("{}/", self.base_path.trim_matches('/'));
		let base = api_server
			.join(&base_path)
			.map_err(|source| ApiDescriptorError::InvalidPath { path: self.base_path, source })?;
		let token_endpoint = base
			.join(self.token_path.trim_start_matches('/'))
			.map_err(|source| ApiDescriptorError::InvalidPath { path: self.token_path, source })?;

		Ok(ApiDescriptor { api_server, base, token_endpoint })
	}
}
