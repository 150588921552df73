//! Immutable endpoint request descriptions and their builder.

// self
use crate::{_prelude::*, descriptor::ApiDescriptor, error::ConfigError};

/// HTTP verbs used by API endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	#[default]
	/// `GET`.
	Get,
	/// `POST`.
	Post,
}
impl HttpMethod {
	/// Returns the method token as sent on the wire.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable description of a single API call.
///
/// Query parameters keep insertion order and may repeat a key. The pipeline attaches the
/// bearer and content-type headers itself, so `headers` only carries endpoint extras.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointRequest {
	path: String,
	query: Vec<(String, String)>,
	method: HttpMethod,
	headers: Vec<(String, String)>,
	body: Option<Vec<u8>>,
}
impl EndpointRequest {
	/// Starts a `GET` request for `path` (relative to the API base, e.g. `/device/info`).
	pub fn get(path: impl Into<String>) -> EndpointRequestBuilder {
		EndpointRequestBuilder::new(HttpMethod::Get, path)
	}

	/// Starts a `POST` request for `path`.
	pub fn post(path: impl Into<String>) -> EndpointRequestBuilder {
		EndpointRequestBuilder::new(HttpMethod::Post, path)
	}

	/// Endpoint path relative to the API base.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Ordered query parameters.
	pub fn query(&self) -> &[(String, String)] {
		&self.query
	}

	/// HTTP method.
	pub fn method(&self) -> HttpMethod {
		self.method
	}

	/// Extra headers supplied by the endpoint constructor.
	pub fn headers(&self) -> &[(String, String)] {
		&self.headers
	}

	/// Optional request body.
	pub fn body(&self) -> Option<&[u8]> {
		self.body.as_deref()
	}

	/// Resolves the absolute URL against `descriptor`'s API base.
	pub fn url(&self, descriptor: &ApiDescriptor) -> Result<Url, ConfigError> {
		let mut url = descriptor.endpoint(&self.path)?;

		if !self.query.is_empty() {
			let mut pairs = url.query_pairs_mut();

			for (key, value) in &self.query {
				pairs.append_pair(key, value);
			}
		}

		Ok(url)
	}
}

/// Builder for [`EndpointRequest`].
#[derive(Clone, Debug)]
pub struct EndpointRequestBuilder {
	request: EndpointRequest,
}
impl EndpointRequestBuilder {
	fn new(method: HttpMethod, path: impl Into<String>) -> Self {
		Self {
			request: EndpointRequest {
				path: path.into(),
				query: Vec::new(),
				method,
				headers: Vec::new(),
				body: None,
			},
		}
	}

	/// Appends a query parameter; repeated keys are kept.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.request.query.push((key.into(), value.to_string()));

		self
	}

	/// Appends an extra header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.request.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the request body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.request.body = Some(body.into());

		self
	}

	/// Finalizes the request.
	pub fn build(self) -> EndpointRequest {
		self.request
	}
}
