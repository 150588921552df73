//! Bearer-authenticated request pipeline with a single, structurally bounded refresh-and-replay.
//!
//! [`AuthenticatedClient::call`] reads the current access token from the [`TokenStore`],
//! dispatches the request, and inspects the response for an error signal: a top-level `error`
//! field of a 2xx body, or the `error` field of a non-2xx error body. An `invalid_token` or
//! `expired_token` signal triggers exactly one refresh through [`TokenRefresher`]; when the
//! refresh succeeds the identical request is replayed once and the replay's result is
//! returned as-is. When the refresh fails the original result is returned unchanged.

pub mod refresh;

pub use refresh::*;

// self
use crate::{
	_prelude::*,
	api::{EndpointRequest, ErrorSignal, Payload},
	auth::Credentials,
	descriptor::ApiDescriptor,
	error::{ConfigError, MalformedResponse, TransportError},
	http::{ApiTransport, HttpRequest, HttpResponse},
	obs::{self, OpKind, OpOutcome, OpSpan, trace_event},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = AuthenticatedClient<ReqwestTransport>;

/// Position of a dispatch within one [`AuthenticatedClient::call`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
	/// First dispatch; an expiry signal may still trigger a refresh.
	Initial,
	/// Dispatch after a successful refresh; its result is final.
	Replay,
}

/// Wraps a transport and a token store, attaching bearer credentials to every call.
///
/// The client never caches credentials: each dispatch reads a fresh snapshot from the store,
/// so a rotation performed by any other client sharing the store is picked up immediately.
pub struct AuthenticatedClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Store owning the credential set.
	pub store: Arc<dyn TokenStore>,
	/// API server description.
	pub descriptor: ApiDescriptor,
	refresher: TokenRefresher<T>,
}
impl<T> AuthenticatedClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		transport: impl Into<Arc<T>>,
		store: Arc<dyn TokenStore>,
		descriptor: ApiDescriptor,
	) -> Self {
		let transport = transport.into();
		let refresher =
			TokenRefresher::new(Arc::clone(&transport), Arc::clone(&store), descriptor.clone());

		Self { transport, store, descriptor, refresher }
	}

	/// Returns the refresher shared by every call issued through this client.
	pub fn refresher(&self) -> &TokenRefresher<T> {
		&self.refresher
	}

	/// Returns the refresh counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.refresher.metrics()
	}

	/// Issues `request` with the current bearer token.
	///
	/// Returns the response document of a 2xx response, including documents whose `error`
	/// field carries a non-expiry signal. Non-2xx responses surface as
	/// [`TransportError::Status`] with the parsed error body attached, and unparsable bodies
	/// surface as [`MalformedResponse`].
	pub async fn call(&self, request: &EndpointRequest) -> Result<Payload> {
		const KIND: OpKind = OpKind::Call;

		let span = OpSpan::new(KIND, "call");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.call_with_single_retry(request)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn call_with_single_retry(&self, request: &EndpointRequest) -> Result<Payload> {
		let url = request.url(&self.descriptor)?;
		let mut attempt = Attempt::Initial;

		loop {
			let credentials = self.store.load().await?.ok_or(ConfigError::MissingCredentials)?;
			let outcome = self.dispatch(request, url.clone(), &credentials).await;

			if attempt == Attempt::Replay || !error_signal(&outcome).is_token_expired() {
				return outcome;
			}

			trace_event!(info, path = request.path(), "Access token rejected; refreshing once.");

			match self.refresher.refresh_after(credentials.access_token.expose()).await {
				Ok(_) => {
					trace_event!(debug, path = request.path(), "Replaying request after refresh.");

					attempt = Attempt::Replay;
				},
				Err(_) => {
					trace_event!(
						warn,
						path = request.path(),
						"Refresh failed; returning original result."
					);

					return outcome;
				},
			}
		}
	}

	async fn dispatch(
		&self,
		request: &EndpointRequest,
		url: Url,
		credentials: &Credentials,
	) -> Result<Payload> {
		let mut headers = vec![
			("Content-Type".to_owned(), "application/json".to_owned()),
			("Accept".to_owned(), "application/json".to_owned()),
			("Authorization".to_owned(), format!("Bearer {}", credentials.access_token.expose())),
		];

		headers.extend(request.headers().iter().cloned());

		let response = self
			.transport
			.execute(HttpRequest {
				method: request.method(),
				url,
				headers,
				body: request.body().map(<[u8]>::to_vec),
			})
			.await?;

		read_response(response)
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(store: Arc<dyn TokenStore>, descriptor: ApiDescriptor) -> Self {
		Self::with_transport(ReqwestTransport::default(), store, descriptor)
	}
}
impl<T> Clone for AuthenticatedClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			descriptor: self.descriptor.clone(),
			refresher: self.refresher.clone(),
		}
	}
}
impl<T> Debug for AuthenticatedClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("descriptor", &self.descriptor)
			.field("refresh_metrics", self.refresher.metrics())
			.finish()
	}
}

/// Converts a raw transport response into the pipeline's result shape.
pub(crate) fn read_response(response: HttpResponse) -> Result<Payload> {
	let success = response.is_success();
	let HttpResponse { status, body } = response;

	if success {
		return Payload::parse(&body).map_err(|source| {
			MalformedResponse { status: Some(status), source, transport: None }.into()
		});
	}
	if body.iter().all(u8::is_ascii_whitespace) {
		return Err(TransportError::Status { status, payload: None }.into());
	}

	match Payload::parse(&body) {
		Ok(payload) => Err(TransportError::Status { status, payload: Some(payload) }.into()),
		Err(source) => Err(MalformedResponse {
			status: Some(status),
			source,
			transport: Some(TransportError::Status { status, payload: None }),
		}
		.into()),
	}
}

/// Extracts the error signal from either a success document or a non-2xx error body.
pub(crate) fn error_signal(outcome: &Result<Payload>) -> ErrorSignal {
	match outcome {
		Ok(payload) => payload.signal(),
		Err(Error::Transport(err)) =>
			err.payload().map(Payload::signal).unwrap_or(ErrorSignal::Absent),
		Err(_) => ErrorSignal::Absent,
	}
}
