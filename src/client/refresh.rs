//! Refresh-token exchange with a singleflight guard, CAS rotation, and metrics.
//!
//! Every exchange runs under one async guard per refresher, so concurrent callers that hit an
//! expired token queue behind the first. A caller that acquires the guard after someone else
//! already rotated the token reuses the stored credentials instead of exchanging again.
//! Successful exchanges rotate access token, refresh token, and expiry in one
//! [`TokenStore::rotate`] call; rejected or failed exchanges never touch the store.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	api::HttpMethod,
	auth::{Credentials, TokenGrant},
	client,
	descriptor::ApiDescriptor,
	error::{ConfigError, TransportError},
	http::{ApiTransport, HttpRequest},
	obs::{self, OpKind, OpOutcome, OpSpan, trace_event},
	store::{CompareAndSwapOutcome, TokenStore},
};

/// Performs the `refresh_token` grant against the descriptor's token endpoint.
///
/// The refresher never retries on its own; callers decide whether a failed exchange is worth
/// another attempt.
pub struct TokenRefresher<T>
where
	T: ?Sized + ApiTransport,
{
	transport: Arc<T>,
	store: Arc<dyn TokenStore>,
	descriptor: ApiDescriptor,
	metrics: Arc<RefreshMetrics>,
	guard: Arc<AsyncMutex<()>>,
}
impl<T> TokenRefresher<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a refresher bound to a transport, store, and descriptor.
	pub fn new(transport: Arc<T>, store: Arc<dyn TokenStore>, descriptor: ApiDescriptor) -> Self {
		Self {
			transport,
			store,
			descriptor,
			metrics: Default::default(),
			guard: Default::default(),
		}
	}

	/// Returns the refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Exchanges the stored refresh token unconditionally.
	///
	/// On success the store holds the rotated credentials, which are also returned. A response
	/// carrying an `error` field yields [`Error::RefreshRejected`]; a response missing any of
	/// `access_token`, `refresh_token`, or `expires_in` yields a [`ConfigError`]. Neither case
	/// mutates the store.
	pub async fn refresh(&self) -> Result<Credentials> {
		self.run("refresh", None).await
	}

	/// Refreshes only when the stored access token expires within `window`.
	///
	/// Returns the stored credentials untouched when they are still fresh.
	pub async fn refresh_if_expiring(&self, window: Duration) -> Result<Credentials> {
		let current = self.load().await?;

		if !current.expires_within(OffsetDateTime::now_utc(), window) {
			return Ok(current);
		}

		self.run("refresh_if_expiring", Some(current.access_token.expose())).await
	}

	/// Refreshes unless the stored access token already differs from `stale_access`.
	pub(crate) async fn refresh_after(&self, stale_access: &str) -> Result<Credentials> {
		self.run("refresh_after", Some(stale_access)).await
	}

	async fn run(&self, stage: &'static str, stale_access: Option<&str>) -> Result<Credentials> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, stage);

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(self.refresh_guarded(stale_access)).await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_op_outcome(KIND, OpOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_op_outcome(KIND, OpOutcome::Failure);
			},
		}

		result
	}

	async fn refresh_guarded(&self, stale_access: Option<&str>) -> Result<Credentials> {
		let _singleflight = self.guard.lock().await;
		let current = self.load().await?;

		if stale_access.is_some_and(|stale| current.access_token.expose() != stale) {
			trace_event!(debug, "Reusing credentials rotated by a concurrent refresh.");
			self.metrics.record_reuse();

			return Ok(current);
		}

		let issued_at = OffsetDateTime::now_utc();
		let grant = self.exchange(&current).await?;
		let expires_at = grant.expires_at(issued_at)?;
		let outcome = self
			.store
			.rotate(current.refresh_token.expose(), grant.clone(), expires_at)
			.await?;

		match outcome {
			CompareAndSwapOutcome::Updated => Ok(current.rotated(&grant, expires_at)),
			CompareAndSwapOutcome::RefreshMismatch => {
				trace_event!(
					debug,
					"Refresh token changed during exchange; keeping stored credentials."
				);

				self.load().await
			},
			CompareAndSwapOutcome::Missing => Err(ConfigError::MissingCredentials.into()),
		}
	}

	async fn exchange(&self, current: &Credentials) -> Result<TokenGrant> {
		let body = form_urlencoded::Serializer::new(String::new())
			.append_pair("client_id", &current.client_id)
			.append_pair("client_secret", current.client_secret.expose())
			.append_pair("grant_type", "refresh_token")
			.append_pair("refresh_token", current.refresh_token.expose())
			.finish();
		let response = self
			.transport
			.execute(HttpRequest {
				method: HttpMethod::Post,
				url: self.descriptor.token_endpoint.clone(),
				headers: vec![
					("Content-Type".into(), "application/x-www-form-urlencoded".into()),
					("Accept".into(), "application/json".into()),
				],
				body: Some(body.into_bytes()),
			})
			.await?;
		let payload = match client::read_response(response) {
			Ok(payload) => payload,
			Err(Error::Transport(TransportError::Status { payload: Some(payload), .. }))
				if payload.error().is_some() =>
				payload,
			Err(e) => return Err(e),
		};

		if let Some(reason) = payload.error() {
			let reason = reason.to_owned();

			trace_event!(warn, reason = reason.as_str(), "Refresh token exchange was rejected.");

			return Err(Error::RefreshRejected { reason, payload });
		}

		Ok(TokenGrant::from_payload(&payload)?)
	}

	async fn load(&self) -> Result<Credentials> {
		Ok(self.store.load().await?.ok_or(ConfigError::MissingCredentials)?)
	}
}
impl<T> Clone for TokenRefresher<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			descriptor: self.descriptor.clone(),
			metrics: Arc::clone(&self.metrics),
			guard: Arc::clone(&self.guard),
		}
	}
}
impl<T> Debug for TokenRefresher<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefresher")
			.field("token_endpoint", &self.descriptor.token_endpoint.as_str())
			.field("metrics", &self.metrics)
			.finish()
	}
}
