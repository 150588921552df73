//! Shared fixtures for integration tests: a scripted in-memory transport and seeded stores.

#![allow(dead_code)]

// std
use std::{collections::VecDeque, io, sync::Arc};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use oauth2_relay::{
	api::Payload,
	auth::Credentials,
	client::AuthenticatedClient,
	descriptor::ApiDescriptor,
	error::TransportError,
	http::{ApiTransport, HttpRequest, HttpResponse, TransportFuture},
	store::{MemoryStore, TokenStore},
	url::Url,
};

pub const CLIENT_ID: &str = "client-relay";
pub const CLIENT_SECRET: &str = "secret-relay";

enum Reply {
	Respond(HttpResponse),
	Fail,
}

/// Transport that answers from a FIFO script and records every request it sees.
///
/// Running out of scripted replies yields an I/O error so unexpected extra calls surface as
/// failures instead of hanging.
#[derive(Default)]
pub struct ScriptedTransport {
	replies: Mutex<VecDeque<Reply>>,
	requests: Mutex<Vec<HttpRequest>>,
}
impl ScriptedTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Queues a response with the given status and body.
	pub fn respond(&self, status: u16, body: &str) -> &Self {
		self.replies.lock().push_back(Reply::Respond(HttpResponse::new(status, body)));

		self
	}

	/// Queues a network failure.
	pub fn fail(&self) -> &Self {
		self.replies.lock().push_back(Reply::Fail);

		self
	}

	pub fn requests(&self) -> Vec<HttpRequest> {
		self.requests.lock().clone()
	}

	/// Number of recorded requests whose path ends with `suffix`.
	pub fn count_path(&self, suffix: &str) -> usize {
		self.requests.lock().iter().filter(|request| request.url.path().ends_with(suffix)).count()
	}

	pub fn remaining(&self) -> usize {
		self.replies.lock().len()
	}
}
impl ApiTransport for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponse> {
		self.requests.lock().push(request);

		let reply = self.replies.lock().pop_front();

		Box::pin(async move {
			match reply {
				Some(Reply::Respond(response)) => Ok(response),
				Some(Reply::Fail) =>
					Err(TransportError::network(io::Error::other("scripted network failure"))),
				None => Err(TransportError::network(io::Error::other("no scripted reply left"))),
			}
		})
	}
}

pub fn descriptor() -> ApiDescriptor {
	ApiDescriptor::builder(
		Url::parse("https://api.example.com").expect("Fixture API server should parse."),
	)
	.build()
	.expect("Fixture descriptor should build.")
}

pub fn credentials(access: &str, refresh: &str) -> Credentials {
	Credentials::new(
		CLIENT_ID,
		CLIENT_SECRET,
		access,
		refresh,
		OffsetDateTime::now_utc() + Duration::hours(1),
	)
}

pub fn seeded_store(access: &str, refresh: &str) -> Arc<MemoryStore> {
	Arc::new(MemoryStore::with_credentials(credentials(access, refresh)))
}

/// Builds a client over a fresh scripted transport that shares `store`.
pub fn scripted_client(
	store: &Arc<MemoryStore>,
) -> (Arc<ScriptedTransport>, AuthenticatedClient<ScriptedTransport>) {
	let transport = ScriptedTransport::new();
	let store: Arc<dyn TokenStore> = store.clone();
	let client = AuthenticatedClient::with_transport(transport.clone(), store, descriptor());

	(transport, client)
}

pub fn payload(json: &str) -> Payload {
	json.parse().expect("Payload fixture should parse.")
}

/// Access and refresh tokens currently held by `store`.
pub fn tokens(store: &MemoryStore) -> (String, String) {
	let credentials = store.snapshot().expect("Store should hold credentials.");

	(credentials.access_token.expose().to_owned(), credentials.refresh_token.expose().to_owned())
}
