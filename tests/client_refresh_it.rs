mod support;

// self
use oauth2_relay::{
	api::{EndpointRequest, ErrorSignal},
	error::{ConfigError, Error, TransportError},
	store::{MemoryStore, TokenStore},
};
use support::*;

const EXPIRED: &str = r#"{"error":"expired_token"}"#;
const GRANT: &str = r#"{"access_token":"A2","refresh_token":"R2","expires_in":"3600"}"#;
const SUCCESS: &str = r#"{"status":"success"}"#;

fn command() -> EndpointRequest {
	EndpointRequest::get("/device/command").query("id", 5).query("method", 1).build()
}

fn body_text(body: Option<&Vec<u8>>) -> String {
	String::from_utf8(body.cloned().unwrap_or_default()).expect("Request body should be UTF-8.")
}

#[tokio::test]
async fn expired_token_refreshes_once_and_replays_original_request() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(200, EXPIRED).respond(200, GRANT).respond(200, SUCCESS);

	let result = client.call(&command()).await.expect("Replayed call should succeed.");

	assert_eq!(result, payload(SUCCESS));
	assert_eq!(tokens(&store), ("A2".to_owned(), "R2".to_owned()));

	let requests = transport.requests();

	assert_eq!(requests.len(), 3);
	assert_eq!(requests[0].header("Authorization"), Some("Bearer A1"));
	assert_eq!(requests[0].header("Content-Type"), Some("application/json"));
	assert_eq!(
		requests[0].url.as_str(),
		"https://api.example.com/oauth2/device/command?id=5&method=1"
	);
	assert_eq!(requests[1].url.as_str(), "https://api.example.com/oauth2/accessToken");
	assert_eq!(requests[1].method.as_str(), "POST");

	let refresh_body = body_text(requests[1].body.as_ref());

	assert!(refresh_body.contains("grant_type=refresh_token"));
	assert!(refresh_body.contains("refresh_token=R1"));
	assert!(refresh_body.contains(&format!("client_id={CLIENT_ID}")));
	assert!(refresh_body.contains(&format!("client_secret={CLIENT_SECRET}")));
	assert_eq!(requests[2].url, requests[0].url);
	assert_eq!(requests[2].header("Authorization"), Some("Bearer A2"));
	assert_eq!(client.refresh_metrics().attempts(), 1);
	assert_eq!(client.refresh_metrics().successes(), 1);
}

#[tokio::test]
async fn rejected_refresh_surfaces_original_result_and_keeps_store() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(200, EXPIRED).respond(200, r#"{"error":"invalid_grant"}"#);

	let result = client.call(&command()).await.expect("Original response should be returned.");

	assert_eq!(result, payload(EXPIRED));
	assert_eq!(tokens(&store), ("A1".to_owned(), "R1".to_owned()));
	assert_eq!(transport.requests().len(), 2);
	assert_eq!(client.refresh_metrics().failures(), 1);
}

#[tokio::test]
async fn nested_error_body_of_non_success_response_triggers_refresh() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport
		.respond(401, r#"{"error":"Invalid_Token"}"#)
		.respond(200, GRANT)
		.respond(200, SUCCESS);

	let result = client.call(&command()).await.expect("Replayed call should succeed.");

	assert_eq!(result, payload(SUCCESS));
	assert_eq!(transport.count_path("/accessToken"), 1);
	assert_eq!(tokens(&store).0, "A2");
}

#[tokio::test]
async fn failed_refresh_after_non_success_response_returns_original_error() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(401, r#"{"error":"expired_token"}"#).fail();

	let err = client.call(&command()).await.expect_err("Original 401 should be surfaced.");

	match err {
		Error::Transport(TransportError::Status { status, payload: Some(body) }) => {
			assert_eq!(status, 401);
			assert_eq!(body.signal(), ErrorSignal::TokenExpired("expired_token".into()));
		},
		other => panic!("Expected the original 401, got {other:?}."),
	}

	assert_eq!(tokens(&store), ("A1".to_owned(), "R1".to_owned()));
}

#[tokio::test]
async fn replay_result_is_final_even_when_it_also_expires() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(200, EXPIRED).respond(200, GRANT).respond(200, EXPIRED);

	let result = client.call(&command()).await.expect("Replay response should be returned.");

	assert_eq!(result, payload(EXPIRED));
	assert_eq!(transport.requests().len(), 3);
	assert_eq!(transport.count_path("/accessToken"), 1);
	assert_eq!(client.refresh_metrics().attempts(), 1);
}

#[tokio::test]
async fn incomplete_refresh_grant_never_touches_the_store() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport
		.respond(200, EXPIRED)
		.respond(200, r#"{"access_token":"A2","refresh_token":"R2"}"#);

	let result = client.call(&command()).await.expect("Original response should be returned.");

	assert_eq!(result, payload(EXPIRED));
	assert_eq!(tokens(&store), ("A1".to_owned(), "R1".to_owned()));
	assert_eq!(client.refresh_metrics().failures(), 1);
}

#[tokio::test]
async fn unrepresentable_expiry_is_a_refresh_failure() {
	const HUGE: &str =
		r#"{"access_token":"A2","refresh_token":"R2","expires_in":"9000000000000"}"#;

	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(200, EXPIRED).respond(200, HUGE).respond(200, HUGE);

	let result = client.call(&command()).await.expect("Original response should be returned.");

	assert_eq!(result, payload(EXPIRED));
	assert_eq!(tokens(&store), ("A1".to_owned(), "R1".to_owned()));
	assert!(matches!(
		client.refresher().refresh().await,
		Err(Error::Config(ConfigError::ExpiresInOutOfRange))
	));
	assert_eq!(tokens(&store), ("A1".to_owned(), "R1".to_owned()));
	assert_eq!(transport.remaining(), 0);
	assert_eq!(client.refresh_metrics().failures(), 2);
}

#[tokio::test]
async fn refresh_network_failure_returns_original_result() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(200, EXPIRED).fail();

	let result = client.call(&command()).await.expect("Original response should be returned.");

	assert_eq!(result, payload(EXPIRED));
	assert_eq!(transport.requests().len(), 2);
	assert_eq!(transport.remaining(), 0);
	assert_eq!(tokens(&store), ("A1".to_owned(), "R1".to_owned()));
}

#[tokio::test]
async fn refresh_errors_are_reported_directly_by_the_refresher() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport
		.respond(400, r#"{"error":"invalid_grant"}"#)
		.respond(200, r#"{"access_token":"A2","refresh_token":"R2","expires_in":"-5"}"#)
		.respond(200, GRANT);

	match client.refresher().refresh().await {
		Err(Error::RefreshRejected { reason, .. }) => assert_eq!(reason, "invalid_grant"),
		other => panic!("Expected a rejected refresh, got {other:?}."),
	}

	assert!(matches!(
		client.refresher().refresh().await,
		Err(Error::Config(ConfigError::NonPositiveExpiresIn))
	));
	assert_eq!(tokens(&store), ("A1".to_owned(), "R1".to_owned()));

	let rotated = client.refresher().refresh().await.expect("Valid grant should rotate.");

	assert_eq!(rotated.access_token.expose(), "A2");
	assert_eq!(tokens(&store), ("A2".to_owned(), "R2".to_owned()));
	assert_eq!(client.refresh_metrics().attempts(), 3);
	assert_eq!(client.refresh_metrics().failures(), 2);
}

#[tokio::test]
async fn non_expiry_errors_pass_through_without_refresh() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(200, r#"{"error":"device_offline"}"#).respond(500, "");

	let result = client.call(&command()).await.expect("2xx documents should be returned.");

	assert_eq!(result.error(), Some("device_offline"));

	let err = client.call(&command()).await.expect_err("Empty 500 should fail.");

	assert_eq!(err.status(), Some(500));
	assert_eq!(transport.count_path("/accessToken"), 0);
	assert_eq!(client.refresh_metrics().attempts(), 0);
}

#[tokio::test]
async fn malformed_bodies_surface_without_refresh() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(200, "<html>maintenance</html>");

	let err = client.call(&command()).await.expect_err("HTML body should be malformed.");

	assert!(matches!(err, Error::MalformedResponse(_)));
	assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn missing_credentials_fail_before_any_request() {
	let store = std::sync::Arc::new(MemoryStore::default());
	let (transport, client) = scripted_client(&store);
	let err = client.call(&command()).await.expect_err("Empty store should fail.");

	assert!(matches!(err, Error::Config(ConfigError::MissingCredentials)));
	assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn preemptive_refresh_only_runs_inside_the_window() {
	let store = seeded_store("A1", "R1");
	let (transport, client) = scripted_client(&store);

	transport.respond(200, GRANT);

	let fresh = client
		.refresher()
		.refresh_if_expiring(time::Duration::seconds(20))
		.await
		.expect("Fresh credentials should be returned untouched.");

	assert_eq!(fresh.access_token.expose(), "A1");
	assert!(transport.requests().is_empty());

	let mut expiring = credentials("A1", "R1");

	expiring.expires_at = time::OffsetDateTime::now_utc() + time::Duration::seconds(10);
	store.save(expiring).await.expect("Expiring credentials should be saved.");

	let rotated = client
		.refresher()
		.refresh_if_expiring(time::Duration::seconds(20))
		.await
		.expect("Expiring credentials should be refreshed.");

	assert_eq!(rotated.access_token.expose(), "A2");
	assert_eq!(transport.count_path("/accessToken"), 1);
}
