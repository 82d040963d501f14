// crates.io
use httpmock::prelude::*;
// self
use serenity_sdk::{
	_preludet::*,
	auth::{ScopeSet, TokenRecord},
	error::TransientError,
};

const TENANT: &str = "tenant-cc";
const CLIENT_ID: &str = "client-cc";
const CLIENT_SECRET: &str = "secret-cc";
const TOKEN_PATH: &str = "/tenant-cc/oauth2/v2.0/token";
const SCOPE: &str = "https://serenity-api-prod-eastus2.cloudwall.network/.default";

fn scope() -> ScopeSet {
	ScopeSet::new([SCOPE]).expect("Scope set should be valid for credential tests.")
}

#[tokio::test]
async fn token_request_posts_client_secret_and_scope() {
	let server = MockServer::start_async().await;
	let credential = build_reqwest_test_credential(&server.base_url(), TENANT, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "client_credentials")
				.form_urlencoded_tuple("client_id", CLIENT_ID)
				.form_urlencoded_tuple("client_secret", CLIENT_SECRET)
				.form_urlencoded_tuple("scope", SCOPE);
			then.status(200).header("content-type", "application/json").body(
				"{\"token_type\":\"Bearer\",\"expires_in\":3599,\"ext_expires_in\":3599,\"access_token\":\"aad-token\"}",
			);
		})
		.await;
	let record = credential.get_token(&scope()).await.expect("Token exchange should succeed.");

	assert_eq!(record.access_token.expose(), "aad-token");
	assert_eq!(record.scope, scope());
	assert_eq!(record.bearer(), "Bearer aad-token");

	mock.assert_async().await;
}

#[tokio::test]
async fn cached_token_is_reused() {
	let server = MockServer::start_async().await;
	let credential = build_reqwest_test_credential(&server.base_url(), TENANT, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"cached-token\",\"token_type\":\"Bearer\",\"expires_in\":1800}",
			);
		})
		.await;
	let first = credential.get_token(&scope()).await.expect("Initial token request should succeed.");
	let second =
		credential.clone().get_token(&scope()).await.expect("Cached token request should succeed.");

	assert_eq!(first.access_token.expose(), "cached-token");
	assert_eq!(second.expires_at, first.expires_at);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let credential = build_reqwest_test_credential(&server.base_url(), TENANT, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body("{\"access_token\":\"guard-token\",\"token_type\":\"Bearer\",\"expires_in\":900}");
		})
		.await;
	let scope = scope();
	let (first, second): (Result<TokenRecord>, Result<TokenRecord>) =
		tokio::join!(credential.get_token(&scope), credential.get_token(&scope));

	assert_eq!(first.expect("First concurrent call should succeed.").access_token.expose(), "guard-token");
	assert_eq!(second.expect("Second concurrent call should succeed.").access_token.expose(), "guard-token");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn near_expiry_and_forced_requests_refetch() {
	let server = MockServer::start_async().await;
	let credential = build_reqwest_test_credential(&server.base_url(), TENANT, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"short-token\",\"token_type\":\"Bearer\",\"expires_in\":30}",
			);
		})
		.await;

	credential.get_token(&scope()).await.expect("First token request should succeed.");
	// 30 s is inside the 60 s preemptive window.
	credential.get_token(&scope()).await.expect("Refresh inside the window should succeed.");

	mock.assert_calls_async(2).await;

	credential.get_token_forced(&scope()).await.expect("Forced request should succeed.");

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn bad_secret_maps_to_invalid_client() {
	let server = MockServer::start_async().await;
	let credential = build_reqwest_test_credential(&server.base_url(), TENANT, CLIENT_ID, "wrong");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"AADSTS7000215: Invalid client secret provided.\"}",
			);
		})
		.await;
	let err = credential
		.get_token(&scope())
		.await
		.expect_err("Invalid client errors should surface to the caller.");

	match err {
		Error::InvalidClient { reason } => assert!(reason.starts_with("invalid_client: AADSTS7000215")),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	mock.assert_async().await;
}

#[tokio::test]
async fn unknown_scope_maps_to_insufficient_scope() {
	let server = MockServer::start_async().await;
	let credential = build_reqwest_test_credential(&server.base_url(), TENANT, CLIENT_ID, CLIENT_SECRET);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_scope\",\"error_description\":\"AADSTS70011: The provided value for the input parameter 'scope' is not valid.\"}",
			);
		})
		.await;
	let err = credential.get_token(&scope()).await.expect_err("Invalid scope should fail.");

	assert!(matches!(err, Error::InsufficientScope { .. }));
}

#[tokio::test]
async fn throttled_endpoint_is_transient_with_retry_hint() {
	let server = MockServer::start_async().await;
	let credential = build_reqwest_test_credential(&server.base_url(), TENANT, CLIENT_ID, CLIENT_SECRET);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(503)
				.header("content-type", "application/json")
				.header("retry-after", "12")
				.body("{\"error\":\"temporarily_unavailable\"}");
		})
		.await;
	let err = credential.get_token(&scope()).await.expect_err("Throttled endpoint should fail.");

	match err {
		Error::Transient(TransientError::TokenEndpoint { status, retry_after, .. }) => {
			assert_eq!(status, Some(503));
			assert_eq!(retry_after, Some(Duration::seconds(12)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn failed_exchange_leaves_no_cached_token() {
	let server = MockServer::start_async().await;
	let credential = build_reqwest_test_credential(&server.base_url(), TENANT, CLIENT_ID, CLIENT_SECRET);
	let mut failing = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500).body("upstream exploded");
		})
		.await;

	assert!(credential.get_token(&scope()).await.is_err());

	failing.delete_async().await;

	let recovered = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"recovered\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let record = credential.get_token(&scope()).await.expect("Retry after failure should succeed.");

	assert_eq!(record.access_token.expose(), "recovered");

	recovered.assert_async().await;
}
