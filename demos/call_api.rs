//! Calls a mocked Serenity endpoint end to end: the client fetches an Azure AD token from a
//! mock authority, then reuses it for two API calls.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use serenity_sdk::{
	SerenityClientBuilder, SerenityConfig,
	environment::{Environment, Region},
	provider::IdentityAuthority,
	reqwest::Client,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/demo-tenant/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/refdata/asset/summaries");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({"result": [{"assetId": "btc", "symbol": "BTC"}]}));
		})
		.await;
	let config = SerenityConfig::from_json_str(
		&json!({
			"schemaVersion": 1,
			"tenantId": "demo-tenant",
			"clientId": "demo-client",
			"userApplicationId": "demo-app",
			"userApplicationSecret": "super-secret",
		})
		.to_string(),
	)?;
	let client = SerenityClientBuilder::new(&config)
		.env(Environment::Dev)
		.region(Region::UsPrimary)
		.authority(IdentityAuthority::parse(&server.base_url())?)
		.base_url(Url::parse(&server.url("/v1/"))?)
		.reqwest_client(
			Client::builder()
				.danger_accept_invalid_certs(true)
				.danger_accept_invalid_hostnames(true)
				.build()?,
		)
		.build()?;

	for _ in 0..2 {
		let summaries = client.call_api("refdata", "/asset/summaries", &[], None).await?;

		println!("Asset summaries: {summaries}.");
	}

	token_mock.assert_async().await;
	api_mock.assert_calls_async(2).await;

	Ok(())
}
