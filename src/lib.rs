//! Client library for the Serenity analytics REST API: local credential loading, Azure AD
//! client-credentials tokens scoped per environment/region, and authenticated GET/POST calls.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod credential;
pub mod environment;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ClientId, TenantId, TokenSecret},
		client::{SerenityClient, SerenityClientBuilder},
		config::SerenityConfig,
		credential::ClientSecretCredential,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		provider::IdentityAuthority,
	};

	/// Credential type alias used by reqwest-backed integration tests.
	pub type ReqwestTestCredential =
		ClientSecretCredential<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Wraps [`test_reqwest_client`] in the token transport.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::with_client(test_reqwest_client())
	}

	/// Parses a mock server URL into an [`IdentityAuthority`].
	pub fn test_authority(base: &str) -> IdentityAuthority {
		IdentityAuthority::parse(base).expect("Mock authority URL should be accepted.")
	}

	/// Constructs a credential that talks to a mock identity provider rooted at `authority`.
	pub fn build_reqwest_test_credential(
		authority: &str,
		tenant: &str,
		client_id: &str,
		client_secret: &str,
	) -> ReqwestTestCredential {
		ClientSecretCredential::with_http_client(
			TenantId::new(tenant).expect("Tenant fixture should be valid."),
			ClientId::new(client_id).expect("Client fixture should be valid."),
			TokenSecret::new(client_secret),
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
		.with_authority(test_authority(authority))
	}

	/// Builds a config fixture that passes validation.
	pub fn test_config(tenant: &str, client_id: &str, app_id: &str, secret: &str) -> SerenityConfig {
		SerenityConfig::from_value(serde_json::json!({
			"schemaVersion": 1,
			"tenantId": tenant,
			"clientId": client_id,
			"userApplicationId": app_id,
			"userApplicationSecret": secret,
		}))
		.expect("Config fixture should validate.")
	}

	/// Builds a client whose identity provider and API both live on the mock server.
	pub fn build_reqwest_test_client(server_base: &str, config: &SerenityConfig) -> SerenityClient {
		SerenityClientBuilder::new(config)
			.authority(test_authority(server_base))
			.base_url(
				Url::parse(&format!("{}/v1/", server_base.trim_end_matches('/')))
					.expect("Mock API base URL should parse."),
			)
			.reqwest_client(test_reqwest_client())
			.build()
			.expect("Test client should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use client::{SerenityClient, SerenityClientBuilder};
pub use config::{SerenityConfig, load_config_file, load_local_config};
pub use credential::{ClientSecretCredential, create_auth_headers, get_credential_user_app};
pub use environment::{Environment, Region, SERENITY_API_VERSION, api_base_url, get_scopes};
pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
