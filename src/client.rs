//! Authenticated access to the Serenity REST API.
//!
//! A [`SerenityClient`] owns one credential and one scope set for its environment/region.
//! Every call asks the credential for a token, so tokens are fetched lazily and replaced
//! shortly before they expire.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, UserApplicationId},
	config::SerenityConfig,
	credential::{self, ReqwestCredential},
	environment::{self, Environment, Region, SERENITY_API_VERSION},
	error::{ConfigError, TransientError, TransportError},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	obs::{self, OpKind, OpOutcome, OpSpan},
	provider::IdentityAuthority,
};

/// Per-request timeout applied when the builder does not override it.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Client for one Serenity deployment (environment + region).
///
/// Cloning is cheap; clones share the connection pool and the token cache.
#[derive(Clone, Debug)]
pub struct SerenityClient {
	env: Environment,
	region: Region,
	version: &'static str,
	base_url: Url,
	scopes: ScopeSet,
	user_application_id: UserApplicationId,
	credential: ReqwestCredential,
	http: ReqwestClient,
	timeout: StdDuration,
}
impl SerenityClient {
	/// Builds a client for `env`/`region` from a validated configuration.
	///
	/// No token is requested until the first call; use [`SerenityClient::connect`] to surface
	/// credential problems immediately.
	pub fn new(config: &SerenityConfig, env: Environment, region: Region) -> Result<Self> {
		SerenityClientBuilder::new(config).env(env).region(region).build()
	}

	/// Builds a client and acquires its first token.
	pub async fn connect(config: &SerenityConfig, env: Environment, region: Region) -> Result<Self> {
		SerenityClientBuilder::new(config).env(env).region(region).connect().await
	}

	/// Deployment environment.
	pub fn env(&self) -> Environment {
		self.env
	}

	/// Deployment region.
	pub fn region(&self) -> Region {
		self.region
	}

	/// API version segment used in every URL.
	pub fn version(&self) -> &str {
		self.version
	}

	/// Base URL that API groups are appended to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Scopes requested for this deployment.
	pub fn scopes(&self) -> &ScopeSet {
		&self.scopes
	}

	/// Underlying credential.
	pub fn credential(&self) -> &ReqwestCredential {
		&self.credential
	}

	/// Calls `{base_url}{api_group}{api_path}` and returns the decoded JSON body.
	///
	/// A non-empty `body_json` is POSTed. `None`, `null`, `false`, zero, `""`, `[]` and `{}`
	/// make the call a GET.
	/// `params` are sent as the query string. An empty response body yields [`Value::Null`].
	pub async fn call_api(
		&self,
		api_group: &str,
		api_path: &str,
		params: &[(&str, &str)],
		body_json: Option<&Value>,
	) -> Result<Value> {
		const KIND: OpKind = OpKind::ApiCall;

		let span = OpSpan::new(KIND, "call_api");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.dispatch(api_group, api_path, params, body_json)).await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Like [`SerenityClient::call_api`], decoding the body into `T`.
	pub async fn call_api_as<T>(
		&self,
		api_group: &str,
		api_path: &str,
		params: &[(&str, &str)],
		body_json: Option<&Value>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let value = self.call_api(api_group, api_path, params, body_json).await?;

		serde_path_to_error::deserialize(value).map_err(|source| Error::Decode { source })
	}

	async fn dispatch(
		&self,
		api_group: &str,
		api_path: &str,
		params: &[(&str, &str)],
		body_json: Option<&Value>,
	) -> Result<Value> {
		let url = self.api_url(api_group, api_path)?;
		let headers =
			credential::create_auth_headers(&self.credential, &self.scopes, &self.user_application_id)
				.await?;
		let mut request = match body_json.filter(|body| !is_empty_body(body)) {
			Some(body) => self.http.post(url.clone()).json(body),
			None => self.http.get(url.clone()),
		};

		if !params.is_empty() {
			request = request.query(params);
		}

		let response =
			request.headers(headers).timeout(self.timeout).send().await.map_err(|e| map_api_error(&url, e))?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(|e| map_api_error(&url, e))?;

		#[cfg(feature = "tracing")]
		tracing::debug!(%url, status = status.as_u16(), len = bytes.len(), "serenity api responded");

		if !status.is_success() {
			return Err(Error::Api { status: status.as_u16(), body: lenient_body(&bytes) });
		}
		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Value::Null);
		}

		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(de).map_err(|source| Error::Decode { source })
	}

	fn api_url(&self, api_group: &str, api_path: &str) -> Result<Url> {
		let raw = format!("{}{api_group}{api_path}", self.base_url);

		Url::parse(&raw).map_err(|e| ConfigError::invalid_url(&raw, e).into())
	}
}

/// Builder for [`SerenityClient`] with overrides for tests and private deployments.
#[derive(Debug)]
pub struct SerenityClientBuilder<'a> {
	config: &'a SerenityConfig,
	env: Environment,
	region: Region,
	authority: Option<IdentityAuthority>,
	base_url: Option<Url>,
	reqwest_client: Option<ReqwestClient>,
	timeout: StdDuration,
}
impl<'a> SerenityClientBuilder<'a> {
	/// Starts from `config`, targeting production in the primary US region.
	pub fn new(config: &'a SerenityConfig) -> Self {
		Self {
			config,
			env: Environment::default(),
			region: Region::default(),
			authority: None,
			base_url: None,
			reqwest_client: None,
			timeout: DEFAULT_TIMEOUT,
		}
	}

	/// Selects the deployment environment.
	pub fn env(mut self, env: Environment) -> Self {
		self.env = env;

		self
	}

	/// Selects the deployment region.
	pub fn region(mut self, region: Region) -> Self {
		self.region = region;

		self
	}

	/// Sends token requests to another identity authority.
	pub fn authority(mut self, authority: IdentityAuthority) -> Self {
		self.authority = Some(authority);

		self
	}

	/// Replaces the computed API base URL. A trailing slash is added when missing.
	pub fn base_url(mut self, base_url: Url) -> Self {
		self.base_url = Some(base_url);

		self
	}

	/// Shares a preconfigured reqwest client between token requests and API calls.
	///
	/// The client should not follow redirects.
	pub fn reqwest_client(mut self, client: ReqwestClient) -> Self {
		self.reqwest_client = Some(client);

		self
	}

	/// Overrides the per-request timeout for API calls.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Builds the client without contacting the identity provider.
	pub fn build(self) -> Result<SerenityClient> {
		let http = match self.reqwest_client {
			Some(client) => client,
			None => ReqwestClient::builder().redirect(Policy::none()).build().map_err(ConfigError::from)?,
		};
		let mut credential = ReqwestCredential::with_http_client(
			self.config.tenant_id.clone(),
			self.config.client_id.clone(),
			self.config.user_application_secret.clone(),
			ReqwestHttpClient::with_client(http.clone()),
			ReqwestTransportErrorMapper,
		);

		if let Some(authority) = self.authority {
			credential = credential.with_authority(authority);
		}

		let base_url = match self.base_url {
			Some(url) => with_trailing_slash(url),
			None => environment::api_base_url(self.env, self.region, SERENITY_API_VERSION)?,
		};

		Ok(SerenityClient {
			env: self.env,
			region: self.region,
			version: SERENITY_API_VERSION,
			base_url,
			scopes: environment::get_scopes(self.env, self.region),
			user_application_id: self.config.user_application_id.clone(),
			credential,
			http,
			timeout: self.timeout,
		})
	}

	/// Builds the client and acquires its first token.
	pub async fn connect(self) -> Result<SerenityClient> {
		let client = self.build()?;

		client.credential.get_token(&client.scopes).await?;

		Ok(client)
	}
}

fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

// `null`, `false`, zero, `""`, `[]` and `{}` all mean "no body".
fn is_empty_body(body: &Value) -> bool {
	match body {
		Value::Null => true,
		Value::Bool(flag) => !flag,
		Value::Number(number) => number.as_f64() == Some(0.0),
		Value::String(text) => text.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(fields) => fields.is_empty(),
	}
}

fn lenient_body(bytes: &[u8]) -> Value {
	if bytes.is_empty() {
		return Value::Null;
	}

	serde_json::from_slice(bytes)
		.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn map_api_error(url: &Url, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::ApiTimeout { url: url.to_string() }.into();
	}

	TransportError::network(url.to_string(), err).into()
}
