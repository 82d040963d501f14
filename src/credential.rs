//! Client-secret credential that exchanges application credentials for bearer tokens.
//!
//! [`ClientSecretCredential::get_token`] reuses a cached token per scope set until it is
//! expired or inside the preemptive window, and only then calls the identity provider. A
//! per-scope singleflight guard makes concurrent callers share one in-flight exchange
//! instead of stampeding the token endpoint.

mod headers;

pub use headers::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, TenantId, TokenRecord, TokenSecret},
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ClientCredentialsExchange, ReqwestTransportErrorMapper, TransportErrorMapper},
	obs::{self, OpKind, OpOutcome, OpSpan},
	provider::{DefaultProviderStrategy, IdentityAuthority, ProviderStrategy},
};

/// Credential specialized for the crate's default reqwest transport stack.
pub type ReqwestCredential = ClientSecretCredential<ReqwestHttpClient, ReqwestTransportErrorMapper>;

type Guard = Arc<AsyncMutex<Option<TokenRecord>>>;

/// Tokens closer than this to expiry are replaced before use.
pub const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

/// Builds the default reqwest-backed credential for a registered application.
pub fn get_credential_user_app(
	client_id: ClientId,
	client_secret: TokenSecret,
	tenant_id: TenantId,
) -> Result<ReqwestCredential> {
	ReqwestCredential::new(tenant_id, client_id, client_secret)
}

/// Azure AD application credential (tenant + client id + client secret).
///
/// Cloning is cheap and clones share the token cache.
pub struct ClientSecretCredential<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	tenant_id: TenantId,
	client_id: ClientId,
	client_secret: TokenSecret,
	authority: IdentityAuthority,
	strategy: Arc<dyn ProviderStrategy>,
	preemptive_window: Duration,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	tokens: Arc<Mutex<HashMap<ScopeSet, Guard>>>,
}
impl ReqwestCredential {
	/// Creates a credential against the public Azure AD authority.
	pub fn new(tenant_id: TenantId, client_id: ClientId, client_secret: TokenSecret) -> Result<Self> {
		Ok(Self::with_http_client(
			tenant_id,
			client_id,
			client_secret,
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> ClientSecretCredential<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a credential that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		tenant_id: TenantId,
		client_id: ClientId,
		client_secret: TokenSecret,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			tenant_id,
			client_id,
			client_secret,
			authority: IdentityAuthority::default(),
			strategy: Arc::new(DefaultProviderStrategy),
			preemptive_window: DEFAULT_PREEMPTIVE_WINDOW,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			tokens: Default::default(),
		}
	}

	/// Points the credential at another identity authority (sovereign clouds, mocks).
	pub fn with_authority(mut self, authority: IdentityAuthority) -> Self {
		self.authority = authority;

		self
	}

	/// Replaces the error classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Overrides the preemptive refresh window; negative values clamp to zero.
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Tenant the credential authenticates against.
	pub fn tenant_id(&self) -> &TenantId {
		&self.tenant_id
	}

	/// Client identifier of the application.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Identity authority in use.
	pub fn authority(&self) -> &IdentityAuthority {
		&self.authority
	}

	/// Returns a token for `scope`, reusing the cached one while it is still fresh.
	pub async fn get_token(&self, scope: &ScopeSet) -> Result<TokenRecord> {
		self.acquire(scope, false).await
	}

	/// Always exchanges credentials for a new token and replaces the cached one.
	pub async fn get_token_forced(&self, scope: &ScopeSet) -> Result<TokenRecord> {
		self.acquire(scope, true).await
	}

	/// Drops every cached token.
	pub fn clear_cache(&self) {
		self.tokens.lock().clear();
	}

	async fn acquire(&self, scope: &ScopeSet, force: bool) -> Result<TokenRecord> {
		const KIND: OpKind = OpKind::TokenAcquire;

		let span = OpSpan::new(KIND, if force { "get_token_forced" } else { "get_token" });

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let guard = self.guard(scope);
				let mut slot = guard.lock().await;
				let now = OffsetDateTime::now_utc();

				if let Some(current) =
					slot.as_ref().filter(|record| !force && self.is_fresh(record, now))
				{
					return Ok(current.clone());
				}

				let token_endpoint = self.authority.token_endpoint(&self.tenant_id)?;
				let exchange = <ClientCredentialsExchange<C, M>>::new(
					&token_endpoint,
					&self.client_id,
					&self.client_secret,
					self.http_client.clone(),
					self.transport_mapper.clone(),
				)?;
				let record = exchange.exchange(self.strategy.as_ref(), scope).await?;

				#[cfg(feature = "tracing")]
				tracing::debug!(expires_at = %record.expires_at, "acquired access token");

				*slot = Some(record.clone());

				Ok(record)
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	fn is_fresh(&self, record: &TokenRecord, now: OffsetDateTime) -> bool {
		!record.is_expired_at(now) && record.remaining_at(now) > self.preemptive_window
	}

	fn guard(&self, scope: &ScopeSet) -> Guard {
		let mut tokens = self.tokens.lock();

		tokens.entry(scope.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(None))).clone()
	}
}
impl<C, M> Clone for ClientSecretCredential<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			tenant_id: self.tenant_id.clone(),
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
			authority: self.authority.clone(),
			strategy: self.strategy.clone(),
			preemptive_window: self.preemptive_window,
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			tokens: self.tokens.clone(),
		}
	}
}
impl<C, M> Debug for ClientSecretCredential<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretCredential")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("authority", &self.authority)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn credential() -> ReqwestCredential {
		get_credential_user_app(
			ClientId::new("client").expect("Client fixture should be valid."),
			TokenSecret::new("hunter2"),
			TenantId::new("tenant").expect("Tenant fixture should be valid."),
		)
		.expect("Default credential should build.")
	}

	fn record(expires_in: Duration) -> TokenRecord {
		TokenRecord::builder(ScopeSet::new(["s/.default"]).expect("Scope should be valid."))
			.access_token("token")
			.issued_at(OffsetDateTime::now_utc())
			.expires_in(expires_in)
			.build()
			.expect("Record fixture should build.")
	}

	#[test]
	fn freshness_honors_preemptive_window() {
		let credential = credential();
		let now = OffsetDateTime::now_utc();

		assert!(credential.is_fresh(&record(Duration::hours(1)), now));
		assert!(!credential.is_fresh(&record(Duration::seconds(30)), now));

		let eager = credential.with_preemptive_window(Duration::minutes(-5));

		assert!(eager.is_fresh(&record(Duration::seconds(30)), now));
	}

	#[test]
	fn debug_hides_secret() {
		let rendered = format!("{:?}", credential());

		assert!(rendered.contains("tenant"));
		assert!(!rendered.contains("hunter2"));
	}

	#[test]
	fn clones_share_scope_guards() {
		let credential = credential();
		let clone = credential.clone();
		let scope = ScopeSet::new(["s/.default"]).expect("Scope should be valid.");
		let before = credential.guard(&scope);

		assert!(Arc::ptr_eq(&before, &clone.guard(&scope)));

		clone.clear_cache();

		assert!(!Arc::ptr_eq(&before, &credential.guard(&scope)));
	}
}
