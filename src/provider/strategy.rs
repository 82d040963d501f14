//! Strategy hooks that classify token endpoint failures.
//!
//! Implementations normalize error mapping without tying the credential to any particular
//! HTTP client.

// self
use crate::_prelude::*;

/// Strategy hook that lets callers customize how token endpoint errors are classified.
///
/// Implementors must be `Send + Sync`; the hook works on crate-owned data so downstream
/// crates never depend on reqwest-specific structures.
pub trait ProviderStrategy: Send + Sync {
	/// Maps an OAuth error response into the crate taxonomy.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Provider rejected the grant itself.
	InvalidGrant,
	/// Client authentication failed (bad secret, unknown application or tenant).
	InvalidClient,
	/// Requested scope is unknown or not granted to the application.
	InsufficientScope,
	/// Failure is temporary and should be retried.
	Transient,
}

/// Context passed to strategies when classifying token errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
}
impl ProviderErrorContext {
	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code string returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}
}

/// Default strategy: RFC 6749 error codes, then Azure AD `AADSTS` codes found in the
/// description, then the HTTP status. Anything unrecognized is transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if let Some(kind) = ctx.oauth_error.as_deref().and_then(match_oauth_code) {
			return kind;
		}
		if let Some(kind) = ctx.error_description.as_deref().and_then(match_aadsts_code) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn match_oauth_code(value: &str) -> Option<ProviderErrorKind> {
	if value.eq_ignore_ascii_case("invalid_grant") || value.eq_ignore_ascii_case("access_denied") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if value.eq_ignore_ascii_case("invalid_client")
		|| value.eq_ignore_ascii_case("unauthorized_client")
	{
		Some(ProviderErrorKind::InvalidClient)
	} else if value.eq_ignore_ascii_case("invalid_scope")
		|| value.eq_ignore_ascii_case("insufficient_scope")
	{
		Some(ProviderErrorKind::InsufficientScope)
	} else if value.eq_ignore_ascii_case("temporarily_unavailable")
		|| value.eq_ignore_ascii_case("server_error")
	{
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

// Azure AD prefixes descriptions with `AADSTS<code>:`.
fn match_aadsts_code(description: &str) -> Option<ProviderErrorKind> {
	let code = description.strip_prefix("AADSTS")?;
	let digits: String = code.chars().take_while(char::is_ascii_digit).collect();

	match digits.as_str() {
		// Bad secret, unknown application, unknown tenant.
		"7000215" | "700016" | "90002" | "7000222" => Some(ProviderErrorKind::InvalidClient),
		// Invalid or unconsented scope.
		"70011" | "650057" => Some(ProviderErrorKind::InsufficientScope),
		"50012" => Some(ProviderErrorKind::InvalidGrant),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}
