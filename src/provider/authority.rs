//! Identity authority that issues client-credentials tokens.

// self
use crate::{_prelude::*, auth::TenantId, error::ConfigError};

/// Public Azure AD authority used when no override is configured.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/";

/// Base URL of the identity provider.
///
/// The token endpoint for a tenant is `{authority}/{tenant}/oauth2/v2.0/token`. Authorities
/// must use HTTPS; plain HTTP is accepted only for loopback hosts so local mock servers work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityAuthority(Url);
impl IdentityAuthority {
	/// Parses and validates an authority URL.
	pub fn parse(raw: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(raw).map_err(|e| ConfigError::invalid_url(raw, e))?;

		Self::new(url)
	}

	/// Validates an already-parsed authority URL.
	pub fn new(mut url: Url) -> Result<Self, ConfigError> {
		if url.cannot_be_a_base() {
			return Err(ConfigError::invalid_url(&url, "authority must be a base URL"));
		}
		if url.scheme() != "https" && !is_loopback(&url) {
			return Err(ConfigError::invalid_url(&url, "authority must use HTTPS"));
		}
		if url.query().is_some() || url.fragment().is_some() {
			return Err(ConfigError::invalid_url(&url, "authority cannot carry a query or fragment"));
		}
		if !url.path().ends_with('/') {
			let path = format!("{}/", url.path());

			url.set_path(&path);
		}

		Ok(Self(url))
	}

	/// Authority URL, always with a trailing slash.
	pub fn url(&self) -> &Url {
		&self.0
	}

	/// Token endpoint for `tenant`.
	///
	/// The tenant is appended as a single percent-encoded path segment, so it can never
	/// change the authority's scheme, host, or query.
	pub fn token_endpoint(&self, tenant: &TenantId) -> Result<Url, ConfigError> {
		let mut url = self.0.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::invalid_url(&self.0, "authority must be a base URL"))?
			.pop_if_empty()
			.extend([tenant.as_ref(), "oauth2", "v2.0", "token"]);

		Ok(url)
	}
}
impl Default for IdentityAuthority {
	fn default() -> Self {
		Self(Url::parse(DEFAULT_AUTHORITY).unwrap_or_else(|_| unreachable!("constant URL parses")))
	}
}
impl Display for IdentityAuthority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.0.as_str())
	}
}
impl TryFrom<String> for IdentityAuthority {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}
impl From<IdentityAuthority> for String {
	fn from(value: IdentityAuthority) -> Self {
		value.0.into()
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_authority_builds_tenant_token_endpoint() {
		let tenant = TenantId::new("0f3c-tenant").expect("Tenant fixture should be valid.");
		let endpoint = IdentityAuthority::default()
			.token_endpoint(&tenant)
			.expect("Token endpoint should join.");

		assert_eq!(
			endpoint.as_str(),
			"https://login.microsoftonline.com/0f3c-tenant/oauth2/v2.0/token"
		);
	}

	#[test]
	fn authority_path_gains_trailing_slash() {
		let tenant = TenantId::new("t").expect("Tenant fixture should be valid.");
		let authority = IdentityAuthority::parse("https://login.example.com/sovereign")
			.expect("HTTPS authority should be accepted.");

		assert_eq!(authority.url().as_str(), "https://login.example.com/sovereign/");
		assert_eq!(
			authority.token_endpoint(&tenant).expect("Token endpoint should join.").as_str(),
			"https://login.example.com/sovereign/t/oauth2/v2.0/token"
		);
	}

	#[test]
	fn token_endpoint_keeps_authority_host_and_path() {
		let authority = IdentityAuthority::default();

		for tenant in ["common", "contoso.onmicrosoft.com", "0f3c-tenant"] {
			let tenant = TenantId::new(tenant).expect("Tenant fixture should be valid.");
			let endpoint =
				authority.token_endpoint(&tenant).expect("Token endpoint should build.");

			assert_eq!(endpoint.host_str(), Some("login.microsoftonline.com"));
			assert_eq!(endpoint.scheme(), "https");
			assert_eq!(endpoint.query(), None);
			assert_eq!(endpoint.path(), format!("/{tenant}/oauth2/v2.0/token"));
		}
	}

	#[test]
	fn plain_http_only_for_loopback() {
		assert!(IdentityAuthority::parse("http://login.example.com/").is_err());
		assert!(IdentityAuthority::parse("http://127.0.0.1:8080").is_ok());
		assert!(IdentityAuthority::parse("http://localhost:8080/").is_ok());
		assert!(IdentityAuthority::parse("http://[::1]:8080/").is_ok());
		assert!(IdentityAuthority::parse("https://login.example.com/?x=1").is_err());
	}
}
