//! Deployment coordinates (environment + region) and the URL templates derived from them.

// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError};

/// REST API version segment used in every request URL.
pub const SERENITY_API_VERSION: &str = "v1";

/// Error returned when parsing an unknown environment or region label.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown {kind} `{value}`.")]
pub struct UnknownDeploymentLabel {
	/// `environment` or `region`.
	pub kind: &'static str,
	/// Rejected label.
	pub value: String,
}

/// Operational environment (test vs. production) to connect to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
	/// Development installation.
	#[serde(rename = "dev")]
	Dev,
	/// Test installation.
	#[serde(rename = "test")]
	Test,
	/// Production installation.
	#[default]
	#[serde(rename = "prod")]
	Production,
}
impl Environment {
	/// Returns the label embedded in hostnames.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Dev => "dev",
			Environment::Test => "test",
			Environment::Production => "prod",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = UnknownDeploymentLabel;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"dev" => Ok(Environment::Dev),
			"test" => Ok(Environment::Test),
			"prod" => Ok(Environment::Production),
			other => Err(UnknownDeploymentLabel { kind: "environment", value: other.to_owned() }),
		}
	}
}

/// Regional installation of Serenity to connect to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
	/// Primary US installation (Azure `eastus2`).
	#[default]
	#[serde(rename = "eastus2")]
	UsPrimary,
}
impl Region {
	/// Returns the label embedded in hostnames.
	pub const fn as_str(self) -> &'static str {
		match self {
			Region::UsPrimary => "eastus2",
		}
	}
}
impl Display for Region {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Region {
	type Err = UnknownDeploymentLabel;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"eastus2" => Ok(Region::UsPrimary),
			other => Err(UnknownDeploymentLabel { kind: "region", value: other.to_owned() }),
		}
	}
}

/// Login scopes required to access the API in `env`/`region`.
///
/// Most callers never need this directly; [`SerenityClient`](crate::SerenityClient) computes
/// it on construction.
pub fn get_scopes(env: Environment, region: Region) -> ScopeSet {
	let scope = format!("https://serenity-api-{env}-{region}.cloudwall.network/.default");

	// Labels are fixed ASCII without whitespace, so validation cannot fail.
	ScopeSet::new([scope]).unwrap_or_default()
}

/// Base URL every API path is appended to, including the trailing slash.
pub fn api_base_url(env: Environment, region: Region, version: &str) -> Result<Url> {
	let raw = format!("https://serenity-rest-{env}-{region}.cloudwall.network/{version}/");

	Url::parse(&raw).map_err(|e| ConfigError::invalid_url(&raw, e).into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_follow_the_hostname_template() {
		let scopes = get_scopes(Environment::Production, Region::UsPrimary);

		assert_eq!(scopes.len(), 1);
		assert!(scopes.contains("https://serenity-api-prod-eastus2.cloudwall.network/.default"));

		let dev = get_scopes(Environment::Dev, Region::UsPrimary);

		assert_eq!(dev.normalized(), "https://serenity-api-dev-eastus2.cloudwall.network/.default");
	}

	#[test]
	fn base_url_embeds_env_region_and_version() {
		let url = api_base_url(Environment::Test, Region::UsPrimary, SERENITY_API_VERSION)
			.expect("Base URL should parse.");

		assert_eq!(url.as_str(), "https://serenity-rest-test-eastus2.cloudwall.network/v1/");
	}

	#[test]
	fn labels_parse_and_serialize() {
		assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
		assert_eq!("eastus2".parse::<Region>(), Ok(Region::UsPrimary));
		assert!("production".parse::<Environment>().is_err());
		assert_eq!(Environment::default(), Environment::Production);
		assert_eq!(
			serde_json::to_string(&Environment::Test).expect("Environment should serialize."),
			"\"test\""
		);
	}
}
