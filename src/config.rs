//! Local credential configuration stored under `$HOME/.serenity/`.
//!
//! A credential document is a JSON object:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "tenantId": "…",
//!   "clientId": "…",
//!   "userApplicationId": "…",
//!   "userApplicationSecret": "…"
//! }
//! ```
//!
//! Because the file carries a cloud client secret, [`load_local_config`] and
//! [`load_config_file`] refuse to read it when the group or others can read it (Unix only).

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, TenantId, TokenSecret, UserApplicationId},
	error::ConfigError,
};

/// Keys every credential document must carry.
pub const REQUIRED_KEYS: &[&str] =
	&["schemaVersion", "tenantId", "clientId", "userApplicationId", "userApplicationSecret"];
/// The only credential schema this crate understands.
pub const SUPPORTED_SCHEMA_VERSION: u64 = 1;

const CONFIG_DIR: &str = ".serenity";
const INLINE_ORIGIN: &str = "<inline>";
#[cfg(unix)]
const GROUP_OR_OTHER_READ: u32 = 0o040 | 0o004;

/// Validated credential configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerenityConfig {
	/// Schema version of the document (always 1 today).
	pub schema_version: u64,
	/// Azure AD tenant that owns the application registration.
	pub tenant_id: TenantId,
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// Serenity user application identifier.
	pub user_application_id: UserApplicationId,
	/// OAuth client secret.
	pub user_application_secret: TokenSecret,
}
impl SerenityConfig {
	/// Parses and validates an in-memory JSON document.
	pub fn from_json_str(raw: &str) -> Result<Self> {
		Self::parse(raw, INLINE_ORIGIN)
	}

	/// Validates an already-parsed JSON value.
	pub fn from_value(value: Value) -> Result<Self> {
		let Value::Object(object) = value else {
			return Err(ConfigError::MissingKeys {
				origin: INLINE_ORIGIN.into(),
				required: REQUIRED_KEYS,
				found: Vec::new(),
			}
			.into());
		};

		Self::validate(object, INLINE_ORIGIN)
	}

	fn parse(raw: &str, origin: &str) -> Result<Self> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let object: Map<String, Value> = serde_path_to_error::deserialize(de)
			.map_err(|source| ConfigError::Parse { origin: origin.into(), source })?;

		Self::validate(object, origin)
	}

	fn validate(object: Map<String, Value>, origin: &str) -> Result<Self> {
		if !REQUIRED_KEYS.iter().all(|key| object.contains_key(*key)) {
			return Err(ConfigError::MissingKeys {
				origin: origin.into(),
				required: REQUIRED_KEYS,
				found: object.keys().cloned().collect(),
			}
			.into());
		}

		let version = &object["schemaVersion"];

		// `1.0` counts as version 1; strings and other numbers do not.
		if version.as_f64() != Some(SUPPORTED_SCHEMA_VERSION as f64) {
			return Err(ConfigError::UnsupportedSchemaVersion {
				origin: origin.into(),
				version: version.clone(),
			}
			.into());
		}

		let document: CredentialDocument =
			serde_path_to_error::deserialize(Value::Object(object))
				.map_err(|e| reparse_error(e, origin))?;

		if document.user_application_secret.is_empty() {
			return Err(ConfigError::EmptySecret { origin: origin.into() }.into());
		}

		Ok(Self {
			schema_version: SUPPORTED_SCHEMA_VERSION,
			tenant_id: TenantId::new(document.tenant_id).map_err(ConfigError::from)?,
			client_id: ClientId::new(document.client_id).map_err(ConfigError::from)?,
			user_application_id: UserApplicationId::new(document.user_application_id)
				.map_err(ConfigError::from)?,
			user_application_secret: document.user_application_secret,
		})
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialDocument {
	tenant_id: String,
	client_id: String,
	user_application_id: String,
	user_application_secret: TokenSecret,
}

/// Path of the credential file for `config_id`: `$HOME/.serenity/{config_id}.json`.
pub fn local_config_path(config_id: &str) -> Result<PathBuf> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;

	Ok(home.join(CONFIG_DIR).join(format!("{config_id}.json")))
}

/// Reads `$HOME/.serenity/{config_id}.json`.
///
/// Fails if the file is readable by anyone other than its owner, if a required key is
/// missing, or if `schemaVersion` is not 1.
pub fn load_local_config(config_id: &str) -> Result<SerenityConfig> {
	load_config_file(local_config_path(config_id)?)
}

/// Reads and validates the credential document at `path`.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<SerenityConfig> {
	let path = path.as_ref();
	let metadata =
		fs::metadata(path).map_err(|source| ConfigError::Read { path: path.into(), source })?;

	ensure_owner_only(path, &metadata)?;

	let raw =
		fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.into(), source })?;

	SerenityConfig::parse(&raw, &path.display().to_string())
}

#[cfg(unix)]
fn ensure_owner_only(path: &Path, metadata: &fs::Metadata) -> Result<(), ConfigError> {
	use std::os::unix::fs::PermissionsExt;

	let mode = metadata.permissions().mode();

	if mode & GROUP_OR_OTHER_READ != 0 {
		return Err(ConfigError::UnsafePermissions { path: path.into(), mode: mode & 0o777 });
	}

	Ok(())
}

#[cfg(not(unix))]
fn ensure_owner_only(_path: &Path, _metadata: &fs::Metadata) -> Result<(), ConfigError> {
	Ok(())
}

fn reparse_error(err: serde_path_to_error::Error<serde_json::Error>, origin: &str) -> Error {
	ConfigError::Parse { origin: origin.into(), source: err }.into()
}
