//! Crate-level error types shared by the config loader, credential, and API client.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Requested scopes exceed what the application was granted.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Identity provider rejected the grant.
	#[error("Identity provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Serenity API answered with a non-success status.
	#[error("Serenity API returned HTTP {status}.")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Response body, parsed as JSON when possible and wrapped as a string otherwise.
		body: serde_json::Value,
	},
	/// Serenity API answered successfully but its body could not be decoded.
	#[error("Serenity API response could not be decoded.")]
	Decode {
		/// Structured parsing failure, including the failing JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Home directory could not be resolved.
	#[error("Unable to determine the home directory.")]
	HomeDirUnavailable,
	/// Credential file could not be read.
	#[error("Unable to read {}.", .path.display())]
	Read {
		/// File that failed.
		path: PathBuf,
		/// Underlying I/O failure.
		#[source]
		source: std::io::Error,
	},
	/// Credential file is readable by group or others.
	#[error("{} should only be readable by the current user.", .path.display())]
	UnsafePermissions {
		/// Offending file.
		path: PathBuf,
		/// Permission bits observed on the file.
		mode: u32,
	},
	/// Credential file is not valid JSON (or not an object).
	#[error("{origin} is not a valid credential document.")]
	Parse {
		/// File path or `<inline>` for in-memory documents.
		origin: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// One or more required keys are absent.
	#[error("{origin} invalid. Required keys: {required:?}; got: {found:?}.")]
	MissingKeys {
		/// File path or `<inline>` for in-memory documents.
		origin: String,
		/// Keys every credential document must carry.
		required: &'static [&'static str],
		/// Keys present in the document.
		found: Vec<String>,
	},
	/// Credential document declares an unsupported schema.
	#[error("At this time only schemaVersion 1 supported; {origin} is version {version}.")]
	UnsupportedSchemaVersion {
		/// File path or `<inline>` for in-memory documents.
		origin: String,
		/// Version found in the document.
		version: serde_json::Value,
	},
	/// Credential document carries an empty secret.
	#[error("{origin} has an empty userApplicationSecret.")]
	EmptySecret {
		/// File path or `<inline>` for in-memory documents.
		origin: String,
	},
	/// Identifier failed validation.
	#[error("Identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Scope set failed validation.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// URL could not be parsed or is otherwise unusable.
	#[error("URL `{url}` is invalid: {reason}.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Why it was rejected.
		reason: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Header value could not be encoded.
	#[error("Header `{name}` contains characters that cannot be sent.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
	},
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid_url(url: impl Display, reason: impl Display) -> Self {
		Self::InvalidUrl { url: url.to_string(), reason: reason.to_string() }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// API call timed out.
	#[error("Request to {url} timed out.")]
	ApiTimeout {
		/// URL being called.
		url: String,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// `token endpoint` or the API URL.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised against `target`.
	pub fn network(
		target: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		let target = e.url().map(ToString::to_string).unwrap_or_else(|| "the token endpoint".into());

		Self::network(target, e)
	}
}
