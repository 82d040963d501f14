//! HTTP headers carrying the bearer token and the Serenity application id.

// crates.io
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenRecord, UserApplicationId},
	credential::ClientSecretCredential,
	error::ConfigError,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
};

/// Header naming the Serenity user application on every request.
pub const USER_APP_ID_HEADER: HeaderName = HeaderName::from_static("x-user-app-id");

/// Acquires a token for `scopes` and returns the headers every API call must carry.
pub async fn create_auth_headers<C, M>(
	credential: &ClientSecretCredential<C, M>,
	scopes: &ScopeSet,
	user_app_id: &UserApplicationId,
) -> Result<HeaderMap>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let record = credential.get_token(scopes).await?;

	auth_headers(&record, user_app_id)
}

/// Builds the authorization headers for an already-acquired token.
pub fn auth_headers(record: &TokenRecord, user_app_id: &UserApplicationId) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	let mut bearer = HeaderValue::from_str(&record.bearer())
		.map_err(|_| ConfigError::InvalidHeader { name: "authorization" })?;

	bearer.set_sensitive(true);
	headers.insert(AUTHORIZATION, bearer);
	headers.insert(
		USER_APP_ID_HEADER,
		HeaderValue::from_str(user_app_id)
			.map_err(|_| ConfigError::InvalidHeader { name: "x-user-app-id" })?,
	);
	headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

	Ok(headers)
}
