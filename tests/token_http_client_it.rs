// self
use serenity_sdk::{
	_preludet::*,
	auth::{ClientId, ScopeSet, TenantId, TokenSecret},
	credential::ClientSecretCredential,
	error::{ConfigError, Error, Result, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{
		TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	},
};

#[derive(Debug)]
enum FakeTransportError {
	Throttled,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Throttled => write!(f, "Transport throttled."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone, Copy)]
struct FakeHttpClient {
	retry_after: Duration,
}
impl FakeHttpClient {
	fn throttled(retry_after: Duration) -> Self {
		Self { retry_after }
	}
}
impl TokenHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { slot, retry_after: self.retry_after }
	}
}

struct FakeHttpHandle {
	slot: ResponseMetadataSlot,
	retry_after: Duration,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, _request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let retry_after = self.retry_after;

		Box::pin(async move {
			assert!(
				slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);
			slot.store(ResponseMetadata { status: Some(429), retry_after: Some(retry_after) });

			Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Throttled)))
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	metadata: Arc<Mutex<Vec<Option<ResponseMetadata>>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded_metadata(&self) -> Vec<Option<ResponseMetadata>> {
		self.metadata.lock().clone()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> Error {
		let status = meta.and_then(|value| value.status);
		let retry_after = meta.and_then(|value| value.retry_after);

		self.metadata.lock().push(meta.cloned());

		match err {
			HttpClientError::Reqwest(inner) => TransientError::TokenEndpoint {
				message: format!("Fake transport error: {inner}"),
				status,
				retry_after,
			}
			.into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransientError::TokenEndpoint {
				message: format!(
					"HTTP client error occurred while calling the token endpoint: {message}"
				),
				status,
				retry_after,
			}
			.into(),
			other => TransientError::TokenEndpoint {
				message: format!(
					"Unhandled HTTP client error variant while calling the token endpoint: {other:?}"
				),
				status,
				retry_after,
			}
			.into(),
		}
	}
}

type FakeCredential = ClientSecretCredential<FakeHttpClient, RecordingTransportErrorMapper>;

fn build_credential(
	retry_after: Duration,
	mapper: Arc<RecordingTransportErrorMapper>,
) -> FakeCredential {
	ClientSecretCredential::with_http_client(
		TenantId::new("fake-tenant").expect("Failed to build fake tenant identifier."),
		ClientId::new("throttled-client").expect("Failed to build fake client identifier."),
		TokenSecret::new("throttled-secret"),
		FakeHttpClient::throttled(retry_after),
		mapper,
	)
}

fn scope() -> ScopeSet {
	ScopeSet::new(["https://serenity-api-test-eastus2.cloudwall.network/.default"])
		.expect("Failed to build fake scope set.")
}

#[tokio::test]
async fn fake_token_http_client_surfaces_metadata() {
	let credential =
		build_credential(Duration::seconds(5), Arc::new(RecordingTransportErrorMapper::default()));
	let err = credential
		.get_token(&scope())
		.await
		.expect_err("Request should be throttled with HTTP 429.");

	match err {
		Error::Transient(TransientError::TokenEndpoint { status, retry_after, .. }) => {
			assert_eq!(status, Some(429));
			assert_eq!(retry_after, Some(Duration::seconds(5)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn fake_mapper_captures_response_metadata() {
	let mapper = Arc::new(RecordingTransportErrorMapper::default());
	let credential = build_credential(Duration::seconds(30), mapper.clone());
	let _ = credential
		.get_token(&scope())
		.await
		.expect_err("Request should be throttled with HTTP 429.");
	let observed = mapper.recorded_metadata();

	assert_eq!(observed.len(), 1, "Mapper must record a single request.");

	let meta = observed
		.first()
		.and_then(|value| value.clone())
		.expect("Response metadata should be recorded exactly once.");

	assert_eq!(meta.status, Some(429));
	assert_eq!(meta.retry_after, Some(Duration::seconds(30)));
}

#[tokio::test]
async fn failed_attempts_are_not_cached() {
	let mapper = Arc::new(RecordingTransportErrorMapper::default());
	let credential = build_credential(Duration::seconds(1), mapper.clone());

	for _ in 0..2 {
		assert!(credential.get_token(&scope()).await.is_err());
	}

	assert_eq!(mapper.recorded_metadata().len(), 2, "Each call must reach the transport.");
}
