//! Internal OAuth client facade: authorization-code exchange and userinfo lookup.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret,
	EndpointNotSet, EndpointSet, HttpClientError, RedirectUrl, RequestTokenError, TokenResponse,
	TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransientError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		ClientAuthMethod, ProviderDescriptor, ProviderErrorContext, ProviderErrorKind,
		ProviderStrategy,
	},
};
#[cfg(feature = "reqwest")] use crate::error::TransportError;

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into bridge [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] raised while calling `endpoint` into a bridge error.
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(endpoint, meta, message),
			_ => map_generic_transport_error(endpoint, meta, "unknown transport failure"),
		}
	}
}

/// Tokens returned by a successful code exchange.
///
/// The refresh token is optional on the wire; the broker decides what its absence means.
#[derive(Clone, Debug)]
pub(crate) struct CodeExchange {
	pub(crate) access_token: TokenSecret,
	pub(crate) refresh_token: Option<TokenSecret>,
	pub(crate) expires_in: Option<Duration>,
}

/// Subset of the OIDC userinfo document the bridge relies on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct UserinfoClaims {
	#[serde(default)]
	pub(crate) sub: Option<String>,
	#[serde(default)]
	pub(crate) email: Option<String>,
}

pub(crate) trait OAuth2Facade {
	fn exchange_authorization_code<'a, 'strategy, 'code>(
		&'a self,
		strategy: &'strategy dyn ProviderStrategy,
		code: &'code str,
	) -> FacadeFuture<'a, CodeExchange>
	where
		'strategy: 'a,
		'code: 'a;

	fn fetch_userinfo<'a, 'token>(
		&'a self,
		access_token: &'token TokenSecret,
	) -> FacadeFuture<'a, UserinfoClaims>
	where
		'token: 'a;
}

pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	userinfo_endpoint: Url,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: Option<&str>,
		redirect_uri: Option<&Url>,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		if let Some(secret) = client_secret.filter(|secret| !secret.is_empty()) {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.to_owned()));
		}
		if let Some(redirect) = redirect_uri {
			let redirect_url = RedirectUrl::new(redirect.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;

			oauth_client = oauth_client.set_redirect_uri(redirect_url);
		}
		if matches!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			userinfo_endpoint: descriptor.endpoints.userinfo.clone(),
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}
}
impl<C, M> OAuth2Facade for BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_authorization_code<'a, 'strategy, 'code>(
		&'a self,
		strategy: &'strategy dyn ProviderStrategy,
		code: &'code str,
	) -> FacadeFuture<'a, CodeExchange>
	where
		'strategy: 'a,
		'code: 'a,
	{
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut extra = BTreeMap::new();

			strategy.augment_code_exchange(&mut extra);

			let mut request =
				self.oauth_client.exchange_code(AuthorizationCode::new(code.to_owned()));

			for (key, value) in extra {
				request = request.add_extra_param(key, value);
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				map_request_error(strategy, meta.take(), err, self.error_mapper.as_ref())
			})?;

			Ok(CodeExchange {
				access_token: TokenSecret::new(response.access_token().secret().to_owned()),
				refresh_token: response
					.refresh_token()
					.map(|token| TokenSecret::new(token.secret().to_owned())),
				expires_in: response.expires_in().and_then(|ttl| Duration::try_from(ttl).ok()),
			})
		})
	}

	fn fetch_userinfo<'a, 'token>(
		&'a self,
		access_token: &'token TokenSecret,
	) -> FacadeFuture<'a, UserinfoClaims>
	where
		'token: 'a,
	{
		const ENDPOINT: &str = "userinfo";

		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let request = Request::builder()
				.method(Method::GET)
				.uri(self.userinfo_endpoint.as_str())
				.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()))
				.header(ACCEPT, "application/json")
				.body(Vec::new())
				.map_err(ConfigError::from)?;
			let response = instrumented.call(request).await.map_err(|err| {
				self.error_mapper.map_transport_error(ENDPOINT, meta.take().as_ref(), err)
			})?;
			let status = response.status().as_u16();

			if !response.status().is_success() {
				return Err(Error::Userinfo { status });
			}

			let mut deserializer = serde_json::Deserializer::from_slice(response.body());

			serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
				Error::from(TransientError::PayloadParse {
					endpoint: ENDPOINT,
					source,
					status: Some(status),
				})
			})
		})
	}
}

fn map_request_error<E, M>(
	strategy: &dyn ProviderStrategy,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(strategy, response, meta),
		RequestTokenError::Request(error) => mapper.map_transport_error("token", meta, error),
		RequestTokenError::Parse(source, body) => match meta_status(meta) {
			Some(status) if status >= 400 => map_unparsed_error_body(strategy, status, &body),
			status => TransientError::PayloadParse { endpoint: "token", source, status }.into(),
		},
		RequestTokenError::Other(message) => TransientError::Endpoint {
			endpoint: "token",
			message,
			status: meta_status(meta),
		}
		.into(),
	}
}

fn map_server_response_error(
	strategy: &dyn ProviderStrategy,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let status = meta_status(meta);
	let mut ctx = ProviderErrorContext::default().with_oauth_error(response.error().as_ref());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = status {
		ctx = ctx.with_http_status(status);
	}

	let reason = ctx.reason("token endpoint rejected the request");

	classified_error(strategy.classify_token_error(&ctx), reason, status)
}

// Error statuses with a non-JSON body (HTML error pages, plain text) are classified from a preview.
fn map_unparsed_error_body(strategy: &dyn ProviderStrategy, status: u16, body: &[u8]) -> Error {
	let ctx = ProviderErrorContext::default()
		.with_http_status(status)
		.with_body_preview(String::from_utf8_lossy(body));
	let reason = ctx.reason("token endpoint returned an unreadable error body");

	classified_error(strategy.classify_token_error(&ctx), reason, Some(status))
}

fn classified_error(kind: ProviderErrorKind, reason: String, status: Option<u16>) -> Error {
	match kind {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason, status },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason, status },
		ProviderErrorKind::Transient =>
			TransientError::Endpoint { endpoint: "token", message: reason, status }.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	endpoint: &'static str,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			endpoint,
			message: "request timed out".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(
	endpoint: &'static str,
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> Error {
	TransientError::Endpoint {
		endpoint,
		message: format!("HTTP client error: {message}"),
		status: meta_status(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
