//! Brokered authorization-code login against a Keycloak realm.
//!
//! [`IdentityBroker`] is the only seam the HTTP handler depends on. [`KeycloakBroker`] implements
//! it by exchanging the code at the realm token endpoint and resolving the user profile from the
//! userinfo endpoint with the freshly minted access token.

// self
use crate::{
	_prelude::*,
	auth::{
		AuthorizationCode, BrokeredIdentity, BrokeredTokens, BrokeredUser, TokenSecret,
		TokenizedIdentity,
	},
	http::TokenHttpClient,
	oauth::{BasicFacade, CodeExchange, OAuth2Facade, TransportErrorMapper, UserinfoClaims},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{DefaultProviderStrategy, ProviderDescriptor, ProviderStrategy},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Boxed future returned by [`IdentityBroker`] implementations.
pub type BrokerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestKeycloakBroker = KeycloakBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Exchanges an authorization code for a provider identity.
///
/// Implementations never fail at the type level: provider rejections are reported through
/// [`BrokeredIdentity::success`] and [`BrokeredIdentity::http_error_code`].
pub trait IdentityBroker: Send + Sync {
	/// Redeems `code` and resolves the user behind it.
	fn brokered_code_login<'a>(
		&'a self,
		code: &'a AuthorizationCode,
	) -> BrokerFuture<'a, BrokeredIdentity>;
}

/// Confidential Keycloak client performing the code exchange and userinfo lookup.
#[derive(Clone)]
pub struct KeycloakBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors.
	pub transport_mapper: Arc<M>,
	/// Realm descriptor with the authorization, token, and userinfo endpoints.
	pub descriptor: ProviderDescriptor,
	/// Strategy responsible for request adjustments and error classification.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// OAuth 2.0 client identifier registered in the realm.
	pub client_id: String,
	/// Client secret for confidential authentication.
	pub client_secret: Option<TokenSecret>,
	/// Redirect URI the frontend used when requesting the code.
	pub redirect_uri: Option<Url>,
}
impl<C, M> KeycloakBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport and mapper pair.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			strategy: Arc::new(DefaultProviderStrategy),
			client_id: client_id.into(),
			client_secret: None,
			redirect_uri: None,
		}
	}

	/// Sets or replaces the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Sets the redirect URI sent along with the code exchange.
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	/// Replaces the provider strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	async fn redeem(&self, code: &AuthorizationCode) -> Result<Option<TokenizedIdentity>> {
		let facade: BasicFacade<C, M> = BasicFacade::from_descriptor(
			&self.descriptor,
			&self.client_id,
			self.client_secret.as_ref().map(TokenSecret::expose),
			self.redirect_uri.as_ref(),
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?;
		let exchange =
			facade.exchange_authorization_code(self.strategy.as_ref(), code.as_str()).await?;
		let userinfo = facade.fetch_userinfo(&exchange.access_token).await?;

		Ok(assemble_identity(exchange, userinfo))
	}
}
#[cfg(feature = "reqwest")]
impl KeycloakBroker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker backed by a default reqwest transport.
	pub fn new(descriptor: ProviderDescriptor, client_id: impl Into<String>) -> Self {
		Self::with_http_client(
			descriptor,
			client_id,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> IdentityBroker for KeycloakBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn brokered_code_login<'a>(
		&'a self,
		code: &'a AuthorizationCode,
	) -> BrokerFuture<'a, BrokeredIdentity> {
		const KIND: FlowKind = FlowKind::CodeExchange;

		Box::pin(async move {
			let span = FlowSpan::new(KIND, "brokered_code_login");

			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

			match span.instrument(self.redeem(code)).await {
				Ok(identity) => {
					if identity.is_none() {
						tracing::warn!("Provider response lacks a subject, e-mail, or refresh token.");
					}

					obs::record_flow_outcome(KIND, FlowOutcome::Success);

					BrokeredIdentity::succeeded(identity)
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						status = ?err.http_status(),
						"Code exchange failed."
					);
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);

					BrokeredIdentity::from_error(&err)
				},
			}
		})
	}
}
impl<C, M> Debug for KeycloakBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeycloakBroker")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("redirect_uri", &self.redirect_uri)
			.finish()
	}
}

// Blank values count as missing.
fn assemble_identity(
	exchange: CodeExchange,
	userinfo: UserinfoClaims,
) -> Option<TokenizedIdentity> {
	let present = |value: &String| !value.trim().is_empty();
	let id = userinfo.sub.filter(present)?;
	let email = userinfo.email.filter(present)?;
	let refresh_token = exchange.refresh_token.filter(|token| !token.is_blank())?;

	Some(TokenizedIdentity {
		user: BrokeredUser { id, email },
		token: BrokeredTokens {
			access_token: exchange.access_token,
			refresh_token,
			expires_in: exchange.expires_in,
		},
	})
}
