//! `oauth2` facade for the password grant and the interactive authorization URL.

pub use oauth2;

// crates.io
use oauth2::{
	AuthUrl, ClientId, CsrfToken, EndpointNotSet, EndpointSet, HttpClientError, RedirectUrl,
	RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, ResponseType, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	descriptor::{DescriptorError, ServiceDescriptor},
	error::{AuthError, ConfigError, TransportError},
	http::{HttpTransport, ResponseMetadata, ResponseMetadataSlot},
	session::{Credentials, SessionToken},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Response type requested from the interactive issuer.
pub const SIGN_IN_RESPONSE_TYPE: &str = "id_token token";
/// Scopes requested from the interactive issuer.
pub const SIGN_IN_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Maps HTTP transport failures into client [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a client error.
	fn map_transport_error(
		&self,
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
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) =>
				TransportError::Client { message, status: meta_status(meta) }.into(),
			_ => TransportError::Client {
				message: "unknown HTTP client failure".into(),
				status: meta_status(meta),
			}
			.into(),
		}
	}
}

/// `oauth2` client configured for one service descriptor.
pub(crate) struct BasicFacade<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ServiceDescriptor,
		client_id: &str,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorize.to_string())
			.map_err(|source| invalid_endpoint(descriptor.endpoints.authorize.as_str(), source))?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| invalid_endpoint(descriptor.endpoints.token.as_str(), source))?;
		let redirect_url = RedirectUrl::new(descriptor.base().to_owned())
			.map_err(|source| invalid_endpoint(descriptor.base(), source))?;
		let oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		Ok(Self { oauth_client, http_client, error_mapper })
	}

	/// Runs the resource-owner password grant.
	pub(crate) async fn exchange_password(&self, credentials: &Credentials) -> Result<SessionToken> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let username = ResourceOwnerUsername::new(credentials.username.clone());
		let password = ResourceOwnerPassword::new(credentials.password.expose().to_owned());
		let response = self
			.oauth_client
			.exchange_password(&username, &password)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

		map_password_response(response)
	}

	/// Builds the interactive issuer authorization URL.
	pub(crate) fn authorization_url(&self) -> Url {
		let (url, _state) = self
			.oauth_client
			.authorize_url(CsrfToken::new_random)
			.set_response_type(&ResponseType::new(SIGN_IN_RESPONSE_TYPE.into()))
			.add_scopes(SIGN_IN_SCOPES.iter().map(|scope| Scope::new((*scope).into())))
			.url();

		url
	}
}

fn invalid_endpoint(url: &str, source: url::ParseError) -> Error {
	ConfigError::from(DescriptorError::InvalidEndpoint { url: url.to_owned(), source }).into()
}

fn map_password_response(response: BasicTokenResponse) -> Result<SessionToken> {
	let expires_in = response.expires_in().ok_or(AuthError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| AuthError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(AuthError::NonPositiveExpiresIn.into());
	}

	let expires_at = OffsetDateTime::now_utc() + Duration::seconds(expires_in);

	Ok(SessionToken::password_grant(response.access_token().secret().to_owned(), expires_at))
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();
	let status = meta_status(meta_ref);

	if let RequestTokenError::Request(error) = err {
		return mapper.map_transport_error(meta_ref, error);
	}
	if let Some(code @ (404 | 405)) = status {
		return AuthError::FlowNotSupported { status: code }.into();
	}

	match (err, status) {
		(RequestTokenError::ServerResponse(response), status) => AuthError::PasswordGrantRejected {
			status: status.unwrap_or_default(),
			body: serde_json::to_string(&response).unwrap_or_default(),
		}
		.into(),
		(RequestTokenError::Parse(_, body), Some(status)) if !(200..300).contains(&status) =>
			AuthError::PasswordGrantRejected {
				status,
				body: String::from_utf8_lossy(&body).into_owned(),
			}
			.into(),
		(RequestTokenError::Parse(source, _), status) =>
			AuthError::TokenResponseParse { source, status }.into(),
		(RequestTokenError::Other(_), Some(status)) if !(200..300).contains(&status) =>
			AuthError::PasswordGrantRejected { status, body: String::new() }.into(),
		(RequestTokenError::Other(message), status) =>
			AuthError::TokenEndpoint { message, status }.into(),
		(RequestTokenError::Request(error), _) => mapper.map_transport_error(meta_ref, error),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::from(err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
