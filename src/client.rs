//! The KYPO client: session, transport, and retry policy bundled behind one handle.
//!
//! Flow implementations live next to the concern they cover (`auth`, `request`, `retry`, `poll`,
//! `resources`) as additional `impl` blocks on [`KypoClient`], so this module only owns
//! construction.

// self
use crate::{
	_prelude::*,
	auth::AuthMetrics,
	descriptor::ServiceDescriptor,
	http::HttpTransport,
	oauth::TransportErrorMapper,
	retry::RetryConfig,
	session::{Credentials, Session},
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError, http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper,
};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestKypoClient = KypoClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Authenticated handle to one KYPO deployment.
///
/// The client owns the HTTP transport, the service descriptor, and the shared [`Session`].
/// Clones share the session, so a token refreshed through one clone is visible to all of them.
#[derive(Clone)]
pub struct KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Endpoint layout of the deployment.
	pub descriptor: ServiceDescriptor,
	/// Retry policy applied by [`KypoClient::execute_with_retry`].
	pub retry: RetryConfig,
	/// Sign-in and refresh counters shared by every clone.
	pub auth_metrics: Arc<AuthMetrics>,
	pub(crate) session: Arc<Session>,
}
impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Creates a client around `session` without contacting the service.
	pub fn from_session(
		descriptor: ServiceDescriptor,
		session: Session,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			retry: RetryConfig::default(),
			auth_metrics: Default::default(),
			session: Arc::new(session),
		}
	}

	/// Signs in with `credentials` over the caller-provided transport + mapper pair.
	///
	/// Fails when neither the password grant nor the interactive sign-in yields a token.
	pub async fn login_with_http_client(
		ctx: &CallContext,
		descriptor: ServiceDescriptor,
		client_id: impl Into<String>,
		credentials: Credentials,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let session = Session::unauthenticated(client_id, credentials);
		let client = Self::from_session(descriptor, session, http_client, mapper);

		client.authenticate(ctx).await?;

		Ok(client)
	}

	/// Creates a client that reuses a pre-issued bearer token over the caller-provided transport.
	pub fn with_token_and_http_client(
		descriptor: ServiceDescriptor,
		client_id: impl Into<String>,
		token: impl Into<String>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self::from_session(
			descriptor,
			Session::with_static_token(client_id, token),
			http_client,
			mapper,
		)
	}

	/// Replaces the retry policy.
	pub fn with_retry(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;

		self
	}

	/// Returns the shared session.
	pub fn session(&self) -> &Session {
		&self.session
	}
}
#[cfg(feature = "reqwest")]
impl KypoClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Signs in to `endpoint` with a username and password.
	///
	/// The password grant is tried first; when the token endpoint answers 404 or 405 the client
	/// falls back to the interactive form login. The call fails if no token is obtained.
	pub async fn new(
		endpoint: &str,
		client_id: impl Into<String>,
		username: impl Into<String>,
		password: impl Into<String>,
	) -> Result<Self> {
		let descriptor = ServiceDescriptor::from_endpoint(endpoint).map_err(ConfigError::from)?;

		Self::login_with_http_client(
			&CallContext::new(),
			descriptor,
			client_id,
			Credentials::new(username, password),
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.await
	}

	/// Creates a client that reuses a pre-issued bearer token and never signs in.
	pub fn with_token(
		endpoint: &str,
		client_id: impl Into<String>,
		token: impl Into<String>,
	) -> Result<Self> {
		let descriptor = ServiceDescriptor::from_endpoint(endpoint).map_err(ConfigError::from)?;

		Ok(Self::with_token_and_http_client(
			descriptor,
			client_id,
			token,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KypoClient")
			.field("descriptor", &self.descriptor)
			.field("retry", &self.retry)
			.field("session", &self.session)
			.finish()
	}
}
