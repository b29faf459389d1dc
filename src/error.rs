//! Client-level error types shared by the authenticator, the executor, and resource operations.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); never retried.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Fatal authentication failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// The service answered, but not with the expected status.
	#[error(transparent)]
	Resource(#[from] ResourceError),
	/// The service answered with a body that does not match the expected shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// The call context was cancelled.
	#[error("Operation was cancelled.")]
	Cancelled,
	/// The call context deadline elapsed.
	#[error("Operation deadline exceeded.")]
	DeadlineExceeded,
}
impl Error {
	/// Returns `true` when the error reports a missing resource.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::Resource(err) if err.is_not_found())
	}

	/// Returns `true` for cancellation and deadline errors.
	pub fn is_cancellation(&self) -> bool {
		matches!(self, Self::Cancelled | Self::DeadlineExceeded)
	}

	/// Returns `true` when the password grant reported that it is not offered (404/405).
	pub fn is_flow_not_supported(&self) -> bool {
		matches!(self, Self::Auth(AuthError::FlowNotSupported { .. }))
	}

	/// Returns the resource error carried by this value, if any.
	pub fn as_resource(&self) -> Option<&ResourceError> {
		match self {
			Self::Resource(err) => Some(err),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
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
	/// Service descriptor is invalid.
	#[error(transparent)]
	Descriptor(#[from] crate::descriptor::DescriptorError),
	/// A request URL could not be built from the descriptor.
	#[error("Request URL `{url}` is invalid.")]
	InvalidRequestUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Authentication was requested on a session without credentials.
	#[error("Session has no credentials to authenticate with.")]
	MissingCredentials,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[from] serde_json::Error),
	/// Poll interval must be non-zero.
	#[error("Poll interval must be greater than zero.")]
	ZeroPollInterval,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the service.")]
	Io(#[from] std::io::Error),
	/// HTTP client failed without a structured cause.
	#[error("HTTP client failed: {message}.")]
	Client {
		/// Message reported by the HTTP client.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Interactive sign-in stages, used to report where the form login failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignInStage {
	/// Initial authorization page.
	Authorize,
	/// Credentials form submission.
	Login,
	/// Consent form submission.
	Approve,
}
impl SignInStage {
	/// Returns a stable label for logs and error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Authorize => "authorize",
			Self::Login => "login",
			Self::Approve => "approve",
		}
	}
}
impl Display for SignInStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fatal authentication failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered 404 or 405; the interactive sign-in may be used instead.
	#[error("Password grant is not supported by the service (status {status}).")]
	FlowNotSupported {
		/// HTTP status code returned by the token endpoint.
		status: u16,
	},
	/// Token endpoint refused the password grant.
	#[error("Password grant was rejected: status: {status}, body: {body}.")]
	PasswordGrantRejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Response body as text.
		body: String,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded in a way the OAuth client could not interpret.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Message describing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// A sign-in page answered with a non-200 status.
	#[error("Sign-in {stage} page returned status {status}.")]
	SignInStatus {
		/// Stage that failed.
		stage: SignInStage,
		/// HTTP status code returned by the page.
		status: u16,
	},
	/// A sign-in page did not carry a CSRF token.
	#[error("Sign-in {stage} page does not contain a CSRF token.")]
	MissingCsrf {
		/// Stage whose page lacked the token.
		stage: SignInStage,
	},
	/// The sign-in finished without an access token in the redirect fragment.
	#[error("Sign-in finished without an access token.")]
	MissingAccessToken,
	/// A request was attempted before the session obtained a token.
	#[error("Session is not authenticated.")]
	Unauthenticated,
}

/// Identifier attached to a [`ResourceError`]: a numeric id or a descriptive string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceId {
	/// Numeric service identifier.
	Numeric(i64),
	/// Free-form description, such as `sandbox pool 3`, or empty for collections.
	Descriptive(String),
}
impl ResourceId {
	/// Identifier used for operations that do not target an existing resource.
	pub fn none() -> Self {
		Self::Descriptive(String::new())
	}
}
impl From<i64> for ResourceId {
	fn from(value: i64) -> Self {
		Self::Numeric(value)
	}
}
impl From<String> for ResourceId {
	fn from(value: String) -> Self {
		Self::Descriptive(value)
	}
}
impl From<&str> for ResourceId {
	fn from(value: &str) -> Self {
		Self::Descriptive(value.to_owned())
	}
}
impl Display for ResourceId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Numeric(id) => Display::fmt(id, f),
			Self::Descriptive(text) => f.write_str(text),
		}
	}
}

/// Failure reported for a service resource.
#[derive(Debug, ThisError)]
#[error("resource {resource} {identifier}: {cause}")]
pub struct ResourceError {
	/// Resource kind, for example `sandbox pool`.
	pub resource: String,
	/// Identifier of the resource.
	pub identifier: ResourceId,
	/// What went wrong.
	#[source]
	pub cause: ResourceCause,
}
impl ResourceError {
	/// Creates a new resource error.
	pub fn new(
		resource: impl Into<String>,
		identifier: impl Into<ResourceId>,
		cause: ResourceCause,
	) -> Self {
		Self { resource: resource.into(), identifier: identifier.into(), cause }
	}

	/// Returns `true` when the cause is [`ResourceCause::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self.cause, ResourceCause::NotFound)
	}
}

/// Cause carried by a [`ResourceError`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ResourceCause {
	/// The service answered 404.
	#[error("not found")]
	NotFound,
	/// The service answered with a status other than the expected one.
	#[error("status: {status}, body: {body}")]
	Unexpected {
		/// HTTP status code.
		status: u16,
		/// Response body as text.
		body: String,
	},
	/// The operation completed but the service reported a failure.
	#[error("{reason}")]
	Failed {
		/// Failure description.
		reason: String,
	},
}
impl ResourceCause {
	/// Classifies a status/body pair that did not match the expected status.
	pub fn classify(status: u16, body: &[u8]) -> Self {
		if status == 404 {
			Self::NotFound
		} else {
			Self::Unexpected { status, body: String::from_utf8_lossy(body).into_owned() }
		}
	}
}

/// Response body that could not be decoded into the expected shape.
#[derive(Debug, ThisError)]
#[error("Response for {resource} could not be decoded.")]
pub struct DecodeError {
	/// Resource kind whose payload failed to decode.
	pub resource: String,
	/// Structured parsing failure, including the JSON path.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
}

/// Decodes a JSON body, reporting the JSON path on failure.
pub(crate) fn decode_json<T>(resource: &str, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| DecodeError { resource: resource.to_owned(), source }.into())
}
