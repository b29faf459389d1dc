//! In-memory session state: credentials, the current bearer token, and its expiry.
//!
//! A [`Session`] starts unauthenticated (or with a pre-issued token) and is mutated in place by
//! every successful sign-in or refresh. Token fields sit behind a [`RwLock`] that is never held
//! across an `.await`; the check-and-refresh sequence is serialized by a separate async guard.

mod secret;

pub use secret::*;

// self
use crate::_prelude::*;

/// Tokens are refreshed once they are within this window of their expiry.
pub const REFRESH_LEEWAY: Duration = Duration::seconds(10);

/// How the current bearer token was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
	/// Resource-owner password grant; the token carries an expiry.
	PasswordGrant,
	/// Interactive form login; the token has no tracked expiry.
	InteractiveLogin,
	/// Token supplied by the caller.
	StaticToken,
}
impl AuthStrategy {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::PasswordGrant => "password_grant",
			Self::InteractiveLogin => "interactive_login",
			Self::StaticToken => "static_token",
		}
	}
}
impl Display for AuthStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Username and password used for the password grant and the interactive sign-in.
#[derive(Clone, Debug)]
pub struct Credentials {
	/// Account name.
	pub username: String,
	/// Account password.
	pub password: Secret,
}
impl Credentials {
	/// Creates a new credential pair.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: Secret::new(password) }
	}
}

/// Bearer token plus the metadata needed to decide when it must be replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionToken {
	/// Bearer token sent with every request.
	pub bearer: Secret,
	/// Instant at which the token stops being valid, when known.
	pub expires_at: Option<OffsetDateTime>,
	/// Flow that produced the token.
	pub strategy: AuthStrategy,
}
impl SessionToken {
	/// Token issued by the password grant.
	pub fn password_grant(bearer: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self {
			bearer: Secret::new(bearer),
			expires_at: Some(expires_at),
			strategy: AuthStrategy::PasswordGrant,
		}
	}

	/// Token issued by the interactive sign-in.
	pub fn interactive(bearer: impl Into<String>) -> Self {
		Self {
			bearer: Secret::new(bearer),
			expires_at: None,
			strategy: AuthStrategy::InteractiveLogin,
		}
	}

	/// Token supplied by the caller.
	pub fn static_token(bearer: impl Into<String>) -> Self {
		Self { bearer: Secret::new(bearer), expires_at: None, strategy: AuthStrategy::StaticToken }
	}

	/// Returns `true` when the token must be refreshed before use at `now`.
	pub fn needs_refresh_at(&self, now: OffsetDateTime) -> bool {
		match self.expires_at {
			Some(expires_at) => now + REFRESH_LEEWAY >= expires_at,
			None => false,
		}
	}

	/// Returns `true` once the token has expired at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| now >= expires_at)
	}
}

/// Shared session state owned by a client.
pub struct Session {
	client_id: String,
	credentials: Option<Credentials>,
	token: RwLock<Option<SessionToken>>,
	guard: AsyncMutex<()>,
}
impl Session {
	/// Creates a session that must sign in with `credentials` before its first request.
	pub fn unauthenticated(client_id: impl Into<String>, credentials: Credentials) -> Self {
		Self {
			client_id: client_id.into(),
			credentials: Some(credentials),
			token: RwLock::new(None),
			guard: AsyncMutex::new(()),
		}
	}

	/// Creates a session around a caller-supplied bearer token.
	pub fn with_static_token(client_id: impl Into<String>, token: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			credentials: None,
			token: RwLock::new(Some(SessionToken::static_token(token))),
			guard: AsyncMutex::new(()),
		}
	}

	/// Returns the OAuth client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Returns the sign-in credentials, if the session has any.
	pub fn credentials(&self) -> Option<&Credentials> {
		self.credentials.as_ref()
	}

	/// Returns a snapshot of the current token.
	pub fn token(&self) -> Option<SessionToken> {
		self.token.read().clone()
	}

	/// Returns the current bearer token.
	pub fn bearer(&self) -> Option<Secret> {
		self.token.read().as_ref().map(|token| token.bearer.clone())
	}

	/// Returns the current token expiry, if one is tracked.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.token.read().as_ref().and_then(|token| token.expires_at)
	}

	/// Returns how the current token was obtained.
	pub fn strategy(&self) -> Option<AuthStrategy> {
		self.token.read().as_ref().map(|token| token.strategy)
	}

	/// Returns `true` once a token has been obtained.
	pub fn is_authenticated(&self) -> bool {
		self.token.read().is_some()
	}

	/// Returns `true` when a tracked expiry falls within [`REFRESH_LEEWAY`] of `now`.
	pub fn needs_refresh_at(&self, now: OffsetDateTime) -> bool {
		self.token.read().as_ref().is_some_and(|token| token.needs_refresh_at(now))
	}

	/// Returns `true` when a token exists and needs no refresh at `now`.
	pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
		self.token.read().as_ref().is_some_and(|token| !token.needs_refresh_at(now))
	}

	pub(crate) fn replace_token(&self, token: SessionToken) {
		*self.token.write() = Some(token);
	}

	pub(crate) fn guard(&self) -> &AsyncMutex<()> {
		&self.guard
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let token = self.token.read();

		f.debug_struct("Session")
			.field("client_id", &self.client_id)
			.field("has_credentials", &self.credentials.is_some())
			.field("strategy", &token.as_ref().map(|token| token.strategy))
			.field("expires_at", &token.as_ref().and_then(|token| token.expires_at))
			.finish()
	}
}
