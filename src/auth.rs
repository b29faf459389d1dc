//! Session authentication: initial sign-in, lazy refresh, and the interactive fallback.
//!
//! [`KypoClient::ensure_valid_token`] runs before every outgoing request. An unauthenticated
//! session signs in with the password grant and falls back to the interactive form login when
//! the token endpoint answers 404 or 405. A password-grant token is re-issued once the clock is
//! within [`REFRESH_LEEWAY`](crate::session::REFRESH_LEEWAY) of its expiry. Concurrent callers
//! serialize on the session guard and re-check after acquiring it, so one refresh serves them
//! all; a failed refresh leaves the previous token in place.

mod interactive;
mod metrics;
mod password;

pub use interactive::*;
pub use metrics::{AuthMetrics, AuthMetricsSnapshot};

// self
use crate::{
	_prelude::*,
	client::KypoClient,
	error::ConfigError,
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, flow_debug, flow_warn},
	session::{Credentials, SessionToken},
};

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Signs in from scratch and replaces the session token.
	pub async fn authenticate(&self, ctx: &CallContext) -> Result<()> {
		let _guard = self.session.guard().lock().await;
		let token = self.sign_in(ctx).await?;

		self.session.replace_token(token);

		Ok(())
	}

	/// Makes sure the session holds a token that is usable right now.
	pub async fn ensure_valid_token(&self, ctx: &CallContext) -> Result<()> {
		self.ensure_valid_token_at(ctx, OffsetDateTime::now_utc()).await
	}

	/// Same as [`KypoClient::ensure_valid_token`], evaluated at `now`.
	pub async fn ensure_valid_token_at(&self, ctx: &CallContext, now: OffsetDateTime) -> Result<()> {
		if self.session.is_usable_at(now) {
			return Ok(());
		}

		let _guard = self.session.guard().lock().await;

		match self.session.token() {
			None => {
				let token = self.sign_in(ctx).await?;

				self.session.replace_token(token);

				Ok(())
			},
			Some(token) if token.needs_refresh_at(now) => self.refresh_locked(ctx).await,
			Some(_) => Ok(()),
		}
	}

	/// Re-runs the password grant when the tracked expiry is within the refresh window at `now`.
	///
	/// Returns `true` when a new token was installed. Sessions without a tracked expiry are
	/// never refreshed.
	pub async fn refresh_if_needed_at(&self, ctx: &CallContext, now: OffsetDateTime) -> Result<bool> {
		if !self.session.needs_refresh_at(now) {
			return Ok(false);
		}

		let _guard = self.session.guard().lock().await;

		if !self.session.needs_refresh_at(now) {
			return Ok(false);
		}

		self.refresh_locked(ctx).await.map(|()| true)
	}

	async fn sign_in(&self, ctx: &CallContext) -> Result<SessionToken> {
		let credentials = self.credentials()?;
		let token = match self.password_grant(ctx, credentials).await {
			Err(err) if err.is_flow_not_supported() => {
				flow_debug!(error = %err, "Password grant unavailable; using the interactive sign-in.");

				self.auth_metrics.record_fallback();

				self.interactive_login(ctx, credentials).await?
			},
			result => result?,
		};

		self.auth_metrics.record_sign_in();

		Ok(token)
	}

	async fn refresh_locked(&self, ctx: &CallContext) -> Result<()> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_locked");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.auth_metrics.record_refresh();

		let result = span
			.instrument(async {
				let credentials = self.credentials()?;
				let token = self.password_grant(ctx, credentials).await?;

				self.session.replace_token(token);

				Ok(())
			})
			.await;

		if let Err(_err) = &result {
			flow_warn!(error = %_err, "Token refresh failed; keeping the previous token.");

			self.auth_metrics.record_refresh_failure();
		}

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	fn credentials(&self) -> Result<&Credentials> {
		self.session.credentials().ok_or_else(|| ConfigError::MissingCredentials.into())
	}
}
