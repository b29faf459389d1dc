//! Optional observability helpers for client flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `kypo_client.flow` with the `flow` and
//!   `stage` (call site) fields, plus debug/warn events for retries, refreshes, and polls.
//! - Enable `metrics` to increment the `kypo_client_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`. Retries add to
//!   `kypo_client_retry_total{resource}` and poll checks to
//!   `kypo_client_poll_checks_total{request}`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Resource-owner password grant.
	PasswordGrant,
	/// Interactive form login fallback.
	InteractiveLogin,
	/// Password grant re-run for an expiring token.
	Refresh,
	/// Retrying request execution.
	Request,
	/// Long-poll for an allocation or cleanup request.
	Poll,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::PasswordGrant => "password_grant",
			FlowKind::InteractiveLogin => "interactive_login",
			FlowKind::Refresh => "refresh",
			FlowKind::Request => "request",
			FlowKind::Poll => "poll",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a client flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto [`FlowOutcome::Success`] or [`FlowOutcome::Failure`].
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Emits a debug event when tracing is enabled.
macro_rules! flow_debug {
	($($arg:tt)*) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::debug!($($arg)*);
		}
	};
}

/// Emits a warn event when tracing is enabled.
macro_rules! flow_warn {
	($($arg:tt)*) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::warn!($($arg)*);
		}
	};
}

pub(crate) use flow_debug;
pub(crate) use flow_warn;
