// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Authentication counters shared by every clone of a client.
#[derive(Debug, Default)]
pub struct AuthMetrics {
	sign_ins: AtomicU64,
	fallbacks: AtomicU64,
	refreshes: AtomicU64,
	refresh_failures: AtomicU64,
}
impl AuthMetrics {
	/// Returns the number of completed sign-ins from an unauthenticated session.
	pub fn sign_ins(&self) -> u64 {
		self.sign_ins.load(Ordering::Relaxed)
	}

	/// Returns how many sign-ins fell back to the interactive form login.
	pub fn fallbacks(&self) -> u64 {
		self.fallbacks.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh attempts.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that kept the previous token.
	pub fn refresh_failures(&self) -> u64 {
		self.refresh_failures.load(Ordering::Relaxed)
	}

	/// Copies every counter at once.
	pub fn snapshot(&self) -> AuthMetricsSnapshot {
		AuthMetricsSnapshot {
			sign_ins: self.sign_ins(),
			fallbacks: self.fallbacks(),
			refreshes: self.refreshes(),
			refresh_failures: self.refresh_failures(),
		}
	}

	pub(crate) fn record_sign_in(&self) {
		self.sign_ins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fallback(&self) {
		self.fallbacks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_failure(&self) {
		self.refresh_failures.fetch_add(1, Ordering::Relaxed);
	}
}

/// Point-in-time copy of [`AuthMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuthMetricsSnapshot {
	/// Completed sign-ins.
	pub sign_ins: u64,
	/// Sign-ins served by the interactive form login.
	pub fallbacks: u64,
	/// Refresh attempts.
	pub refreshes: u64,
	/// Failed refreshes.
	pub refresh_failures: u64,
}
