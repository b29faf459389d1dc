//! Redacting wrapper for passwords and bearer tokens.

// self
use crate::_prelude::*;

/// Password or bearer token that never prints its value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Wraps a secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw value. Never log it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` for an empty secret.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// `Authorization` header value carrying this secret as a bearer token.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Secret(<redacted>)")
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
