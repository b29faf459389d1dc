// self
use crate::_prelude::*;

/// Account that created a resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
	/// Numeric user id.
	pub id: i64,
	/// OIDC subject.
	pub sub: String,
	/// Display name.
	pub full_name: String,
	/// Given name.
	pub given_name: String,
	/// Family name.
	pub family_name: String,
	/// E-mail address.
	pub mail: String,
}
