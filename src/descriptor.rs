//! Endpoint layout of a KYPO deployment.
//!
//! Every URL the client talks to derives from a single base endpoint. The token endpoint and the
//! interactive issuer default to the paths a stock deployment serves, and the builder overrides
//! either one for installations that move them.

/// Builder API for assembling service descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Keycloak token endpoint path relative to the base endpoint.
pub const TOKEN_PATH: &str = "/keycloak/realms/KYPO/protocol/openid-connect/token";
/// Interactive issuer path relative to the base endpoint.
pub const ISSUER_PATH: &str = "/csirtmu-dummy-issuer-server";
/// Sandbox service API prefix.
pub const SANDBOX_API_PATH: &str = "/kypo-sandbox-service/api/v1";
/// Linear training service API prefix.
pub const TRAINING_API_PATH: &str = "/kypo-rest-training/api/v1";
/// Adaptive training service API prefix.
pub const ADAPTIVE_TRAINING_API_PATH: &str = "/kypo-adaptive-training/api/v1";

/// Authentication endpoints derived from the base endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
	/// Password-grant token endpoint.
	pub token: Url,
	/// Interactive issuer authorization page.
	pub authorize: Url,
	/// Interactive issuer credentials form.
	pub login: Url,
}

/// Immutable service descriptor consumed by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
	/// Base endpoint, also used as the interactive sign-in redirect URI.
	pub endpoint: Url,
	/// Authentication endpoints.
	pub endpoints: ServiceEndpoints,
}
impl ServiceDescriptor {
	/// Creates a new builder for the provided base endpoint.
	pub fn builder(endpoint: Url) -> ServiceDescriptorBuilder {
		ServiceDescriptorBuilder::new(endpoint)
	}

	/// Parses `endpoint` and derives every other URL from it.
	pub fn from_endpoint(endpoint: &str) -> Result<Self, DescriptorError> {
		let url = Url::parse(endpoint)
			.map_err(|source| DescriptorError::InvalidEndpoint { url: endpoint.to_owned(), source })?;

		Self::builder(url).build()
	}

	/// Returns the base endpoint without a trailing slash.
	pub fn base(&self) -> &str {
		self.endpoint.as_str().trim_end_matches('/')
	}

	/// Builds an API URL by appending `path` (which starts with `/`) to the base endpoint.
	pub fn api_url(&self, path: &str) -> Result<Url> {
		let url = format!("{}{path}", self.base());

		Url::parse(&url).map_err(|source| ConfigError::InvalidRequestUrl { url, source }.into())
	}
}
