// self
use crate::{
	_prelude::*,
	descriptor::{ISSUER_PATH, ServiceDescriptor, ServiceEndpoints, TOKEN_PATH},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum DescriptorError {
	/// Endpoint string could not be parsed.
	#[error("Endpoint `{url}` is not a valid URL.")]
	InvalidEndpoint {
		/// Offending endpoint string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTP or HTTPS.
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The base endpoint must not carry a query or fragment.
	#[error("The base endpoint must not carry a query or fragment: {url}.")]
	DecoratedEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ServiceDescriptor`] values.
#[derive(Debug)]
pub struct ServiceDescriptorBuilder {
	/// Base endpoint of the deployment.
	pub endpoint: Url,
	/// Optional token endpoint override.
	pub token_endpoint: Option<Url>,
	/// Optional interactive authorization page override.
	pub authorize_endpoint: Option<Url>,
	/// Optional interactive credentials form override.
	pub login_endpoint: Option<Url>,
}
impl ServiceDescriptorBuilder {
	/// Creates a new builder seeded with the base endpoint.
	pub fn new(endpoint: Url) -> Self {
		Self { endpoint, token_endpoint: None, authorize_endpoint: None, login_endpoint: None }
	}

	/// Overrides the password-grant token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the interactive authorization page.
	pub fn authorize_endpoint(mut self, url: Url) -> Self {
		self.authorize_endpoint = Some(url);

		self
	}

	/// Overrides the interactive credentials form.
	pub fn login_endpoint(mut self, url: Url) -> Self {
		self.login_endpoint = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ServiceDescriptor, DescriptorError> {
		validate_endpoint("base", &self.endpoint)?;

		if self.endpoint.query().is_some() || self.endpoint.fragment().is_some() {
			return Err(DescriptorError::DecoratedEndpoint { url: self.endpoint.to_string() });
		}

		let base = self.endpoint.as_str().trim_end_matches('/');
		let token = match self.token_endpoint {
			Some(url) => url,
			None => derive(base, TOKEN_PATH)?,
		};
		let authorize = match self.authorize_endpoint {
			Some(url) => url,
			None => derive(base, &format!("{ISSUER_PATH}/authorize"))?,
		};
		let login = match self.login_endpoint {
			Some(url) => url,
			None => derive(base, &format!("{ISSUER_PATH}/login"))?,
		};
		let descriptor = ServiceDescriptor {
			endpoint: self.endpoint,
			endpoints: ServiceEndpoints { token, authorize, login },
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ServiceDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), DescriptorError> {
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("authorize", &self.endpoints.authorize)?;
		validate_endpoint("login", &self.endpoints.login)?;

		Ok(())
	}
}

fn derive(base: &str, path: &str) -> Result<Url, DescriptorError> {
	let url = format!("{base}{path}");

	Url::parse(&url).map_err(|source| DescriptorError::InvalidEndpoint { url, source })
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DescriptorError> {
	if matches!(url.scheme(), "http" | "https") {
		Ok(())
	} else {
		Err(DescriptorError::UnsupportedScheme { endpoint: name, url: url.to_string() })
	}
}
