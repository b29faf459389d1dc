//! Request executor: attaches session headers and performs exactly one HTTP exchange.
//!
//! The executor never interprets the status code. Callers that expect a specific status go
//! through [`KypoClient::execute_with_retry`](crate::client::KypoClient::execute_with_retry),
//! which classifies mismatches with [`RequestOutcome::expect_status`].

pub use oauth2::http::{Method, StatusCode};

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	client::KypoClient,
	error::{AuthError, ConfigError, ResourceCause},
	http::{HttpTransport, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	session::Secret,
};

/// `Accept` value used for raw file downloads.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// One API request, described independently of the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Request body; empty for bodiless requests.
	pub body: Vec<u8>,
	/// Optional `Accept` header value.
	pub accept: Option<&'static str>,
}
impl ApiRequest {
	/// Creates a bodiless request.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, body: Vec::new(), accept: None }
	}

	/// Creates a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Creates a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Creates a `PATCH` request.
	pub fn patch(url: Url) -> Self {
		Self::new(Method::PATCH, url)
	}

	/// Creates a `DELETE` request.
	pub fn delete(url: Url) -> Self {
		Self::new(Method::DELETE, url)
	}

	/// Sets a raw request body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Serializes `value` as the JSON request body.
	pub fn with_json<T>(self, value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(value).map_err(ConfigError::from)?;

		Ok(self.with_body(body))
	}

	/// Sets the `Accept` header.
	pub fn with_accept(mut self, accept: &'static str) -> Self {
		self.accept = Some(accept);

		self
	}

	fn to_http(&self, bearer: &Secret) -> Result<HttpRequest> {
		let mut builder = Request::builder()
			.method(self.method.clone())
			.uri(self.url.as_str())
			.header(CONTENT_TYPE, "application/json")
			.header(AUTHORIZATION, bearer.bearer_header());

		if let Some(accept) = self.accept {
			builder = builder.header(ACCEPT, accept);
		}

		builder.body(self.body.clone()).map_err(|err| ConfigError::from(err).into())
	}
}

/// Status and fully drained body of one exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOutcome {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response body.
	pub body: Vec<u8>,
}
impl RequestOutcome {
	/// Returns the body as text, replacing invalid UTF-8.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Returns the body when the status matches `expected`, otherwise the classified cause.
	pub fn expect_status(self, expected: StatusCode) -> Result<Vec<u8>, ResourceCause> {
		if self.status == expected {
			Ok(self.body)
		} else {
			Err(ResourceCause::classify(self.status.as_u16(), &self.body))
		}
	}
}

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Performs exactly one exchange with session headers attached.
	///
	/// The token is refreshed first when it is about to expire. Every status code is returned as
	/// data; only transport failures, authentication failures, and context cancellation are
	/// errors.
	pub async fn execute(&self, ctx: &CallContext, request: &ApiRequest) -> Result<RequestOutcome> {
		ctx.run(async {
			self.ensure_valid_token(ctx).await?;

			let bearer = self.session.bearer().ok_or(AuthError::Unauthenticated)?;
			let http_request = request.to_http(&bearer)?;
			let meta = ResponseMetadataSlot::default();
			let handle = self.http_client.with_metadata(meta.clone());
			let response = handle.call(http_request).await.map_err(|err| {
				self.transport_mapper.map_transport_error(meta.take().as_ref(), err)
			})?;
			let status = response.status();

			Ok(RequestOutcome { status, body: response.into_body() })
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url() -> Url {
		Url::parse("https://kypo.example.com/kypo-sandbox-service/api/v1/pools")
			.expect("Failed to parse request URL.")
	}

	#[test]
	fn http_request_carries_session_headers() {
		let request = ApiRequest::post(url())
			.with_json(&serde_json::json!({ "definition_id": 1, "max_size": 2 }))
			.expect("JSON body should serialize.")
			.with_accept(OCTET_STREAM);
		let http = request
			.to_http(&Secret::new("abc"))
			.expect("Request should convert to an HTTP request.");

		assert_eq!(http.method(), &Method::POST);
		assert_eq!(http.headers()[AUTHORIZATION], "Bearer abc");
		assert_eq!(http.headers()[CONTENT_TYPE], "application/json");
		assert_eq!(http.headers()[ACCEPT], OCTET_STREAM);
		assert_eq!(http.body(), br#"{"definition_id":1,"max_size":2}"#);
	}

	#[test]
	fn expect_status_classifies_mismatches() {
		let ok = RequestOutcome { status: StatusCode::CREATED, body: b"{}".to_vec() };

		assert_eq!(ok.expect_status(StatusCode::CREATED), Ok(b"{}".to_vec()));

		let missing = RequestOutcome { status: StatusCode::NOT_FOUND, body: Vec::new() };

		assert_eq!(missing.expect_status(StatusCode::OK), Err(ResourceCause::NotFound));

		let failed =
			RequestOutcome { status: StatusCode::INTERNAL_SERVER_ERROR, body: b"oops".to_vec() };

		assert_eq!(failed.body_text(), "oops");
		assert_eq!(
			failed.expect_status(StatusCode::OK),
			Err(ResourceCause::Unexpected { status: 500, body: "oops".into() })
		);
	}
}
