//! Transport primitives shared by the token exchange, the sign-in pages, and API calls.
//!
//! [`HttpTransport`] is the client's only dependency on an HTTP stack. It hands out
//! [`AsyncHttpClient`] handles that each carry a clone of a [`ResponseMetadataSlot`], so callers
//! can read the status code and the post-redirect URL of the last exchange even when `oauth2`
//! consumes the response. Implementations call [`ResponseMetadataSlot::take`] before dispatching a
//! request and [`ResponseMetadataSlot::store`] once a response arrives.

// std
#[cfg(feature = "reqwest")] use std::{ops::Deref, pin::Pin};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")]
use reqwest::{StatusCode, header::LOCATION, redirect::Policy};
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Maximum number of redirects followed by the interactive sign-in transport.
pub const SIGN_IN_REDIRECT_LIMIT: usize = 10;

/// Abstraction over HTTP transports used by the client.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared behind `Arc`, and the
/// handles they return must own whatever state is required so their request futures remain
/// `Send` for the lifetime of the in-flight exchange.
pub trait HttpTransport
where
	Self: 'static + Send + Sync + Sized,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request so stale
	///   information never leaks across attempts.
	/// - Once a response arrives, save its status and final URL with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;

	/// Creates the transport used by one interactive sign-in.
	///
	/// The returned transport must keep cookies between its requests, follow redirects, and
	/// record the post-redirect URL, fragment included, in [`ResponseMetadata::final_url`]. It is
	/// dropped once the sign-in finishes, so no cookie outlives it.
	fn sign_in_session(&self) -> Result<Self>;
}

/// Status and post-redirect URL of the last exchange made through a handle.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, when a response arrived.
	pub status: Option<u16>,
	/// URL that produced the response; differs from the request URL after redirects.
	pub final_url: Option<Url>,
}

/// Shared cell a handle writes [`ResponseMetadata`] into.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Replaces the stored metadata.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Removes and returns the stored metadata.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Who follows redirects for a reqwest transport.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum RedirectMode {
	/// reqwest follows redirects with its own policy.
	#[default]
	Client,
	/// The handle follows at most this many redirects and keeps each `Location` fragment.
	Handle(usize),
}

/// Default reqwest transport.
///
/// API calls and the password grant follow up to ten redirects, reqwest's default policy. The
/// sign-in transport follows redirects itself because reqwest drops the fragment of a `Location`
/// header, and the implicit grant delivers its token there.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
	client: ReqwestClient,
	redirects: RedirectMode,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps a preconfigured reqwest client, for example one with custom TLS roots.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, redirects: RedirectMode::Client }
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}

/// [`AsyncHttpClient`] handle of [`ReqwestHttpClient`] that fills a [`ResponseMetadataSlot`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	redirects: RedirectMode,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl ReqwestHandle {
	async fn exchange(
		client: ReqwestClient,
		redirects: RedirectMode,
		slot: ResponseMetadataSlot,
		request: HttpRequest,
	) -> Result<HttpResponse, HttpClientError<ReqwestError>> {
		slot.take();

		let method = request.method().clone();
		let request_headers = request.headers().clone();
		let request_body = request.body().clone();
		let request: reqwest::Request = request.try_into().map_err(Box::new)?;
		let mut url = request.url().clone();
		let mut response = client.execute(request).await.map_err(Box::new)?;

		match redirects {
			RedirectMode::Client => url = response.url().clone(),
			RedirectMode::Handle(limit) => {
				let mut hops = 0;

				while let Some(next) = redirect_target(&url, &response) {
					if hops == limit {
						return Err(HttpClientError::Other(format!(
							"Stopped after {limit} redirects at {url}."
						)));
					}

					hops += 1;

					// 307 and 308 replay the original request; every other redirect becomes a GET.
					let follow = match response.status() {
						StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => client
							.request(method.clone(), next.clone())
							.headers(request_headers.clone())
							.body(request_body.clone()),
						_ => client.get(next.clone()),
					};

					response = follow.send().await.map_err(Box::new)?;
					url = next;
				}
			},
		}

		let status = response.status();
		let headers = response.headers().clone();

		slot.store(ResponseMetadata { status: Some(status.as_u16()), final_url: Some(url) });

		let body = response.bytes().await.map_err(Box::new)?;
		let mut http_response = HttpResponse::new(body.to_vec());

		*http_response.status_mut() = status;
		*http_response.headers_mut() = headers;

		Ok(http_response)
	}
}

#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(Self::exchange(self.client.clone(), self.redirects, self.slot.clone(), request))
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ReqwestHandle { client: self.client.clone(), redirects: self.redirects, slot }
	}

	fn sign_in_session(&self) -> Result<Self> {
		let client = ReqwestClient::builder()
			.cookie_store(true)
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self { client, redirects: RedirectMode::Handle(SIGN_IN_REDIRECT_LIMIT) })
	}
}

/// Resolves the `Location` of a redirect response against the URL that produced it.
#[cfg(feature = "reqwest")]
fn redirect_target(base: &Url, response: &reqwest::Response) -> Option<Url> {
	if !response.status().is_redirection() {
		return None;
	}

	let location = response.headers().get(LOCATION)?.to_str().ok()?;

	base.join(location).ok()
}
