//! Async client for the KYPO cyber range sandbox service: password-grant and interactive sign-in,
//! lazy token refresh, bounded retries, and cancellable provisioning polls.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod poll;
pub mod request;
pub mod resources;
pub mod retry;
pub mod session;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Re-exports and client builders for unit and integration tests; outside this crate's own
	//! unit tests they require the `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{client::ReqwestKypoClient, retry::RetryConfig};

	/// Client identifier used by test clients.
	pub const TEST_CLIENT_ID: &str = "kypo-test-client";
	/// Bearer token carried by clients built with [`token_test_client`].
	pub const TEST_TOKEN: &str = "test-bearer-token";

	/// Builds a client that reuses [`TEST_TOKEN`] against `endpoint` without signing in.
	pub fn token_test_client(endpoint: &str) -> ReqwestKypoClient {
		ReqwestKypoClient::with_token(endpoint, TEST_CLIENT_ID, TEST_TOKEN)
			.expect("Failed to build token-authenticated test client.")
	}

	/// Builds a token client whose retry policy allows `retries` extra attempts with a 5 ms
	/// initial delay.
	pub fn retrying_test_client(endpoint: &str, retries: u32) -> ReqwestKypoClient {
		token_test_client(endpoint).with_retry(
			RetryConfig::with_retries(retries).with_initial_delay(StdDuration::from_millis(5)),
		)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::{
		context::CallContext,
		error::{Error, Result},
	};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
