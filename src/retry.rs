//! Bounded retries with exponential backoff for requests that expect one status code.
//!
//! A call makes `1 + max_retries` attempts. Transport and authentication errors end the call at
//! once. A status mismatch becomes a pending resource error (`NotFound` for 404, `Unexpected`
//! otherwise); if attempts remain the call waits `initial_delay * backoff_multiplier^retry` and
//! tries again, and after the final attempt it returns the last pending error without waiting.
//! Every wait races the call context, so cancellation interrupts a backoff immediately.

// self
use crate::{
	_prelude::*,
	client::KypoClient,
	error::{ResourceError, ResourceId},
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, flow_debug},
	request::{ApiRequest, RequestOutcome, StatusCode},
};

/// Retry policy applied to one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
	/// Additional attempts beyond the first (0 = try once).
	pub max_retries: u32,
	/// Delay before the first retry.
	pub initial_delay: StdDuration,
	/// Factor applied to the delay after every retry.
	pub backoff_multiplier: u32,
}
impl RetryConfig {
	/// Default delay before the first retry.
	pub const DEFAULT_INITIAL_DELAY: StdDuration = StdDuration::from_millis(100);
	/// Default backoff multiplier.
	pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

	/// Creates a config with the given number of retries and default timing.
	pub fn with_retries(retries: u32) -> Self {
		Self { max_retries: retries, ..Default::default() }
	}

	/// Overrides the delay before the first retry.
	pub fn with_initial_delay(mut self, delay: StdDuration) -> Self {
		self.initial_delay = delay;

		self
	}

	/// Overrides the backoff multiplier.
	pub fn with_backoff_multiplier(mut self, multiplier: u32) -> Self {
		self.backoff_multiplier = multiplier;

		self
	}

	/// Total number of attempts a call may make.
	pub fn attempts(&self) -> u32 {
		self.max_retries.saturating_add(1)
	}

	/// Delay before retry number `retry` (0-indexed); the first retry waits `initial_delay`.
	pub fn delay_for_retry(&self, retry: u32) -> StdDuration {
		self.initial_delay.saturating_mul(self.backoff_multiplier.saturating_pow(retry))
	}
}
impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: 0,
			initial_delay: Self::DEFAULT_INITIAL_DELAY,
			backoff_multiplier: Self::DEFAULT_BACKOFF_MULTIPLIER,
		}
	}
}

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Executes `request` until it answers `expected`, retrying per [`KypoClient::retry`].
	///
	/// Returns the body of the first matching response. When every attempt mismatches, the error
	/// of the last attempt is returned, tagged with `resource` and `identifier`.
	pub async fn execute_with_retry(
		&self,
		ctx: &CallContext,
		request: &ApiRequest,
		expected: StatusCode,
		resource: &str,
		identifier: impl Into<ResourceId>,
	) -> Result<Vec<u8>> {
		const KIND: FlowKind = FlowKind::Request;

		let identifier = identifier.into();
		let span = FlowSpan::for_resource(KIND, "execute_with_retry", resource);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(run_with_retry(
				ctx,
				&self.retry,
				expected,
				resource,
				&identifier,
				move || self.execute(ctx, request),
			))
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}

pub(crate) async fn run_with_retry<F, Fut>(
	ctx: &CallContext,
	config: &RetryConfig,
	expected: StatusCode,
	resource: &str,
	identifier: &ResourceId,
	mut attempt: F,
) -> Result<Vec<u8>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<RequestOutcome>>,
{
	let mut retry = 0;

	loop {
		let cause = match attempt().await?.expect_status(expected) {
			Ok(body) => return Ok(body),
			Err(cause) => cause,
		};

		if retry >= config.max_retries {
			return Err(ResourceError::new(resource, identifier.clone(), cause).into());
		}

		let delay = config.delay_for_retry(retry);

		flow_debug!(resource, %identifier, %cause, retry, ?delay, "Retrying request.");
		obs::record_retry(resource);

		ctx.sleep(delay).await?;

		retry += 1;
	}
}
