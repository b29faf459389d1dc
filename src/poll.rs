//! Long-poll for asynchronous sandbox requests.
//!
//! The poller ticks on a fixed period whose first tick fires one interval after the start. Each
//! tick fetches the request once through the executor, without retries, and the poll ends at the
//! first response whose stages contain neither `RUNNING` nor `IN_QUEUE`. There is no built-in
//! deadline: callers bound the wait through the [`CallContext`].

// crates.io
use tokio::time::{self, Instant, MissedTickBehavior};
// self
use crate::{
	_prelude::*,
	client::KypoClient,
	descriptor::SANDBOX_API_PATH,
	error::{ConfigError, ResourceCause, ResourceError, decode_json},
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, flow_debug},
	request::{ApiRequest, RequestOutcome, StatusCode},
	resources::SandboxRequest,
};

/// Stage marker for a request waiting to start.
pub const STAGE_IN_QUEUE: &str = "IN_QUEUE";
/// Stage marker for a request in progress.
pub const STAGE_RUNNING: &str = "RUNNING";
/// Stage marker for a completed stage.
pub const STAGE_FINISHED: &str = "FINISHED";
/// Stage marker for a failed stage.
pub const STAGE_FAILED: &str = "FAILED";

/// Resource kind used for errors raised while polling.
const REQUEST_RESOURCE: &str = "sandbox request";

/// Which request of an allocation unit is polled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
	/// Sandbox allocation request.
	Allocation,
	/// Sandbox cleanup request.
	Cleanup,
}
impl RequestKind {
	/// Returns the path segment prefix used by the service.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Allocation => "allocation",
			Self::Cleanup => "cleanup",
		}
	}

	/// Returns `true` when the service deletes the request (and its unit) on success.
	pub const fn removed_on_completion(self) -> bool {
		matches!(self, Self::Cleanup)
	}
}
impl Display for RequestKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Terminal result of a poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
	/// The job reached a terminal stage.
	Terminal(T),
	/// The job disappeared, which for cleanup requests means it finished.
	Removed,
}

impl<C, M> KypoClient<C, M>
where
	C: HttpTransport,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Polls the `kind` request of allocation unit `unit_id` every `interval` until it finishes.
	///
	/// Transport and decode failures, as well as statuses other than 200 and 404, end the poll
	/// with an error. A 404 ends a cleanup poll with [`PollOutcome::Removed`] and any other poll
	/// with a not-found error.
	pub async fn poll_request_finished(
		&self,
		ctx: &CallContext,
		unit_id: i64,
		interval: StdDuration,
		kind: RequestKind,
	) -> Result<PollOutcome<SandboxRequest>> {
		const KIND: FlowKind = FlowKind::Poll;

		let span = FlowSpan::new(KIND, "poll_request_finished");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let url = self.descriptor.api_url(&format!(
					"{SANDBOX_API_PATH}/sandbox-allocation-units/{unit_id}/{kind}-request"
				))?;
				let request = &ApiRequest::get(url);

				poll_until(ctx, interval, move || async move {
					obs::record_poll_check(kind.as_str());

					let outcome = self.execute(ctx, request).await?;

					check_response(unit_id, kind, outcome)
				})
				.await
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}

/// Interprets one status fetch: `None` while the request is still running.
fn check_response(
	unit_id: i64,
	kind: RequestKind,
	outcome: RequestOutcome,
) -> Result<Option<PollOutcome<SandboxRequest>>> {
	match outcome.status {
		StatusCode::OK => {
			let job: SandboxRequest = decode_json(REQUEST_RESOURCE, &outcome.body)?;

			if job.is_finished() {
				return Ok(Some(PollOutcome::Terminal(job)));
			}

			flow_debug!(unit_id, %kind, stages = ?job.stages, "Request still running.");

			Ok(None)
		},
		StatusCode::NOT_FOUND if kind.removed_on_completion() => Ok(Some(PollOutcome::Removed)),
		status => Err(ResourceError::new(
			REQUEST_RESOURCE,
			unit_id,
			ResourceCause::classify(status.as_u16(), &outcome.body),
		)
		.into()),
	}
}

/// Calls `check` on every tick until it yields a value, an error, or the context finishes.
pub(crate) async fn poll_until<T, F, Fut>(
	ctx: &CallContext,
	interval: StdDuration,
	mut check: F,
) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<Option<T>>>,
{
	if interval.is_zero() {
		return Err(ConfigError::ZeroPollInterval.into());
	}

	let mut ticker = time::interval_at(Instant::now() + interval, interval);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			biased;
			err = ctx.done() => return Err(err),
			_ = ticker.tick() => {},
		}

		if let Some(value) = ctx.run(check()).await? {
			return Ok(value);
		}
	}
}
