// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"kypo_client_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts one backoff-and-retry of a request against `resource`.
pub fn record_retry(resource: &str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("kypo_client_retry_total", "resource" => resource.to_owned()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = resource;
	}
}

/// Counts one status check of a long-polled sandbox request (`allocation` or `cleanup`).
pub fn record_poll_check(request: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("kypo_client_poll_checks_total", "request" => request).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = request;
	}
}
