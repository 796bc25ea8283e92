// self
use crate::obs::{FlowOutcome, RequestPath};

/// Records a refresh cycle outcome via the global metrics recorder (when enabled).
pub fn record_refresh_outcome(outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("auth_interceptor_refresh_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records how a request travelled through the interceptor (when enabled).
pub fn record_request_path(path: RequestPath) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("auth_interceptor_request_total", "path" => path.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = path;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_refresh_outcome(FlowOutcome::Failure);
		record_request_path(RequestPath::Denied);
	}
}
