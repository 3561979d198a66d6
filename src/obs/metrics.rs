// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_token_bridge_flow_total",
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

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcomes_map_from_success_flags() {
		assert_eq!(FlowOutcome::from_success(true), FlowOutcome::Success);
		assert_eq!(FlowOutcome::from_success(false), FlowOutcome::Failure);

		record_flow_outcome(FlowKind::CodeExchange, FlowOutcome::Failure);
	}
}
