//! `vault_account_phase_total` counter, a no-op unless the `metrics` feature is enabled.

// self
use crate::obs::{Phase, PhaseOutcome};

impl PhaseOutcome {
	pub(crate) fn record(self, phase: Phase) {
		#[cfg(feature = "metrics")]
		metrics::counter!(
			"vault_account_phase_total",
			"phase" => phase.as_str(),
			"outcome" => self.as_str()
		)
		.increment(1);

		#[cfg(not(feature = "metrics"))]
		let _ = (self, phase);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_silent() {
		for outcome in [PhaseOutcome::Attempt, PhaseOutcome::Success, PhaseOutcome::Failure] {
			outcome.record(Phase::Store);
		}
	}
}
