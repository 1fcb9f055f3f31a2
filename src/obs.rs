//! Optional observability helpers for provisioning phases.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to wrap each phase in a span named `vault_account.phase` with the `phase`
//!   and `stage` (call site) fields.
//! - Enable `metrics` to increment the `vault_account_phase_total` counter for every
//!   attempt/success/failure, labeled by `phase` + `outcome`.
//!
//! Neither layer records secrets, tokens, or paths.

mod counter;
mod span;

// self
use self::span::PhaseSpan;
use crate::_prelude::*;

/// Provisioning phases observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Account request validation.
	Validate,
	/// Explicit mutual-TLS handshake check.
	Handshake,
	/// Role login exchange.
	Login,
	/// Token-scoped secret read.
	Fetch,
	/// Check-and-set guarded secret write.
	Store,
}
impl Phase {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Phase::Validate => "validate",
			Phase::Handshake => "handshake",
			Phase::Login => "login",
			Phase::Fetch => "fetch",
			Phase::Store => "store",
		}
	}
}
impl Display for Phase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseOutcome {
	/// Entry to a phase.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl PhaseOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			PhaseOutcome::Attempt => "attempt",
			PhaseOutcome::Success => "success",
			PhaseOutcome::Failure => "failure",
		}
	}
}
impl Display for PhaseOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

impl PhaseOutcome {
	fn of<T, E>(result: &Result<T, E>) -> Self {
		match result {
			Ok(_) => Self::Success,
			Err(_) => Self::Failure,
		}
	}
}

/// Runs a synchronous phase inside its span and counts attempt + outcome.
pub(crate) fn observe_sync<T, E>(
	phase: Phase,
	stage: &'static str,
	f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
	PhaseOutcome::Attempt.record(phase);

	let result = PhaseSpan::new(phase, stage).in_scope(f);

	PhaseOutcome::of(&result).record(phase);

	result
}

/// Async counterpart of [`observe_sync`].
pub(crate) async fn observe<T, E, Fut>(phase: Phase, stage: &'static str, fut: Fut) -> Result<T, E>
where
	Fut: Future<Output = Result<T, E>>,
{
	PhaseOutcome::Attempt.record(phase);

	let result = PhaseSpan::new(phase, stage).run(fut).await;

	PhaseOutcome::of(&result).record(phase);

	result
}
