//! Check-and-set modes attached to account requests.

// self
use crate::{_prelude::*, account::ValidationError};

/// Optimistic-concurrency guard for a secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasMode {
	/// Reads and writes must target this exact version; `0` means "must not exist yet".
	Enforced(u64),
	/// No version constraint is sent to the server.
	SkipCheck,
}
impl CasMode {
	/// Builds a mode from the raw `skip` flag and expected version.
	///
	/// `SkipCheck` with a non-zero version is contradictory. `Enforced` accepts any version,
	/// including `0`.
	pub fn from_settings(skip: bool, version: u64) -> Result<Self, ValidationError> {
		match (skip, version) {
			(true, 0) => Ok(Self::SkipCheck),
			(true, _) => Err(ValidationError::InvalidCas),
			(false, version) => Ok(Self::Enforced(version)),
		}
	}

	/// Version sent to the server, if any.
	pub fn expected_version(self) -> Option<u64> {
		match self {
			Self::Enforced(version) => Some(version),
			Self::SkipCheck => None,
		}
	}

	/// Whether an observed version satisfies the guard.
	pub fn admits(self, observed: u64) -> bool {
		match self {
			Self::Enforced(expected) => expected == observed,
			Self::SkipCheck => true,
		}
	}
}
impl Display for CasMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Enforced(version) => write!(f, "cas={version}"),
			Self::SkipCheck => f.write_str("cas=skip"),
		}
	}
}
