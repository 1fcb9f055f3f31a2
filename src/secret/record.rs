//! Secret records and payloads returned by the engine.

// std
use std::collections::btree_map::Iter;
// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, http::MalformedResponse};

/// Field map of a secret: key material plus any associated metadata.
///
/// Values are opaque JSON. `Debug` only lists field names.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretPayload(BTreeMap<String, Value>);
impl SecretPayload {
	/// Creates an empty payload.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces a field.
	pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.0.insert(name.into(), value.into());

		self
	}

	/// Returns a field value.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// Returns a field value when it is a string.
	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	/// Number of fields.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the payload has no fields.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates fields in name order.
	pub fn iter(&self) -> Iter<'_, String, Value> {
		self.0.iter()
	}

	/// Consumes the payload, returning the raw field map.
	pub fn into_inner(self) -> BTreeMap<String, Value> {
		self.0
	}
}
impl<K, V> FromIterator<(K, V)> for SecretPayload
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}
impl<'a> IntoIterator for &'a SecretPayload {
	type IntoIter = Iter<'a, String, Value>;
	type Item = (&'a String, &'a Value);

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
impl Debug for SecretPayload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_set().entries(self.0.keys()).finish()
	}
}

/// Version metadata reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecretVersion {
	/// Monotonic version assigned by the engine.
	pub version: u64,
	/// Creation instant of this version, when reported.
	pub created_time: Option<OffsetDateTime>,
}

/// Secret read under a validated location whose version satisfied the CAS guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretRecord {
	/// Version metadata.
	pub version: SecretVersion,
	/// Secret fields.
	pub payload: SecretPayload,
}

#[derive(Deserialize)]
pub(crate) struct WireMetadata {
	#[serde(default)]
	pub(crate) version: Option<u64>,
	#[serde(default)]
	pub(crate) created_time: Option<String>,
}
impl WireMetadata {
	pub(crate) fn into_version(
		self,
		version_field: &'static str,
		created_field: &'static str,
	) -> Result<SecretVersion, MalformedResponse> {
		let version =
			self.version.ok_or(MalformedResponse::MissingField { field: version_field })?;
		let created_time = parse_timestamp(created_field, self.created_time.as_deref())?;

		Ok(SecretVersion { version, created_time })
	}
}

/// Parses an RFC 3339 timestamp; empty strings mean "unset".
pub(crate) fn parse_timestamp(
	field: &'static str,
	raw: Option<&str>,
) -> Result<Option<OffsetDateTime>, MalformedResponse> {
	match raw.map(str::trim) {
		None | Some("") => Ok(None),
		Some(raw) => OffsetDateTime::parse(raw, &Rfc3339)
			.map(Some)
			.map_err(|source| MalformedResponse::InvalidTimestamp { field, source }),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn payload_debug_lists_only_field_names() {
		let payload = SecretPayload::new()
			.with_field("0xabc", "deadbeef")
			.with_field("label", serde_json::json!({ "k": 1 }));

		assert_eq!(format!("{payload:?}"), "{\"0xabc\", \"label\"}");
		assert_eq!(payload.get_str("0xabc"), Some("deadbeef"));
		assert_eq!(payload.get_str("label"), None);
		assert_eq!(payload.len(), 2);
	}

	#[test]
	fn payload_collects_from_pairs() {
		let payload: SecretPayload = [("a", "1"), ("b", "2")].into_iter().collect();
		let names = (&payload).into_iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();

		assert_eq!(names, ["a", "b"]);
	}

	#[test]
	fn timestamps_parse_vault_precision() {
		let parsed = parse_timestamp("created_time", Some("2018-03-22T02:24:06.945319214Z"))
			.expect("Vault timestamps should parse.");

		assert_eq!(parsed, Some(datetime!(2018-03-22 02:24:06.945319214 UTC)));
		assert_eq!(parse_timestamp("deletion_time", Some("")).ok(), Some(None));
		assert!(matches!(
			parse_timestamp("created_time", Some("yesterday")),
			Err(MalformedResponse::InvalidTimestamp { field: "created_time", .. })
		));
	}

	#[test]
	fn metadata_requires_version() {
		let meta = WireMetadata { version: None, created_time: None };

		assert!(matches!(
			meta.into_version("data.metadata.version", "data.metadata.created_time"),
			Err(MalformedResponse::MissingField { field: "data.metadata.version" })
		));
	}
}
