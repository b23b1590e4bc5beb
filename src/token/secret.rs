//! Redacting wrapper for bearer values and client secrets.

// self
use crate::_prelude::*;

const MASK: &str = "***";

/// Sensitive string kept out of `Debug`, `Display`, and tracing fields.
///
/// Serializes transparently so cached token documents and credential files stay plain JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps `value`.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw value for the wire. Never log it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` for an empty secret, which no athenahealth endpoint accepts.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for TokenSecret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret({MASK})")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(MASK)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_mask_the_value() {
		let secret = TokenSecret::new("hunter2");

		assert_eq!(format!("{secret:?} {secret}"), "TokenSecret(***) ***");
		assert_eq!(secret.expose(), "hunter2");
	}

	#[test]
	fn secret_round_trips_as_plain_json_string() {
		let json = serde_json::to_string(&TokenSecret::from("abc"))
			.expect("Token secret should serialize to JSON.");
		let parsed: TokenSecret =
			serde_json::from_str(&json).expect("Token secret should deserialize from JSON.");

		assert_eq!(json, "\"abc\"");
		assert_eq!(parsed, TokenSecret::new("abc"));
		assert!(TokenSecret::new("").is_empty());
	}
}
