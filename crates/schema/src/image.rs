use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A caller-supplied image target submitted for registration with the
/// matching process.
///
/// The `id` is the caller's external identifier; the numeric id used on the
/// wire is assigned by the matching process and scoped to one detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectableImage {
	/// External identifier, unique among the caller's targets.
	pub id: String,
	/// Human-readable name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Arbitrary media metadata carried through to match results.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub media: Option<JsonValue>,
}

/// A raw captured frame handed to the detection backend for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
	pub width: u32,
	pub height: u32,
	/// Tightly packed RGBA pixels, `width * height * 4` bytes.
	pub pixels: Vec<u8>,
}
