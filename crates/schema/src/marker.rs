use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::artifact::{Artifact, Target};

/// A marker observed by a capture collaborator, e.g.
/// `{ "type": "qrcode", "value": "https://..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
	/// Marker kind as reported by the capture side.
	#[serde(rename = "type")]
	pub marker_type: String,
	/// Decoded payload, e.g. the barcode text.
	pub value: String,
}

impl Marker {
	/// Convenience constructor for observed markers.
	pub fn new(marker_type: impl Into<String>, value: impl Into<String>) -> Self {
		Self { marker_type: marker_type.into(), value: value.into() }
	}
}

/// One artifact surfaced for an observed marker.
///
/// Result sets are complete per lookup so an orchestrating collaborator can
/// diff successive cycles into found/lost deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyResult {
	/// The target descriptor the marker matched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target: Option<Target>,
	/// The artifact's content payload, when it declares one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<JsonValue>,
	/// The matched artifact.
	pub artifact: Arc<Artifact>,
}
