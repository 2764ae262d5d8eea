use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// An externally supplied content descriptor, optionally tied to one or more
/// recognizable targets.
///
/// Artifacts are immutable once accepted by a store; ownership stays with the
/// caller and stores hold them behind an [`std::sync::Arc`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
	/// Human-readable name, when the source document provides one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Target descriptor(s) this artifact should be surfaced for.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ar_target: Option<OneOrMany<Target>>,
	/// Content payload to hand to the presentation layer on a match.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ar_content: Option<JsonValue>,
}

impl Artifact {
	/// Returns the artifact's targets as a slice, empty when none are declared.
	pub fn targets(&self) -> &[Target] {
		self.ar_target.as_ref().map_or(&[], OneOrMany::as_slice)
	}
}

/// A type-discriminated description of a recognizable target.
///
/// Source documents discriminate on the `@type` field. Discriminators this
/// crate does not model deserialize into [`Target::Unknown`] rather than
/// failing, so stores can skip them and index the variants they do support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Target {
	/// A barcode (or QR code) with a known payload.
	Barcode(BarcodeTarget),
	/// Any other target type, kept as inert data.
	#[serde(untagged)]
	Unknown(JsonValue),
}

/// Payload of a barcode target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeTarget {
	/// The encoded barcode text.
	pub text: String,
}

/// A field that source documents spell as either a single value or a list.
///
/// `Many` is tried first: element types with a catch-all variant (such as
/// [`Target`]) would otherwise swallow a whole JSON array as one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
	/// A list of values.
	Many(Vec<T>),
	/// A bare value.
	One(T),
}

impl<T> OneOrMany<T> {
	/// Returns the contained value(s) as a slice.
	pub fn as_slice(&self) -> &[T] {
		match self {
			Self::One(value) => std::slice::from_ref(value),
			Self::Many(values) => values,
		}
	}
}
