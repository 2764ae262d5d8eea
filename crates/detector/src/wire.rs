//! Wire protocol spoken with the matching process.
//!
//! Structured, serializable messages only; the matching process shares no
//! memory with the controlling side. Messages are JSON bodies framed with a
//! `Content-Length` header. Every request carries a monotonically increasing
//! correlation id which the matching process echoes verbatim in its
//! response; a one-time bare `"ready"` sentinel precedes all responses.

use percept_schema::Frame;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Monotonically increasing correlation id source, one per connection.
///
/// Ids start at 0 and are never reissued for the life of the channel, so a
/// response always identifies exactly one in-flight request.
#[derive(Debug, Default, Clone, Copy)]
pub struct CorrelationIds(u64);

impl CorrelationIds {
	/// A fresh sequence beginning at id 0.
	#[must_use]
	pub const fn new() -> Self {
		Self(0)
	}

	/// Issues the next id in the sequence.
	#[allow(clippy::should_implement_trait)]
	pub fn next(&mut self) -> u64 {
		let id = self.0;
		self.0 += 1;
		id
	}
}

/// A request to the matching process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// Correlation id, echoed by the matching process.
	pub id: u64,
	/// The requested operation.
	#[serde(flatten)]
	pub op: RequestOp,
}

/// Operations the matching process performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RequestOp {
	/// Register a template image; acknowledged with the assigned target id.
	Add {
		/// Raw template bytes.
		#[serde(with = "base64_bytes")]
		data: Vec<u8>,
	},
	/// Drop a registered target; acknowledged with the same id.
	Remove {
		/// The target id to drop.
		target: u64,
	},
	/// Match a frame against every registered target.
	Process {
		/// The frame to match.
		frame: WireFrame,
	},
}

/// A response from the matching process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	/// Correlation id of the originating request.
	pub id: u64,
	/// The acknowledgment body.
	#[serde(flatten)]
	pub body: ResponseBody,
}

/// Acknowledgment bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResponseBody {
	/// Add/remove acknowledgment carrying the affected target id.
	Target {
		/// The worker-assigned numeric target id.
		target: u64,
	},
	/// Process acknowledgment carrying matched target ids.
	///
	/// An absent or null list means no matches.
	Matches {
		/// Ids of the targets the frame matched.
		#[serde(default)]
		targets: Option<Vec<u64>>,
	},
}

/// A frame as transported on the wire, pixels base64-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
	pub width: u32,
	pub height: u32,
	/// Tightly packed RGBA pixels.
	#[serde(with = "base64_bytes")]
	pub pixels: Vec<u8>,
}

impl From<&Frame> for WireFrame {
	fn from(frame: &Frame) -> Self {
		Self { width: frame.width, height: frame.height, pixels: frame.pixels.clone() }
	}
}

/// The one-time startup sentinel value.
pub const READY_SENTINEL: &str = "ready";

/// Returns true when the inbound message is the readiness sentinel.
pub fn is_ready_sentinel(msg: &JsonValue) -> bool {
	msg.as_str() == Some(READY_SENTINEL)
}

/// Writes one framed message.
pub async fn write_message(
	output: &mut (impl AsyncWrite + Unpin),
	msg: &JsonValue,
) -> Result<()> {
	let json = serde_json::to_string(msg)?;
	let framed = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);
	output.write_all(framed.as_bytes()).await?;
	output.flush().await?;
	Ok(())
}

/// Reads one framed message; `Ok(None)` means the channel reached EOF.
pub async fn read_message(
	input: &mut (impl AsyncBufRead + Unpin),
	buf: &mut String,
) -> Result<Option<JsonValue>> {
	let mut content_length: Option<usize> = None;
	loop {
		buf.clear();
		let bytes_read = input.read_line(buf).await?;
		if bytes_read == 0 {
			return Ok(None);
		}

		let line = buf.trim();
		if line.is_empty() {
			break;
		}

		if let Some(len_str) = line.strip_prefix("Content-Length: ") {
			content_length = len_str.parse().ok();
		}
	}

	let length = content_length.ok_or_else(|| Error::Protocol("missing Content-Length".into()))?;

	let mut body = vec![0u8; length];
	input.read_exact(&mut body).await?;

	let msg: JsonValue = serde_json::from_slice(&body)?;
	Ok(Some(msg))
}

mod base64_bytes {
	use base64::Engine as _;
	use base64::engine::general_purpose::STANDARD;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let encoded = String::deserialize(deserializer)?;
		STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
	}
}
